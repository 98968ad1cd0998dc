use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use std::io::Read;

use crate::config::ClientConfig;
use crate::error::SubsetError;
use crate::wsp::{WspRequest, WspResponse};

/// An artifact body being received.
pub struct Download {
    /// Expected body length, when the server announced one.
    pub content_length: Option<u64>,
    pub body: Box<dyn Read>,
}

/// Connection to the subset service and the artifact host.
///
/// One transport is owned by a [`crate::SubsetClient`] for its whole life and
/// every request goes through it, one at a time.
pub trait Transport {
    /// Sends a JSON-WSP request and returns the decoded envelope.
    fn call(&self, request: &WspRequest) -> Result<WspResponse, SubsetError>;

    /// Starts a GET for an artifact. Non-2xx replies fail with
    /// [`SubsetError::HttpStatus`] before any body is handed out.
    fn get(&self, url: &str) -> Result<Download, SubsetError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn call(&self, request: &WspRequest) -> Result<WspResponse, SubsetError> {
        (**self).call(request)
    }

    fn get(&self, url: &str) -> Result<Download, SubsetError> {
        (**self).get(url)
    }
}

/// Blocking HTTP transport backed by a single `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(cfg: &ClientConfig) -> Result<Self, SubsetError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gesdisc-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("gesdisc-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(cfg.timeout);

        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            url: cfg.url.clone(),
            http: builder.build()?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn call(&self, request: &WspRequest) -> Result<WspResponse, SubsetError> {
        log::debug!("POST {} ({})", self.url, request.methodname);
        let resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(request)
            .send()?;

        let status = resp.status();
        let text = resp.text()?;

        // Faults usually arrive with a 2xx status, but some gateways use 500.
        // Either way a parseable envelope wins over the bare status.
        match serde_json::from_str::<WspResponse>(&text) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(SubsetError::HttpStatus {
                status,
                url: self.url.clone(),
            }),
            Err(e) => Err(SubsetError::unexpected(
                &request.methodname,
                format!("{e} (status={status})"),
            )),
        }
    }

    fn get(&self, url: &str) -> Result<Download, SubsetError> {
        let resp = self.http.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SubsetError::HttpStatus {
                status,
                url: url.to_string(),
            });
        }

        Ok(Download {
            content_length: resp.content_length(),
            body: Box::new(resp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves one connection with `reply` as raw bytes, then hangs up.
    fn serve_once(reply: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((k, v)) = line.split_once(':') {
                    if k.eq_ignore_ascii_case("content-length") {
                        content_length = v.trim().parse().unwrap();
                    }
                }
            }
            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();
            let mut stream = reader.into_inner();
            stream.write_all(reply).unwrap();
            stream.flush().unwrap();
        });
        format!("http://{addr}/service/subset/jsonwsp")
    }

    fn transport(url: String) -> HttpTransport {
        HttpTransport::new(&ClientConfig {
            url,
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn call_decodes_envelope() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 57\r\nConnection: close\r\n\r\n\
{\"type\":\"jsonwsp/response\",\"result\":{\"Status\":\"Running\"}}",
        );
        let resp = transport(url)
            .call(&WspRequest::new("GetStatus", json!({ "jobId": "abc" })))
            .unwrap();
        assert!(!resp.is_fault());
        assert_eq!(resp.result, Some(json!({ "Status": "Running" })));
    }

    #[test]
    fn truncated_reply_body_is_an_http_error() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 200\r\nConnection: close\r\n\r\n{\"type\":",
        );
        let err = transport(url)
            .call(&WspRequest::new("GetStatus", json!({ "jobId": "abc" })))
            .unwrap_err();
        assert!(matches!(err, SubsetError::Http(_)), "{err:?}");
    }
}
