use reqwest::StatusCode;
use thiserror::Error;

use crate::workflow::WorkflowState;

/// Errors raised by the subset job client.
///
/// Any error from submit, poll or collect ends a workflow. Errors raised
/// while fetching a single data URL are recorded per item and do not stop
/// the run.
#[derive(Debug, Error)]
pub enum SubsetError {
    #[error("API error: faulty {method} request{}", fault_suffix(.code, .message))]
    ProtocolFault {
        method: String,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("job {job_id} failed{}", message_suffix(.message))]
    JobFailed {
        job_id: String,
        message: Option<String>,
    },

    #[error("retrieved {received} out of {expected} expected result items")]
    IncompleteResultSet { received: usize, expected: usize },

    #[error("job {job_id} still {status} after {waited_secs}s")]
    PollTimeout {
        job_id: String,
        status: String,
        waited_secs: u64,
    },

    #[error("unexpected {method} response: {detail}")]
    UnexpectedResponse { method: String, detail: String },

    #[error("HTTP {status} for url ({url})")]
    HttpStatus { status: StatusCode, url: String },

    #[error("invalid subset request: {0}")]
    InvalidRequest(String),

    #[error("invalid workflow transition {from:?} -> {to:?}")]
    InvalidTransition { from: WorkflowState, to: WorkflowState },

    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubsetError {
    pub(crate) fn unexpected(method: &str, detail: impl Into<String>) -> Self {
        SubsetError::UnexpectedResponse {
            method: method.to_string(),
            detail: detail.into(),
        }
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

fn fault_suffix(code: &Option<String>, message: &Option<String>) -> String {
    match (code.as_deref(), message.as_deref()) {
        (Some(c), Some(m)) => format!(" ({c}: {m})"),
        (Some(c), None) => format!(" ({c})"),
        (None, Some(m)) => format!(" ({m})"),
        (None, None) => String::new(),
    }
}

/// Body of a `jsonwsp/fault` reply.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct WspFault {
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(default)]
    pub(crate) string: Option<String>,
    // Some deployments put the explanation under "detail" instead.
    #[serde(default)]
    pub(crate) detail: Option<Vec<String>>,
}

impl WspFault {
    pub(crate) fn into_error(self, method: &str) -> SubsetError {
        let message = self
            .string
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.detail.map(|d| d.join("; ")))
            .filter(|s| !s.trim().is_empty());
        SubsetError::ProtocolFault {
            method: method.to_string(),
            code: self.code,
            message,
        }
    }
}
