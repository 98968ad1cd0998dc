use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::client::SubsetClient;
use crate::error::SubsetError;
use crate::job::Job;
use crate::transport::Transport;
use crate::util::{guess_filename_from_url, safe_file_name};

/// One `GetResult` reply.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ResultPage {
    #[serde(rename = "itemsPerPage")]
    pub items_per_page: usize,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
    #[serde(rename = "startIndex")]
    pub start_index: usize,
    #[serde(default)]
    pub items: Vec<Value>,
}

/// Informational entry in a job's output listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub label: Option<String>,
    pub link: Option<String>,
}

/// Time-bounded downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// File name the artifact is stored under.
    pub label: String,
    pub link: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultItem {
    Document(Document),
    DataUrl(DataUrl),
}

/// An item that is neither a clean document nor a clean data URL.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedItem {
    pub reason: String,
    pub raw: Value,
}

impl ResultItem {
    /// Classifies a raw listing entry.
    ///
    /// Entries carrying neither `start` nor `end` are documents. Entries with
    /// both as non-empty strings and a non-empty `link` are data URLs. Anything
    /// in between is reported instead of guessed at.
    pub fn classify(raw: &Value) -> Result<ResultItem, MalformedItem> {
        let malformed = |reason: &str| MalformedItem {
            reason: reason.to_string(),
            raw: raw.clone(),
        };

        let obj = raw.as_object().ok_or_else(|| malformed("item is not an object"))?;
        let text = |key: &str| string_field(obj, key).map_err(|reason| malformed(&reason));

        let label = text("label")?;
        let link = text("link")?;

        match (text("start")?, text("end")?) {
            (None, None) => Ok(ResultItem::Document(Document {
                label: label.map(str::to_string),
                link: link.map(str::to_string),
            })),
            (Some(start), Some(end)) if !start.trim().is_empty() && !end.trim().is_empty() => {
                let link = link
                    .filter(|l| !l.trim().is_empty())
                    .ok_or_else(|| malformed("data item without a link"))?;
                let label = label
                    .and_then(safe_file_name)
                    .or_else(|| guess_filename_from_url(link))
                    .ok_or_else(|| malformed("no usable file name for data item"))?;
                Ok(ResultItem::DataUrl(DataUrl {
                    label,
                    link: link.to_string(),
                    start: start.to_string(),
                    end: end.to_string(),
                }))
            }
            (Some(_), Some(_)) => Err(malformed("empty `start` or `end`")),
            _ => Err(malformed("only one of `start` and `end` present")),
        }
    }
}

fn string_field<'v>(obj: &'v Map<String, Value>, key: &str) -> Result<Option<&'v str>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(format!("`{key}` is not a string")),
    }
}

/// Lazy walk over a finished job's result listing.
///
/// Pages are requested on demand, `batch_size` items at a time, until the
/// service-reported total has been received. Not restartable: once exhausted
/// (or after an error) it yields nothing more.
pub struct ResultItems<'a, T: Transport> {
    client: &'a SubsetClient<T>,
    job_id: String,
    next_index: usize,
    received: usize,
    total: Option<usize>,
    pages: usize,
    buffer: VecDeque<Value>,
    done: bool,
}

impl<'a, T: Transport> ResultItems<'a, T> {
    pub(crate) fn new(client: &'a SubsetClient<T>, job: &Job) -> Self {
        Self {
            client,
            job_id: job.id().to_string(),
            next_index: 0,
            received: 0,
            total: None,
            pages: 0,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Number of `GetResult` calls made so far.
    pub fn pages_requested(&self) -> usize {
        self.pages
    }

    /// Service-reported total, known after the first page.
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    fn fetch_next_page(&mut self) -> Result<(), SubsetError> {
        let page = self
            .client
            .get_result_page(&self.job_id, self.next_index)?;
        self.pages += 1;

        let expected = *self.total.get_or_insert(page.total_results);
        let got = page.items.len();
        log::info!(
            "GetResult startIndex={} returned {} item(s), {} of {} so far",
            page.start_index,
            got,
            self.received + got,
            expected
        );

        if got == 0 && self.received < expected {
            return Err(SubsetError::IncompleteResultSet {
                received: self.received,
                expected,
            });
        }

        self.received += got;
        self.next_index += self.client.batch_size();
        self.buffer.extend(page.items);
        Ok(())
    }
}

impl<T: Transport> Iterator for ResultItems<'_, T> {
    type Item = Result<Value, SubsetError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if let Some(total) = self.total {
                if self.received >= total {
                    self.done = true;
                    return None;
                }
            }
            if let Err(e) = self.fetch_next_page() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}
