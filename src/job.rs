use std::fmt;
use std::str::FromStr;

use crate::error::SubsetError;

/// Remote-defined job states.
///
/// Accepted → Running → {Succeeded | Failed}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Accepted,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Accepted => 0,
            JobStatus::Running => 1,
            JobStatus::Succeeded | JobStatus::Failed => 2,
        }
    }

    /// Whether the service may report `next` after `self`.
    pub fn can_follow_with(&self, next: JobStatus) -> bool {
        *self == next || (!self.is_terminal() && next.rank() >= self.rank())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Accepted => "Accepted",
            JobStatus::Running => "Running",
            JobStatus::Succeeded => "Succeeded",
            JobStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Accepted" => Ok(JobStatus::Accepted),
            "Running" => Ok(JobStatus::Running),
            "Succeeded" => Ok(JobStatus::Succeeded),
            "Failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status [{other}]")),
        }
    }
}

/// A submitted subset job. Only updated from service replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    id: String,
    status: JobStatus,
    percent_complete: u8,
    message: Option<String>,
}

impl Job {
    pub(crate) fn new(id: String, status: JobStatus) -> Self {
        Self {
            id,
            status,
            percent_complete: 0,
            message: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn percent_complete(&self) -> u8 {
        self.percent_complete
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub(crate) fn apply(&mut self, reply: StatusReply) -> Result<(), SubsetError> {
        let status: JobStatus = reply
            .status
            .parse::<JobStatus>()
            .map_err(|e: String| SubsetError::unexpected(crate::wsp::METHOD_GET_STATUS, e))?;

        if !self.status.can_follow_with(status) {
            log::warn!(
                "job {}: service reported {} after {}",
                self.id,
                status,
                self.status
            );
        }

        self.status = status;
        if let Some(raw) = &reply.percent_completed {
            match percent(raw) {
                Some(p) => self.percent_complete = p,
                None => log::debug!("job {}: ignoring PercentCompleted {}", self.id, raw),
            }
        }
        if reply.message.is_some() {
            self.message = reply.message;
        }
        Ok(())
    }
}

/// Reads a progress value sent as a number or a numeric string, clamped to 0..=100.
fn percent(value: &serde_json::Value) -> Option<u8> {
    let p = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    p.is_finite().then(|| p.clamp(0.0, 100.0) as u8)
}

/// `result` of a `subset` reply.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct SubmitReply {
    #[serde(default, rename = "jobId")]
    pub(crate) job_id: Option<String>,
    #[serde(default, rename = "Status")]
    pub(crate) status: Option<String>,
}

/// `result` of a `GetStatus` reply.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct StatusReply {
    #[serde(rename = "Status")]
    pub(crate) status: String,
    // Number or numeric string; anything else is ignored.
    #[serde(default, rename = "PercentCompleted")]
    pub(crate) percent_completed: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}
