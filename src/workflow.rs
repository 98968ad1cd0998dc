//! End-to-end run: submit, poll, collect, download.
//!
//! Idle → Submitted → Polling → {Succeeded → Collecting → Downloading → Done}
//!                             | {Failed → Aborted}
//!
//! A fault at any step before downloading also ends in Aborted.

use std::path::{Path, PathBuf};

use crate::client::SubsetClient;
use crate::error::SubsetError;
use crate::job::{Job, JobStatus};
use crate::request::SubsetRequest;
use crate::results::{DataUrl, Document, MalformedItem, ResultItem};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Submitted,
    Polling,
    Succeeded,
    Failed,
    Collecting,
    Downloading,
    Done,
    Aborted,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Done | WorkflowState::Aborted)
    }

    pub fn can_transition_to(&self, target: WorkflowState) -> bool {
        use WorkflowState::*;
        match (self, target) {
            (Idle, Submitted) => true,
            (Submitted, Polling) => true,
            (Polling, Succeeded) | (Polling, Failed) => true,
            (Succeeded, Collecting) => true,
            (Collecting, Downloading) => true,
            (Downloading, Done) => true,

            (Failed, Aborted) => true,
            // Faults abort from any non-terminal state.
            (from, Aborted) => !from.is_terminal(),

            _ => false,
        }
    }
}

/// Tracks the state of one run and rejects backwards moves.
#[derive(Debug)]
pub(crate) struct Workflow {
    state: WorkflowState,
}

impl Workflow {
    pub(crate) fn new() -> Self {
        Self {
            state: WorkflowState::Idle,
        }
    }

    pub(crate) fn state(&self) -> WorkflowState {
        self.state
    }

    pub(crate) fn advance(&mut self, to: WorkflowState) -> Result<(), SubsetError> {
        if !self.state.can_transition_to(to) {
            return Err(SubsetError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        log::debug!("workflow {:?} -> {:?}", self.state, to);
        self.state = to;
        Ok(())
    }

    fn abort(&mut self, err: SubsetError) -> SubsetError {
        log::error!("workflow aborted in state {:?}: {}", self.state, err);
        if self.state.can_transition_to(WorkflowState::Aborted) {
            self.state = WorkflowState::Aborted;
        }
        err
    }
}

/// A data URL that could not be downloaded.
#[derive(Debug)]
pub struct FailedDownload {
    pub item: DataUrl,
    pub error: SubsetError,
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct WorkflowReport {
    pub job: Job,
    /// Number of listing entries received.
    pub items_received: usize,
    pub documents: Vec<Document>,
    pub downloaded: Vec<PathBuf>,
    pub failed: Vec<FailedDownload>,
    pub malformed: Vec<MalformedItem>,
}

impl<T: Transport> SubsetClient<T> {
    /// Runs the whole workflow and writes every data URL into `dir`.
    ///
    /// Consumes the client: the transport is released once the run is over.
    /// Faults from the job API and a failed job are returned as errors; a
    /// single failed download is recorded in the report and the run goes on.
    pub fn run(self, request: &SubsetRequest, dir: &Path) -> Result<WorkflowReport, SubsetError> {
        let mut wf = Workflow::new();
        let outcome = self
            .run_tracked(&mut wf, request, dir)
            .map_err(|e| wf.abort(e));
        log::debug!("workflow ended in {:?}", wf.state());
        outcome
    }

    fn run_tracked(
        &self,
        wf: &mut Workflow,
        request: &SubsetRequest,
        dir: &Path,
    ) -> Result<WorkflowReport, SubsetError> {
        let mut job = self.submit(request)?;
        wf.advance(WorkflowState::Submitted)?;

        wf.advance(WorkflowState::Polling)?;
        match self.poll(&mut job)? {
            JobStatus::Succeeded => wf.advance(WorkflowState::Succeeded)?,
            _ => {
                wf.advance(WorkflowState::Failed)?;
                return Err(SubsetError::JobFailed {
                    job_id: job.id().to_string(),
                    message: job.message().map(str::to_string),
                });
            }
        }

        wf.advance(WorkflowState::Collecting)?;
        let mut items_received = 0;
        let mut documents = Vec::new();
        let mut data_urls = Vec::new();
        let mut malformed = Vec::new();
        let mut items = self.collect(&job);
        for raw in items.by_ref() {
            let raw = raw?;
            items_received += 1;
            match ResultItem::classify(&raw) {
                Ok(ResultItem::DataUrl(url)) => data_urls.push(url),
                Ok(ResultItem::Document(doc)) => {
                    log::debug!(
                        "document {}: {}",
                        doc.label.as_deref().unwrap_or("(unlabelled)"),
                        doc.link.as_deref().unwrap_or("")
                    );
                    documents.push(doc);
                }
                Err(bad) => {
                    log::warn!("skipping malformed result item ({}): {}", bad.reason, bad.raw);
                    malformed.push(bad);
                }
            }
        }
        log::info!(
            "Retrieved {} out of {} expected items",
            items_received,
            items.total().unwrap_or(0)
        );

        wf.advance(WorkflowState::Downloading)?;
        let mut downloaded = Vec::new();
        let mut failed = Vec::new();
        for item in data_urls {
            match self.fetch(&item, dir) {
                Ok(path) => downloaded.push(path),
                Err(error) => {
                    log::warn!("Error! {} for {}", error, item.label);
                    failed.push(FailedDownload { item, error });
                }
            }
        }
        log::info!(
            "Downloading is done: {} file(s) written to {}, {} failed",
            downloaded.len(),
            dir.display(),
            failed.len()
        );

        wf.advance(WorkflowState::Done)?;
        Ok(WorkflowReport {
            job,
            items_received,
            documents,
            downloaded,
            failed,
            malformed,
        })
    }
}
