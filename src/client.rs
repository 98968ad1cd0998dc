use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{ClientConfig, load_config};
use crate::download::fetch_to_dir;
use crate::error::SubsetError;
use crate::job::{Job, JobStatus, StatusReply, SubmitReply};
use crate::request::SubsetRequest;
use crate::results::{DataUrl, ResultItems, ResultPage};
use crate::transport::{HttpTransport, Transport};
use crate::util::short_url;
use crate::wsp::{METHOD_GET_RESULT, METHOD_GET_STATUS, METHOD_SUBSET, WspRequest};

/// Results requested per `GetResult` call.
pub const DEFAULT_BATCH_SIZE: usize = 20;
/// Pause between two `GetStatus` calls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Client for the asynchronous subset job service.
///
/// Owns its [`Transport`]; every request of a workflow goes through it and it
/// is released when the client is dropped.
#[derive(Debug)]
pub struct SubsetClient<T: Transport = HttpTransport> {
    transport: T,

    poll_interval: Duration,
    poll_timeout: Option<Duration>,
    batch_size: usize,
    progress: bool,
}

impl SubsetClient<HttpTransport> {
    /// Creates a client using environment variables and/or `.gesdiscrc`.
    ///
    /// This is equivalent to `SubsetClient::new(None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`verify` arguments
    /// - environment variables `GESDISC_SUBSET_URL` / `GESDISC_VERIFY`
    /// - config file from `GESDISC_RC` or `.gesdiscrc`
    /// - the public GES DISC endpoint
    pub fn new(url: Option<String>, verify: Option<bool>) -> Result<Self> {
        let cfg = load_config(url, verify)?;
        Self::with_config(&cfg)
    }

    pub fn with_config(cfg: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(cfg).context("failed to build HTTP client")?;
        Ok(Self::with_transport(transport))
    }
}

impl<T: Transport> SubsetClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: None,
            batch_size: DEFAULT_BATCH_SIZE,
            progress: true,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Gives up polling after `timeout`. Without it, polling waits as long as
    /// the service keeps reporting the job as accepted or running.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Submits a subset request and returns the job the service created.
    pub fn submit(&self, request: &SubsetRequest) -> Result<Job, SubsetError> {
        let reply: SubmitReply = self.call(METHOD_SUBSET, request.to_args())?;

        let job_id = reply
            .job_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| SubsetError::unexpected(METHOD_SUBSET, "missing jobId"))?;
        let status: JobStatus = reply
            .status
            .ok_or_else(|| SubsetError::unexpected(METHOD_SUBSET, "missing Status"))?
            .parse::<JobStatus>()
            .map_err(|e: String| SubsetError::unexpected(METHOD_SUBSET, e))?;

        log::info!("Job ID: {}", job_id);
        log::info!("Job status: {}", status);
        Ok(Job::new(job_id, status))
    }

    /// Blocks until the job reaches a terminal status and returns it.
    ///
    /// Sleeps the poll interval before every `GetStatus` call. A job that is
    /// already terminal is returned without contacting the service.
    pub fn poll(&self, job: &mut Job) -> Result<JobStatus, SubsetError> {
        let started = Instant::now();

        while !job.status().is_terminal() {
            if let Some(limit) = self.poll_timeout {
                if started.elapsed() >= limit {
                    return Err(SubsetError::PollTimeout {
                        job_id: job.id().to_string(),
                        status: job.status().to_string(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }

            thread::sleep(self.poll_interval);
            let reply: StatusReply =
                self.call(METHOD_GET_STATUS, json!({ "jobId": job.id() }))?;
            job.apply(reply)?;
            log::info!(
                "Job status: {} ({}% complete)",
                job.status(),
                job.percent_complete()
            );
        }

        match job.status() {
            JobStatus::Succeeded => {
                log::info!("Job Finished: {}", job.message().unwrap_or(""))
            }
            _ => log::warn!("Job Failed: {}", job.message().unwrap_or("no message")),
        }
        Ok(job.status())
    }

    /// Requests one page of a job's result listing.
    pub fn get_result_page(&self, job_id: &str, start_index: usize) -> Result<ResultPage, SubsetError> {
        self.call(
            METHOD_GET_RESULT,
            json!({
                "jobId": job_id,
                "count": self.batch_size,
                "startIndex": start_index,
            }),
        )
    }

    /// Lazily walks the result listing of a succeeded job.
    pub fn collect<'a>(&'a self, job: &Job) -> ResultItems<'a, T> {
        ResultItems::new(self, job)
    }

    /// Downloads one data URL into `dir`, named by its label.
    pub fn fetch(&self, item: &DataUrl, dir: &Path) -> Result<PathBuf, SubsetError> {
        log::debug!("GET {}", short_url(&item.link));
        let path = fetch_to_dir(&self.transport, item, dir, self.progress)?;
        log::info!("{} is downloaded", path.display());
        Ok(path)
    }

    fn call<R: DeserializeOwned>(&self, method: &str, args: Value) -> Result<R, SubsetError> {
        let request = WspRequest::new(method, args);
        self.transport.call(&request)?.into_result(method)
    }
}
