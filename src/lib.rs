//! A small Rust client for the NASA GES DISC subsetting service.
//!
//! This crate implements the asynchronous subset job flow used to fetch
//! MERRA-2 reanalysis slices: submit a subset request, poll until the job
//! finishes, page through the result listing, then download every data URL.
//!
//! ## Quick start
//! - The service endpoint defaults to the public GES DISC URL. Override it via
//!   `GESDISC_SUBSET_URL` or a `.gesdiscrc` file (current or home directory).
//! - Build a [`SubsetRequest`] and call [`SubsetClient::run`].
//!
//! ```no_run
//! use anyhow::Result;
//! use gesdisc::{BoundingBox, SubsetClient, SubsetRequest};
//!
//! fn main() -> Result<()> {
//!     let request = SubsetRequest::builder("M2T1NXFLX_V5.12.4", "PRECTOT")
//!         .bbox(BoundingBox::new(70.0, 24.0, 90.0, 39.0)?)
//!         .time_range("1980-01", "1980-02")
//!         .build()?;
//!
//!     let report = SubsetClient::from_env()?.run(&request, std::path::Path::new("."))?;
//!     println!("{} file(s) downloaded", report.downloaded.len());
//!     Ok(())
//! }
//! ```
//!
//! The individual steps ([`SubsetClient::submit`], [`SubsetClient::poll`],
//! [`SubsetClient::collect`], [`ResultItem::classify`],
//! [`SubsetClient::fetch`]) are public for callers that need finer control.

#![forbid(unsafe_code)]

mod client;
mod config;
mod download;
mod error;
mod job;
mod request;
mod results;
mod transport;
mod util;
mod workflow;
mod wsp;

pub use client::{DEFAULT_BATCH_SIZE, DEFAULT_POLL_INTERVAL, SubsetClient};
pub use config::{ClientConfig, DEFAULT_URL};
pub use error::SubsetError;
pub use job::{Job, JobStatus};
pub use request::{BoundingBox, DatasetVariable, Regrid, SubsetRequest, SubsetRequestBuilder, TimeRange};
pub use results::{DataUrl, Document, MalformedItem, ResultItem, ResultItems, ResultPage};
pub use transport::{Download, HttpTransport, Transport};
pub use workflow::{FailedDownload, WorkflowReport, WorkflowState};
pub use wsp::{WspRequest, WspResponse};
