use anyhow::Result;
use gesdisc::{BoundingBox, SubsetClient, SubsetRequest};
use std::path::Path;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Run with RUST_LOG=info to follow job status and downloads.
    // Data downloads need an Earthdata login linked with GES DISC.
    env_logger::init();

    let client = SubsetClient::from_env()?;

    // MERRA-2 hourly surface flux diagnostics, total precipitation over the Karakoram.
    let request = SubsetRequest::builder("M2T1NXFLX_V5.12.4", "PRECTOT")
        .bbox(BoundingBox::new(70.0, 24.0, 90.0, 39.0)?)
        .time_range("1980-01", "1980-02")
        .crop(true)
        .build()?;

    let report = client.run(&request, Path::new("."))?;

    println!(
        "Job {}: {} item(s), {} downloaded, {} failed",
        report.job.id(),
        report.items_received,
        report.downloaded.len(),
        report.failed.len()
    );
    for failed in &report.failed {
        println!("  {}: {}", failed.item.label, failed.error);
    }
    Ok(())
}
