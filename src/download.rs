use indicatif::{ProgressBar, ProgressStyle};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::SubsetError;
use crate::results::DataUrl;
use crate::transport::Transport;
use crate::util::short_url;

/// Streams one data URL into `dir/<label>`.
///
/// The body lands in a temporary file next to the target and is renamed onto
/// it only once complete, so a failed transfer leaves nothing behind.
pub(crate) fn fetch_to_dir<T: Transport>(
    transport: &T,
    item: &DataUrl,
    dir: &Path,
    progress: bool,
) -> Result<PathBuf, SubsetError> {
    let target = dir.join(&item.label);
    let mut download = transport.get(&item.link)?;

    std::fs::create_dir_all(dir)?;
    let mut out = tempfile::Builder::new()
        .prefix(".gesdisc-")
        .suffix(".part")
        .tempfile_in(dir)?;

    let pb = progress.then(|| progress_bar(download.content_length, &item.label));

    let mut buf = [0u8; 64 * 1024];
    let mut written: u64 = 0;
    loop {
        let n = match download.body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if let Some(pb) = &pb {
                    pb.abandon();
                }
                return Err(e.into());
            }
        };
        out.write_all(&buf[..n])?;
        written += n as u64;
        if let Some(pb) = &pb {
            pb.inc(n as u64);
        }
    }
    out.flush()?;

    if let Some(expected) = download.content_length {
        if written < expected {
            return Err(SubsetError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "{}: received {} byte(s) out of {}",
                    short_url(&item.link),
                    written,
                    expected
                ),
            )));
        }
    }

    out.persist(&target).map_err(|e| SubsetError::Io(e.error))?;
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    Ok(target)
}

fn progress_bar(len: Option<u64>, label: &str) -> ProgressBar {
    let pb = match len {
        Some(len) => {
            let pb = ProgressBar::new(len);
            if let Ok(style) = ProgressStyle::with_template(
                "{msg} {spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        }
        None => ProgressBar::new_spinner(),
    };
    pb.set_message(label.to_string());
    pb
}
