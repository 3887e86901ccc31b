//! Tarball download over HTTP.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::util::shell::{Shell, Status};

/// Fetches remote files during source acquisition.
///
/// Callers skip the fetch entirely when the destination already exists, so
/// implementations never see a pre-existing `dest`.
pub trait Downloader {
    /// Download `url` to `dest`.
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// HTTP downloader with progress reporting.
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
    shell: Arc<Shell>,
}

impl HttpDownloader {
    pub fn new(shell: Arc<Shell>) -> Self {
        HttpDownloader {
            client: reqwest::blocking::Client::new(),
            shell,
        }
    }
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        self.shell.status(Status::Fetching, url);

        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to download {}", url))?;

        if !response.status().is_success() {
            bail!("failed to download {}: HTTP {}", url, response.status());
        }

        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());
        let total = response.content_length().unwrap_or(0);
        let mut progress = self.shell.bytes_progress(name, total);

        // Stream into a temporary file next to the destination so a partial
        // download never looks like a finished one.
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;

        let mut buffer = [0u8; 65536];
        loop {
            let n = response
                .read(&mut buffer)
                .with_context(|| format!("failed to read response body from {}", url))?;
            if n == 0 {
                break;
            }
            tmp.write_all(&buffer[..n])?;
            progress.inc(n as u64);
        }
        progress.finish();

        tmp.persist(dest)
            .with_context(|| format!("failed to write {}", dest.display()))?;

        Ok(())
    }
}

/// Final path segment of a download URL.
pub fn filename_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).with_context(|| format!("invalid source url: {}", url))?;
    let name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string);

    match name {
        Some(name) => Ok(name),
        None => bail!("source url has no file name: {}", url),
    }
}
