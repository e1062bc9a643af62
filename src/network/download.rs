// file: src/network/download.rs
// version: 2.0.0
// guid: u1v2w3x4-y5z6-7890-1234-567890uvwxyz

//! HTTP downloads with a terminal progress bar

use crate::error::ConfiguratorError;
use crate::Result;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(test)]
type MockResponses = HashMap<String, Result<Vec<u8>>>;

#[cfg(test)]
static MOCK_RESPONSES: OnceLock<Mutex<MockResponses>> = OnceLock::new();

#[cfg(test)]
fn mock_storage() -> &'static Mutex<MockResponses> {
    MOCK_RESPONSES.get_or_init(|| Mutex::new(HashMap::new()))
}

#[cfg(test)]
fn take_mock_download(url: &str) -> Option<Result<Vec<u8>>> {
    mock_storage().lock().unwrap().remove(url)
}

/// Queue the outcome of the next download of `url`; `Ok` bytes are written
/// to the destination
#[cfg(test)]
pub(crate) fn set_mock_download(url: &str, result: Result<Vec<u8>>) {
    mock_storage().lock().unwrap().insert(url.to_string(), result);
}

/// Fetches release archives over HTTP(S)
pub struct NetworkDownloader {
    client: Option<reqwest::Client>,
}

impl NetworkDownloader {
    pub fn new() -> Self {
        #[cfg(test)]
        {
            Self { client: None }
        }

        #[cfg(not(test))]
        {
            Self {
                client: Some(reqwest::Client::new()),
            }
        }
    }

    /// Stream `url` into `dest`, drawing a byte progress bar on a terminal.
    ///
    /// An empty body is an error; nothing downstream can use a zero-byte
    /// archive.
    pub async fn download_with_progress<P: AsRef<Path>>(&self, url: &str, dest: P) -> Result<u64> {
        let dest = dest.as_ref();

        #[cfg(test)]
        if let Some(mock) = take_mock_download(url) {
            let bytes = mock?;
            tokio::fs::write(dest, &bytes).await?;
            return Ok(bytes.len() as u64);
        }

        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ConfiguratorError::network("HTTP client unavailable"))?;

        info!("Fetching {}", url);
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConfiguratorError::network(format!("GET {} returned {}", url, status)));
        }

        let progress = progress_bar(response.content_length())?;
        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut received = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            progress.set_position(received);
        }
        file.flush().await?;
        progress.finish_and_clear();

        if received == 0 {
            return Err(ConfiguratorError::network(format!("{} returned an empty body", url)));
        }

        debug!("Saved {} bytes to {}", received, dest.display());
        Ok(received)
    }
}

fn progress_bar(total: Option<u64>) -> Result<ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return Ok(ProgressBar::hidden());
    }

    let style = match total {
        Some(_) => ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})"),
        None => ProgressStyle::default_spinner().template("{spinner:.green} {bytes} received"),
    }
    .map_err(|e| ConfiguratorError::config(format!("Invalid progress template: {}", e)))?;

    Ok(ProgressBar::new(total.unwrap_or(0)).with_style(style.progress_chars("#>-")))
}

impl Default for NetworkDownloader {
    fn default() -> Self {
        Self::new()
    }
}
