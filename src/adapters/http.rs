//! HTTP downloader for episode audio.
//!
//! Streams each response into `<destination>.part` and renames it into place
//! once the body is complete, so a failed transfer never leaves a file at the
//! destination.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::{DownloadItem, DownloadOutcome, DownloadResult, DownloadSummary, Downloader};

/// Settings for [`HttpDownloader`]
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Maximum transfers in flight
    pub concurrency: usize,

    /// Per-request timeout
    pub timeout: Duration,

    /// Replace existing destination files instead of skipping them
    pub overwrite: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: Duration::from_secs(300),
            overwrite: false,
        }
    }
}

/// Downloader backed by reqwest
pub struct HttpDownloader {
    client: reqwest::Client,
    config: DownloaderConfig,
}

impl HttpDownloader {
    /// Create a downloader with its own HTTP client
    pub fn new(config: DownloaderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("podvault/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(client, config))
    }

    /// Create a downloader sharing an existing client
    pub fn with_client(client: reqwest::Client, config: DownloaderConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    fn name(&self) -> &str {
        "http"
    }

    async fn download(&self, items: Vec<DownloadItem>) -> DownloadSummary {
        if items.is_empty() {
            return DownloadSummary::default();
        }

        info!(
            count = items.len(),
            concurrency = self.config.concurrency,
            "starting batch download"
        );

        // One transfer per destination; repeats share the first item's outcome
        let mut first_for: HashMap<PathBuf, usize> = HashMap::new();
        let mut source: Vec<usize> = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let first = *first_for.entry(item.destination.clone()).or_insert(index);
            source.push(first);
        }
        if first_for.len() < items.len() {
            debug!(
                duplicates = items.len() - first_for.len(),
                "collapsing items that share a destination"
            );
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, item) in items.iter().enumerate() {
            if source[index] != index {
                continue;
            }

            let item = item.clone();
            let client = self.client.clone();
            let semaphore = Arc::clone(&semaphore);
            let overwrite = self.config.overwrite;

            tasks.spawn(async move {
                // Never closed
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = download_one(&client, &item, overwrite).await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<DownloadOutcome>> = vec![None; items.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => error!(error = %e, "download task aborted"),
            }
        }

        let results = items
            .into_iter()
            .zip(source)
            .map(|(item, first)| {
                let outcome = outcomes[first].clone().unwrap_or_else(|| {
                    DownloadOutcome::Failed("download task aborted".to_string())
                });
                DownloadResult::new(item, outcome)
            })
            .collect();

        let summary = DownloadSummary::from_results(results);
        info!(
            successful = summary.successful,
            skipped = summary.skipped,
            failed = summary.failed,
            "batch download completed"
        );

        summary
    }
}

async fn download_one(
    client: &reqwest::Client,
    item: &DownloadItem,
    overwrite: bool,
) -> DownloadOutcome {
    if !overwrite && item.destination.exists() {
        debug!(path = %item.destination.display(), "file already exists, skipping");
        return DownloadOutcome::Skipped;
    }

    match fetch_to_path(client, &item.url, &item.destination).await {
        Ok(bytes) => {
            info!(path = %item.destination.display(), bytes, "download complete");
            DownloadOutcome::Downloaded
        }
        Err(e) => {
            error!(url = %item.url, error = %e, "download failed");
            DownloadOutcome::Failed(format!("{:#}", e))
        }
    }
}

async fn fetch_to_path(client: &reqwest::Client, url: &str, destination: &Path) -> Result<u64> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let partial = partial_path(destination);
    let result = stream_to_file(client, url, &partial).await;

    match result {
        Ok(bytes) => {
            fs::rename(&partial, destination).await.with_context(|| {
                format!("Failed to move download into place: {}", destination.display())
            })?;
            Ok(bytes)
        }
        Err(e) => {
            if fs::remove_file(&partial).await.is_ok() {
                debug!(path = %partial.display(), "cleaned up partial file");
            }
            Err(e)
        }
    }
}

async fn stream_to_file(client: &reqwest::Client, url: &str, path: &Path) -> Result<u64> {
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request failed: {}", url))?
        .error_for_status()
        .with_context(|| format!("Server rejected request: {}", url))?;

    debug!(url, content_length = ?response.content_length(), "receiving");

    let mut file = fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create file: {}", path.display()))?;

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await.context("Failed to read response body")? {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        written += chunk.len() as u64;
    }
    file.flush().await.context("Failed to flush download")?;

    Ok(written)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut partial = destination.as_os_str().to_owned();
    partial.push(".part");
    PathBuf::from(partial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/data/downloads/e1.mp3")),
            PathBuf::from("/data/downloads/e1.mp3.part")
        );
    }

    #[tokio::test]
    async fn test_existing_destination_is_skipped() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("e1.mp3");
        std::fs::write(&destination, b"already here").unwrap();

        let downloader = HttpDownloader::new(DownloaderConfig::default()).unwrap();
        let summary = downloader
            .download(vec![DownloadItem::new("http://127.0.0.1:9/e1.mp3", &destination)])
            .await;

        assert_eq!(summary.requested, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(std::fs::read(&destination).unwrap(), b"already here");
    }

    #[tokio::test]
    async fn test_failed_transfer_leaves_no_file() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("downloads").join("e1.mp3");

        let config = DownloaderConfig {
            timeout: Duration::from_secs(5),
            ..DownloaderConfig::default()
        };
        let downloader = HttpDownloader::new(config).unwrap();
        // Port 9 (discard) is not expected to serve HTTP
        let summary = downloader
            .download(vec![DownloadItem::new("http://127.0.0.1:9/e1.mp3", &destination)])
            .await;

        assert_eq!(summary.failed, 1);
        assert!(matches!(summary.results[0].outcome, DownloadOutcome::Failed(_)));
        assert!(!destination.exists());
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_shared_destination_downloads_once() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("downloads").join("e1.mp3");

        let config = DownloaderConfig {
            timeout: Duration::from_secs(5),
            ..DownloaderConfig::default()
        };
        let downloader = HttpDownloader::new(config).unwrap();
        let summary = downloader
            .download(vec![
                DownloadItem::new("http://127.0.0.1:9/e1.mp3", &destination),
                DownloadItem::new("http://127.0.0.1:9/other.mp3", temp.path().join("e2.mp3")),
                DownloadItem::new("http://127.0.0.1:9/e1-mirror.mp3", &destination),
            ])
            .await;

        assert_eq!(summary.requested, 3);
        assert_eq!(summary.results.len(), 3);
        assert_eq!(summary.results[0].outcome, summary.results[2].outcome);
        assert_eq!(summary.results[2].url, "http://127.0.0.1:9/e1-mirror.mp3");
        assert_eq!(summary.results[2].destination, destination);
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_shared_existing_destination_is_skipped_for_all() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("e1.mp3");
        std::fs::write(&destination, b"already here").unwrap();

        let downloader = HttpDownloader::new(DownloaderConfig::default()).unwrap();
        let item = DownloadItem::new("http://127.0.0.1:9/e1.mp3", &destination);
        let summary = downloader.download(vec![item.clone(), item]).await;

        assert_eq!(summary.requested, 2);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let downloader = HttpDownloader::new(DownloaderConfig::default()).unwrap();
        let summary = downloader.download(Vec::new()).await;
        assert_eq!(summary.requested, 0);
    }
}
