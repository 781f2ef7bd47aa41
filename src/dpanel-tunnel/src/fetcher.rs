use crate::error::{Result, TunnelError};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Streams release archives to disk.
pub struct ArtifactFetcher {
    client: Client,
    progress: bool,
}

impl ArtifactFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TunnelError::ConfigurationInvalid(e.to_string()))?;
        Ok(Self {
            client,
            progress: true,
        })
    }

    /// Disables the progress bar.
    pub fn quiet(mut self) -> Self {
        self.progress = false;
        self
    }

    /// Downloads `url` into a newly created `destination`, returning the number
    /// of bytes written. A partially written file is left in place on failure.
    pub async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let failed = |reason: String| TunnelError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        if url.trim().is_empty() {
            return Err(failed("source url is empty".to_string()));
        }
        if destination.as_os_str().is_empty() || destination.file_name().is_none() {
            return Err(failed(format!(
                "invalid destination {}",
                destination.display()
            )));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(failed(format!("bad status: {}", response.status())));
        }

        let total = response.content_length().unwrap_or(0);
        let pb = self.progress_bar(total);

        let mut file = File::create(destination)
            .await
            .map_err(TunnelError::fs("create", destination))?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| failed(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(TunnelError::fs("write", destination))?;
            written += chunk.len() as u64;
            pb.inc(chunk.len() as u64);
        }
        file.flush()
            .await
            .map_err(TunnelError::fs("flush", destination))?;

        pb.finish_and_clear();
        tracing::info!(
            "downloaded {} ({} bytes) to {}",
            url,
            written,
            destination.display()
        );

        Ok(written)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ) {
            pb.set_style(style);
        }
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::Router;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });
        format!("http://{}", addr)
    }

    fn fetcher() -> ArtifactFetcher {
        ArtifactFetcher::new(Duration::from_secs(5)).unwrap().quiet()
    }

    #[tokio::test]
    async fn writes_body_to_destination() {
        let body = vec![7u8; 64 * 1024];
        let served = body.clone();
        let base = serve(Router::new().route(
            "/archive.tar.gz",
            get(move || {
                let served = served.clone();
                async move { served }
            }),
        ))
        .await;

        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("archive.tar.gz");

        let written = fetcher()
            .download(&format!("{}/archive.tar.gz", base), &destination)
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&destination).unwrap(), body);
    }

    #[tokio::test]
    async fn non_ok_status_is_a_download_failure() {
        let base = serve(Router::new().route("/gone", get(|| async { AxumStatus::NOT_FOUND }))).await;
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("gone.tar.gz");

        let result = fetcher()
            .download(&format!("{}/gone", base), &destination)
            .await;

        assert!(matches!(result, Err(TunnelError::DownloadFailed { .. })));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn empty_url_or_destination_is_rejected() {
        let temp = TempDir::new().unwrap();

        let result = fetcher().download("", &temp.path().join("a.tar.gz")).await;
        assert!(matches!(result, Err(TunnelError::DownloadFailed { .. })));

        let result = fetcher()
            .download("http://127.0.0.1:9/a.tar.gz", Path::new(""))
            .await;
        assert!(matches!(result, Err(TunnelError::DownloadFailed { .. })));
    }
}
