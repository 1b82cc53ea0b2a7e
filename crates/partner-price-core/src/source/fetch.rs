//! Download of published price sheets

use crate::error::PriceError;
use std::path::PathBuf;
use std::time::Duration;

/// Where a sheet lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Http(String),
    File(PathBuf),
}

impl SourceLocation {
    /// `http(s)://` URLs are fetched, `file://` URLs and plain paths are read from disk
    pub fn parse(source: &str) -> Self {
        let lower = source.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceLocation::Http(source.to_string())
        } else {
            let path = source.strip_prefix("file://").unwrap_or(source);
            SourceLocation::File(PathBuf::from(path))
        }
    }
}

/// Fetch the CSV body of a sheet
pub async fn fetch_csv(source: &str, timeout: Duration) -> Result<String, PriceError> {
    match SourceLocation::parse(source) {
        SourceLocation::Http(url) => fetch_http(&url, timeout).await,
        SourceLocation::File(path) => {
            tracing::debug!(path = %path.display(), "Reading local price sheet");
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| PriceError::FileRead {
                    path: path.clone(),
                    source,
                })
        }
    }
}

async fn fetch_http(url: &str, timeout: Duration) -> Result<String, PriceError> {
    tracing::info!("Fetching price sheet: {}", url);

    let fetch_error = |message: String| PriceError::Fetch {
        url: url.to_string(),
        message,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| fetch_error(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(format!("HTTP {}", status)));
    }

    response
        .text()
        .await
        .map_err(|e| fetch_error(format!("failed to read body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        assert_eq!(
            SourceLocation::parse("https://bucket.example.com/a.csv"),
            SourceLocation::Http("https://bucket.example.com/a.csv".to_string())
        );
        assert_eq!(
            SourceLocation::parse("file:///tmp/a.csv"),
            SourceLocation::File(PathBuf::from("/tmp/a.csv"))
        );
        assert_eq!(
            SourceLocation::parse("sheets/a.csv"),
            SourceLocation::File(PathBuf::from("sheets/a.csv"))
        );
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers_price.csv");
        std::fs::write(&path, "plan,threshold\n").unwrap();

        let body = fetch_csv(&path.to_string_lossy(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(body, "plan,threshold\n");
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let err = fetch_csv(&path.to_string_lossy(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, PriceError::FileRead { .. }));
    }
}
