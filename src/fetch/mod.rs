//! Byte-level access to materialized record files.
//!
//! A data source is either a local directory or an `http(s)://` base URL.
//! Relative paths such as `service/route_id=Red-A.csv` resolve against it.
//! A file that does not exist is reported as `None`, not as an error.

mod client;

pub use client::{BasicClient, HttpClient};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Fetches `url`, returning `None` on 404.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Option<Vec<u8>>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let resp = resp.error_for_status()?;
    Ok(Some(resp.bytes().await?.to_vec()))
}

/// Reads record files from a local directory or over HTTP.
pub struct SourceReader<C = BasicClient> {
    root: String,
    client: C,
}

impl SourceReader<BasicClient> {
    pub fn new(root: &str) -> Result<Self> {
        Ok(Self::with_client(root, BasicClient::new()?))
    }
}

impl<C: HttpClient> SourceReader<C> {
    pub fn with_client(root: &str, client: C) -> Self {
        Self {
            root: root.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.root.starts_with("http://") || self.root.starts_with("https://")
    }

    /// Location of `relative` under this source, for logs and error messages.
    pub fn locate(&self, relative: &str) -> String {
        format!("{}/{}", self.root, relative)
    }

    /// Reads `relative`, returning `None` if it does not exist.
    #[tracing::instrument(skip(self), fields(root = %self.root))]
    pub async fn read(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        let location = self.locate(relative);

        let bytes = if self.is_remote() {
            fetch_bytes(&self.client, &location)
                .await
                .with_context(|| format!("fetching {location}"))?
        } else {
            match tokio::fs::read(Path::new(&location)).await {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => return Err(e).with_context(|| format!("reading {location}")),
            }
        };

        debug!(found = bytes.is_some(), "Source read");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_local_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("service")).unwrap();
        std::fs::write(dir.path().join("service/route_id=Red-A.csv"), b"date\n").unwrap();

        let reader = SourceReader::new(dir.path().to_str().unwrap()).unwrap();

        assert!(!reader.is_remote());
        let bytes = reader.read("service/route_id=Red-A.csv").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"date\n"[..]));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let reader = SourceReader::new(dir.path().to_str().unwrap()).unwrap();

        let bytes = reader.read("ridership/line_id=nope.csv").await.unwrap();
        assert!(bytes.is_none());
    }

    #[test]
    fn test_remote_root_and_locate() {
        let reader = SourceReader::new("https://data.example.org/dashboard/").unwrap();
        assert!(reader.is_remote());
        assert_eq!(
            reader.locate("routes.csv"),
            "https://data.example.org/dashboard/routes.csv"
        );
    }
}
