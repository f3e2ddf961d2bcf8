//! Where the module catalog document lives: a local file or an HTTP(S) URL.

use std::{path::PathBuf, str::FromStr, time::SystemTime};

use anyhow::Context;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLocation {
    File(PathBuf),
    Http(url::Url),
}

impl DocumentLocation {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        if let Ok(url) = url::Url::parse(s) {
            match url.scheme() {
                "http" | "https" => return Ok(Self::Http(url)),
                "file" => {
                    let path = url
                        .to_file_path()
                        .map_err(|_| anyhow::anyhow!("file uri must hold an absolute path: {s}"))?;
                    return Ok(Self::File(path));
                }
                _ => {}
            }
        }
        Ok(Self::File(PathBuf::from_str(s)?))
    }

    pub async fn read_bytes(&self, http: &reqwest::Client) -> anyhow::Result<Bytes> {
        match self {
            Self::File(path) => Ok(Bytes::from(
                tokio::fs::read(path)
                    .await
                    .with_context(|| format!("read {}", path.display()))?,
            )),
            Self::Http(url) => {
                let resp = http
                    .get(url.clone())
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?;
                let status = resp.status();
                if !status.is_success() {
                    anyhow::bail!("GET {url} failed (status {status})");
                }
                Ok(resp.bytes().await.context("read response body")?)
            }
        }
    }

    /// `(modification time, length)` of a file location; `None` for remote documents.
    pub async fn fingerprint(&self) -> anyhow::Result<Option<(SystemTime, u64)>> {
        match self {
            Self::File(path) => {
                let meta = tokio::fs::metadata(path)
                    .await
                    .with_context(|| format!("stat {}", path.display()))?;
                Ok(Some((meta.modified()?, meta.len())))
            }
            Self::Http(_) => Ok(None),
        }
    }
}

impl std::fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Http(url) => write!(f, "{url}"),
        }
    }
}
