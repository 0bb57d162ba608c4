//! RemoteFileStore: versioned remote file storage
//!
//! [`GitHubFileStore`] talks to the GitHub contents API:
//! - `GET  /repos/{repo}/contents/{path}?ref={branch}` → current `sha` or 404
//! - `PUT  /repos/{repo}/contents/{path}` → full content replacement, `sha`
//!   required when the path already exists

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::error::RemoteError;

/// Opaque version token of a remote path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub String);

impl Revision {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Versioned remote file storage
#[async_trait]
pub trait RemoteFileStore: Send + Sync {
    /// Current revision of `path`, `None` when the path does not exist
    async fn get_revision(&self, path: &str) -> Result<Option<Revision>, RemoteError>;

    /// Replace the whole content of `path`
    ///
    /// `revision` must be the current revision for an existing path and
    /// `None` for a new one; a stale value yields [`RemoteError::Conflict`].
    async fn upsert(
        &self,
        path: &str,
        content: &[u8],
        revision: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, RemoteError>;
}

/// Connection settings of the remote repository
#[derive(Clone)]
pub struct RemoteSettings {
    /// API base URL (e.g. "https://api.github.com")
    pub api_url: String,
    /// "owner/name"
    pub repo: String,
    pub branch: String,
    pub token: String,
}

impl fmt::Debug for RemoteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSettings")
            .field("api_url", &self.api_url)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct ContentMeta {
    sha: String,
}

#[derive(Deserialize)]
struct PutResponse {
    content: ContentMeta,
}

#[derive(Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// GitHub contents API client
pub struct GitHubFileStore {
    client: Client,
    settings: RemoteSettings,
}

impl GitHubFileStore {
    pub fn new(settings: RemoteSettings) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("backup-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.repo,
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("token {}", self.settings.token),
            )
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
    }
}

async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("status {status}: {}", body.chars().take(200).collect::<String>())
}

#[async_trait]
impl RemoteFileStore for GitHubFileStore {
    async fn get_revision(&self, path: &str) -> Result<Option<Revision>, RemoteError> {
        let url = self.contents_url(path);
        let response = self
            .request(reqwest::Method::GET, &url)
            .query(&[("ref", self.settings.branch.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let meta: ContentMeta = response.json().await.map_err(|e| {
                    RemoteError::InvalidResponse(format!("Failed to parse contents of {path}: {e}"))
                })?;
                Ok(Some(Revision(meta.sha)))
            }
            _ => Err(RemoteError::Transport(error_body(response).await)),
        }
    }

    async fn upsert(
        &self,
        path: &str,
        content: &[u8],
        revision: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, RemoteError> {
        let url = self.contents_url(path);
        let body = PutRequest {
            message,
            content: BASE64.encode(content),
            branch: &self.settings.branch,
            sha: revision.map(Revision::as_str),
        };

        let response = self
            .request(reqwest::Method::PUT, &url)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            // 409: stale sha; 422: sha missing or mismatched on an existing file
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(RemoteError::Conflict(error_body(response).await))
            }
            status if status.is_success() => {
                let put: PutResponse = response.json().await.map_err(|e| {
                    RemoteError::InvalidResponse(format!("Failed to parse upsert of {path}: {e}"))
                })?;
                Ok(Revision(put.content.sha))
            }
            _ => Err(RemoteError::Transport(error_body(response).await)),
        }
    }
}
