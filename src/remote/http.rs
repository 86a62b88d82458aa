//! Contents-API client for a repository-hosted site.
//!
//! Files travel base64-encoded; every write names the blob sha it replaces.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{RemoteFile, RemoteFileStore};
use crate::auth::Credential;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::VersionTag;

const USER_AGENT: &str = concat!("gallery-admin/", env!("CARGO_PKG_VERSION"));
const ACCEPT_JSON: &str = "application/vnd.github+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// File metadata returned by a contents GET.
#[derive(Debug, Deserialize)]
struct ContentsFile {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// Body of a contents PUT or DELETE response.
#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: Option<WrittenFile>,
}

#[derive(Debug, Deserialize)]
struct WrittenFile {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    message: String,
    sha: &'a str,
    branch: &'a str,
}

/// Remote file store backed by the contents HTTP API.
#[derive(Debug, Clone)]
pub struct HttpFileStore {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    branch: String,
}

impl HttpFileStore {
    pub fn new(
        api_base: &str,
        owner: &str,
        repo: &str,
        branch: &str,
        credential: &Credential,
    ) -> AppResult<Self> {
        let authorization = credential.authorization_header().map_err(|_| {
            AppError::Validation("Access token contains invalid characters".to_string())
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let credential = config.credential.as_ref().ok_or_else(|| {
            AppError::Unauthorized("No access token configured (GALLERY_TOKEN)".to_string())
        })?;
        if config.repo_owner.is_empty() || config.repo_name.is_empty() {
            return Err(AppError::Validation(
                "GALLERY_REPO_OWNER and GALLERY_REPO_NAME are required".to_string(),
            ));
        }

        Self::new(
            &config.api_base,
            &config.repo_owner,
            &config.repo_name,
            &config.branch,
            credential,
        )
    }

    /// Build the contents URL with every path segment percent-encoded.
    fn contents_url(&self, path: &str) -> AppResult<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| AppError::Validation(format!("Invalid API base URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| AppError::Validation("API base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
            .extend(path.split('/').filter(|segment| !segment.is_empty()));

        Ok(url)
    }

    async fn fetch(&self, path: &str) -> AppResult<ContentsFile> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", &self.branch);

        tracing::debug!("GET {}", path);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(path, response).await);
        }

        Ok(response.json::<ContentsFile>().await?)
    }
}

#[async_trait]
impl RemoteFileStore for HttpFileStore {
    async fn get_file(&self, path: &str) -> AppResult<RemoteFile> {
        let file = self.fetch(path).await?;

        if file.encoding.as_deref() == Some("none") {
            return Err(AppError::Transport(format!(
                "{} is too large for the contents API",
                path
            )));
        }

        // The API wraps base64 at 60 columns
        let packed: String = file.content.split_whitespace().collect();
        let content = STANDARD
            .decode(packed)
            .map_err(|e| AppError::Transport(format!("Invalid base64 content for {}: {}", path, e)))?;

        Ok(RemoteFile {
            content,
            version: VersionTag::new(file.sha),
        })
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        version: Option<&VersionTag>,
    ) -> AppResult<VersionTag> {
        let body = PutRequest {
            message: format!("Update {}", path),
            content: STANDARD.encode(content),
            sha: version.map(VersionTag::as_str),
            branch: &self.branch,
        };

        tracing::debug!("PUT {} (version {:?})", path, version);
        let response = self
            .client
            .put(self.contents_url(path)?)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(path, response).await);
        }

        let written = response.json::<WriteResponse>().await?;
        written
            .content
            .map(|file| VersionTag::new(file.sha))
            .ok_or_else(|| AppError::Transport(format!("No version returned for {}", path)))
    }

    async fn delete_file(&self, path: &str) -> AppResult<()> {
        let current = self.fetch(path).await?;
        let body = DeleteRequest {
            message: format!("Delete {}", path),
            sha: &current.sha,
            branch: &self.branch,
        };

        tracing::debug!("DELETE {}", path);
        let response = self
            .client
            .delete(self.contents_url(path)?)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(path, response).await);
        }

        Ok(())
    }
}

/// Map a non-success response to an error, preferring the body's `message`.
async fn error_from_response(path: &str, response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = remote_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

    tracing::debug!("{} failed with {}: {}", path, status, message);

    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(format!("{}: {}", path, message)),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            AppError::Conflict(format!("{}: {}", path, message))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(message),
        _ => AppError::Transport(format!("{} ({})", message, status.as_u16())),
    }
}

fn remote_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(api_base: &str) -> HttpFileStore {
        HttpFileStore::new(
            api_base,
            "jo",
            "portfolio",
            "main",
            &Credential::new("token"),
        )
        .unwrap()
    }

    #[test]
    fn test_contents_url_encodes_segments() {
        let url = store("https://api.example.com/")
            .contents_url("photos/uploads/Sunset Pier #2.jpg")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/repos/jo/portfolio/contents/photos/uploads/Sunset%20Pier%20%232.jpg"
        );
    }

    #[test]
    fn test_contents_url_with_base_path() {
        let url = store("http://127.0.0.1:9000/api/v3")
            .contents_url("/data/photos.json")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/api/v3/repos/jo/portfolio/contents/data/photos.json"
        );
    }

    #[test]
    fn test_remote_message() {
        assert_eq!(
            remote_message(r#"{"message":"sha does not match"}"#),
            Some("sha does not match".to_string())
        );
        assert_eq!(remote_message("<html>bad gateway</html>"), None);
        assert_eq!(remote_message(r#"{"message": 5}"#), None);
    }

    #[test]
    fn test_from_config_requires_token() {
        let mut config = Config::from_env();
        config.credential = None;
        config.repo_owner = "jo".to_string();
        config.repo_name = "portfolio".to_string();

        let err = HttpFileStore::from_config(&config).unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHORIZED");
    }
}
