//! Template set stored in a GitHub repository

use super::{join_path, DirEntry, TemplateFs};
use crate::config::settings::{EngineSettings, DEFAULT_API_BASE, DEFAULT_HOST};
use crate::error::{ScaffoldError, SourceError};
use crate::templates::locator::TemplateSetLocator;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

/// One item of a contents API directory listing
#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Authenticated, read-only view of a repository directory
pub struct GitHubFs {
    client: reqwest::Client,
    api: Url,
    locator: TemplateSetLocator,
    token: String,
}

impl GitHubFs {
    /// Connect to the repository named by `locator`
    ///
    /// Listing the template root doubles as the authentication check, so a
    /// bad token or a missing repository fails here instead of mid-walk.
    pub async fn connect(
        settings: &EngineSettings,
        locator: TemplateSetLocator,
        token: &str,
    ) -> Result<Self, ScaffoldError> {
        if locator.host != DEFAULT_HOST && settings.api_base == DEFAULT_API_BASE {
            return Err(ScaffoldError::UnsupportedHost(locator.host.clone()));
        }

        let api = settings.api_url()?;
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ScaffoldError::SourceUnavailable {
                location: locator.to_string(),
                reason: e.to_string(),
            })?;

        let fs = Self {
            client,
            api,
            locator,
            token: token.to_string(),
        };

        match fs.read_dir("").await {
            Ok(_) => Ok(fs),
            Err(SourceError::Status { status, .. }) if status == 401 || status == 403 => {
                Err(ScaffoldError::Unauthorized(fs.locator.to_string()))
            }
            Err(e) => Err(ScaffoldError::SourceUnavailable {
                location: fs.locator.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn locator(&self) -> &TemplateSetLocator {
        &self.locator
    }

    /// Contents API URL for a path below the template root
    fn contents_url(&self, path: &str) -> Result<Url, SourceError> {
        contents_url(&self.api, &self.locator, path)
    }

    async fn get(&self, path: &str, accept: &str) -> Result<reqwest::Response, SourceError> {
        let url = self.contents_url(path)?;
        debug!(%url, "fetching template entry");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, accept)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl TemplateFs for GitHubFs {
    fn describe(&self) -> String {
        self.locator.to_string()
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, SourceError> {
        let items: Vec<ContentItem> = self.get(path, JSON_MEDIA_TYPE).await?.json().await?;
        Ok(items
            .into_iter()
            .map(|item| DirEntry {
                path: join_path(path, &item.name),
                is_dir: item.kind == "dir",
            })
            .collect())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let bytes = self.get(path, RAW_MEDIA_TYPE).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

fn contents_url(api: &Url, locator: &TemplateSetLocator, path: &str) -> Result<Url, SourceError> {
    let mut url = api.clone();
    url.path_segments_mut()
        .map_err(|_| SourceError::Request(format!("URL cannot have path segments: {}", api)))?
        .pop_if_empty()
        .extend(["repos", locator.org.as_str(), locator.repo.as_str(), "contents"])
        .extend(locator.path.split('/').filter(|s| !s.is_empty()))
        .extend(path.split('/').filter(|s| !s.is_empty()));

    if let Some(git_ref) = locator.git_ref() {
        url.query_pairs_mut().append_pair("ref", git_ref);
    }
    Ok(url)
}
