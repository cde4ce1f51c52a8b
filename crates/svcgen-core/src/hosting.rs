//! Repository creation on the template host

use crate::config::EngineSettings;
use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable holding the access token
pub const TOKEN_ENV: &str = "GITHUB_AUTH_TOKEN";

#[derive(Debug, Serialize)]
struct NewRepository<'a> {
    name: &'a str,
    private: bool,
    description: String,
}

/// Repository returned by the host
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CreatedRepository {
    pub full_name: String,
    pub html_url: String,
}

/// Access token from the environment, if set and non-empty
pub fn token_from_env() -> Option<String> {
    std::env::var(TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn description_for(name: &str) -> String {
    format!("Service repository for {}", name)
}

/// Create a private repository named `name` for the token's owner
pub async fn create_repository(
    settings: &EngineSettings,
    token: &str,
    name: &str,
) -> Result<CreatedRepository> {
    let mut url = settings.api_url()?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("API base cannot hold a path: {}", settings.api_base))?
        .pop_if_empty()
        .extend(["user", "repos"]);

    let client = reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let body = NewRepository {
        name,
        private: true,
        description: description_for(name),
    };

    let response = client
        .post(url)
        .bearer_auth(token)
        .header(ACCEPT, "application/vnd.github+json")
        .json(&body)
        .send()
        .await
        .with_context(|| format!("Failed to create repository {}", name))?;

    match response.status() {
        status if status.is_success() => {
            let repo: CreatedRepository = response
                .json()
                .await
                .context("Failed to parse repository response")?;
            info!(repo = %repo.full_name, "created repository");
            Ok(repo)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            anyhow::bail!("Not authorized to create repository {}; check {}", name, TOKEN_ENV)
        }
        StatusCode::UNPROCESSABLE_ENTITY => {
            anyhow::bail!("Repository {} already exists or the name is invalid", name)
        }
        status => anyhow::bail!("Failed to create repository {}: HTTP {}", name, status),
    }
}
