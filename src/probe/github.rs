//! GitHub REST API prober

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;

use super::VisibilityProber;
use crate::alerts::Visibility;

/// Prober backed by `GET /repos/{owner}/{name}`
#[derive(Debug, Clone)]
pub struct GitHubProber {
    http_client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

/// Subset of the repository payload we rely on
#[derive(Debug, Deserialize)]
struct RepoResponse {
    private: Option<bool>,
}

impl GitHubProber {
    pub fn new(
        api_base: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn repo_url(&self, entity: &str) -> String {
        format!("{}/repos/{}", self.api_base, entity)
    }

    /// Query the API and classify the response
    async fn fetch(&self, entity: &str) -> Result<Visibility, ProbeError> {
        let mut request = self
            .http_client
            .get(self.repo_url(entity))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("repowatch/", env!("CARGO_PKG_VERSION")));

        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // Private and not-yet-created repositories look identical here
            return Ok(Visibility::NotPublic);
        }

        if !status.is_success() {
            return Err(match rate_limit_reset(response.headers()) {
                Some(reset) => ProbeError::RateLimited {
                    code: status.as_u16(),
                    reset,
                },
                None => ProbeError::Status(status.as_u16()),
            });
        }

        let body: RepoResponse = response
            .json()
            .await
            .map_err(|e| ProbeError::Deserialization(e.to_string()))?;

        match body.private {
            Some(false) => Ok(Visibility::Public),
            Some(true) => Ok(Visibility::NotPublic),
            None => Err(ProbeError::Deserialization(
                "response has no `private` field".to_string(),
            )),
        }
    }
}

#[async_trait]
impl VisibilityProber for GitHubProber {
    async fn probe(&self, entity: &str) -> Visibility {
        match self.fetch(entity).await {
            Ok(visibility) => {
                tracing::debug!(entity = %entity, visibility = %visibility, "Probed repository");
                visibility
            }
            Err(e) => {
                tracing::warn!(entity = %entity, error = %e, "Visibility probe failed");
                Visibility::NotPublic
            }
        }
    }
}

/// Reset time when the response reports an exhausted rate limit
fn rate_limit_reset(headers: &HeaderMap) -> Option<String> {
    let remaining = headers.get("x-ratelimit-remaining")?.to_str().ok()?;
    if remaining.trim() != "0" {
        return None;
    }

    let reset: i64 = headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;

    chrono::DateTime::from_timestamp(reset, 0).map(|t| t.to_rfc3339())
}

/// Probe errors. These never leave the prober; they are logged and the
/// entity is classified as not public.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Rate limited (status {code}) until {reset}")]
    RateLimited { code: u16, reset: String },

    #[error("Malformed response: {0}")]
    Deserialization(String),
}
