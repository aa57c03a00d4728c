//! Thin REST client shared by the HTTP repositories.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use voyage_core::{RepositoryError, RepositoryResult};

use crate::app_config::{ApiConfig, ApiToken};

const ERROR_BODY_LIMIT: usize = 200;

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<ApiToken>,
}

impl ApiClient {
    pub fn new(base_url: &str, config: &ApiConfig) -> RepositoryResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RepositoryError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .header("Accept", "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }

    /// Send and decode a JSON body
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> RepositoryResult<T> {
        let response = Self::send(request).await?;
        response
            .json()
            .await
            .map_err(|e| RepositoryError::Decode(e.to_string()))
    }

    /// Send and discard the body
    pub async fn send_empty(&self, request: RequestBuilder) -> RepositoryResult<()> {
        Self::send(request).await.map(|_| ())
    }

    async fn send(request: RequestBuilder) -> RepositoryResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;

        let status = response.status();
        debug!("{} {}", status, response.url());
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(RepositoryError::NotFound(response.url().to_string()));
        }
        Err(RepositoryError::Backend {
            status: status.as_u16(),
            message: failure_message(response.text().await),
        })
    }
}

/// List endpoints answer either a bare array or a paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListEnvelope::Plain(items) => items,
            ListEnvelope::Paged { results } => results,
        }
    }
}

/// Message for a non-2xx response, including the case where its body could not be read.
pub fn failure_message<E: std::fmt::Display>(body: Result<String, E>) -> String {
    match body {
        Ok(body) => backend_message(&body),
        Err(e) => format!("<unreadable error body: {}>", e),
    }
}

/// Pull the human-readable reason out of an error body.
pub fn backend_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.chars().take(ERROR_BODY_LIMIT).collect()
}
