//! Hetzner Cloud action status client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use hk_core::config::CloudConfig;
use hk_core::traits::ActionSource;
use hk_core::{ActionError, ActionId, FetchError, RemoteAction};

/// Reads action snapshots from the Hetzner Cloud API
pub struct HcloudActions {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ActionEnvelope {
    action: RemoteAction,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ActionError,
}

impl HcloudActions {
    /// Create a client for `endpoint` authenticating with `token`
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token: token.into(),
            timeout: CloudConfig::default().request_timeout,
        }
    }

    /// Fail a fetch that has not completed within `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a client from cloud settings; `None` without a token
    pub fn from_config(config: &CloudConfig) -> Option<Self> {
        config.resolve_token().map(|token| {
            Self::new(config.endpoint.clone(), token).with_timeout(config.request_timeout)
        })
    }

    fn action_url(&self, id: ActionId) -> String {
        format!("{}/actions/{}", self.endpoint.trim_end_matches('/'), id)
    }
}

#[async_trait]
impl ActionSource for HcloudActions {
    async fn get_action(&self, id: ActionId) -> Result<RemoteAction, FetchError> {
        let response = self
            .client
            .get(self.action_url(id))
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(id));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        parse_action(&body)
    }
}

fn parse_action(body: &str) -> Result<RemoteAction, FetchError> {
    serde_json::from_str::<ActionEnvelope>(body)
        .map(|envelope| envelope.action)
        .map_err(|e| FetchError::Decode(e.to_string()))
}

fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.to_string(),
        Err(_) => body.trim().to_string(),
    }
}
