//! reqwest-backed transport

use crate::transport::{RawPage, Transport};
use crate::{ProviderConfig, ProviderError, ProviderResult};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// Token audience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    /// Resource management API
    Management,
    /// Directory (Microsoft Graph) API
    Directory,
}

/// Credential collaborator: acquisition and refresh live outside this crate
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self, scope: TokenScope) -> ProviderResult<String>;
}

/// Pre-acquired bearer tokens
#[derive(Clone)]
pub struct StaticTokenProvider {
    management_token: String,
    directory_token: Option<String>,
}

impl StaticTokenProvider {
    /// One token used for every scope
    pub fn new(token: &str) -> Self {
        Self {
            management_token: token.to_string(),
            directory_token: None,
        }
    }

    pub fn with_directory_token(mut self, token: &str) -> Self {
        self.directory_token = Some(token.to_string());
        self
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("management_token", &"[REDACTED]")
            .field("directory_token", &self.directory_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self, scope: TokenScope) -> ProviderResult<String> {
        let token = match scope {
            TokenScope::Management => &self.management_token,
            TokenScope::Directory => self.directory_token.as_ref().unwrap_or(&self.management_token),
        };
        if token.is_empty() {
            return Err(ProviderError::AuthError(format!("No access token for {:?} scope", scope)));
        }
        Ok(token.clone())
    }
}

/// Transport issuing authenticated GET requests
pub struct HttpTransport {
    client: Client,
    config: ProviderConfig,
    token_provider: Arc<dyn TokenProvider>,
}

impl HttpTransport {
    pub fn new(config: ProviderConfig, token_provider: Arc<dyn TokenProvider>) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            config,
            token_provider,
        })
    }

    fn scope_for(&self, url: &str) -> TokenScope {
        if url.starts_with(self.config.graph_endpoint.trim_end_matches('/')) {
            TokenScope::Directory
        } else {
            TokenScope::Management
        }
    }

    async fn classify(url: &str, response: Response) -> ProviderError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let message = response.text().await.unwrap_or_default();
        let endpoint = url.to_string();

        match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { endpoint, retry_after },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::PermissionDenied {
                endpoint,
                status: status.as_u16(),
                message,
            },
            StatusCode::NOT_FOUND => ProviderError::NotFound { endpoint },
            s if s.is_server_error() => ProviderError::Transient {
                endpoint,
                status: Some(s.as_u16()),
                message,
            },
            s => ProviderError::ApiError {
                endpoint,
                status: s.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_page(&self, url: &str) -> ProviderResult<RawPage> {
        let token = self.token_provider.access_token(self.scope_for(url)).await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::Transient {
                endpoint: url.to_string(),
                status: None,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(Self::classify(url, response).await);
        }

        let text = response.text().await.map_err(|e| ProviderError::Transient {
            endpoint: url.to_string(),
            status: None,
            message: e.to_string(),
        })?;

        serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse {
            endpoint: url.to_string(),
            message: format!(
                "{} - Body: {}",
                e,
                text.chars().take(500).collect::<String>()
            ),
        })
    }
}
