//! Provider API traversal
//!
//! This crate drives the cloud provider's paginated list endpoints:
//! - `pagination`: the paginated resource iterator with bounded retry
//! - `transport`: the page-fetching seam, with a reqwest implementation in `http`
//! - `clients`: one resource client per family (directory, authorization,
//!   database, network, storage)
//! - `mock`: a scripted transport for tests

pub mod clients;
pub mod http;
pub mod mock;
pub mod pagination;
pub mod records;
pub mod retry;
pub mod transport;

pub use clients::{
    AuthorizationClient, ClientBase, DatabaseClient, DirectoryClient, NetworkClient, StorageClient,
};
pub use http::{HttpTransport, StaticTokenProvider, TokenProvider, TokenScope};
pub use mock::ScriptedTransport;
pub use pagination::{IterationStats, Page, PageSource, ResourceIterator};
pub use retry::RetryPolicy;
pub use transport::{RawPage, Transport, TransportPageSource};

use std::time::Duration;

/// Provider endpoint configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Resource management endpoint
    pub arm_endpoint: String,
    /// Directory (Microsoft Graph) endpoint
    pub graph_endpoint: String,
    /// Subscription scoping ARM list calls
    pub subscription_id: String,
    pub timeout_seconds: u64,
}

impl ProviderConfig {
    pub fn new(subscription_id: &str) -> Self {
        Self {
            arm_endpoint: "https://management.azure.com".to_string(),
            graph_endpoint: "https://graph.microsoft.com".to_string(),
            subscription_id: subscription_id.to_string(),
            timeout_seconds: 30,
        }
    }

    pub fn with_arm_endpoint(mut self, endpoint: &str) -> Self {
        self.arm_endpoint = endpoint.to_string();
        self
    }

    pub fn with_graph_endpoint(mut self, endpoint: &str) -> Self {
        self.graph_endpoint = endpoint.to_string();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// `/subscriptions/{id}`
    pub fn subscription_path(&self) -> String {
        format!("/subscriptions/{}", self.subscription_id)
    }

    /// ARM URL for a resource path (which starts with `/`)
    pub fn arm_url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.arm_endpoint.trim_end_matches('/'),
            path,
            api_version
        )
    }

    /// Microsoft Graph v1.0 URL
    pub fn graph_url(&self, path: &str) -> String {
        format!(
            "{}/v1.0/{}",
            self.graph_endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Provider operation result type
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Provider error taxonomy
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Rate limited at {endpoint}")]
    RateLimited {
        endpoint: String,
        retry_after: Option<Duration>,
    },

    #[error("Transient error at {endpoint}: {message}")]
    Transient {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Resource not found at {endpoint}")]
    NotFound { endpoint: String },

    #[error("Permission denied ({status}) at {endpoint}: {message}")]
    PermissionDenied {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("API error at {endpoint}: {status} - {message}")]
    ApiError {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    #[error("Gave up on {endpoint} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        endpoint: String,
        attempts: u32,
        last_error: Box<ProviderError>,
    },

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProviderError {
    /// Rate limits and transient failures are retried; everything else is reported at once
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. } | ProviderError::Transient { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    pub fn is_permission_denied(&self) -> bool {
        match self {
            ProviderError::PermissionDenied { .. } => true,
            ProviderError::RetriesExhausted { last_error, .. } => last_error.is_permission_denied(),
            _ => false,
        }
    }

    /// Endpoint the error was raised for, when known
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderError::RateLimited { endpoint, .. }
            | ProviderError::Transient { endpoint, .. }
            | ProviderError::NotFound { endpoint }
            | ProviderError::PermissionDenied { endpoint, .. }
            | ProviderError::ApiError { endpoint, .. }
            | ProviderError::InvalidResponse { endpoint, .. }
            | ProviderError::RetriesExhausted { endpoint, .. } => Some(endpoint),
            ProviderError::AuthError(_) | ProviderError::ConfigError(_) => None,
        }
    }
}
