//! Page-fetching seam between resource clients and the wire

use crate::pagination::{Page, PageSource};
use crate::{ProviderError, ProviderResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

/// Undecoded list response.
///
/// Resource management endpoints use `nextLink`, directory endpoints use
/// `@odata.nextLink`; both envelopes carry the items under `value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    #[serde(rename = "value", default)]
    pub items: Vec<serde_json::Value>,
    #[serde(rename = "nextLink", alias = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

impl RawPage {
    pub fn new(items: Vec<serde_json::Value>) -> Self {
        Self {
            items,
            next_link: None,
        }
    }

    pub fn with_next_link(mut self, next_link: &str) -> Self {
        self.next_link = Some(next_link.to_string());
        self
    }
}

/// Fetches one page from a list URL or continuation URL
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_page(&self, url: &str) -> ProviderResult<RawPage>;
}

/// [`PageSource`] over a [`Transport`]: the initial page comes from a fixed
/// URL, continuation tokens are absolute URLs.
pub struct TransportPageSource<T> {
    transport: Arc<dyn Transport>,
    url: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> TransportPageSource<T> {
    pub fn new(transport: Arc<dyn Transport>, url: String) -> Self {
        Self {
            transport,
            url,
            _item: PhantomData,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl<T: DeserializeOwned> TransportPageSource<T> {
    fn decode(raw: RawPage, endpoint: &str) -> ProviderResult<Page<T>> {
        let items = raw
            .items
            .into_iter()
            .map(serde_json::from_value::<T>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ProviderError::InvalidResponse {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        Ok(Page {
            items,
            next_link: raw.next_link,
        })
    }
}

#[async_trait]
impl<T> PageSource for TransportPageSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Item = T;

    fn endpoint(&self, token: Option<&str>) -> String {
        token.unwrap_or(&self.url).to_string()
    }

    async fn list(&self) -> ProviderResult<Page<T>> {
        let raw = self.transport.get_page(&self.url).await?;
        Self::decode(raw, &self.url)
    }

    async fn list_next(&self, token: &str) -> ProviderResult<Page<T>> {
        let raw = self.transport.get_page(token).await?;
        Self::decode(raw, token)
    }
}
