//! Paginated resource iterator
//!
//! Drives a `list` / `list_next` pair page by page. Each page's items are
//! handed to the callback, and awaited one at a time, before the next page is
//! requested, so at most one page is held in memory.

use crate::retry::RetryPolicy;
use crate::{ProviderError, ProviderResult};
use async_trait::async_trait;
use nimbus_core::EndpointTracker;
use std::future::Future;

/// One page of a list response
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token; absent on the last page
    pub next_link: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
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

/// A paginated list operation: initial page plus continuation
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    /// Endpoint description for the initial page (`None`) or a continuation
    fn endpoint(&self, token: Option<&str>) -> String;

    /// Fetch the initial page
    async fn list(&self) -> ProviderResult<Page<Self::Item>>;

    /// Fetch the page a continuation token points at
    async fn list_next(&self, token: &str) -> ProviderResult<Page<Self::Item>>;
}

/// Counters for one traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationStats {
    /// Pages successfully fetched
    pub pages: usize,
    /// Items delivered to the callback
    pub items: usize,
    /// Fetch calls issued, retries included
    pub requests: u32,
}

/// Paginated resource iterator with rate-limit backoff and bounded retry
#[derive(Debug, Clone, Default)]
pub struct ResourceIterator {
    policy: RetryPolicy,
    tracker: Option<EndpointTracker>,
}

enum Fetched<T> {
    Page(Page<T>),
    Absent,
}

impl ResourceIterator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            tracker: None,
        }
    }

    /// Record each in-flight endpoint in the given tracker
    pub fn with_tracker(mut self, tracker: EndpointTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deliver every item of every page to `callback`, in provider order.
    pub async fn for_each<S, F, Fut, E>(&self, source: &S, callback: F) -> Result<IterationStats, E>
    where
        S: PageSource + ?Sized,
        F: FnMut(S::Item) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        let (stats, _) = self.drive(source, callback, false).await?;
        Ok(stats)
    }

    /// Like [`ResourceIterator::for_each`], but a not-found response to the
    /// initial page yields `Ok(None)` instead of an error. A not-found on a
    /// continuation page is still an error.
    pub async fn for_each_optional<S, F, Fut, E>(
        &self,
        source: &S,
        callback: F,
    ) -> Result<Option<IterationStats>, E>
    where
        S: PageSource + ?Sized,
        F: FnMut(S::Item) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        let (stats, found) = self.drive(source, callback, true).await?;
        Ok(found.then_some(stats))
    }

    async fn drive<S, F, Fut, E>(
        &self,
        source: &S,
        mut callback: F,
        optional: bool,
    ) -> Result<(IterationStats, bool), E>
    where
        S: PageSource + ?Sized,
        F: FnMut(S::Item) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        let mut stats = IterationStats::default();
        // Nested walks share the tracker; the enclosing walk's endpoint comes back on success
        let enclosing = self.tracker.as_ref().and_then(EndpointTracker::current);

        let mut page = match self.fetch(source, None, optional, &mut stats).await? {
            Fetched::Page(page) => page,
            Fetched::Absent => {
                self.restore_tracker(enclosing);
                return Ok((stats, false));
            }
        };

        loop {
            stats.pages += 1;
            let next_link = page.next_link.take().filter(|token| !token.is_empty());

            for item in page.items {
                callback(item).await?;
                stats.items += 1;
            }

            let Some(token) = next_link else {
                break;
            };

            page = match self.fetch(source, Some(&token), false, &mut stats).await? {
                Fetched::Page(page) => page,
                Fetched::Absent => break,
            };
        }

        self.restore_tracker(enclosing);
        Ok((stats, true))
    }

    fn restore_tracker(&self, enclosing: Option<String>) {
        if let Some(tracker) = &self.tracker {
            tracker.restore(enclosing);
        }
    }

    /// Fetch one page, retrying rate limits and transient failures up to the ceiling
    async fn fetch<S>(
        &self,
        source: &S,
        token: Option<&str>,
        optional: bool,
        stats: &mut IterationStats,
    ) -> ProviderResult<Fetched<S::Item>>
    where
        S: PageSource + ?Sized,
    {
        let endpoint = source.endpoint(token);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            stats.requests += 1;
            if let Some(tracker) = &self.tracker {
                tracker.set(&endpoint);
            }

            let result = match token {
                None => source.list().await,
                Some(token) => source.list_next(token).await,
            };

            let error = match result {
                Ok(page) => return Ok(Fetched::Page(page)),
                Err(error) => error,
            };

            if optional && error.is_not_found() {
                return Ok(Fetched::Absent);
            }

            if !error.is_retryable() {
                return Err(error);
            }

            if attempt >= max_attempts {
                return Err(ProviderError::RetriesExhausted {
                    endpoint,
                    attempts: attempt,
                    last_error: Box::new(error),
                });
            }

            let delay = match &error {
                ProviderError::RateLimited { retry_after, .. } => self.policy.rate_limit_delay(*retry_after),
                _ => self.policy.backoff_for(attempt),
            };
            tokio::time::sleep(delay).await;
        }
    }
}
