//! Scripted transport for tests

use crate::transport::{RawPage, Transport};
use crate::{ProviderError, ProviderResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum Scripted {
    Once(ProviderResult<RawPage>),
    Forever(ProviderResult<RawPage>),
}

#[derive(Debug, Default)]
struct Script {
    responses: HashMap<String, VecDeque<Scripted>>,
    calls: Vec<String>,
}

/// Transport answering from per-URL response queues.
///
/// Each URL's queue is consumed in order; a `*_forever` entry repeats once
/// reached. Unscripted URLs answer `NotFound`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, url: &str, entry: Scripted) -> &Self {
        self.lock()
            .responses
            .entry(url.to_string())
            .or_default()
            .push_back(entry);
        self
    }

    /// Queue one successful page
    pub fn respond(&self, url: &str, page: RawPage) -> &Self {
        self.push(url, Scripted::Once(Ok(page)))
    }

    /// Queue one failure
    pub fn fail(&self, url: &str, error: ProviderError) -> &Self {
        self.push(url, Scripted::Once(Err(error)))
    }

    /// Answer every remaining request with this page
    pub fn respond_forever(&self, url: &str, page: RawPage) -> &Self {
        self.push(url, Scripted::Forever(Ok(page)))
    }

    /// Answer every remaining request with this failure
    pub fn fail_forever(&self, url: &str, error: ProviderError) -> &Self {
        self.push(url, Scripted::Forever(Err(error)))
    }

    /// Every requested URL, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.lock().calls.iter().filter(|called| called.as_str() == url).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get_page(&self, url: &str) -> ProviderResult<RawPage> {
        let mut script = self.lock();
        script.calls.push(url.to_string());

        let queue = match script.responses.get_mut(url) {
            Some(queue) => queue,
            None => {
                return Err(ProviderError::NotFound {
                    endpoint: url.to_string(),
                })
            }
        };

        match queue.pop_front() {
            Some(Scripted::Forever(result)) => {
                queue.push_front(Scripted::Forever(result.clone()));
                result
            }
            Some(Scripted::Once(result)) => result,
            None => Err(ProviderError::NotFound {
                endpoint: url.to_string(),
            }),
        }
    }
}
