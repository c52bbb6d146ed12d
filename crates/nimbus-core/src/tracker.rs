//! In-flight endpoint tracking shared between a step and its resource clients

use std::sync::{Arc, Mutex};

/// Records the provider endpoint currently being fetched.
///
/// Cloning shares the underlying cell, so the scheduler can read what a step's
/// clients last touched when the step runs past its deadline.
#[derive(Debug, Clone, Default)]
pub struct EndpointTracker {
    current: Arc<Mutex<Option<String>>>,
}

impl EndpointTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, endpoint: &str) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = Some(endpoint.to_string());
    }

    pub fn clear(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = None;
    }

    /// Put back a value read earlier with [`EndpointTracker::current`]
    pub fn restore(&self, previous: Option<String>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = previous;
    }

    pub fn current(&self) -> Option<String> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
