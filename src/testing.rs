//! Mock service client for tests
//! Keeps the sequencer testable without live downstream services

use crate::client::{ServiceClient, ServiceRequest};
use crate::models::{FailureKind, ServiceResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shared record of every request a mock received
#[derive(Clone, Default)]
pub struct CallLog {
    requests: Arc<Mutex<Vec<ServiceRequest>>>,
}

impl CallLog {
    fn push(&self, request: ServiceRequest) {
        self.requests.lock().unwrap().push(request);
    }

    pub fn requests(&self) -> Vec<ServiceRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    /// Number of requests whose URL contains `fragment`
    pub fn count(&self, fragment: &str) -> usize {
        self.urls().iter().filter(|u| u.contains(fragment)).count()
    }

    pub fn find(&self, fragment: &str) -> Option<ServiceRequest> {
        self.requests().into_iter().find(|r| r.url.contains(fragment))
    }
}

/// Routes exact URLs to canned results; unknown URLs fail like a refused
/// connection.
#[derive(Default)]
pub struct MockServiceClient {
    routes: HashMap<String, ServiceResult>,
    log: CallLog,
}

impl MockServiceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, url: impl Into<String>, result: ServiceResult) -> Self {
        self.routes.insert(url.into(), result);
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

#[async_trait]
impl ServiceClient for MockServiceClient {
    async fn call(&self, request: ServiceRequest) -> ServiceResult {
        let result = self.routes.get(&request.url).cloned().unwrap_or_else(|| {
            ServiceResult::failure(
                FailureKind::Network,
                format!("Connection refused: {}", request.url),
                500,
            )
        });
        self.log.push(request);
        result
    }
}
