use async_trait::async_trait;
use serde_json::Value;

use crate::context::RequestContext;
use crate::core::{Error, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// One call to the backup daemon, relative to its `api/v1` root.
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonRequest {
    pub operation: Operation,
    pub method: Method,
    /// Path segments, each percent-encoded on the way out.
    pub path: Vec<String>,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl DaemonRequest {
    pub fn new(operation: Operation, method: Method, path: &[&str]) -> Self {
        Self {
            operation,
            method,
            path: path.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(&'static str, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw daemon reply. Status interpretation is left to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl DaemonResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests to the backup daemon.
///
/// Implementations must be safe for concurrent use and must give up on the call
/// once `ctx` is cancelled or past its deadline, returning [`Error::Interrupted`].
#[async_trait]
pub trait DaemonTransport: Send + Sync {
    async fn send(
        &self,
        ctx: &RequestContext,
        request: DaemonRequest,
    ) -> Result<DaemonResponse, Error>;
}
