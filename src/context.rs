use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::core::{Interrupt, Orchestrator};

/// State shared by every inbound request.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub orchestrator: Arc<Orchestrator>,
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(config: AppConfig, orchestrator: Orchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            shutdown: CancellationToken::new(),
        }
    }

    /// Context for one inbound call, cancelled on shutdown and bounded by the
    /// configured request timeout.
    pub fn request(&self, request_id: impl Into<String>) -> RequestContext {
        RequestContext::new(request_id)
            .with_cancellation(self.shutdown.child_token())
            .with_timeout(Duration::from_secs(self.config.request_timeout_secs))
    }
}

/// Per-call execution context: correlation id plus cancellation and deadline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Context with a fresh UUIDv7 request id.
    pub fn generated() -> Self {
        Self::new(Uuid::now_v7().to_string())
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn interrupted(&self) -> Interrupt {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => Interrupt::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Interrupt::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Interrupt::Cancelled
            }
        }
    }

    /// Drive `fut` to completion unless the context is interrupted first.
    /// An already interrupted context never polls `fut`.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupt> {
        tokio::select! {
            biased;
            reason = self.interrupted() => Err(reason),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn run_completes_when_not_interrupted() {
        let ctx = RequestContext::new("req-1");
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn cancelled_context_never_polls_the_future() {
        let ctx = RequestContext::new("req-2");
        ctx.cancel();

        let polled = AtomicBool::new(false);
        let result = ctx
            .run(async {
                polled.store(true, Ordering::SeqCst);
            })
            .await;

        assert_eq!(result, Err(Interrupt::Cancelled));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn deadline_interrupts_slow_futures() {
        let ctx = RequestContext::new("req-3").with_timeout(Duration::from_millis(20));

        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(60)))
            .await;

        assert_eq!(result, Err(Interrupt::DeadlineExceeded));
    }

    #[tokio::test]
    async fn parent_cancellation_reaches_child_contexts() {
        let shutdown = CancellationToken::new();
        let ctx = RequestContext::generated().with_cancellation(shutdown.child_token());

        shutdown.cancel();

        assert!(ctx.cancellation_token().is_cancelled());
        assert!(Uuid::parse_str(ctx.request_id()).is_ok());
    }
}
