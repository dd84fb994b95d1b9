use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Service, ServiceExt};
use tower_layer::Layer;
use tracing::{debug, warn};

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one attempt.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(50))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RetryLayer {
    policy: RetryPolicy,
}

impl RetryLayer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = Retry<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Retry {
            inner,
            policy: self.policy,
        }
    }
}

/// Retries the inner service and turns exhaustion into `Ok(None)`.
///
/// Which attempt succeeded is not reported; callers only see whether a
/// response arrived.
#[derive(Debug, Clone)]
pub struct Retry<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S, Req> Service<Req> for Retry<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Display + Send + 'static,
    S::Future: Send + 'static,
    Req: Clone + Send + 'static,
{
    type Response = Option<S::Response>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Each attempt drives its own clone of the inner service to readiness.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let inner = self.inner.clone();
        let policy = self.policy;

        Box::pin(async move {
            for attempt in 1..=policy.max_attempts {
                match inner.clone().oneshot(req.clone()).await {
                    Ok(response) => return Ok(Some(response)),
                    Err(e) if attempt < policy.max_attempts => {
                        debug!("Retry {}/{} after error: {}", attempt, policy.max_attempts, e);
                        tokio::time::sleep(policy.backoff).await;
                    }
                    Err(e) => {
                        warn!("All {} attempts failed: {}", policy.max_attempts, e);
                    }
                }
            }
            Ok(None)
        })
    }
}
