use std::time::Duration;

use reqwest::Request;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    handler::{SendFuture, SendRequest},
    options::validate_max_retries,
    HarnessError, PipelineOptions, Result,
};

/// Re-issues a request while the inner layer answers with a non-2xx status.
///
/// At most `max_retries` dispatches are made per call; the last response is returned
/// as-is once they are used up. Transport errors from the inner layer are returned
/// immediately and are not retried.
#[derive(Clone, Debug)]
pub struct RetryHandler<H> {
    inner: H,
    max_retries: usize,
    backoff: Duration,
}

impl<H> RetryHandler<H> {
    /// Wraps `inner` with a retry budget of `max_retries` dispatches and no backoff.
    ///
    /// Fails with [`HarnessError::Config`] when `max_retries` is zero or above
    /// [`crate::MAX_RETRIES_CEILING`].
    pub fn new(inner: H, max_retries: usize) -> Result<Self> {
        validate_max_retries(max_retries)?;
        Ok(Self {
            inner,
            max_retries,
            backoff: Duration::ZERO,
        })
    }

    /// Wraps `inner` with the retry count and backoff from `options`.
    pub fn from_options(inner: H, options: &PipelineOptions) -> Result<Self> {
        Ok(Self::new(inner, options.max_retries)?
            .with_backoff(Duration::from_millis(options.retry_backoff_ms)))
    }

    /// Base delay before the second attempt; doubles on each later attempt.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    fn delay_after(&self, attempt: usize) -> Duration {
        let exp = attempt.saturating_sub(1).min(16) as u32;
        self.backoff.saturating_mul(1u32 << exp)
    }
}

impl<H: SendRequest> SendRequest for RetryHandler<H> {
    fn send<'a>(&'a self, request: Request, cancel: &'a CancellationToken) -> SendFuture<'a> {
        Box::pin(async move {
            let mut request = request;
            let mut attempt = 0usize;
            loop {
                attempt += 1;
                if cancel.is_cancelled() {
                    tracing::warn!(attempt, "cancelled before dispatch");
                    return Err(HarnessError::Cancelled);
                }

                let next = if attempt < self.max_retries {
                    let next = request.try_clone();
                    if next.is_none() {
                        tracing::debug!("request body cannot be cloned; sending once");
                    }
                    next
                } else {
                    None
                };

                let response = self.inner.send(request, cancel).await?;
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                let Some(next) = next else {
                    if attempt >= self.max_retries {
                        tracing::warn!(
                            attempt,
                            max_retries = self.max_retries,
                            status = status.as_u16(),
                            "retries exhausted"
                        );
                    }
                    return Ok(response);
                };

                tracing::info!(
                    attempt,
                    max_retries = self.max_retries,
                    status = status.as_u16(),
                    "retry"
                );
                drop(response);

                let delay = self.delay_after(attempt);
                if !delay.is_zero() {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            tracing::warn!(attempt, "cancelled during retry backoff");
                            return Err(HarnessError::Cancelled);
                        }
                        () = sleep(delay) => {}
                    }
                }
                request = next;
            }
        })
    }
}
