//! The single capability every pipeline layer implements.
//!
//! Layers wrap an inner `H: SendRequest` and are composed by construction:
//!
//! ```no_run
//! use hosting_harness::{HttpTransport, LoggingHandler, PipelineOptions, RetryHandler};
//!
//! let transport = HttpTransport::new(&PipelineOptions::default());
//! let stack = RetryHandler::new(LoggingHandler::new(transport), 3).unwrap();
//! ```

use std::{future::Future, pin::Pin, sync::Arc};

use reqwest::{Request, Response};
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Future returned by [`SendRequest::send`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

/// Sends one request and resolves to its response.
///
/// Implementations must honor `cancel`: once it fires, no new dispatch may start and
/// any pending wait returns [`crate::HarnessError::Cancelled`] promptly.
pub trait SendRequest: Send + Sync {
    fn send<'a>(&'a self, request: Request, cancel: &'a CancellationToken) -> SendFuture<'a>;
}

impl<H: SendRequest + ?Sized> SendRequest for Box<H> {
    fn send<'a>(&'a self, request: Request, cancel: &'a CancellationToken) -> SendFuture<'a> {
        (**self).send(request, cancel)
    }
}

impl<H: SendRequest + ?Sized> SendRequest for Arc<H> {
    fn send<'a>(&'a self, request: Request, cancel: &'a CancellationToken) -> SendFuture<'a> {
        (**self).send(request, cancel)
    }
}
