use std::{fmt, time::Duration};

use reqwest::Request;
use tokio_util::sync::CancellationToken;

use crate::{
    handler::{SendFuture, SendRequest},
    HarnessError, PipelineOptions,
};

/// Innermost pipeline layer: dispatches requests through a `reqwest::Client`.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpTransport {
    /// Creates a transport with a fresh client and the configured per-request timeout.
    pub fn new(options: &PipelineOptions) -> Self {
        Self::with_client(reqwest::Client::new(), options)
    }

    /// Creates a transport over an existing client, e.g. one supplied by a deployment.
    pub fn with_client(http: reqwest::Client, options: &PipelineOptions) -> Self {
        Self {
            http,
            timeout: options.timeout(),
        }
    }

    /// Underlying client, for building requests that this transport will send.
    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }
}

impl SendRequest for HttpTransport {
    fn send<'a>(&'a self, mut request: Request, cancel: &'a CancellationToken) -> SendFuture<'a> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(HarnessError::Cancelled);
            }
            // A timeout set by the caller wins.
            if request.timeout().is_none() {
                *request.timeout_mut() = Some(self.timeout);
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(HarnessError::Cancelled),
                response = self.http.execute(request) => response.map_err(HarnessError::Transport),
            }
        })
    }
}
