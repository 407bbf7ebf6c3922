use std::fmt::Write as _;

use reqwest::{header::HeaderMap, Request};
use tokio_util::sync::CancellationToken;

use crate::handler::{SendFuture, SendRequest};

const REDACTED_HEADERS: [&str; 4] = [
    "authorization",
    "cookie",
    "proxy-authorization",
    "set-cookie",
];

/// Records every request before dispatch and its response (or error) after.
///
/// Forwards the request and the outcome unchanged.
#[derive(Clone, Debug)]
pub struct LoggingHandler<H> {
    inner: H,
}

impl<H> LoggingHandler<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H: SendRequest> SendRequest for LoggingHandler<H> {
    fn send<'a>(&'a self, request: Request, cancel: &'a CancellationToken) -> SendFuture<'a> {
        Box::pin(async move {
            let method = request.method().clone();
            let url = request.url().clone();
            tracing::debug!(
                %method,
                %url,
                headers = %render_headers(request.headers()),
                "sending request"
            );

            let outcome = self.inner.send(request, cancel).await;
            match &outcome {
                Ok(response) => tracing::debug!(
                    %method,
                    url = %response.url(),
                    status = response.status().as_u16(),
                    version = ?response.version(),
                    headers = %render_headers(response.headers()),
                    "received response"
                ),
                Err(err) => tracing::debug!(%method, %url, error = %err, "request failed"),
            }
            outcome
        })
    }
}

/// Renders headers as `name: value` pairs, hiding credentials.
pub(crate) fn render_headers(headers: &HeaderMap) -> String {
    let mut out = String::new();
    for (name, value) in headers {
        if !out.is_empty() {
            out.push_str(", ");
        }
        let shown = if REDACTED_HEADERS.contains(&name.as_str()) {
            "<redacted>"
        } else {
            value.to_str().unwrap_or("<binary>")
        };
        let _ = write!(out, "{name}: {shown}");
    }
    out
}
