use std::{fmt, sync::Arc};

use reqwest::{Method, Request, Response, Url};
use tokio_util::sync::CancellationToken;

use crate::{
    handler::SendRequest, HarnessError, HttpTransport, LoggingHandler, PipelineOptions, Result,
    RetryHandler,
};

/// Caller-visible client over a decorated handler stack.
///
/// A client is scoped to one test case; it is not meant to be shared across cases.
#[derive(Clone)]
pub struct HarnessClient {
    handler: Arc<dyn SendRequest>,
    http: reqwest::Client,
    base_url: Url,
    cancel: CancellationToken,
}

impl fmt::Debug for HarnessClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessClient")
            .field("base_url", &self.base_url.as_str())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl HarnessClient {
    /// Starts building a client with the typical `transport -> logging -> retry` stack.
    pub fn builder(base_url: impl AsRef<str>) -> HarnessClientBuilder {
        HarnessClientBuilder {
            base_url: base_url.as_ref().to_owned(),
            options: PipelineOptions::default(),
            http: None,
            cancel: None,
        }
    }

    /// Creates a client over a caller-composed handler stack.
    pub fn with_handler<H>(
        base_url: impl AsRef<str>,
        handler: H,
        cancel: CancellationToken,
    ) -> Result<Self>
    where
        H: SendRequest + 'static,
    {
        Ok(Self {
            handler: Arc::new(handler),
            http: reqwest::Client::new(),
            base_url: parse_base_url(base_url.as_ref())?,
            cancel,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Cancellation signal observed by every dispatch made through this client.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolves `path` against the base URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        join_url(&self.base_url, path)
    }

    /// Issues a GET for `path` through the pipeline.
    pub async fn get(&self, path: &str) -> Result<Response> {
        let request = self.request(Method::GET, path)?;
        self.send(request).await
    }

    /// Builds a bodiless request for `path` without sending it.
    pub fn request(&self, method: Method, path: &str) -> Result<Request> {
        let url = self.url(path)?;
        self.http
            .request(method, url)
            .build()
            .map_err(HarnessError::Transport)
    }

    /// Sends an arbitrary request through the pipeline.
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.handler.send(request, &self.cancel).await
    }
}

/// Builder for [`HarnessClient`].
#[derive(Debug)]
pub struct HarnessClientBuilder {
    base_url: String,
    options: PipelineOptions,
    http: Option<reqwest::Client>,
    cancel: Option<CancellationToken>,
}

impl HarnessClientBuilder {
    /// Applies pipeline options such as timeout and retry behavior.
    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses an existing `reqwest::Client` as the transport.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Observes `cancel`; when it fires, pending calls and retries stop.
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Validates the options and composes `retry(logging(transport))`.
    pub fn build(self) -> Result<HarnessClient> {
        self.options.validate()?;
        let base_url = parse_base_url(&self.base_url)?;
        let http = self.http.unwrap_or_default();
        let transport = HttpTransport::with_client(http.clone(), &self.options);
        let stack = RetryHandler::from_options(LoggingHandler::new(transport), &self.options)?;

        Ok(HarnessClient {
            handler: Arc::new(stack),
            http,
            base_url,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw.trim()).map_err(|err| HarnessError::Url(format!("'{raw}': {err}")))?;
    if url.cannot_be_a_base() {
        return Err(HarnessError::Url(format!("'{raw}' cannot be a base url")));
    }
    // Treat the base as a directory so relative paths append instead of replacing.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn join_url(base: &Url, path: &str) -> Result<Url> {
    base.join(path.trim_start_matches('/'))
        .map_err(|err| HarnessError::Url(format!("'{path}' against '{base}': {err}")))
}
