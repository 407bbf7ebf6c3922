//! Deployment collaborator.
//!
//! Starting and stopping the actual web server is left to implementations of
//! [`Deployer`]. This module only fixes the shape of what goes in and what comes back.

use std::{future::Future, path::PathBuf};

use tokio_util::sync::CancellationToken;

use crate::{HarnessClient, PipelineOptions, Result, ServerConfigFiles, TestCase};

/// Everything a deployer needs to host one test case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentParameters {
    pub case: TestCase,
    pub application_path: PathBuf,
    /// Server configuration text, for server kinds that take one.
    pub server_config: Option<String>,
}

impl DeploymentParameters {
    /// Builds parameters for `case`, loading the server config matching its server kind.
    pub fn for_case(
        case: TestCase,
        application_path: impl Into<PathBuf>,
        config_files: Option<&ServerConfigFiles>,
    ) -> Result<Self> {
        let server_config = match config_files {
            Some(files) => files.content_for(case.server)?,
            None => None,
        };
        Ok(Self {
            case,
            application_path: application_path.into(),
            server_config,
        })
    }
}

/// Handle to a running deployment.
#[derive(Clone, Debug)]
pub struct DeploymentResult {
    base_url: String,
    shutdown: CancellationToken,
    http: Option<reqwest::Client>,
}

impl DeploymentResult {
    pub fn new(base_url: impl Into<String>, shutdown: CancellationToken) -> Self {
        Self {
            base_url: base_url.into(),
            shutdown,
            http: None,
        }
    }

    /// Uses a deployment-specific client (e.g. one trusting a test certificate).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fires when the deployed process has shut down.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Signals that the deployment is gone; pipelines built from it stop retrying.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Builds the typical pipeline against this deployment. The client observes a child
    /// of the shutdown token, so a dead target aborts pending calls.
    pub fn client(&self, options: PipelineOptions) -> Result<HarnessClient> {
        let mut builder = HarnessClient::builder(&self.base_url)
            .options(options)
            .cancellation(self.shutdown.child_token());
        if let Some(http) = &self.http {
            builder = builder.http_client(http.clone());
        }
        builder.build()
    }
}

/// Deploys an application for one test case.
pub trait Deployer {
    fn deploy(
        &self,
        params: DeploymentParameters,
    ) -> impl Future<Output = Result<DeploymentResult>> + Send;
}
