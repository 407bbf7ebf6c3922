//! `hosting-harness` drives functional tests of a hosted "Hello World" application.
//!
//! Two pieces do the work:
//! - a decorating HTTP pipeline ([`HttpTransport`] wrapped by [`LoggingHandler`] and
//!   [`RetryHandler`], exposed through [`HarnessClient`]) that logs every attempt and
//!   re-issues unsuccessful requests a bounded number of times, and
//! - a [`TestMatrix`] that expands configuration axes into a deterministic list of
//!   [`TestCase`]s.
//!
//! Deployment itself stays behind the [`Deployer`] trait; [`run_case`] ties a case, a
//! deployment and the pipeline together.

mod client;
mod deploy;
mod error;
mod handler;
mod harness;
mod logging;
mod matrix;
mod options;
mod retry;
mod server_config;
mod transport;

pub use client::{HarnessClient, HarnessClientBuilder};
pub use deploy::{Deployer, DeploymentParameters, DeploymentResult};
pub use error::HarnessError;
pub use handler::{SendFuture, SendRequest};
pub use harness::{run_case, run_matrix, CaseReport, CaseSetup, Expectation, HeaderMatch};
pub use logging::LoggingHandler;
pub use matrix::{
    ApplicationType, Cases, CompatibilityRule, HostingModel, RuntimeArchitecture,
    RuntimeFlavor, ServerKind, TestCase, TestMatrix, DEFAULT_TFM,
};
pub use options::{PipelineOptions, DEFAULT_MAX_RETRIES, MAX_RETRIES_CEILING};
pub use retry::RetryHandler;
pub use server_config::ServerConfigFiles;
pub use transport::HttpTransport;

pub type Result<T> = std::result::Result<T, HarnessError>;
