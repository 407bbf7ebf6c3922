//! Per-case runner: deploy, issue one GET, compare body and `Server` header.

use std::path::PathBuf;

use reqwest::header::SERVER;
use serde::Serialize;

use crate::{
    deploy::{Deployer, DeploymentParameters, DeploymentResult},
    HarnessError, PipelineOptions, Result, ServerConfigFiles, TestCase, TestMatrix,
};

/// How the `Server` response header is checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum HeaderMatch {
    Exact(String),
    Prefix(String),
    /// Header may be anything, including absent.
    Any,
}

impl HeaderMatch {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    pub fn prefix(value: impl Into<String>) -> Self {
        Self::Prefix(value.into())
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (HeaderMatch::Any, _) => true,
            (HeaderMatch::Exact(expected), Some(actual)) => actual == expected.as_str(),
            (HeaderMatch::Prefix(expected), Some(actual)) => actual.starts_with(expected.as_str()),
            (_, None) => false,
        }
    }
}

/// What a case must observe to pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Expectation {
    pub body: String,
    pub server_header: HeaderMatch,
}

impl Expectation {
    pub fn new(body: impl Into<String>, server_header: HeaderMatch) -> Self {
        Self {
            body: body.into(),
            server_header,
        }
    }
}

/// Inputs shared by every case of a run.
#[derive(Clone, Debug)]
pub struct CaseSetup {
    pub application_path: PathBuf,
    pub config_files: Option<ServerConfigFiles>,
    pub options: PipelineOptions,
    /// Path requested after deployment.
    pub path: String,
}

impl CaseSetup {
    pub fn new(application_path: impl Into<PathBuf>) -> Self {
        Self {
            application_path: application_path.into(),
            config_files: None,
            options: PipelineOptions::default(),
            path: "/".to_owned(),
        }
    }

    pub fn with_config_files(mut self, files: ServerConfigFiles) -> Self {
        self.config_files = Some(files);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// Observed outcome of one case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    pub case: TestCase,
    pub status: u16,
    pub body: String,
    pub server_header: Option<String>,
    pub mismatches: Vec<String>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|err| HarnessError::Config(format!("could not encode report: {err}")))
    }
}

/// Deploys `case`, sends one GET through the decorated pipeline and compares the result.
///
/// The deployment is shut down once the response is read, whatever the outcome.
/// Transport failures and cancellation are returned as errors; a mismatching body or
/// header is reported in [`CaseReport::mismatches`].
pub async fn run_case<D: Deployer>(
    deployer: &D,
    case: &TestCase,
    setup: &CaseSetup,
    expectation: &Expectation,
) -> Result<CaseReport> {
    let params = DeploymentParameters::for_case(
        case.clone(),
        setup.application_path.clone(),
        setup.config_files.as_ref(),
    )?;

    tracing::info!(case = %case, "deploying");
    let deployment = deployer.deploy(params).await?;
    let observed = fetch(&deployment, setup).await;
    deployment.shutdown();
    let (status, server_header, body) = observed?;

    let mut mismatches = Vec::new();
    if body != expectation.body {
        mismatches.push(format!(
            "body: expected {:?}, got {body:?}",
            expectation.body
        ));
    }
    if !expectation.server_header.matches(server_header.as_deref()) {
        mismatches.push(format!(
            "server header: expected {:?}, got {server_header:?}",
            expectation.server_header
        ));
    }

    if mismatches.is_empty() {
        tracing::info!(case = %case, status, "case passed");
    } else {
        tracing::warn!(case = %case, status, ?mismatches, "case failed");
    }

    Ok(CaseReport {
        case: case.clone(),
        status,
        body,
        server_header,
        mismatches,
    })
}

/// Runs every case of `matrix` in order, one deployment at a time.
///
/// `expect` maps each case to its expectation; this is where the environment-specific
/// header table lives.
pub async fn run_matrix<D, F>(
    deployer: &D,
    matrix: &TestMatrix,
    setup: &CaseSetup,
    expect: F,
) -> Vec<(TestCase, Result<CaseReport>)>
where
    D: Deployer,
    F: Fn(&TestCase) -> Expectation,
{
    let mut results = Vec::new();
    for case in matrix.cases() {
        let expectation = expect(&case);
        let outcome = run_case(deployer, &case, setup, &expectation).await;
        if let Err(err) = &outcome {
            tracing::warn!(case = %case, error = %err, "case errored");
        }
        results.push((case, outcome));
    }
    results
}

async fn fetch(
    deployment: &DeploymentResult,
    setup: &CaseSetup,
) -> Result<(u16, Option<String>, String)> {
    let client = deployment.client(setup.options.clone())?;
    let response = client.get(&setup.path).await?;
    let status = response.status().as_u16();
    let server_header = response
        .headers()
        .get(SERVER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let body = response.text().await.map_err(HarnessError::Transport)?;
    Ok((status, server_header, body))
}
