//! Declarative test matrix.
//!
//! A [`TestMatrix`] holds one ordered set of values per configuration axis plus a list of
//! [`CompatibilityRule`]s. [`TestMatrix::cases`] walks the cross-product lazily, server
//! axis outermost and hosting model innermost, skipping every combination a rule
//! rejects. The walk is deterministic and can be restarted by calling `cases` again.

use std::{fmt, sync::Arc};

use serde::Serialize;

/// Target framework used when the axis is not configured.
pub const DEFAULT_TFM: &str = "net8.0";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ServerKind {
    IisExpress,
    Iis,
    Kestrel,
    Nginx,
    HttpSys,
}

impl ServerKind {
    pub const ALL: [ServerKind; 5] = [
        ServerKind::IisExpress,
        ServerKind::Iis,
        ServerKind::Kestrel,
        ServerKind::Nginx,
        ServerKind::HttpSys,
    ];

    /// Whether the server has an in-process versus reverse-proxied hosting concept.
    pub fn supports_hosting_models(self) -> bool {
        matches!(self, ServerKind::IisExpress | ServerKind::Iis)
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerKind::IisExpress => "IISExpress",
            ServerKind::Iis => "IIS",
            ServerKind::Kestrel => "Kestrel",
            ServerKind::Nginx => "Nginx",
            ServerKind::HttpSys => "HttpSys",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum RuntimeFlavor {
    #[default]
    CoreClr,
    Clr,
}

impl fmt::Display for RuntimeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum RuntimeArchitecture {
    #[default]
    X64,
    X86,
}

impl fmt::Display for RuntimeArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuntimeArchitecture::X64 => "x64",
            RuntimeArchitecture::X86 => "x86",
        })
    }
}

/// How the application is packaged for deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ApplicationType {
    /// Framework-dependent; runs on a shared runtime.
    #[default]
    Portable,
    /// Self-contained; carries its own runtime.
    Standalone,
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Whether the app runs inside the host process or reverse-proxied behind it.
///
/// `None` marks servers without the concept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum HostingModel {
    #[default]
    None,
    InProcess,
    OutOfProcess,
}

impl fmt::Display for HostingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One configuration to exercise. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TestCase {
    pub server: ServerKind,
    pub target_framework: String,
    pub application_type: ApplicationType,
    pub architecture: RuntimeArchitecture,
    pub runtime_flavor: RuntimeFlavor,
    pub hosting_model: HostingModel,
}

impl TestCase {
    /// Stable identifier, e.g. `Kestrel-net8.0-Portable-x64-CoreClr-InProcess`.
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}-{}",
            self.server,
            self.target_framework,
            self.application_type,
            self.architecture,
            self.runtime_flavor,
            self.hosting_model
        )
    }
}

type Predicate = Arc<dyn Fn(&TestCase) -> bool + Send + Sync>;

/// Declares a set of invalid combinations.
#[derive(Clone)]
pub struct CompatibilityRule {
    name: String,
    excludes: Predicate,
}

impl fmt::Debug for CompatibilityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompatibilityRule")
            .field("name", &self.name)
            .finish()
    }
}

impl CompatibilityRule {
    /// Rule from a predicate that returns `true` for cases that must be skipped.
    pub fn custom<F>(name: impl Into<String>, excludes: F) -> Self
    where
        F: Fn(&TestCase) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            excludes: Arc::new(excludes),
        }
    }

    /// `server` cannot run with `model`.
    pub fn exclude_hosting_model(server: ServerKind, model: HostingModel) -> Self {
        Self::custom(format!("{server} has no {model} hosting model"), move |case| {
            case.server == server && case.hosting_model == model
        })
    }

    /// Servers with a hosting model concept must pick one; servers without it may only
    /// use [`HostingModel::None`].
    pub fn hosting_model_matches_server() -> Self {
        Self::custom("hosting model matches server", |case| {
            case.server.supports_hosting_models() == (case.hosting_model == HostingModel::None)
        })
    }

    /// `server` cannot run on `architecture`.
    pub fn exclude_architecture(server: ServerKind, architecture: RuntimeArchitecture) -> Self {
        Self::custom(format!("{server} does not run on {architecture}"), move |case| {
            case.server == server && case.architecture == architecture
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn excludes(&self, case: &TestCase) -> bool {
        (self.excludes)(case)
    }
}

/// Declarative description of configuration axes.
#[derive(Clone, Debug)]
pub struct TestMatrix {
    servers: Vec<ServerKind>,
    target_frameworks: Vec<String>,
    application_types: Vec<ApplicationType>,
    architectures: Vec<RuntimeArchitecture>,
    runtime_flavors: Vec<RuntimeFlavor>,
    hosting_models: Vec<HostingModel>,
    rules: Vec<CompatibilityRule>,
}

impl Default for TestMatrix {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            target_frameworks: vec![DEFAULT_TFM.to_owned()],
            application_types: vec![ApplicationType::default()],
            architectures: vec![RuntimeArchitecture::default()],
            runtime_flavors: vec![RuntimeFlavor::default()],
            hosting_models: vec![HostingModel::default()],
            rules: Vec::new(),
        }
    }
}

impl TestMatrix {
    /// Matrix over `servers` with every other axis at its default single value.
    pub fn for_servers(servers: impl IntoIterator<Item = ServerKind>) -> Self {
        Self::default().with_servers(servers)
    }

    pub fn with_servers(mut self, servers: impl IntoIterator<Item = ServerKind>) -> Self {
        self.servers = dedup(servers);
        self
    }

    pub fn with_target_frameworks<I, S>(mut self, tfms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_frameworks = dedup(tfms.into_iter().map(Into::into));
        self
    }

    pub fn with_application_types(
        mut self,
        types: impl IntoIterator<Item = ApplicationType>,
    ) -> Self {
        self.application_types = dedup(types);
        self
    }

    pub fn with_all_application_types(self) -> Self {
        self.with_application_types([ApplicationType::Portable, ApplicationType::Standalone])
    }

    pub fn with_architectures(
        mut self,
        architectures: impl IntoIterator<Item = RuntimeArchitecture>,
    ) -> Self {
        self.architectures = dedup(architectures);
        self
    }

    pub fn with_runtime_flavors(
        mut self,
        flavors: impl IntoIterator<Item = RuntimeFlavor>,
    ) -> Self {
        self.runtime_flavors = dedup(flavors);
        self
    }

    pub fn with_hosting_models(mut self, models: impl IntoIterator<Item = HostingModel>) -> Self {
        self.hosting_models = dedup(models);
        self
    }

    /// In-process and out-of-process, plus `None` for servers without the concept.
    pub fn with_all_hosting_models(self) -> Self {
        self.with_hosting_models([
            HostingModel::None,
            HostingModel::InProcess,
            HostingModel::OutOfProcess,
        ])
        .with_rule(CompatibilityRule::hosting_model_matches_server())
    }

    pub fn with_rule(mut self, rule: CompatibilityRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[CompatibilityRule] {
        &self.rules
    }

    /// Lazily walks the filtered cross-product. Each call starts from the beginning.
    pub fn cases(&self) -> Cases<'_> {
        let exhausted = self.axis_lens().contains(&0);
        Cases {
            matrix: self,
            indices: [0; AXES],
            exhausted,
        }
    }

    pub fn collect(&self) -> Vec<TestCase> {
        self.cases().collect()
    }

    /// Size of the unfiltered cross-product.
    pub fn combinations(&self) -> usize {
        self.axis_lens().iter().product()
    }

    fn axis_lens(&self) -> [usize; AXES] {
        [
            self.servers.len(),
            self.target_frameworks.len(),
            self.application_types.len(),
            self.architectures.len(),
            self.runtime_flavors.len(),
            self.hosting_models.len(),
        ]
    }

    fn case_at(&self, idx: &[usize; AXES]) -> TestCase {
        TestCase {
            server: self.servers[idx[0]],
            target_framework: self.target_frameworks[idx[1]].clone(),
            application_type: self.application_types[idx[2]],
            architecture: self.architectures[idx[3]],
            runtime_flavor: self.runtime_flavors[idx[4]],
            hosting_model: self.hosting_models[idx[5]],
        }
    }

    fn excluded(&self, case: &TestCase) -> bool {
        self.rules.iter().any(|rule| rule.excludes(case))
    }
}

const AXES: usize = 6;

/// Iterator returned by [`TestMatrix::cases`].
#[derive(Debug)]
pub struct Cases<'a> {
    matrix: &'a TestMatrix,
    indices: [usize; AXES],
    exhausted: bool,
}

impl Cases<'_> {
    // Odometer step: the last axis turns fastest.
    fn advance(&mut self) {
        let lens = self.matrix.axis_lens();
        for axis in (0..AXES).rev() {
            self.indices[axis] += 1;
            if self.indices[axis] < lens[axis] {
                return;
            }
            self.indices[axis] = 0;
        }
        self.exhausted = true;
    }
}

impl Iterator for Cases<'_> {
    type Item = TestCase;

    fn next(&mut self) -> Option<TestCase> {
        while !self.exhausted {
            let case = self.matrix.case_at(&self.indices);
            self.advance();
            if !self.matrix.excluded(&case) {
                return Some(case);
            }
        }
        None
    }
}

fn dedup<T: PartialEq>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
