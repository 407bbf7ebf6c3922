/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// The cancellation signal fired before or while a request was in flight.
    #[error("request cancelled")]
    Cancelled,
    /// Invalid options, unreadable config files or bad environment values.
    #[error("config error: {0}")]
    Config(String),
    /// Failure reported by the deployment collaborator.
    #[error("deploy error: {0}")]
    Deploy(String),
    /// A request path could not be resolved against the base URL.
    #[error("invalid url: {0}")]
    Url(String),
}
