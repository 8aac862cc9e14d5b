use thiserror::Error;

/// Errors that stop a batch before anything is dispatched.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("invalid proxy {address:?}: {source}")]
    InvalidProxy {
        address: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}
