use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("store connection is closed")]
    Closed,

    #[error("credential error: {0}")]
    Credential(String),
}

impl From<tiberius::error::Error> for StoreError {
    fn from(e: tiberius::error::Error) -> Self {
        match e {
            tiberius::error::Error::Io { .. } => StoreError::Connection(e.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Connection(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed search response: {0}")]
    Malformed(String),

    #[error("search API key is not configured")]
    MissingApiKey,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("external service failure: {0}")]
    ExternalService(#[from] SearchError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
