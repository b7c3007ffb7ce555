use thiserror::Error;

#[derive(Error, Debug)]
pub enum StarNetworkError {
    #[error("GitHub API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid repository URL: {0}")]
    InvalidRepoUrl(String),

    #[error("Invalid login: {0}")]
    InvalidLogin(String),

    #[error("Malformed star record: {0}")]
    MalformedRecord(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Corrupt cache entry: {0}")]
    CorruptEntry(String),

    #[error("Environment error: {0}")]
    EnvError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),
}

/// Coarse classification used when reporting failures upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RemoteFetch,
    CacheIo,
    MalformedRecord,
    Config,
}

impl StarNetworkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StarNetworkError::ApiError(_)
            | StarNetworkError::RateLimitExceeded(_)
            | StarNetworkError::NetworkError(_)
            | StarNetworkError::AuthError(_)
            | StarNetworkError::NotFound(_) => ErrorKind::RemoteFetch,
            StarNetworkError::CacheError(_)
            | StarNetworkError::CorruptEntry(_)
            | StarNetworkError::IoError(_)
            | StarNetworkError::JsonError(_) => ErrorKind::CacheIo,
            StarNetworkError::InvalidRepoUrl(_)
            | StarNetworkError::InvalidLogin(_)
            | StarNetworkError::MalformedRecord(_) => ErrorKind::MalformedRecord,
            StarNetworkError::EnvError(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, StarNetworkError>;
