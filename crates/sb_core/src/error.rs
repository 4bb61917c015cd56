use thiserror::Error;

/// Coarse classification used when an error crosses a process boundary
/// (HTTP status codes, CLI exit messages).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UpstreamFetchFailed,
    ParseFailed,
    NotFound,
    Internal,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Upstream fetch failed: {0}")]
    Upstream(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Upstream(_) | Error::Inference(_) => ErrorKind::UpstreamFetchFailed,
            Error::Http(e) if e.is_decode() => ErrorKind::ParseFailed,
            Error::Http(_) => ErrorKind::UpstreamFetchFailed,
            Error::Parse(_) | Error::Serialization(_) => ErrorKind::ParseFailed,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Io(_) | Error::InvalidUrl(_) | Error::Storage(_) | Error::External(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn upstream(source: &str, err: impl std::fmt::Display) -> Self {
        Error::Upstream(format!("{}: {}", source, err))
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUrl(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
