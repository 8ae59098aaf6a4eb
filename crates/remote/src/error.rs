use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transport failure or the service is down. Surfaced once, not retried.
    Unavailable(String),
    NotFound,
    /// The service answered but refused the request.
    Rejected(String),
    /// The response could not be understood.
    Malformed(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Unavailable(msg) => write!(f, "remote unavailable: {msg}"),
            RemoteError::NotFound => write!(f, "not found"),
            RemoteError::Rejected(msg) => write!(f, "request rejected: {msg}"),
            RemoteError::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Malformed(err.to_string())
        } else {
            RemoteError::Unavailable(err.to_string())
        }
    }
}

/// One query among several that the filter service could not evaluate. Its
/// matches count as empty; the other queries still apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFailure {
    pub filter_index: usize,
    pub query: String,
    pub reason: String,
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "filter {} ({:?}) failed: {}",
            self.filter_index, self.query, self.reason
        )
    }
}
