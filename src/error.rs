use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The transport failed before a response arrived (DNS, refused, reset).
    #[error("failed to reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to get resource {url}, status code: {status}")]
    HttpStatus { url: String, status: StatusCode },

    /// The body transport broke after the headers were received.
    #[error("connection to {url} interrupted: {source}")]
    Interrupted {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("invalid cluster endpoint '{0}'")]
    Endpoint(String),

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}
