use thiserror::Error;

/// Errors raised while talking to the resource API or serving the relay.
///
/// None of these reach the browser: the controller folds them into a
/// `ViewOutcome`.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upstream request to {path} failed: {source}")]
    Upstream {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response body from {path}: {source}")]
    UnexpectedBody {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}
