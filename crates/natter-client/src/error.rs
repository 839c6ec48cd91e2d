/// Network-level failure of a single API call.
///
/// Everything transport-shaped funnels into this one type: connection and
/// protocol errors, non-2xx statuses, and bodies that are not valid JSON
/// (the old separate JSON error folded in here). Foreground callers report
/// it and keep the console loop alive; the live loop catches it and backs
/// off. It never terminates the process.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// DNS failure, refused connection, timeout, protocol-level breakage.
    #[error("network error: {0}")]
    Connect(String),

    /// Server answered with a non-2xx status.
    #[error("server returned {status} {reason}")]
    Status { status: u16, reason: String },

    /// Body arrived but is not the JSON we expect.
    #[error("unparseable response body: {0}")]
    BadBody(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        NetworkError::Connect(err.to_string())
    }
}
