use std::time::Duration;

/// Login for HTTP Basic auth. Opaque to the core: the bytes are handed to
/// the transport once at session construction and never change.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

/// Client configuration, built once at startup and passed down. No ambient
/// global state.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, no trailing slash.
    pub api_base: String,
    /// TCP connect timeout for both transports.
    pub connect_timeout: Duration,
    /// Total request timeout for the command path. The live transport has
    /// none — a long poll is allowed to hang until the server answers.
    pub request_timeout: Duration,
    /// Fixed delay before the live loop retries a failed poll.
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://convore.com".into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_secs(10),
        }
    }
}
