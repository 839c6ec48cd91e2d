use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use crate::config::{ClientConfig, Credentials};
use crate::error::NetworkError;

/// What the core needs from the HTTP layer: authenticated GET/POST returning
/// parsed JSON or a typed failure. Sessions hold two independent instances —
/// one for foreground commands, one exclusive to the live poll — so a long
/// poll never blocks a command on the same connection.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, NetworkError>;

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Value, NetworkError>;
}

/// reqwest-backed transport with HTTP Basic auth attached to every request.
pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
    auth: Option<String>,
}

impl HttpTransport {
    /// Transport for foreground commands: bounded total request time.
    pub fn for_commands(
        config: &ClientConfig,
        credentials: Option<&Credentials>,
    ) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::assemble(client, config, credentials))
    }

    /// Transport for the live poll: connect timeout only. The server holds
    /// the request open until data exists, so a total timeout would turn
    /// every quiet stretch into a spurious failure.
    pub fn for_live(
        config: &ClientConfig,
        credentials: Option<&Credentials>,
    ) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self::assemble(client, config, credentials))
    }

    fn assemble(
        client: reqwest::Client,
        config: &ClientConfig,
        credentials: Option<&Credentials>,
    ) -> Self {
        let auth = credentials.map(|c| {
            let raw = format!("{}:{}", c.login, c.password);
            format!("Basic {}", BASE64.encode(raw))
        });
        Self {
            client,
            base: config.api_base.trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn execute(
        &self,
        mut request: reqwest::RequestBuilder,
    ) -> Result<Value, NetworkError> {
        if let Some(auth) = &self.auth {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                status: status.as_u16(),
                reason: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|_| NetworkError::BadBody(excerpt(&text)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, NetworkError> {
        self.execute(self.client.get(self.url(path)).query(query))
            .await
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Value, NetworkError> {
        self.execute(self.client.post(self.url(path)).form(form))
            .await
    }
}

/// First line-ish of a bad body, for the error message.
fn excerpt(text: &str) -> String {
    const LIMIT: usize = 120;
    let flat = text.trim().replace('\n', " ");
    if flat.len() <= LIMIT {
        flat
    } else {
        let mut cut = LIMIT;
        while !flat.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…", &flat[..cut])
    }
}
