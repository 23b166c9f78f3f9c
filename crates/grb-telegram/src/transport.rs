use std::{fmt, time::Duration};

use async_trait::async_trait;
use regex::Regex;
use tokio::time::sleep;
use tracing::{trace, warn};

use grb_core::{
    api::{ApiResponse, ApiTransport, Params},
    config::Config,
    errors::Error,
    Result,
};

const TOKEN_PATTERN: &str = r"^\d{3,11}:[\w-]{35}$";

/// Bot API over HTTPS: every method is a JSON `POST` to
/// `{base_url}/bot{token}/{method}`.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let token = token.into();
        if !is_valid_token(&token)? {
            return Err(Error::InvalidToken);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(map_err)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(&cfg.telegram_bot_token, &cfg.api_url, cfg.request_timeout)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn post(&self, method: &str, params: &Params) -> Result<ApiResponse> {
        let res = self
            .client
            .post(self.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(map_err)?;

        let status = res.status();
        let body = res.text().await.map_err(map_err)?;
        trace!(method, %status, %body, "bot api response");

        serde_json::from_str(&body).map_err(|_| {
            Error::External(format!("unexpected bot api response ({status}): {body}"))
        })
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, method: &str, params: Params) -> Result<ApiResponse> {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            let res = self.post(method, &params).await?;
            let retry_after = (!res.ok && res.error_code == Some(429))
                .then(|| res.parameters.as_ref().and_then(|p| p.retry_after))
                .flatten();

            match retry_after {
                Some(secs) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    warn!(method, retry_after = secs, "bot api flood limit hit; retrying");
                    sleep(Duration::from_secs(secs.max(0) as u64)).await;
                }
                _ => return Ok(res),
            }
        }
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

fn is_valid_token(token: &str) -> Result<bool> {
    let re = Regex::new(TOKEN_PATTERN).map_err(|e| Error::Config(format!("token pattern: {e}")))?;
    Ok(re.is_match(token))
}

// Drop the URL: it carries the bot token.
fn map_err(e: reqwest::Error) -> Error {
    Error::External(format!("telegram request failed: {}", e.without_url()))
}
