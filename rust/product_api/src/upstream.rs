use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::product::{decode_payload, UpstreamPayload};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const KASPI_REFERER: &str = "https://kaspi.kz/";

/// Where product payloads come from. One call per inbound request; no retries.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch(&self, product_id: &str) -> Result<UpstreamPayload, FetchError>;
}

pub struct KaspiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl KaspiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(REFERER, HeaderValue::from_static(KASPI_REFERER));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url, timeout })
    }

    /// The id goes in verbatim; it is not validated or escaped.
    pub fn product_url(&self, product_id: &str) -> String {
        format!("{}/{}", self.base_url, product_id)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout.as_millis() as u64)
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ProductSource for KaspiClient {
    #[instrument(skip(self))]
    async fn fetch(&self, product_id: &str) -> Result<UpstreamPayload, FetchError> {
        let url = self.product_url(product_id);
        debug!(%url, "requesting upstream offer");

        let resp = self.http.get(&url).send().await.map_err(|e| self.classify(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        decode_payload(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
