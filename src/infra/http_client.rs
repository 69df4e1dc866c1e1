use crate::app::ports::{HttpClientPort, HttpGetResult};
use crate::common::error::{Result, ScraperError};
use crate::config::HttpConfig;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl Default for ReqwestHttp {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestHttp {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client with the configured connect bound. The overall per-run bound is the
    /// orchestrator's extraction timeout.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(|e| ScraperError::Config(format!("could not build HTTP client: {e}")))?;
        Ok(Self::with_client(client))
    }
}

#[async_trait]
impl HttpClientPort for ReqwestHttp {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> std::result::Result<HttpGetResult, String> {
        tracing::info!("HTTP GET request to: {}", url);
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let resp = request.send().await.map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = resp.bytes().await.map_err(|e| e.to_string())?;
        tracing::info!("HTTP response: status={}, size={} bytes", status, bytes.len());
        let body = String::from_utf8_lossy(&bytes).to_string();
        Ok(HttpGetResult {
            status,
            body,
            content_type,
        })
    }
}
