use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use util::config::PlagiarismConfig;

use super::ReportingClient;
use super::types::{ApiRequest, Envelope, Method, RequestBody, TimeoutClass};
use crate::error::ClientError;

pub const INTEGRATION_NAME_HEADER: &str = "X-Integration-Name";
pub const INTEGRATION_VERSION_HEADER: &str = "X-Integration-Version";

/// reqwest-backed transport.
pub struct HttpReportingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    integration_name: String,
    integration_version: String,
    short_timeout: Duration,
    long_timeout: Duration,
}

impl HttpReportingClient {
    pub fn new(config: &PlagiarismConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("plagiarism-engine/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.timeouts.short)
            .build()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            integration_name: config.integration_name.clone(),
            integration_version: config.integration_version.clone(),
            short_timeout: config.timeouts.short,
            long_timeout: config.timeouts.long,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

#[async_trait]
impl ReportingClient for HttpReportingClient {
    async fn send(&self, request: ApiRequest) -> Result<Envelope, ClientError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let timeout = match request.timeout {
            TimeoutClass::Short => self.short_timeout,
            TimeoutClass::Long => self.long_timeout,
        };

        let mut builder = self
            .http
            .request(method, self.url(&request.endpoint))
            .timeout(timeout)
            .bearer_auth(&self.api_key)
            .header(INTEGRATION_NAME_HEADER, &self.integration_name)
            .header(INTEGRATION_VERSION_HEADER, &self.integration_version);

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Binary { bytes, filename } => builder
                .header(CONTENT_TYPE, "binary/octet-stream")
                .header(
                    CONTENT_DISPOSITION,
                    format!("inline; filename=\"{}\"", header_safe(&filename)),
                )
                .body(bytes),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        tracing::debug!(
            endpoint = %request.endpoint,
            status,
            "similarity service responded"
        );

        Ok(Envelope::new(status, decode_body(&bytes)))
    }
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Header values must be visible ASCII; quotes would end the parameter early.
fn header_safe(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
