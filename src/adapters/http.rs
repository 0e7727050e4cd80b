use crate::adapters::wire::truncate;
use crate::domain::ports::{HttpMethod, HttpRequest, Transport};
use crate::utils::error::{Result, TrackingError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

const USER_AGENT: &str = concat!("packagetrack/", env!("CARGO_PKG_VERSION"));

/// `reqwest`-backed transport. The client is built on first use and shared
/// for the rest of the process.
#[derive(Debug, Default)]
pub struct HttpTransport {
    client: OnceLock<Client>,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: OnceLock::new(),
            timeout: Some(timeout),
        }
    }

    fn client(&self) -> Result<&Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TrackingError::network(format!("HTTP client setup failed: {}", e)))?;
        Ok(self.client.get_or_init(|| client))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<String> {
        let client = self.client()?;

        let mut builder = match request.method {
            HttpMethod::Get => client.get(&request.url),
            HttpMethod::Post => client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        tracing::debug!("Sending {:?} request to: {}", request.method, request.url);
        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!("Carrier response status: {}", status);

        let body = response.text().await?;
        if !status.is_success() {
            return Err(TrackingError::api(format!(
                "HTTP {}: {}",
                status,
                truncate(&body, 200)
            )));
        }
        Ok(body)
    }
}
