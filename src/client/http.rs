//! Reqwest-based HTTP transport.
//!
//! Requests are form POSTs to `<base_url>/api/<endpoint>` carrying the access
//! token as the `token` field. Connection settings come from
//! [`TransportConfig`] once, at construction.

use crate::client::Transport;
use crate::config::TransportConfig;
use crate::KeywardenError;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::Proxy;
use tracing::debug;

/// HTTP transport for the licensing API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport from config.
    pub fn new(config: &TransportConfig) -> Result<Self, KeywardenError> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(build_user_agent(config));

        if let Some(proxy) = config.proxy {
            let proxy = Proxy::all(proxy)
                .map_err(|e| KeywardenError::ConfigError(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        if !config.keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }

        let client = builder
            .build()
            .map_err(|e| KeywardenError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL for an endpoint path.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

impl Transport for HttpTransport {
    fn send_request(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
        access_token: &str,
    ) -> Result<Vec<u8>, KeywardenError> {
        let url = self.endpoint_url(endpoint);

        let mut form: Vec<(&str, &str)> = params
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();
        form.push(("token", access_token));

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .map_err(|e| KeywardenError::Transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        debug!(endpoint, status = status.as_u16(), "licensing API response");

        if status.is_server_error() {
            return Err(KeywardenError::Transport(format!("Server unavailable: HTTP {}", status)));
        }

        let body = response
            .bytes()
            .map_err(|e| KeywardenError::Transport(format!("Failed to read body: {}", e)))?
            .to_vec();

        if !status.is_success() && body.is_empty() {
            return Err(KeywardenError::ServerError(format!("HTTP {}", status)));
        }

        Ok(body)
    }
}

/// Build a User-Agent string from config.
///
/// Format: `<product> keywarden/<version>`
pub fn build_user_agent(config: &TransportConfig) -> String {
    format!(
        "{} keywarden/{}",
        config.user_agent_product,
        env!("CARGO_PKG_VERSION")
    )
}
