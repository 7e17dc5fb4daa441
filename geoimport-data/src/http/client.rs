//! Shared reqwest client and its configuration.

use std::time::Duration;

use geoimport_core::ImportError;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Error type for [`HttpClient`] construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Default user agent for outgoing requests.
pub const DEFAULT_USER_AGENT: &str = "geoimport/0.1";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpClientConfig {
    /// Create a configuration with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Cloneable reqwest client shared by the HTTP adapters.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new() -> Result<Self, ProviderBuildError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, ProviderBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        Ok(Self { client, config })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, ImportError> {
        debug!("GET {url}");
        self.client
            .get(url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))
    }

    /// Fetch `url` and return the body as text.
    ///
    /// # Errors
    ///
    /// Returns network, timeout or HTTP status errors.
    pub async fn get_text(&self, url: &str) -> Result<String, ImportError> {
        self.send(url)
            .await?
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))
    }

    /// Fetch `url` and decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns transport errors as [`HttpClient::get_text`] does, and a
    /// network error naming the URL when the body is not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ImportError> {
        let text = self.get_text(url).await?;
        serde_json::from_str(&text).map_err(|err| ImportError::Network {
            url: url.to_owned(),
            message: format!("unexpected response: {err}"),
        })
    }

    /// Convert a reqwest error to an [`ImportError`].
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> ImportError {
        if error.is_timeout() {
            return ImportError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return ImportError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        ImportError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn config_builder_pattern() {
        let config = HttpClientConfig::new()
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("test-agent/1.0");

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }

    #[rstest]
    fn defaults() {
        let client = HttpClient::new().expect("client should build");
        assert_eq!(client.config().user_agent, DEFAULT_USER_AGENT);
        assert_eq!(
            client.config().timeout,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[rstest]
    fn unreachable_host_is_a_network_error() {
        let client = HttpClient::with_config(
            HttpClientConfig::new().with_timeout(Duration::from_secs(2)),
        )
        .expect("client should build");
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        // Port 9 on localhost is discard; nothing listens there in CI.
        let err = rt
            .block_on(client.get_text("http://127.0.0.1:9/data.geojson"))
            .expect_err("should fail");
        assert!(
            matches!(err, ImportError::Network { .. } | ImportError::Timeout { .. }),
            "unexpected {err:?}"
        );
    }
}
