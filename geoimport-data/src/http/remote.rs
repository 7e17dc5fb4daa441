//! Remote payload fetching.

use async_trait::async_trait;
use geoimport_core::{ImportError, RemoteSource};

use super::HttpClient;

/// [`RemoteSource`] fetching payloads over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteSource {
    client: HttpClient,
}

impl HttpRemoteSource {
    /// Wrap a shared client.
    #[must_use]
    pub const fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl RemoteSource for HttpRemoteSource {
    async fn fetch_text(&self, url: &str) -> Result<String, ImportError> {
        self.client.get_text(url).await
    }
}
