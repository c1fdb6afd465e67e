use anyhow::Context;
use std::ops::Deref;
use std::time::Duration;

use crate::fetcher::Fetcher;

/// A wrapper for re-using the reqwest client. Requests carry no custom headers and redirects
/// follow the reqwest defaults.
#[derive(Debug, Clone, Default)]
pub struct HttpClient(reqwest::Client);

impl Deref for HttpClient {
    type Target = reqwest::Client;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl HttpClient {
    /// Client without any request timeout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .with_context(|| "fail to build http client")?;
        Ok(Self(client))
    }

    /// Make a GET request to the given URL and return the body as text, whatever the response
    /// status is.
    ///
    /// # Error
    /// Return error if:
    ///     * The URL can't be parsed
    ///     * Fail to send HTTP request
    ///     * Fail to read the response body
    pub async fn get_text(&self, url: &str) -> anyhow::Result<String> {
        let response = self
            .get(url)
            .send()
            .await
            .with_context(|| format!("fail to send GET request to url: `{url}`"))?;

        tracing::debug!("GET {url} -> {}", response.status());

        response
            .text()
            .await
            .with_context(|| format!("fail to read response body from url: `{url}`"))
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpClient {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        self.get_text(url).await
    }
}
