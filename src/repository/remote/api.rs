//! HTTP access to the remote track catalogue.

use std::time::Duration;

use {
    reqwest::{Client, RequestBuilder},
    serde::de::DeserializeOwned,
    serde_json::{Value, from_str},
    tracing::{debug, warn},
};

use crate::{
    error::DataFetchError,
    repository::remote::models::{ChartResponse, TracksData},
};

/// Low-level catalogue client.
#[derive(Debug, Clone)]
pub struct TrackApi {
    client: Client,
    base_url: String,
}

impl TrackApi {
    /// Creates a client for the catalogue rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `DataFetchError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DataFetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tuneline/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET chart`.
    ///
    /// # Errors
    ///
    /// Returns `DataFetchError` on transport, status or parse failures.
    pub async fn chart(&self) -> Result<TracksData, DataFetchError> {
        let url = format!("{}/chart", self.base_url);
        let chart: ChartResponse = self.fetch(self.client.get(&url), &url).await?;
        Ok(chart.tracks)
    }

    /// `GET search?q=<query>`.
    ///
    /// # Errors
    ///
    /// Returns `DataFetchError` on transport, status or parse failures.
    pub async fn search(&self, query: &str) -> Result<TracksData, DataFetchError> {
        let url = format!("{}/search", self.base_url);
        let request = self.client.get(&url).query(&[("q", query)]);
        self.fetch(request, &url).await
    }

    /// `GET <next>` for an opaque continuation URL.
    ///
    /// # Errors
    ///
    /// Returns `DataFetchError` on transport, status or parse failures.
    pub async fn page(&self, next_url: &str) -> Result<TracksData, DataFetchError> {
        self.fetch(self.client.get(next_url), next_url).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<T, DataFetchError> {
        debug!("GET {}", url);

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Catalogue error ({}): {}", status, body);
            return Err(DataFetchError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;

        // The catalogue reports some failures as `{"error": {...}}` with a 200 status.
        if let Ok(json) = from_str::<Value>(&text)
            && let Some(error) = json.get("error")
        {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown catalogue error");
            warn!("Catalogue error: {}", message);
            return Err(DataFetchError::unavailable(message));
        }

        from_str(&text).map_err(|e| {
            warn!("Failed to parse catalogue response: {}", e);
            DataFetchError::Parse(e)
        })
    }
}
