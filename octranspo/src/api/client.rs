//! HTTP client for the live feed.
//!
//! Posts form-encoded requests to the feed endpoints, limits concurrent
//! requests with a semaphore, and hands the reply bodies to the XML layer.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{RouteNo, RouteSummary, StopNo};
use crate::error::Error;

use super::TransitApi;
use super::types::NextTripsData;
use super::xml;

/// Default base URL for the live feed.
const DEFAULT_BASE_URL: &str = "https://api.octranspo1.com/v1.2";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Application ID issued with the feed subscription
    pub app_id: String,
    /// Application key issued with the feed subscription
    pub app_key: String,
    /// Base URL for the feed (defaults to production)
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Create a new config with the given credentials.
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_key: app_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Live feed API client.
///
/// Credentials travel as form parameters on every request, the way the
/// feed expects them. Uses a semaphore to limit concurrent requests and
/// avoid rate limiting.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_key: String,
    semaphore: Arc<Semaphore>,
}

impl ApiClient {
    /// Create a new feed client with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            app_id: config.app_id,
            app_key: config.app_key,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    /// Post one feed request and return the raw reply body.
    ///
    /// The feed reads parameters in order, credentials first; `params`
    /// holds whatever comes after them.
    async fn fetch(
        &self,
        resource: &'static str,
        params: &[(&str, String)],
    ) -> Result<String, Error> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::NoReply(resource))?;

        let url = format!("{}/{}", self.base_url, resource);

        let mut form: Vec<(&str, String)> = vec![
            ("appID", self.app_id.clone()),
            ("apiKey", self.app_key.clone()),
        ];
        form.extend_from_slice(params);

        debug!(resource, "posting feed request");

        let response = self.http.post(&url).form(&form).send().await?;
        let body = response.error_for_status()?.text().await?;
        Ok(body)
    }
}

#[async_trait]
impl TransitApi for ApiClient {
    async fn get_route_summary(&self, stop: StopNo) -> Result<RouteSummary, Error> {
        let body = self
            .fetch("GetRouteSummaryForStop", &[("stopNo", stop.to_string())])
            .await?;
        xml::parse_route_summary(&body)
    }

    async fn get_next_trips(&self, stop: StopNo, route: RouteNo) -> Result<NextTripsData, Error> {
        let body = self
            .fetch(
                "GetNextTripsForStop",
                &[
                    ("stopNo", stop.to_string()),
                    ("routeNo", route.to_string()),
                ],
            )
            .await?;
        xml::parse_next_trips(&body)
    }
}
