//! API client - fetches precomputed statistics from the dashboard backend
//!
//! Endpoints:
//! - GET /api/map-data?year=..&drilldown_column=..   → map points + bar counts
//! - GET /api/heatmap-data?selected_group=..          → composition matrix
//!
//! No retries, no cancellation, no deduplication: every call goes to the wire.

use anyhow::Context;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::log_fetch;
use crate::model::{Drilldown, HeatmapDataset, HeatmapGroup, MapResponse, Year};

const MAP_DATA_PATH: &str = "api/map-data";
const HEATMAP_DATA_PATH: &str = "api/heatmap-data";
const USER_AGENT: &str = concat!("MeteoriteDashboard/", env!("CARGO_PKG_VERSION"));

/// Where the controller gets its data from
pub trait DataSource: Clone + Send + Sync + 'static {
    fn fetch_map_data(
        &self,
        year: Year,
        drilldown: Drilldown,
    ) -> impl Future<Output = Result<MapResponse, FetchError>> + Send;

    fn fetch_heatmap_data(
        &self,
        group: HeatmapGroup,
    ) -> impl Future<Output = Result<HeatmapDataset, FetchError>> + Send;
}

/// Payloads that carry invariants beyond what serde checks
trait Validate {
    fn check(&self) -> Result<(), String>;
}

impl Validate for MapResponse {
    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

impl Validate for HeatmapDataset {
    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        // Url::join drops the last path segment unless it ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = reqwest::Url::parse(&normalized)
            .with_context(|| format!("invalid API base URL '{}'", base_url))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        tracing::debug!("API client ready: base={} timeout={:?}", base_url, timeout);
        Ok(Self { http, base_url })
    }

    pub fn from_config(api: &ApiConfig) -> anyhow::Result<Self> {
        Self::new(&api.base_url, api.timeout())
    }

    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, FetchError> {
        self.base_url.join(path).map_err(|e| FetchError::Shape {
            url: format!("{}{}", self.base_url, path),
            reason: e.to_string(),
        })
    }

    /// GET `url` with `query`, then decode and validate the JSON body
    async fn get_json<T>(&self, url: reqwest::Url, query: &[(&str, &str)]) -> Result<T, FetchError>
    where
        T: DeserializeOwned + Validate,
    {
        let shown = url.to_string();
        log_fetch!(shown, query = ?query);

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| FetchError::Transport { url: shown.clone(), source })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: shown,
                status: response.status(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport { url: shown.clone(), source })?;
        tracing::debug!("Received {} bytes from {}", body.len(), shown);

        let payload: T = serde_json::from_str(&body).map_err(|source| FetchError::Json {
            url: shown.clone(),
            source,
        })?;
        payload
            .check()
            .map_err(|reason| FetchError::Shape { url: shown, reason })?;
        Ok(payload)
    }
}

impl DataSource for ApiClient {
    async fn fetch_map_data(&self, year: Year, drilldown: Drilldown) -> Result<MapResponse, FetchError> {
        let url = self.endpoint(MAP_DATA_PATH)?;
        let year = year.to_string();
        let response: MapResponse = self
            .get_json(url, &[("year", &year), ("drilldown_column", drilldown.as_str())])
            .await?;
        tracing::debug!(
            "Map data for {} by {}: {} points, {} bars",
            year,
            drilldown,
            response.map_data.len(),
            response.bar_data.categories.len()
        );
        Ok(response)
    }

    async fn fetch_heatmap_data(&self, group: HeatmapGroup) -> Result<HeatmapDataset, FetchError> {
        let url = self.endpoint(HEATMAP_DATA_PATH)?;
        let heatmap: HeatmapDataset = self.get_json(url, &[("selected_group", group.as_str())]).await?;
        tracing::debug!(
            "Heatmap for {}: {}x{} '{}'",
            group,
            heatmap.rows(),
            heatmap.columns(),
            heatmap.title
        );
        Ok(heatmap)
    }
}
