use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::frost::models::{
    Collection, Datastream, IotId, Location, ObservationRecord, Thing, odata_escape,
};

/// Client for a SensorThings API v1.1 server (FROST).
///
/// At most `concurrency` requests are in flight at once, however many
/// batches are running.
pub struct FrostClient {
    http_client: Client,
    base_url: String,
    max_pages: usize,
    concurrency: usize,
    permits: Semaphore,
}

impl FrostClient {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.frost_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        let concurrency = config.frost_concurrency.max(1);
        Ok(Self {
            http_client,
            base_url: config.frost_base_url.trim_end_matches('/').to_string(),
            max_pages: config.frost_max_pages.max(1),
            concurrency,
            permits: Semaphore::new(concurrency),
        })
    }

    /// Batch width for fan-out over many entities.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    async fn permit(&self) -> AppResult<SemaphorePermit<'_>> {
        self.permits
            .acquire()
            .await
            .map_err(|e| AppError::Internal(format!("Request limiter closed: {e}")))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(response: Response) -> AppResult<Response> {
        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }
        Ok(response)
    }

    async fn get_entity<T: DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        let _permit = self.permit().await?;
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Request failed: {e}")))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse response: {e}")))
    }

    /// Fetch a collection, following `@iot.nextLink` until `limit` items are
    /// collected, the server runs out, or the page cap is reached.
    async fn get_collection<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        limit: Option<usize>,
    ) -> AppResult<Vec<T>> {
        let mut items: Vec<T> = Vec::new();

        let mut page: Collection<T> = {
            let _permit = self.permit().await?;
            let first = self
                .http_client
                .get(url)
                .query(query)
                .send()
                .await
                .map_err(|e| AppError::Upstream(format!("Request failed: {e}")))?;

            Self::check(first)
                .await?
                .json()
                .await
                .map_err(|e| AppError::Upstream(format!("Failed to parse response: {e}")))?
        };

        let mut pages = 1;
        loop {
            items.extend(page.value);

            if let Some(limit) = limit
                && items.len() >= limit
            {
                items.truncate(limit);
                break;
            }

            let Some(next) = page.next_link else {
                break;
            };

            if pages >= self.max_pages {
                tracing::warn!(
                    url = %url,
                    pages,
                    items = items.len(),
                    "Page cap reached, returning partial collection"
                );
                break;
            }

            page = self.get_entity(&next).await?;
            pages += 1;
        }

        Ok(items)
    }

    /// All things registered on the server.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the request fails or returns an error status.
    pub async fn get_things(&self) -> AppResult<Vec<Thing>> {
        let url = format!("{}/Things", self.base_url);
        self.get_collection(&url, &[], None).await
    }

    /// Things whose name equals `name` exactly.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the request fails or returns an error status.
    pub async fn find_things_by_name(&self, name: &str) -> AppResult<Vec<Thing>> {
        let url = format!("{}/Things", self.base_url);
        let filter = format!("name eq '{}'", odata_escape(name));
        self.get_collection(&url, &[("$filter", filter)], None).await
    }

    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the request fails or returns an error status.
    pub async fn get_locations(&self, thing_id: &IotId) -> AppResult<Vec<Location>> {
        let url = format!(
            "{}/Things({})/Locations",
            self.base_url,
            thing_id.path_segment()
        );
        self.get_collection(&url, &[], None).await
    }

    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the request fails or returns an error status.
    pub async fn get_datastreams(&self, thing_id: &IotId) -> AppResult<Vec<Datastream>> {
        let url = format!(
            "{}/Things({})/Datastreams",
            self.base_url,
            thing_id.path_segment()
        );
        self.get_collection(&url, &[], None).await
    }

    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the request fails or returns an error status.
    pub async fn get_datastream(&self, datastream_id: &IotId) -> AppResult<Datastream> {
        let url = format!(
            "{}/Datastreams({})",
            self.base_url,
            datastream_id.path_segment()
        );
        self.get_entity(&url).await
    }

    /// The newest `limit` observations of a datastream, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the request fails or returns an error status.
    pub async fn get_observations(
        &self,
        datastream_id: &IotId,
        limit: usize,
    ) -> AppResult<Vec<ObservationRecord>> {
        let url = format!(
            "{}/Datastreams({})/Observations",
            self.base_url,
            datastream_id.path_segment()
        );
        let query = [
            ("$top", limit.to_string()),
            ("$orderby", "phenomenonTime desc".to_string()),
            ("$select", "@iot.id,phenomenonTime,result".to_string()),
        ];
        self.get_collection(&url, &query, Some(limit)).await
    }

    /// The single most recent observation, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the request fails or returns an error status.
    pub async fn get_latest_observation(
        &self,
        datastream_id: &IotId,
    ) -> AppResult<Option<ObservationRecord>> {
        Ok(self
            .get_observations(datastream_id, 1)
            .await?
            .into_iter()
            .next())
    }
}
