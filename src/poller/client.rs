//! Backend REST Client
//!
//! HTTP client for the aggregation backend: polls `/all_data` and sends
//! camera updates to `/update_count`.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use super::sample::{CameraReading, CameraSnapshot};
use crate::config::BackendConfig;

/// Something that can produce the latest per-camera readings
#[async_trait]
pub trait CrowdSource: Send + Sync {
    async fn fetch(&self) -> Result<CameraSnapshot, PollError>;
}

/// Aggregation backend client
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new client with the given configuration
    pub fn new(config: &BackendConfig) -> Result<Self, PollError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the backend is available
    pub async fn health_check(&self) -> Result<(), PollError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await.map_err(classify)?;
        ensure_success(response).await.map(|_| ())
    }

    /// Fetch the latest reading of every camera
    pub async fn all_data(&self) -> Result<CameraSnapshot, PollError> {
        let url = format!("{}/all_data", self.base_url);
        let response = self.client.get(&url).send().await.map_err(classify)?;
        let response = ensure_success(response).await?;

        // Map keeps insertion order with serde_json's preserve_order
        let body: Map<String, Value> = response
            .json()
            .await
            .map_err(|e| PollError::Decode(e.to_string()))?;

        Ok(decode_snapshot(body))
    }

    /// Report one camera's current count
    pub async fn report(&self, camera_id: &str, reading: &CameraReading) -> Result<(), PollError> {
        let url = format!("{}/update_count", self.base_url);

        let body = UpdateCountRequest {
            camera_id,
            latitude: reading.latitude,
            longitude: reading.longitude,
            people_count: reading.people_count,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        ensure_success(response).await.map(|_| ())
    }
}

#[async_trait]
impl CrowdSource for BackendClient {
    async fn fetch(&self) -> Result<CameraSnapshot, PollError> {
        self.all_data().await
    }
}

/// Malformed camera entries are skipped; the rest of the poll still counts
fn decode_snapshot(body: Map<String, Value>) -> CameraSnapshot {
    body.into_iter()
        .filter_map(
            |(camera_id, value)| match serde_json::from_value::<CameraReading>(value) {
                Ok(reading) => Some((camera_id, reading)),
                Err(e) => {
                    tracing::warn!(camera = %camera_id, "Skipping camera reading: {}", e);
                    None
                }
            },
        )
        .collect()
}

fn classify(e: reqwest::Error) -> PollError {
    if e.is_timeout() {
        PollError::Timeout
    } else if e.is_connect() {
        PollError::Unavailable
    } else {
        PollError::Request(e)
    }
}

async fn ensure_success(response: Response) -> Result<Response, PollError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(PollError::Api {
            status: status.as_u16(),
            message: text,
        })
    }
}

#[derive(Debug, Serialize)]
struct UpdateCountRequest<'a> {
    camera_id: &'a str,
    latitude: f64,
    longitude: f64,
    people_count: u32,
}

/// Errors that can occur when talking to the backend
#[derive(Error, Debug)]
pub enum PollError {
    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid backend response: {0}")]
    Decode(String),
}
