//! Timeline delivery to device gateways with exponential-backoff retry.
//!
//! Every `timeline.updated` event carries the full timeline of one
//! studio. [`GatewayDelivery::run`] POSTs it to each gateway registered
//! for that studio. Gateways replace their timeline wholesale, so a failed
//! delivery is superseded by the next successful one.

use std::time::Duration;

use onair_core::ids::StudioId;
use tokio::sync::broadcast;

use crate::bus::{event_types, PlayoutEvent};

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gateway returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEndpoint {
    pub studio_id: StudioId,
    pub url: String,
}

impl GatewayEndpoint {
    /// Parse `studio=url` pairs separated by commas. Malformed entries are
    /// skipped with a warning.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match entry.split_once('=') {
                Some((studio, url)) if !studio.trim().is_empty() && !url.trim().is_empty() => {
                    Some(Self {
                        studio_id: StudioId::new(studio.trim()),
                        url: url.trim().to_string(),
                    })
                }
                _ => {
                    tracing::warn!(entry, "Ignoring malformed gateway endpoint");
                    None
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// GatewayDelivery
// ---------------------------------------------------------------------------

pub struct GatewayDelivery {
    client: reqwest::Client,
    endpoints: Vec<GatewayEndpoint>,
}

impl GatewayDelivery {
    pub fn new(endpoints: Vec<GatewayEndpoint>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints_for<'a>(&'a self, studio_id: &'a StudioId) -> impl Iterator<Item = &'a GatewayEndpoint> {
        self.endpoints.iter().filter(move |e| e.studio_id == *studio_id)
    }

    /// Forward timelines until the bus closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlayoutEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) if event.event_type == event_types::TIMELINE_UPDATED => {
                    let Some(studio_id) = event.studio_id.as_ref() else {
                        continue;
                    };
                    for endpoint in self.endpoints_for(studio_id) {
                        if let Err(e) = self.deliver(&endpoint.url, &event.payload).await {
                            tracing::error!(
                                studio_id = %studio_id,
                                url = %endpoint.url,
                                error = %e,
                                "Timeline delivery failed"
                            );
                        }
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Gateway delivery lagged, older timelines skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, gateway delivery shutting down");
                    break;
                }
            }
        }
    }

    /// POST a timeline to one gateway, retrying with backoff.
    pub async fn deliver(&self, url: &str, timeline: &serde_json::Value) -> Result<(), GatewayError> {
        let mut last_err: Option<GatewayError> = None;

        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.try_send(url, timeline).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url,
                        error = %e,
                        "Timeline delivery attempt failed, retrying"
                    );
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        match self.try_send(url, timeline).await {
            Ok(()) => Ok(()),
            Err(e) => Err(last_err.unwrap_or(e)),
        }
    }

    async fn try_send(&self, url: &str, payload: &serde_json::Value) -> Result<(), GatewayError> {
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
