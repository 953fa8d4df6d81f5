//! # corebus-router — HTTP client for the enhanced-mode remote router
//!
//! The router itself is an external collaborator (§4.7, §6.3 of the
//! design docs) — this crate only implements the four operations the
//! core invokes against it: `health_check`, `register_worker`, `route`,
//! and `subscribe`/`unsubscribe`. Modeled on `r2e-security::jwks::JwksCache`'s
//! `reqwest::Client` + typed-error shape and on `example-microservice`'s
//! `ProductClient` (`base_url` + per-call error mapping).

pub mod error;

pub use error::RouterError;

use async_trait::async_trait;
use corebus_core::EventEnvelope;
use corebus_events::EventRouter;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the enhanced-mode worker/router service.
#[derive(Clone)]
pub struct RouterClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct RegisterWorkerBody<'a> {
    namespace: &'a str,
    capabilities: &'a [String],
}

#[derive(Deserialize)]
struct RouteResponse {
    #[serde(rename = "routedQueues")]
    routed_queues: Vec<String>,
}

#[derive(Serialize)]
struct SubscribeBody<'a> {
    #[serde(rename = "eventTypes")]
    event_types: &'a [String],
}

impl RouterClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    /// `GET /health`, 5 s timeout. Any non-2xx, timeout, or transport
    /// error is reported as unavailable rather than propagated — this is
    /// the probe `auto_detect_workers` uses to decide standalone vs.
    /// enhanced mode, and a slow/unreachable router must never block
    /// `connect()`.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).timeout(HEALTH_CHECK_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                tracing::warn!(url, error = %err, "router health check failed");
                false
            }
        }
    }

    /// `POST /api/v1/workers/{id}/register`. A non-2xx response is fatal
    /// — the caller is choosing enhanced mode and cannot silently fall
    /// back mid-connect.
    pub async fn register_worker(&self, worker_id: &str, namespace: &str, capabilities: &[String]) -> Result<(), RouterError> {
        let url = format!("{}/api/v1/workers/{worker_id}/register", self.base_url);
        let body = RegisterWorkerBody { namespace, capabilities };
        let resp = self.client.post(&url).json(&body).send().await?;
        ensure_success(resp).await.map(|_| ())
    }

    /// `POST /api/v1/events/route`. Returns the number of destination
    /// queues the router fanned the envelope out to — the enhanced-mode
    /// analogue of a `messageId` (§9 open question 3).
    pub async fn route(&self, envelope: &EventEnvelope) -> Result<usize, RouterError> {
        let url = format!("{}/api/v1/events/route", self.base_url);
        let resp = self.client.post(&url).json(envelope).send().await?;
        let body = ensure_success(resp).await?;
        let parsed: RouteResponse = serde_json::from_str(&body).map_err(|_| RouterError::Status { status: 200, body: body.clone() })?;
        Ok(parsed.routed_queues.len())
    }

    /// `POST /api/v1/workers/{id}/subscribe`, best-effort: failures are
    /// logged by the caller, never propagated (§4.6 "best-effort; failure
    /// is logged, not propagated").
    pub async fn subscribe(&self, worker_id: &str, event_types: &[String]) -> Result<(), RouterError> {
        let url = format!("{}/api/v1/workers/{worker_id}/subscribe", self.base_url);
        let body = SubscribeBody { event_types };
        let resp = self.client.post(&url).json(&body).send().await?;
        ensure_success(resp).await.map(|_| ())
    }

    pub async fn unsubscribe(&self, worker_id: &str, event_types: &[String]) -> Result<(), RouterError> {
        let url = format!("{}/api/v1/workers/{worker_id}/unsubscribe", self.base_url);
        let body = SubscribeBody { event_types };
        let resp = self.client.post(&url).json(&body).send().await?;
        ensure_success(resp).await.map(|_| ())
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<String, RouterError> {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if status.is_success() {
        Ok(body)
    } else {
        Err(RouterError::Status { status: status.as_u16(), body })
    }
}

/// Adapts [`RouterClient`] to the `corebus-events::emit` path's narrow
/// [`EventRouter`] seam, collapsing the richer `RouterError` to a
/// `String` the way `EmitError::Router(String)` expects.
#[async_trait]
impl EventRouter for RouterClient {
    async fn route(&self, envelope: &EventEnvelope) -> Result<usize, String> {
        RouterClient::route(self, envelope).await.map_err(|err| err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_check_against_unreachable_host_is_false() {
        let client = RouterClient::new("http://127.0.0.1:1");
        assert!(!client.health_check().await);
    }
}
