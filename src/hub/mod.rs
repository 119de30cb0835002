//! REST client for the home-automation hub.
//!
//! The hub exposes entity state at `GET /api/states/{entity_id}` and accepts
//! commands at `POST /api/services/{domain}/{service}`, both behind a bearer
//! token. Responses are not interpreted here: callers get an opaque
//! [`EntitySnapshot`] and decide what to do with missing fields.

pub mod models;

use anyhow::Context;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use std::sync::Arc;

pub use models::{BrowseNode, EntitySnapshot};

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    base: String,
}

#[derive(Debug, Clone)]
pub struct HubClient {
    inner: Arc<Inner>,
}

impl HubClient {
    /// `host` may be a bare `host:port` or a full `http(s)://` origin.
    pub fn new(host: &str, token: &str) -> anyhow::Result<Self> {
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("http://{host}")
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).context("auth token header")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("build reqwest client")?;

        Ok(Self {
            inner: Arc::new(Inner { http, base }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base
    }

    /// Resolve a possibly hub-relative artwork/thumbnail path to a full URL.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{path}", self.inner.base)
        }
    }

    /// Fetch one entity's latest snapshot.
    pub async fn get_state(&self, entity_id: &str) -> anyhow::Result<EntitySnapshot> {
        let url = format!("{}/api/states/{entity_id}", self.inner.base);
        let snapshot = self
            .inner
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetch state of {entity_id}"))?
            .error_for_status()
            .with_context(|| format!("state http status for {entity_id}"))?
            .json()
            .await
            .with_context(|| format!("parse state json for {entity_id}"))?;
        Ok(snapshot)
    }

    /// Issue a service call; the response body is ignored.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        body: Value,
    ) -> anyhow::Result<()> {
        let url = format!("{}/api/services/{domain}/{service}", self.inner.base);
        self.inner
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("call {domain}.{service}"))?
            .error_for_status()
            .with_context(|| format!("{domain}.{service} http status"))?;
        Ok(())
    }

    pub async fn media_play_pause(&self, entity_id: &str) -> anyhow::Result<()> {
        self.call_service("media_player", "media_play_pause", json!({ "entity_id": entity_id }))
            .await
    }

    pub async fn media_next_track(&self, entity_id: &str) -> anyhow::Result<()> {
        self.call_service("media_player", "media_next_track", json!({ "entity_id": entity_id }))
            .await
    }

    pub async fn media_previous_track(&self, entity_id: &str) -> anyhow::Result<()> {
        self.call_service("media_player", "media_previous_track", json!({ "entity_id": entity_id }))
            .await
    }

    /// `level` is 0.0..=1.0, matching the hub's `volume_level` attribute.
    pub async fn set_volume(&self, entity_id: &str, level: f64) -> anyhow::Result<()> {
        self.call_service(
            "media_player",
            "volume_set",
            json!({ "entity_id": entity_id, "volume_level": level.clamp(0.0, 1.0) }),
        )
        .await
    }

    pub async fn set_shuffle(&self, entity_id: &str, shuffle: bool) -> anyhow::Result<()> {
        self.call_service(
            "media_player",
            "shuffle_set",
            json!({ "entity_id": entity_id, "shuffle": shuffle }),
        )
        .await
    }

    pub async fn play_media(
        &self,
        entity_id: &str,
        content_id: &str,
        content_type: &str,
    ) -> anyhow::Result<()> {
        self.call_service(
            "media_player",
            "play_media",
            json!({
                "entity_id": entity_id,
                "media_content_id": content_id,
                "media_content_type": content_type,
            }),
        )
        .await
    }

    /// Generic `{domain}.turn_on` trigger for scenes/scripts/automations.
    pub async fn turn_on(&self, entity_id: &str) -> anyhow::Result<()> {
        let domain = entity_id.split('.').next().unwrap_or(entity_id);
        self.call_service(domain, "turn_on", json!({ "entity_id": entity_id }))
            .await
    }

    /// Browse the media tree of `entity_id`. `content` is `(id, type)` of the
    /// node to expand; `None` browses the favorites root.
    pub async fn browse_media(
        &self,
        entity_id: &str,
        content: Option<(&str, &str)>,
    ) -> anyhow::Result<BrowseNode> {
        let url = format!(
            "{}/api/services/media_player/browse_media?return_response",
            self.inner.base
        );
        let mut body = json!({ "entity_id": entity_id });
        if let Some((id, kind)) = content {
            body["media_content_id"] = json!(id);
            body["media_content_type"] = json!(kind);
        }

        let v: Value = self
            .inner
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("browse_media request")?
            .error_for_status()
            .context("browse_media http status")?
            .json()
            .await
            .context("parse browse_media json")?;

        // The service response is keyed by entity id; there is exactly one.
        let node = v
            .get("service_response")
            .and_then(|r| r.as_object())
            .and_then(|m| m.values().next())
            .cloned()
            .context("browse_media response missing service_response")?;
        serde_json::from_value(node).context("parse browse node")
    }

    /// Fetch raw bytes (artwork thumbnails) with the hub's auth headers.
    pub async fn fetch_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let resp = self
            .inner
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("fetch {url}"))?;
        if resp.status() == StatusCode::NOT_FOUND {
            anyhow::bail!("not found: {url}");
        }
        let bytes = resp
            .error_for_status()
            .context("bytes http status")?
            .bytes()
            .await
            .context("read bytes")?;
        Ok(bytes.to_vec())
    }
}
