//! LRCLIB lyrics lookup client.
//!
//! One GET per (track, artist) pair; the service answers with synced
//! (LRC-formatted) and/or plain lyrics, or 404 when it knows neither.

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct LyricsResponse {
    #[serde(rename = "plainLyrics")]
    pub plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    pub synced_lyrics: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LyricsClient {
    client: reqwest::Client,
    base_url: String,
}

impl LyricsClient {
    const USER_AGENT: &'static str = "standby/0.1.0 (ambient dashboard)";

    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("build lyrics http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Look up lyrics for a track. `Ok(None)` means the service has none;
    /// only transport-level failures surface as errors.
    pub async fn get(&self, track_name: &str, artist_name: &str) -> anyhow::Result<Option<LyricsResponse>> {
        let url = format!(
            "{}/get?track_name={}&artist_name={}",
            self.base_url,
            urlencoding::encode(track_name),
            urlencoding::encode(artist_name)
        );

        let response = self.client.get(&url).send().await.context("lyrics request")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!("lyrics service error: {}", response.status());
        }

        let lyrics: LyricsResponse = response.json().await.context("parse lyrics json")?;
        Ok(Some(lyrics))
    }
}
