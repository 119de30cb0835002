//! The scheduler.
//!
//! One `tokio::select!` loop drives every periodic task: the 1s clock, the
//! 5s media poll, the 300s weather poll, the 600s catalog refresh, and the
//! 100ms lyrics tick. Network work is spawned and reports back over an mpsc
//! channel as [`NetworkEvent`]s, so a slow or failed request never stalls a
//! tick; each task absorbs its own failures. The only shared mutable state
//! is [`AppState`], owned by the loop.

pub mod events;
pub mod state;

use crate::config::Config;
use crate::lyrics::{self, LinePair, LyricsClient};
use crate::media::{self, NowPlaying, position};
use crate::playlists::{self, color};
use crate::settings::Settings;
use crate::hub::HubClient;
use crate::weather;
use events::NetworkEvent;
use state::AppState;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

const CLOCK_PERIOD: Duration = Duration::from_secs(1);
const MEDIA_PERIOD: Duration = Duration::from_secs(5);
const WEATHER_PERIOD: Duration = Duration::from_secs(300);
const CATALOG_PERIOD: Duration = Duration::from_secs(600);
const LYRICS_TICK: Duration = Duration::from_millis(100);

pub struct App {
    cfg: Config,
    settings: Settings,
    hub: HubClient,
    lyrics: LyricsClient,
    state: AppState,
}

impl App {
    pub fn new(cfg: Config, settings: Settings) -> anyhow::Result<Self> {
        let hub = HubClient::new(&cfg.hub.host, &cfg.hub.token)?;
        let lyrics = LyricsClient::new(&cfg.lyrics.base_url)?;
        Ok(Self {
            cfg,
            settings,
            hub,
            lyrics,
            state: AppState::new(),
        })
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<NetworkEvent>(256);

        let mut clock = interval(CLOCK_PERIOD);
        let mut media = interval(MEDIA_PERIOD);
        let mut weather_poll = interval(WEATHER_PERIOD);
        let mut catalog = interval(CATALOG_PERIOD);
        let mut lyric = interval(LYRICS_TICK);
        lyric.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(hub = %self.hub.base_url(), "dashboard loop started");

        loop {
            tokio::select! {
                _ = clock.tick() => {
                    let now = format_clock(local_now());
                    if now != self.state.clock {
                        debug!(clock = %now, "minute rolled");
                        self.state.clock = now;
                    }
                }
                _ = media.tick() => self.spawn_media_poll(&tx),
                _ = weather_poll.tick() => self.spawn_weather_poll(&tx),
                _ = catalog.tick() => self.spawn_catalog_refresh(&tx),
                _ = lyric.tick() => self.lyrics_tick(),
                Some(ev) = rx.recv() => self.handle_event(ev, &tx),
                _ = tokio::signal::ctrl_c() => {
                    info!("shutting down");
                    return Ok(());
                }
            }
        }
    }

    fn spawn_media_poll(&mut self, tx: &mpsc::Sender<NetworkEvent>) {
        if self.state.media_inflight {
            return;
        }
        self.state.media_inflight = true;

        let hub = self.hub.clone();
        let speaker_id = self.cfg.entities.speaker.clone();
        let tv_id = self.cfg.entities.tv.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            // Both entities in parallel; a failure on either just means that
            // entity is absent this cycle.
            let (speaker, tv) = tokio::join!(hub.get_state(&speaker_id), hub.get_state(&tv_id));
            let speaker = speaker
                .map_err(|e| debug!("speaker poll: {e:#}"))
                .ok();
            let tv = tv.map_err(|e| debug!("tv poll: {e:#}")).ok();
            let _ = tx.send(NetworkEvent::MediaStates { speaker, tv }).await;
        });
    }

    fn spawn_weather_poll(&mut self, tx: &mpsc::Sender<NetworkEvent>) {
        if self.state.weather_inflight {
            return;
        }
        self.state.weather_inflight = true;

        let hub = self.hub.clone();
        let entity = self.cfg.entities.weather.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let snapshot = match hub.get_state(&entity).await {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!("weather poll failed: {e:#}");
                    None
                }
            };
            let _ = tx.send(NetworkEvent::WeatherState { snapshot }).await;
        });
    }

    fn spawn_catalog_refresh(&mut self, tx: &mpsc::Sender<NetworkEvent>) {
        if self.state.catalog_inflight {
            return;
        }
        self.state.catalog_inflight = true;

        let hub = self.hub.clone();
        let entity = self.cfg.entities.speaker.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let ev = match playlists::fetch_catalog(&hub, &entity).await {
                Ok(entries) => NetworkEvent::CatalogLoaded { entries },
                Err(e) => {
                    warn!("catalog refresh failed: {e:#}");
                    NetworkEvent::CatalogFailed
                }
            };
            let _ = tx.send(ev).await;
        });
    }

    fn handle_event(&mut self, ev: NetworkEvent, tx: &mpsc::Sender<NetworkEvent>) {
        match ev {
            NetworkEvent::MediaStates { speaker, tv } => {
                self.state.media_inflight = false;
                self.state.speaker = speaker;
                self.state.tv = tv;
                self.apply_media(tx);
            }
            NetworkEvent::WeatherState { snapshot } => {
                self.state.weather_inflight = false;
                // A failed poll keeps the previous derivation on screen.
                if let Some(snap) = snapshot {
                    let view = weather::derive(&snap, local_now());
                    if self.state.weather.as_ref() != Some(&view) {
                        info!(label = %view.label, "weather updated");
                    }
                    self.state.weather = Some(view);
                }
            }
            NetworkEvent::LyricsLoaded { song_key, lines } => {
                // Drop responses for songs that are no longer current.
                if self.state.lyrics_requested.as_deref() == Some(song_key.as_str()) {
                    info!(lines = lines.len(), "synced lyrics loaded");
                    self.state.sync.activate(lines);
                }
            }
            NetworkEvent::LyricsUnavailable { song_key } => {
                if self.state.lyrics_requested.as_deref() == Some(song_key.as_str()) {
                    // Explicit no-lyrics state; the requested key stays so the
                    // same song is not retried.
                    self.state.sync.reset();
                    self.state.lines = LinePair::default();
                }
            }
            NetworkEvent::CatalogLoaded { entries } => {
                self.state.catalog_inflight = false;
                info!(count = entries.len(), "playlist catalog refreshed");
                self.state.catalog = entries;
                self.state.catalog_loaded = true;
                self.spawn_catalog_colors(tx);
                let signal = self
                    .state
                    .now_playing
                    .as_ref()
                    .map(|np| np.playlist.clone())
                    .unwrap_or_default();
                self.match_catalog(&signal);
            }
            NetworkEvent::CatalogFailed => {
                self.state.catalog_inflight = false;
            }
            NetworkEvent::ColorResolved { key, color } => {
                // First successful resolution wins for the whole session.
                self.state.colors.entry(key).or_insert(color);
            }
        }
    }

    /// Re-derive the now-playing view model from the latest snapshots and
    /// run the song-change / artwork-change / catalog-match side effects.
    fn apply_media(&mut self, tx: &mpsc::Sender<NetworkEvent>) {
        let np = media::reconcile(self.state.speaker.as_ref(), self.state.tv.as_ref());

        match &np {
            None => {
                if self.state.now_playing.is_some() {
                    info!("both media entities absent, rendering offline");
                }
                self.teardown_lyrics();
                self.state.last_artwork = None;
                self.state.now_playing_entry = None;
            }
            Some(np) => {
                if self.state.now_playing.as_ref() != Some(np) {
                    info!(
                        title = %np.title,
                        artist = %np.artist,
                        state = %np.state,
                        source = ?np.source,
                        "now playing",
                    );
                }
                self.sync_lyrics(np, tx);
                self.track_artwork(np, tx);
                let signal = np.playlist.clone();
                self.match_catalog(&signal);
            }
        }

        self.state.now_playing = np;
    }

    /// Issue a lyrics fetch when the song key changes; tear the session down
    /// when lyrics are disabled or the media stopped. An unchanged key is a
    /// no-op, which also covers the no-retry rule for songs without lyrics.
    fn sync_lyrics(&mut self, np: &NowPlaying, tx: &mpsc::Sender<NetworkEvent>) {
        if !self.settings.show_lyrics || !np.is_active() {
            self.teardown_lyrics();
            return;
        }
        let Some(key) = np.song_key() else {
            self.teardown_lyrics();
            return;
        };
        if self.state.lyrics_requested.as_deref() == Some(key.as_str()) {
            return;
        }

        self.state.lyrics_requested = Some(key.clone());
        self.state.sync.reset();
        self.state.lines = LinePair::default();

        let client = self.lyrics.clone();
        let title = np.title.clone();
        let artist = np.artist.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let ev = match lyrics::fetch_synced(&client, &title, &artist).await {
                Ok(Some(lines)) => NetworkEvent::LyricsLoaded { song_key: key, lines },
                Ok(None) => NetworkEvent::LyricsUnavailable { song_key: key },
                Err(e) => {
                    warn!("lyrics fetch failed: {e:#}");
                    NetworkEvent::LyricsUnavailable { song_key: key }
                }
            };
            let _ = tx.send(ev).await;
        });
    }

    fn teardown_lyrics(&mut self) {
        self.state.sync.reset();
        self.state.lyrics_requested = None;
        self.state.lines = LinePair::default();
    }

    /// Kick off color resolution when the artwork URL actually changed;
    /// an unchanged URL never re-runs image analysis.
    fn track_artwork(&mut self, np: &NowPlaying, tx: &mpsc::Sender<NetworkEvent>) {
        if np.artwork == self.state.last_artwork {
            return;
        }
        self.state.last_artwork = np.artwork.clone();

        let Some(url) = np.artwork.clone() else { return };
        if self.state.colors.contains_key(&url) {
            return;
        }
        self.spawn_color(url.clone(), Some(url), np.title.clone(), tx);
    }

    fn spawn_catalog_colors(&mut self, tx: &mpsc::Sender<NetworkEvent>) {
        let pending: Vec<(String, Option<String>, String)> = self
            .state
            .catalog
            .iter()
            .filter_map(|entry| {
                let key = color::cache_key(entry);
                if self.state.colors.contains_key(&key) {
                    None
                } else {
                    Some((key, entry.thumbnail.clone(), entry.title.clone()))
                }
            })
            .collect();
        for (key, thumbnail, title) in pending {
            self.spawn_color(key, thumbnail, title, tx);
        }
    }

    fn spawn_color(
        &self,
        key: String,
        thumbnail: Option<String>,
        title: String,
        tx: &mpsc::Sender<NetworkEvent>,
    ) {
        let hub = self.hub.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let color = color::resolve(&hub, thumbnail.as_deref(), &title).await;
            let _ = tx.send(NetworkEvent::ColorResolved { key, color }).await;
        });
    }

    /// Flag and front-load the catalog entry matching the current playlist.
    fn match_catalog(&mut self, signal: &str) {
        if !self.state.catalog_loaded {
            return;
        }
        match playlists::find_now_playing(&self.state.catalog, signal) {
            Some(index) => {
                playlists::promote(&mut self.state.catalog, index);
                let id = self.state.catalog[0].id.clone();
                if self.state.now_playing_entry.as_deref() != Some(id.as_str()) {
                    debug!(playlist = %self.state.catalog[0].title, "catalog match");
                }
                self.state.now_playing_entry = Some(id);
            }
            None => self.state.now_playing_entry = None,
        }
    }

    /// The 100ms sync tick: estimate the playback position and move the
    /// active lyric line forward when a timestamp has passed.
    fn lyrics_tick(&mut self) {
        if !self.state.sync.is_active() {
            return;
        }
        let Some(snapshot) = self.state.active_snapshot() else {
            return;
        };
        let Some(pos) = position::estimate(snapshot, OffsetDateTime::now_utc()) else {
            return;
        };
        if let Some(pair) = self.state.sync.tick(pos)
            && pair != self.state.lines
        {
            debug!(line = %pair.current, "lyric line");
            self.state.lines = pair;
        }
    }
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// 12-hour wall clock, the dashboard's header format.
fn format_clock(now: OffsetDateTime) -> String {
    let hour = now.hour();
    let meridiem = if hour >= 12 { "PM" } else { "AM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", display, now.minute(), meridiem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HubConfig, LyricsConfig};
    use crate::playlists::PlaylistEntry;
    use crate::playlists::color::Color;
    use serde_json::json;
    use time::format_description::well_known::Rfc3339;

    fn test_app() -> App {
        let cfg = Config {
            hub: HubConfig {
                host: "127.0.0.1:9".to_string(),
                token: "test".to_string(),
            },
            lyrics: LyricsConfig {
                base_url: "http://127.0.0.1:9".to_string(),
            },
            ..Config::default()
        };
        App::new(cfg, Settings::default()).unwrap()
    }

    fn playing_snapshot() -> crate::hub::EntitySnapshot {
        serde_json::from_value(json!({
            "state": "playing",
            "attributes": {
                "media_title": "Hello",
                "media_artist": "Adele",
                "media_position": 10.0,
            }
        }))
        .unwrap()
    }

    fn media_event() -> NetworkEvent {
        NetworkEvent::MediaStates {
            speaker: Some(playing_snapshot()),
            tv: None,
        }
    }

    fn lines() -> Vec<crate::lyrics::LyricLine> {
        crate::lyrics::parser::parse("[00:01.00]one\n[00:02.00]two")
    }

    #[tokio::test]
    async fn unchanged_snapshot_does_not_retrigger_lyrics() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(16);

        app.handle_event(media_event(), &tx);
        let key = app.state.lyrics_requested.clone().expect("fetch issued");

        app.handle_event(
            NetworkEvent::LyricsLoaded { song_key: key.clone(), lines: lines() },
            &tx,
        );
        assert!(app.state.sync.is_active());

        // Identical poll result: the session must survive untouched.
        app.handle_event(media_event(), &tx);
        assert!(app.state.sync.is_active());
        assert_eq!(app.state.lyrics_requested.as_deref(), Some(key.as_str()));
    }

    #[tokio::test]
    async fn no_lyrics_song_is_not_retried() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(16);

        app.handle_event(media_event(), &tx);
        let key = app.state.lyrics_requested.clone().unwrap();

        app.handle_event(NetworkEvent::LyricsUnavailable { song_key: key.clone() }, &tx);
        assert!(!app.state.sync.is_active());
        assert_eq!(app.state.lines, LinePair::default());

        // Next poll of the same song leaves the request key in place, so no
        // second fetch is spawned.
        app.handle_event(media_event(), &tx);
        assert_eq!(app.state.lyrics_requested.as_deref(), Some(key.as_str()));
        assert!(!app.state.sync.is_active());
    }

    #[tokio::test]
    async fn stale_lyrics_response_is_dropped() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(16);

        app.handle_event(media_event(), &tx);
        app.handle_event(
            NetworkEvent::LyricsLoaded { song_key: "other\u{1f}song".into(), lines: lines() },
            &tx,
        );
        assert!(!app.state.sync.is_active());
    }

    #[tokio::test]
    async fn offline_tears_down_lyrics_session() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(16);

        app.handle_event(media_event(), &tx);
        let key = app.state.lyrics_requested.clone().unwrap();
        app.handle_event(NetworkEvent::LyricsLoaded { song_key: key, lines: lines() }, &tx);
        assert!(app.state.sync.is_active());

        app.handle_event(NetworkEvent::MediaStates { speaker: None, tv: None }, &tx);
        assert!(app.state.now_playing.is_none());
        assert!(!app.state.sync.is_active());
        assert!(app.state.lyrics_requested.is_none());
    }

    #[tokio::test]
    async fn color_cache_is_write_once() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(16);

        let first = Color { r: 1, g: 2, b: 3 };
        let second = Color { r: 9, g: 9, b: 9 };
        app.handle_event(NetworkEvent::ColorResolved { key: "k".into(), color: first }, &tx);
        app.handle_event(NetworkEvent::ColorResolved { key: "k".into(), color: second }, &tx);
        assert_eq!(app.state.colors.get("k"), Some(&first));
    }

    #[tokio::test]
    async fn catalog_match_promotes_now_playing() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(16);

        app.handle_event(media_event(), &tx);
        let entries = vec![
            PlaylistEntry {
                id: "p1".into(),
                title: "Focus".into(),
                thumbnail: None,
                playable: true,
                content_type: "playlist".into(),
            },
            PlaylistEntry {
                id: "p2".into(),
                title: "Party".into(),
                thumbnail: None,
                playable: true,
                content_type: "playlist".into(),
            },
        ];
        app.handle_event(NetworkEvent::CatalogLoaded { entries }, &tx);

        // Speaker reports the playlist by title.
        let speaker: crate::hub::EntitySnapshot = serde_json::from_value(json!({
            "state": "playing",
            "attributes": {
                "media_title": "Song",
                "media_artist": "Artist",
                "media_playlist": "Party",
            }
        }))
        .unwrap();
        app.handle_event(NetworkEvent::MediaStates { speaker: Some(speaker), tv: None }, &tx);

        assert_eq!(app.state.now_playing_entry.as_deref(), Some("p2"));
        assert_eq!(app.state.catalog[0].id, "p2");
        assert_eq!(app.state.catalog.len(), 2);
    }

    #[test]
    fn clock_formats_twelve_hour() {
        let t = OffsetDateTime::parse("2026-03-01T00:05:00+00:00", &Rfc3339).unwrap();
        assert_eq!(format_clock(t), "12:05 AM");
        let t = OffsetDateTime::parse("2026-03-01T13:07:00+00:00", &Rfc3339).unwrap();
        assert_eq!(format_clock(t), "1:07 PM");
        let t = OffsetDateTime::parse("2026-03-01T12:00:00+00:00", &Rfc3339).unwrap();
        assert_eq!(format_clock(t), "12:00 PM");
    }
}
