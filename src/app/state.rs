use crate::hub::EntitySnapshot;
use crate::lyrics::{LinePair, SyncClock};
use crate::media::{ActiveSource, NowPlaying};
use crate::playlists::PlaylistEntry;
use crate::playlists::color::Color;
use crate::weather::WeatherView;
use std::collections::HashMap;

/// The whole dashboard model in one place: latest snapshot per entity plus
/// everything derived from them. Each periodic task touches only its own
/// slice; snapshot writes are wholesale replacements (last one wins).
#[derive(Debug, Default)]
pub struct AppState {
    /// Formatted wall-clock string, refreshed every second.
    pub clock: String,

    // Latest upstream snapshots.
    pub speaker: Option<EntitySnapshot>,
    pub tv: Option<EntitySnapshot>,

    // Derived view model.
    pub now_playing: Option<NowPlaying>,
    pub weather: Option<WeatherView>,

    // Playlist catalog.
    pub catalog: Vec<PlaylistEntry>,
    pub catalog_loaded: bool,
    /// Id of the catalog entry currently flagged as now playing.
    pub now_playing_entry: Option<String>,
    /// Write-once color cache, keyed by thumbnail URL or title.
    pub colors: HashMap<String, Color>,

    // Lyrics.
    pub sync: SyncClock,
    /// Song key of the last issued lyrics fetch; also suppresses retries for
    /// songs the lookup had nothing for.
    pub lyrics_requested: Option<String>,
    pub lines: LinePair,

    /// Artwork URL last handed to color resolution.
    pub last_artwork: Option<String>,

    // In-flight guards so polls of one task never overlap.
    pub media_inflight: bool,
    pub weather_inflight: bool,
    pub catalog_inflight: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot backing the currently active media source.
    pub fn active_snapshot(&self) -> Option<&EntitySnapshot> {
        match self.now_playing.as_ref()?.source {
            ActiveSource::Speaker => self.speaker.as_ref(),
            ActiveSource::Tv => self.tv.as_ref(),
        }
    }
}
