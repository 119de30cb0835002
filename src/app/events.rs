use crate::hub::EntitySnapshot;
use crate::lyrics::LyricLine;
use crate::playlists::PlaylistEntry;
use crate::playlists::color::Color;

/// Results of spawned network work, reported back to the scheduler loop.
/// Lyrics and color results carry the key they were fetched for so stale
/// responses can be dropped on arrival.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    MediaStates {
        speaker: Option<EntitySnapshot>,
        tv: Option<EntitySnapshot>,
    },
    WeatherState {
        snapshot: Option<EntitySnapshot>,
    },
    LyricsLoaded {
        song_key: String,
        lines: Vec<LyricLine>,
    },
    LyricsUnavailable {
        song_key: String,
    },
    CatalogLoaded {
        entries: Vec<PlaylistEntry>,
    },
    CatalogFailed,
    ColorResolved {
        key: String,
        color: Color,
    },
}
