//! Lyrics subsystem: lookup client, LRC parsing, and the sync clock.

pub mod lrclib;
pub mod parser;
pub mod sync;

pub use lrclib::LyricsClient;
pub use parser::LyricLine;
pub use sync::{LinePair, SyncClock};

/// Fetch and parse synced lyrics for a track. `Ok(None)` covers every
/// no-lyrics case: unknown track, plain-only lyrics, or an empty synced
/// payload.
pub async fn fetch_synced(
    client: &LyricsClient,
    title: &str,
    artist: &str,
) -> anyhow::Result<Option<Vec<LyricLine>>> {
    let Some(response) = client.get(title, artist).await? else {
        return Ok(None);
    };

    if let Some(synced) = &response.synced_lyrics
        && !synced.is_empty()
    {
        let lines = parser::parse(synced);
        if !lines.is_empty() {
            return Ok(Some(lines));
        }
    }
    if response.plain_lyrics.is_some() {
        tracing::debug!("only plain lyrics available for {title}");
    }
    Ok(None)
}
