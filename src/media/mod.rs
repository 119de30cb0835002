//! Media source reconciliation.
//!
//! Two independent player entities (a speaker and a TV box) are merged into
//! one logical "active source" per poll. The TV pre-empts the speaker only
//! while it is actively showing titled content; otherwise the speaker wins,
//! so an idle TV never hides playing music. Every display field falls back
//! through a fixed attribute chain and terminates in a placeholder, never an
//! error.

pub mod position;

use crate::hub::EntitySnapshot;

pub const NO_MEDIA_TITLE: &str = "No Media Playing";

const ACTIVE_STATES: [&str; 3] = ["playing", "paused", "buffering"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSource {
    Speaker,
    Tv,
}

/// The reconciled view model for the player pane.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub source: ActiveSource,
    pub state: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub playlist: String,
    pub shuffle: bool,
    /// Always sourced from the speaker; the TV has no volume of its own.
    pub volume_percent: u8,
    pub artwork: Option<String>,
    pub source_name: String,
    pub tv_mode: bool,
}

impl NowPlaying {
    pub fn is_playing(&self) -> bool {
        self.state == "playing"
    }

    /// Whether the source is in a state worth syncing lyrics against.
    pub fn is_active(&self) -> bool {
        ACTIVE_STATES.contains(&self.state.as_str())
    }

    /// Identity used for lyrics lookup; `None` when either half is missing.
    pub fn song_key(&self) -> Option<String> {
        if self.title.is_empty() || self.artist.is_empty() {
            return None;
        }
        Some(song_key(&self.title, &self.artist))
    }
}

/// Join title and artist with a separator that cannot occur in either.
pub fn song_key(title: &str, artist: &str) -> String {
    format!("{title}\u{1f}{artist}")
}

fn is_active(snapshot: &EntitySnapshot) -> bool {
    ACTIVE_STATES.contains(&snapshot.state.as_str())
}

/// Source-selection priority: an actively presenting TV (titled content)
/// beats everything, then an active speaker, then whichever entity exists.
pub fn select_source(
    speaker: Option<&EntitySnapshot>,
    tv: Option<&EntitySnapshot>,
) -> Option<ActiveSource> {
    if let Some(t) = tv
        && is_active(t)
        && t.attr_str("media_title").is_some_and(|s| !s.is_empty())
    {
        return Some(ActiveSource::Tv);
    }
    if let Some(s) = speaker
        && is_active(s)
    {
        return Some(ActiveSource::Speaker);
    }
    if speaker.is_some() {
        return Some(ActiveSource::Speaker);
    }
    if tv.is_some() {
        return Some(ActiveSource::Tv);
    }
    None
}

/// Merge the latest snapshots into the now-playing view model. `None` means
/// both entities are absent and the player pane should render offline.
pub fn reconcile(
    speaker: Option<&EntitySnapshot>,
    tv: Option<&EntitySnapshot>,
) -> Option<NowPlaying> {
    let source = select_source(speaker, tv)?;
    let snap = match source {
        ActiveSource::Speaker => speaker?,
        ActiveSource::Tv => tv?,
    };

    let title = snap
        .first_attr_str(&["media_title", "app_name"])
        .unwrap_or(NO_MEDIA_TITLE)
        .to_string();
    let artist = snap
        .first_attr_str(&["media_artist", "media_series_title"])
        .unwrap_or_default()
        .to_string();
    let album = snap.attr_str("media_album_name").unwrap_or_default().to_string();
    let playlist = snap
        .first_attr_str(&["media_playlist", "media_content_id", "queue_name"])
        .unwrap_or_default()
        .to_string();
    let artwork = snap
        .first_attr_str(&["entity_picture", "media_image_url", "media_image_uri"])
        .map(str::to_string);

    let volume_percent = speaker
        .and_then(|s| s.attr_f64("volume_level"))
        .map(|v| (v.clamp(0.0, 1.0) * 100.0).round() as u8)
        .unwrap_or(0);

    Some(NowPlaying {
        source,
        state: snap.state.clone(),
        shuffle: snap.attr_bool("shuffle").unwrap_or(false),
        tv_mode: tv_mode(source, snap),
        source_name: source_name(source, snap),
        volume_percent,
        title,
        artist,
        album,
        playlist,
        artwork,
    })
}

/// Presentation-only switch between the music layout and the TV layout.
fn tv_mode(source: ActiveSource, snap: &EntitySnapshot) -> bool {
    if source == ActiveSource::Tv {
        return true;
    }
    let tvish = |s: &str| s.to_lowercase().contains("tv");
    if snap.attr_str("app_name").is_some_and(tvish) || snap.attr_str("source").is_some_and(tvish) {
        return true;
    }
    snap.attr_str("media_content_type") == Some("tvshow")
}

/// Display name of the active device. A grouped speaker shows all member
/// names joined, so multi-room playback is visible at a glance.
fn source_name(source: ActiveSource, snap: &EntitySnapshot) -> String {
    if source == ActiveSource::Speaker
        && let Some(members) = snap.attr("group_members").and_then(|v| v.as_array())
        && members.len() > 1
    {
        return members
            .iter()
            .filter_map(|m| m.as_str())
            .map(|m| m.trim_start_matches("media_player.").to_string())
            .collect::<Vec<_>>()
            .join(" + ");
    }

    snap.attr_str("friendly_name")
        .map(str::to_string)
        .unwrap_or_else(|| {
            match source {
                ActiveSource::Speaker => "Speaker",
                ActiveSource::Tv => "TV",
            }
            .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(state: &str, attrs: serde_json::Value) -> EntitySnapshot {
        serde_json::from_value(json!({ "state": state, "attributes": attrs })).unwrap()
    }

    #[test]
    fn presenting_tv_preempts_paused_speaker() {
        let speaker = snapshot("paused", json!({ "media_title": "Song" }));
        let tv = snapshot("playing", json!({ "media_title": "Movie" }));
        assert_eq!(
            select_source(Some(&speaker), Some(&tv)),
            Some(ActiveSource::Tv)
        );
    }

    #[test]
    fn untitled_tv_does_not_preempt() {
        let speaker = snapshot("playing", json!({ "media_title": "Song" }));
        let tv = snapshot("playing", json!({}));
        assert_eq!(
            select_source(Some(&speaker), Some(&tv)),
            Some(ActiveSource::Speaker)
        );
    }

    #[test]
    fn idle_speaker_beats_absent_tv() {
        let speaker = snapshot("idle", json!({}));
        assert_eq!(
            select_source(Some(&speaker), None),
            Some(ActiveSource::Speaker)
        );
    }

    #[test]
    fn lone_tv_is_selected_as_fallback() {
        let tv = snapshot("off", json!({}));
        assert_eq!(select_source(None, Some(&tv)), Some(ActiveSource::Tv));
    }

    #[test]
    fn no_entities_means_offline() {
        assert_eq!(select_source(None, None), None);
        assert!(reconcile(None, None).is_none());
    }

    #[test]
    fn title_falls_back_to_app_name_then_placeholder() {
        let speaker = snapshot("playing", json!({ "app_name": "Radio" }));
        let np = reconcile(Some(&speaker), None).unwrap();
        assert_eq!(np.title, "Radio");

        let speaker = snapshot("idle", json!({}));
        let np = reconcile(Some(&speaker), None).unwrap();
        assert_eq!(np.title, NO_MEDIA_TITLE);
        assert_eq!(np.artist, "");
    }

    #[test]
    fn artist_falls_back_to_series_title() {
        let tv = snapshot(
            "playing",
            json!({ "media_title": "E01", "media_series_title": "Some Show" }),
        );
        let np = reconcile(None, Some(&tv)).unwrap();
        assert_eq!(np.artist, "Some Show");
    }

    #[test]
    fn volume_always_comes_from_speaker() {
        let speaker = snapshot("paused", json!({ "volume_level": 0.35 }));
        let tv = snapshot("playing", json!({ "media_title": "Movie", "volume_level": 0.9 }));
        let np = reconcile(Some(&speaker), Some(&tv)).unwrap();
        assert_eq!(np.source, ActiveSource::Tv);
        assert_eq!(np.volume_percent, 35);
    }

    #[test]
    fn tv_mode_from_content_type_on_speaker() {
        let speaker = snapshot(
            "playing",
            json!({ "media_title": "E01", "media_content_type": "tvshow" }),
        );
        let np = reconcile(Some(&speaker), None).unwrap();
        assert_eq!(np.source, ActiveSource::Speaker);
        assert!(np.tv_mode);
    }

    #[test]
    fn grouped_speaker_name_joins_members() {
        let speaker = snapshot(
            "playing",
            json!({
                "media_title": "Song",
                "friendly_name": "Living Room",
                "group_members": ["media_player.living_room", "media_player.kitchen"],
            }),
        );
        let np = reconcile(Some(&speaker), None).unwrap();
        assert_eq!(np.source_name, "living_room + kitchen");
    }

    #[test]
    fn ungrouped_source_name_uses_friendly_name_then_literal() {
        let speaker = snapshot(
            "playing",
            json!({ "media_title": "Song", "friendly_name": "Living Room" }),
        );
        let np = reconcile(Some(&speaker), None).unwrap();
        assert_eq!(np.source_name, "Living Room");

        let tv = snapshot("playing", json!({ "media_title": "Movie" }));
        let np = reconcile(None, Some(&tv)).unwrap();
        assert_eq!(np.source_name, "TV");
    }

    #[test]
    fn song_key_requires_title_and_artist() {
        let speaker = snapshot(
            "playing",
            json!({ "media_title": "Hello", "media_artist": "Adele" }),
        );
        let np = reconcile(Some(&speaker), None).unwrap();
        assert!(np.song_key().is_some());

        let speaker = snapshot("playing", json!({ "media_title": "Hello" }));
        let np = reconcile(Some(&speaker), None).unwrap();
        assert_eq!(np.song_key(), None);
    }
}
