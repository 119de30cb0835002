//! Playback position estimation.
//!
//! The hub reports `media_position` as of `media_position_updated_at`; while a
//! player is actually playing the real position keeps moving, so we
//! extrapolate from the hub-supplied timestamp. Clock skew between us and the
//! hub is accepted drift.

use crate::hub::EntitySnapshot;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Elapsed seconds into the current track, or `None` when the snapshot
/// carries no numeric position. Paused/stopped positions are exact and
/// returned unmodified; only a playing player is extrapolated.
pub fn estimate(snapshot: &EntitySnapshot, now: OffsetDateTime) -> Option<f64> {
    let position = snapshot.attr_f64("media_position")?;

    if snapshot.state != "playing" {
        return Some(position);
    }

    let updated_at = snapshot
        .attr_str("media_position_updated_at")
        .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok());

    match updated_at {
        Some(t) => {
            let elapsed = (now - t).as_seconds_f64();
            Some(position + elapsed)
        }
        None => Some(position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::Duration;

    fn snapshot(state: &str, attrs: serde_json::Value) -> EntitySnapshot {
        serde_json::from_value(json!({ "state": state, "attributes": attrs })).unwrap()
    }

    const T0: &str = "2026-03-01T12:00:00+00:00";

    fn t0() -> OffsetDateTime {
        OffsetDateTime::parse(T0, &Rfc3339).unwrap()
    }

    #[test]
    fn playing_extrapolates_from_update_timestamp() {
        let s = snapshot(
            "playing",
            json!({ "media_position": 10.0, "media_position_updated_at": T0 }),
        );
        let got = estimate(&s, t0() + Duration::seconds(3)).unwrap();
        assert!((got - 13.0).abs() < 1e-9);
    }

    #[test]
    fn paused_position_is_exact() {
        let s = snapshot(
            "paused",
            json!({ "media_position": 10.0, "media_position_updated_at": T0 }),
        );
        let got = estimate(&s, t0() + Duration::seconds(3)).unwrap();
        assert_eq!(got, 10.0);
    }

    #[test]
    fn playing_without_timestamp_returns_raw_position() {
        let s = snapshot("playing", json!({ "media_position": 42.0 }));
        assert_eq!(estimate(&s, t0()).unwrap(), 42.0);
    }

    #[test]
    fn unparseable_timestamp_returns_raw_position() {
        let s = snapshot(
            "playing",
            json!({ "media_position": 7.0, "media_position_updated_at": "yesterday" }),
        );
        assert_eq!(estimate(&s, t0()).unwrap(), 7.0);
    }

    #[test]
    fn non_numeric_position_is_unknown() {
        let s = snapshot("playing", json!({ "media_position": "10" }));
        assert_eq!(estimate(&s, t0()), None);

        let s = snapshot("playing", json!({}));
        assert_eq!(estimate(&s, t0()), None);
    }
}
