//! Playlist color theming.
//!
//! Each catalog entry gets a muted dark color: sampled from its artwork when
//! a thumbnail decodes in time, otherwise derived deterministically from the
//! title hash so the same title keeps its color across sessions. Resolved
//! colors are cached write-once by thumbnail URL (or title when there is
//! none) and never invalidated within a session.

use crate::hub::HubClient;
use crate::playlists::PlaylistEntry;
use sha1::{Digest, Sha1};
use std::time::Duration;

/// Artwork fetch + decode budget; past it the title hash wins the race.
pub const DECODE_TIMEOUT: Duration = Duration::from_millis(1500);

const SAMPLE_SIZE: u32 = 50;
const SAMPLE_STRIDE: usize = 4;
/// Mix fraction toward the dark neutral target.
const BLEND_MIX: f64 = 0.6;
const BLEND_TARGET: [f64; 3] = [34.0, 34.0, 34.0];
const ALPHA: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// CSS value with the fixed translucency the dashboard theme uses.
    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {ALPHA})", self.r, self.g, self.b)
    }
}

/// Cache key for an entry: thumbnail URL when present, title otherwise.
pub fn cache_key(entry: &PlaylistEntry) -> String {
    entry
        .thumbnail
        .clone()
        .unwrap_or_else(|| entry.title.clone())
}

/// Resolve a color for a thumbnail/title pair, racing artwork analysis
/// against the decode timeout. Never fails: every path ends in the
/// deterministic title color.
pub async fn resolve(hub: &HubClient, thumbnail: Option<&str>, title: &str) -> Color {
    if let Some(thumb) = thumbnail {
        let url = hub.absolute_url(thumb);
        let analyze = async {
            let bytes = hub.fetch_bytes(&url).await.ok()?;
            average_artwork(&bytes)
        };
        if let Ok(Some(color)) = tokio::time::timeout(DECODE_TIMEOUT, analyze).await {
            return color;
        }
    }
    from_title(title)
}

/// Average a strided pixel sample of the artwork and mute it toward the dark
/// neutral. `None` when the bytes do not decode as an image.
pub fn average_artwork(bytes: &[u8]) -> Option<Color> {
    let img = image::load_from_memory(bytes).ok()?;
    let thumb = img.thumbnail(SAMPLE_SIZE, SAMPLE_SIZE);
    if thumb.width() == 0 || thumb.height() == 0 {
        return None;
    }

    let rgb = thumb.to_rgb8();
    let (mut r, mut g, mut b, mut n) = (0u64, 0u64, 0u64, 0u64);
    for px in rgb.pixels().step_by(SAMPLE_STRIDE) {
        r += px.0[0] as u64;
        g += px.0[1] as u64;
        b += px.0[2] as u64;
        n += 1;
    }
    if n == 0 {
        return None;
    }

    Some(blend_toward_target(
        r as f64 / n as f64,
        g as f64 / n as f64,
        b as f64 / n as f64,
    ))
}

fn blend_toward_target(r: f64, g: f64, b: f64) -> Color {
    let mix = |v: f64, t: f64| (v * (1.0 - BLEND_MIX) + t * BLEND_MIX).round() as u8;
    Color {
        r: mix(r, BLEND_TARGET[0]),
        g: mix(g, BLEND_TARGET[1]),
        b: mix(b, BLEND_TARGET[2]),
    }
}

/// Deterministic fallback: title hash mapped to a hue with muted saturation
/// and dark lightness, so the palette stays consistent with sampled artwork.
pub fn from_title(title: &str) -> Color {
    let digest = Sha1::digest(title.as_bytes());
    let hue = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) % 360;
    let saturation = 35 + (digest[4] % 21) as u32; // 35..=55%
    let lightness = 18 + (digest[5] % 11) as u32; // 18..=28%
    hsl_to_rgb(
        hue as f64,
        saturation as f64 / 100.0,
        lightness as f64 / 100.0,
    )
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Color {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round() as u8;
    Color {
        r: to_u8(r1),
        g: to_u8(g1),
        b: to_u8(b1),
    }
}
