use serde::Deserialize;
use serde_json::Value;

/// One entity's state record as returned by `GET /api/states/{entity_id}`.
///
/// The attribute map is opaque upstream data; snapshots are replaced wholesale
/// on every poll and never mutated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntitySnapshot {
    pub state: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
}

impl EntitySnapshot {
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Numeric attribute, strictly: strings like `"42"` do not count.
    pub fn attr_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_f64)
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(Value::as_bool)
    }

    /// First non-empty string among `keys`, in order.
    pub fn first_attr_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.attr_str(k))
            .find(|s| !s.is_empty())
    }

    /// First numeric attribute among `keys`, in order.
    pub fn first_attr_f64(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|k| self.attr_f64(k))
    }
}

/// A node in the hub's media-browse tree (`media_player.browse_media`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BrowseNode {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub media_content_id: String,
    #[serde(default)]
    pub media_content_type: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub can_play: bool,
    #[serde(default)]
    pub can_expand: bool,
    #[serde(default)]
    pub children: Vec<BrowseNode>,
}
