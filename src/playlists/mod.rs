//! Playlist catalog.
//!
//! The hub's favorites tree is browsed two levels deep: the root for the
//! speaker entity, then a "Playlists" folder (found by name or by a
//! favorites_folder type marker) whose playable children become the catalog.
//! Without such a folder, playable entries directly under the root are used;
//! with nothing playable at all the catalog is explicitly empty.

pub mod color;

use crate::hub::{BrowseNode, HubClient};

pub const FAVORITES_FOLDER_TITLE: &str = "Playlists";
const FOLDER_TYPE_MARKER: &str = "favorites_folder";

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub playable: bool,
    pub content_type: String,
}

impl From<&BrowseNode> for PlaylistEntry {
    fn from(node: &BrowseNode) -> Self {
        Self {
            id: node.media_content_id.clone(),
            title: node.title.clone(),
            thumbnail: node.thumbnail.clone(),
            playable: node.can_play,
            content_type: node.media_content_type.clone(),
        }
    }
}

/// The playlists folder under the favorites root, if any. Only expandable
/// children qualify; a stray favorite named "Playlists" is not a folder.
pub fn locate_folder(root: &BrowseNode) -> Option<&BrowseNode> {
    root.children.iter().filter(|c| c.can_expand).find(|c| {
        c.title == FAVORITES_FOLDER_TITLE || c.media_content_type.contains(FOLDER_TYPE_MARKER)
    })
}

/// Playable children of a browse node, in upstream order.
pub fn entries_from(node: &BrowseNode) -> Vec<PlaylistEntry> {
    node.children
        .iter()
        .filter(|c| c.can_play)
        .map(PlaylistEntry::from)
        .collect()
}

/// Two-step catalog fetch against the hub. An empty vec is the explicit
/// empty state, not an error.
pub async fn fetch_catalog(hub: &HubClient, entity_id: &str) -> anyhow::Result<Vec<PlaylistEntry>> {
    let root = hub.browse_media(entity_id, None).await?;

    match locate_folder(&root) {
        Some(folder) => {
            let inner = hub
                .browse_media(
                    entity_id,
                    Some((&folder.media_content_id, &folder.media_content_type)),
                )
                .await?;
            Ok(entries_from(&inner))
        }
        None => Ok(entries_from(&root)),
    }
}

/// Match the reconciled current-playlist signal against the catalog, by id
/// or by case-insensitive title.
pub fn find_now_playing(entries: &[PlaylistEntry], signal: &str) -> Option<usize> {
    if signal.is_empty() {
        return None;
    }
    entries
        .iter()
        .position(|e| e.id == signal || e.title.eq_ignore_ascii_case(signal))
}

/// Move the entry at `index` to the front of the display order.
pub fn promote(entries: &mut Vec<PlaylistEntry>, index: usize) {
    if index > 0 && index < entries.len() {
        let entry = entries.remove(index);
        entries.insert(0, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(title: &str, id: &str, kind: &str) -> BrowseNode {
        BrowseNode {
            title: title.to_string(),
            media_content_id: id.to_string(),
            media_content_type: kind.to_string(),
            can_expand: true,
            ..BrowseNode::default()
        }
    }

    fn item(title: &str, id: &str, kind: &str) -> BrowseNode {
        BrowseNode {
            title: title.to_string(),
            media_content_id: id.to_string(),
            media_content_type: kind.to_string(),
            can_play: true,
            ..BrowseNode::default()
        }
    }

    fn catalog() -> Vec<PlaylistEntry> {
        vec![
            PlaylistEntry {
                id: "p1".into(),
                title: "Morning Coffee".into(),
                thumbnail: None,
                playable: true,
                content_type: "playlist".into(),
            },
            PlaylistEntry {
                id: "p2".into(),
                title: "Late Night".into(),
                thumbnail: None,
                playable: true,
                content_type: "playlist".into(),
            },
            PlaylistEntry {
                id: "p3".into(),
                title: "Workout".into(),
                thumbnail: None,
                playable: true,
                content_type: "playlist".into(),
            },
        ]
    }

    #[test]
    fn folder_found_by_title() {
        let mut root = folder("Favorites", "root", "favorites");
        root.children = vec![
            folder("Stations", "f1", "favorites_folder_radio"),
            folder("Playlists", "f2", "container"),
        ];
        assert_eq!(locate_folder(&root).unwrap().media_content_id, "f1");

        root.children.remove(0);
        assert_eq!(locate_folder(&root).unwrap().media_content_id, "f2");
    }

    #[test]
    fn folder_found_by_type_marker() {
        let mut root = folder("Favorites", "root", "favorites");
        root.children = vec![folder("Lists", "f9", "favorites_folder")];
        assert_eq!(locate_folder(&root).unwrap().media_content_id, "f9");
    }

    #[test]
    fn non_expandable_playlists_favorite_is_not_a_folder() {
        let mut root = folder("Favorites", "root", "favorites");
        root.children = vec![item("Playlists", "x", "playlist")];
        assert!(locate_folder(&root).is_none());
    }

    #[test]
    fn only_playable_children_become_entries() {
        let mut parent = folder("Playlists", "f", "container");
        parent.children = vec![
            item("Mix One", "m1", "playlist"),
            folder("Nested Folder", "n", "container"),
            item("Mix Two", "m2", "playlist"),
        ];
        let entries = entries_from(&parent);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Mix One");
        assert!(entries.iter().all(|e| e.playable));
    }

    #[test]
    fn empty_root_yields_explicit_empty_catalog() {
        let root = folder("Favorites", "root", "favorites");
        assert!(entries_from(&root).is_empty());
    }

    #[test]
    fn now_playing_matches_by_id_or_title() {
        let entries = catalog();
        assert_eq!(find_now_playing(&entries, "p2"), Some(1));
        assert_eq!(find_now_playing(&entries, "workout"), Some(2));
        assert_eq!(find_now_playing(&entries, ""), None);
        assert_eq!(find_now_playing(&entries, "unknown"), None);
    }

    #[test]
    fn promotion_moves_match_to_front_without_losing_entries() {
        let mut entries = catalog();
        promote(&mut entries, 2);
        assert_eq!(entries[0].id, "p3");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].id, "p1");
        assert_eq!(entries[2].id, "p2");

        // Promoting the front is a no-op.
        promote(&mut entries, 0);
        assert_eq!(entries[0].id, "p3");
    }
}
