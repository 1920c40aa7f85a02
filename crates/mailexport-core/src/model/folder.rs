//! Mail folder model.

use serde::Serialize;

/// One mail folder as discovered during a single traversal.
///
/// `id` is the only stable key; `path` is derived from the display names of
/// the ancestors at discovery time and changes when a folder is renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderNode {
    /// Opaque handle into the remote directory.
    pub id: String,
    /// Folder display name.
    pub display_name: String,
    /// Slash-joined display names from the traversal root down to this folder.
    pub path: String,
    /// Total number of items.
    pub total_items: u32,
    /// Number of unread items.
    pub unread_items: u32,
    /// Number of child folders reported by the server. A hint, may be stale.
    pub child_count: u32,
}

impl FolderNode {
    /// Creates a root-level folder; its path is its display name.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        Self {
            id: id.into(),
            path: display_name.clone(),
            display_name,
            total_items: 0,
            unread_items: 0,
            child_count: 0,
        }
    }

    /// Sets the item counters.
    #[must_use]
    pub const fn with_counts(mut self, total_items: u32, unread_items: u32) -> Self {
        self.total_items = total_items;
        self.unread_items = unread_items;
        self
    }

    /// Sets the child folder hint.
    #[must_use]
    pub const fn with_child_count(mut self, child_count: u32) -> Self {
        self.child_count = child_count;
        self
    }

    /// Rebases this folder's path under `parent_path`.
    #[must_use]
    pub fn nested_under(mut self, parent_path: &str) -> Self {
        self.path = format!("{parent_path}/{}", self.display_name);
        self
    }

    /// Whether the server claims this folder has children.
    #[must_use]
    pub const fn has_children(&self) -> bool {
        self.child_count > 0
    }
}
