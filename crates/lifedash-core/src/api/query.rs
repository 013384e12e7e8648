//! List filters
//!
//! Query parameters understood by the list endpoints, in the json-server
//! dialect the dashboard API speaks (`q`, `tags_like`, `_sort`, ...).

use crate::models::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Filters for a list fetch; unset fields are not sent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilters {
    /// Full-text search
    pub q: Option<String>,
    /// Tag substring match
    pub tags_like: Option<String>,
    pub is_pinned: Option<bool>,
    pub is_trashed: Option<bool>,
    pub is_favorite: Option<bool>,
    pub folder_id: Option<EntityId>,
    pub album_id: Option<EntityId>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
}

impl ListFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags_like = Some(tag.into());
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.is_pinned = Some(pinned);
        self
    }

    pub fn trashed(mut self, trashed: bool) -> Self {
        self.is_trashed = Some(trashed);
        self
    }

    pub fn favorite(mut self, favorite: bool) -> Self {
        self.is_favorite = Some(favorite);
        self
    }

    pub fn in_folder(mut self, folder: impl Into<EntityId>) -> Self {
        self.folder_id = Some(folder.into());
        self
    }

    pub fn in_album(mut self, album: impl Into<EntityId>) -> Self {
        self.album_id = Some(album.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(field.into());
        self.order = Some(order);
        self
    }

    /// Query pairs in a stable order
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                pairs.push((key.to_string(), value));
            }
        };

        push("q", self.q.clone().filter(|q| !q.trim().is_empty()));
        push("tags_like", self.tags_like.clone());
        push("isPinned", self.is_pinned.map(|b| b.to_string()));
        push("isTrashed", self.is_trashed.map(|b| b.to_string()));
        push("isFavorite", self.is_favorite.map(|b| b.to_string()));
        push("folderId", self.folder_id.as_ref().map(ToString::to_string));
        push("albumId", self.album_id.as_ref().map(ToString::to_string));
        push("_sort", self.sort.clone());
        push(
            "_order",
            self.order.map(|o| match o {
                SortOrder::Asc => "asc".to_string(),
                SortOrder::Desc => "desc".to_string(),
            }),
        );
        pairs
    }
}
