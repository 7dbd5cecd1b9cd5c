use chrono::{DateTime, Utc};

use crate::models::{Category, Id, Post};
use crate::policy;

/// Predicate over posts, composed by the feed and evaluated by the store.
///
/// Every set field narrows the result; an empty filter matches all posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub author_id: Option<Id>,
    pub category_id: Option<Id>,
    /// Keep only posts publicly visible at this instant.
    pub visible_at: Option<DateTime<Utc>>,
}

impl PostFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn publicly_visible(now: DateTime<Utc>) -> Self {
        Self::default().visible_at(now)
    }

    pub fn by_author(mut self, author_id: Id) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn in_category(mut self, category_id: Id) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn visible_at(mut self, now: DateTime<Utc>) -> Self {
        self.visible_at = Some(now);
        self
    }

    /// `category` must be the post's own category (already resolved).
    pub fn matches(&self, post: &Post, category: Option<&Category>) -> bool {
        if self.author_id.map_or(false, |a| a != post.author_id) {
            return false;
        }
        if self.category_id.is_some() && self.category_id != post.category_id {
            return false;
        }
        match self.visible_at {
            Some(now) => policy::is_publicly_visible(post, category, now),
            None => true,
        }
    }
}
