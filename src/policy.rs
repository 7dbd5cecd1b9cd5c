//! Read and write access rules for posts and comments.
//!
//! Visibility is recomputed from the record and the clock on every call; there
//! is no stored "visible" flag anywhere.

use chrono::{DateTime, Utc};

use crate::models::{Category, Comment, Id, Post};
use crate::viewer::Viewer;

/// A post is publicly visible when it is published, filed under a published
/// category and its publication time has been reached.
pub fn is_publicly_visible(post: &Post, category: Option<&Category>, now: DateTime<Utc>) -> bool {
    post.is_published
        && category.map_or(false, |c| c.is_published)
        && post.pub_date <= now
}

/// Authors always see their own posts; everyone else needs public visibility.
pub fn can_view(viewer: &Viewer, post: &Post, category: Option<&Category>, now: DateTime<Utc>) -> bool {
    viewer.is(post.author_id) || is_publicly_visible(post, category, now)
}

/// Anything with a single owning author.
pub trait Owned {
    fn author_id(&self) -> Id;
}

impl Owned for Post {
    fn author_id(&self) -> Id {
        self.author_id
    }
}

impl Owned for Comment {
    fn author_id(&self) -> Id {
        self.author_id
    }
}

pub fn can_modify<R: Owned + ?Sized>(viewer: &Viewer, resource: &R) -> bool {
    viewer.is(resource.author_id())
}

/// Outcome of a write attempt against an owned resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Not the owner: show the detail page of `post_id` instead.
    Redirect { post_id: Id },
}

/// Shared ownership gate for post and comment edits/deletes. `fallback_post_id`
/// is the post detail page a denied viewer is sent to.
pub fn modify_access<R: Owned + ?Sized>(viewer: &Viewer, resource: &R, fallback_post_id: Id) -> Access {
    if can_modify(viewer, resource) {
        Access::Granted
    } else {
        Access::Redirect { post_id: fallback_post_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn category(published: bool) -> Category {
        Category {
            id: 1,
            title: "Travel".into(),
            description: String::new(),
            slug: "travel".into(),
            is_published: published,
            created_at: Utc::now(),
        }
    }

    fn post(author_id: Id, published: bool, pub_date: DateTime<Utc>) -> Post {
        Post {
            id: 10,
            title: "t".into(),
            text: "x".into(),
            pub_date,
            is_published: published,
            created_at: pub_date,
            author_id,
            category_id: Some(1),
            location_id: None,
            image: None,
        }
    }

    #[test]
    fn author_sees_every_own_post() {
        let now = Utc::now();
        let author = Viewer::user(7, "author");
        let cases = [
            (post(7, false, now), Some(category(true))),
            (post(7, true, now + Duration::days(1)), Some(category(true))),
            (post(7, true, now), Some(category(false))),
            (post(7, true, now), None),
        ];
        for (p, c) in cases {
            assert!(can_view(&author, &p, c.as_ref(), now));
        }
    }

    #[test]
    fn strangers_need_every_visibility_condition() {
        let now = Utc::now();
        let past = now - Duration::hours(1);
        let stranger = Viewer::user(8, "other");
        let published = category(true);

        assert!(can_view(&stranger, &post(7, true, past), Some(&published), now));
        assert!(can_view(&Viewer::Anonymous, &post(7, true, now), Some(&published), now));

        assert!(!can_view(&stranger, &post(7, false, past), Some(&published), now));
        assert!(!can_view(&stranger, &post(7, true, now + Duration::seconds(1)), Some(&published), now));
        assert!(!can_view(&stranger, &post(7, true, past), Some(&category(false)), now));
        assert!(!can_view(&Viewer::Anonymous, &post(7, true, past), None, now));
    }

    #[test]
    fn only_the_author_may_modify() {
        let now = Utc::now();
        let p = post(7, true, now);
        let c = Comment { id: 3, text: "hi".into(), created_at: now, post_id: p.id, author_id: 9 };

        assert!(can_modify(&Viewer::user(7, "a"), &p));
        assert!(!can_modify(&Viewer::user(9, "b"), &p));
        assert!(!can_modify(&Viewer::Anonymous, &p));
        assert!(can_modify(&Viewer::user(9, "b"), &c));
        assert!(!can_modify(&Viewer::user(7, "a"), &c));
    }

    #[test]
    fn denied_writes_redirect_to_fallback_post() {
        let now = Utc::now();
        let c = Comment { id: 3, text: "hi".into(), created_at: now, post_id: 10, author_id: 9 };
        assert_eq!(modify_access(&Viewer::user(9, "b"), &c, 10), Access::Granted);
        assert_eq!(modify_access(&Viewer::user(1, "x"), &c, 42), Access::Redirect { post_id: 42 });
    }
}
