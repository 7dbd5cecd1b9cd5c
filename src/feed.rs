//! Post listings (global, category, profile) and the post detail view.

use chrono::{DateTime, Utc};

use crate::constants::POSTS_PER_PAGE;
use crate::filter::PostFilter;
use crate::models::*;
use crate::pagination::Paginator;
use crate::policy;
use crate::repo::{Repo, RepoError, RepoResult};
use crate::viewer::Viewer;

/// Which posts a feed draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope<'a> {
    Global,
    Category { slug: &'a str },
    Profile { username: &'a str },
}

/// A scope after its subject has been looked up.
#[derive(Debug, Clone)]
pub enum ResolvedScope {
    Global,
    Category(Category),
    Profile(User),
}

#[derive(Debug, Clone)]
pub struct Feed {
    pub scope: ResolvedScope,
    pub page: Page<PostWithCommentCount>,
}

/// Looks up the category or profile owner. Unpublished categories resolve to
/// `NotFound` exactly like missing ones.
pub async fn resolve_scope(repo: &dyn Repo, scope: FeedScope<'_>) -> RepoResult<ResolvedScope> {
    match scope {
        FeedScope::Global => Ok(ResolvedScope::Global),
        FeedScope::Category { slug } => {
            let category = repo.get_category_by_slug(slug).await?;
            if !category.is_published {
                return Err(RepoError::NotFound);
            }
            Ok(ResolvedScope::Category(category))
        }
        FeedScope::Profile { username } => {
            Ok(ResolvedScope::Profile(repo.get_user_by_username(username).await?))
        }
    }
}

/// Filter applied to a resolved scope for the given viewer.
pub fn scope_filter(scope: &ResolvedScope, viewer: &Viewer, now: DateTime<Utc>) -> PostFilter {
    match scope {
        ResolvedScope::Global => PostFilter::publicly_visible(now),
        ResolvedScope::Category(c) => PostFilter::publicly_visible(now).in_category(c.id),
        // the owner also sees drafts and scheduled posts
        ResolvedScope::Profile(u) if viewer.is(u.id) => PostFilter::all().by_author(u.id),
        ResolvedScope::Profile(u) => PostFilter::publicly_visible(now).by_author(u.id),
    }
}

pub async fn list_posts(
    repo: &dyn Repo,
    scope: FeedScope<'_>,
    viewer: &Viewer,
    now: DateTime<Utc>,
    page: Option<&str>,
) -> RepoResult<Feed> {
    let scope = resolve_scope(repo, scope).await?;
    let filter = scope_filter(&scope, viewer, now);
    let paginator = Paginator::new(repo.count_posts(&filter).await?, POSTS_PER_PAGE);
    let number = paginator.page_number(page);
    let items = repo
        .find_posts(&filter, paginator.offset(number), paginator.per_page())
        .await?;
    Ok(Feed { scope, page: paginator.page(number, items) })
}

async fn category_of(repo: &dyn Repo, post: &Post) -> RepoResult<Option<Category>> {
    match post.category_id {
        None => Ok(None),
        Some(id) => match repo.get_category(id).await {
            Ok(c) => Ok(Some(c)),
            Err(RepoError::NotFound) => Ok(None),
            Err(e) => Err(e),
        },
    }
}

/// Fetches a post the viewer is allowed to read. Hidden posts are reported as
/// `NotFound`, same as missing ones.
pub async fn visible_post(repo: &dyn Repo, viewer: &Viewer, post_id: Id, now: DateTime<Utc>) -> RepoResult<Post> {
    let post = repo.get_post(post_id).await?;
    let category = category_of(repo, &post).await?;
    if !policy::can_view(viewer, &post, category.as_ref(), now) {
        return Err(RepoError::NotFound);
    }
    Ok(post)
}

pub async fn get_post_detail(repo: &dyn Repo, viewer: &Viewer, post_id: Id, now: DateTime<Utc>) -> RepoResult<PostDetail> {
    let post = visible_post(repo, viewer, post_id, now).await?;
    let comments = repo.list_comments(post.id).await?;
    Ok(PostDetail { form: CommentFormDescriptor::for_post(post.id), post, comments })
}
