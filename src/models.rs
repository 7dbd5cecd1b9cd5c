use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::constants::{MAX_LENGTH, SLUG_MAX_LENGTH};

pub type Id = i64;

#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_joined: DateTime<Utc>,
    #[serde(skip)]
    pub password_hash: String, // argon2 PHC string, never leaves the server
}

/// Author attribution embedded in comment listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct UserSummary {
    pub id: Id,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Category {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = MAX_LENGTH))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = SLUG_MAX_LENGTH))]
    pub slug: String,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Location {
    pub id: Id,
    pub name: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct NewLocation {
    #[validate(length(min = 1, max = MAX_LENGTH))]
    pub name: String,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Post {
    pub id: Id,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub author_id: Id,
    pub category_id: Option<Id>,
    pub location_id: Option<Id>,
    pub image: Option<String>, // sha256 of an uploaded attachment
}

/// Submitted post fields. Used for both create and full update; the author is
/// never part of the form.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct PostForm {
    #[validate(length(min = 1, max = MAX_LENGTH))]
    pub title: String,
    #[validate(length(min = 1))]
    pub text: String,
    pub pub_date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_published: bool,
    #[serde(default)]
    pub category_id: Option<Id>,
    #[serde(default)]
    pub location_id: Option<Id>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct PostWithCommentCount {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: Post,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comment {
    pub id: Id,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub post_id: Id,
    pub author_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CommentForm {
    #[validate(length(min = 1))]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentWithAuthor {
    pub id: Id,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub post_id: Id,
    pub author: UserSummary,
}

/// Describes the empty comment form rendered under a post.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct CommentFormDescriptor {
    pub action: String,
    pub method: String,
    pub fields: Vec<String>,
}

impl CommentFormDescriptor {
    pub fn for_post(post_id: Id) -> Self {
        Self {
            action: format!("/api/v1/posts/{post_id}/comments"),
            method: "POST".into(),
            fields: vec!["text".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<CommentWithAuthor>,
    pub form: CommentFormDescriptor,
}

/// One page of an ordered listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(PostPage = Page<PostWithCommentCount>)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub per_page: usize,
    pub count: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryFeed {
    pub category: Category,
    #[schema(value_type = PostPage)]
    pub page: Page<PostWithCommentCount>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileFeed {
    pub profile: User,
    #[schema(value_type = PostPage)]
    pub page: Page<PostWithCommentCount>,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

fn default_true() -> bool {
    true
}

/// Slugs allow latin letters, digits, hyphen and underscore.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Usernames allow letters, digits and `@ . + - _`.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= 150
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}
