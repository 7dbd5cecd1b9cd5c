use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::filter::PostFilter;
use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, new: NewUser, joined_at: DateTime<Utc>) -> RepoResult<User>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    async fn get_user_by_username(&self, username: &str) -> RepoResult<User>;
    async fn update_user(&self, id: Id, upd: ProfileUpdate) -> RepoResult<User>;
    /// Removes the user together with their posts and comments.
    async fn delete_user(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn create_category(&self, new: NewCategory, created_at: DateTime<Utc>) -> RepoResult<Category>;
    async fn get_category(&self, id: Id) -> RepoResult<Category>;
    async fn get_category_by_slug(&self, slug: &str) -> RepoResult<Category>;
    /// Posts filed under the category stay, with their category cleared.
    async fn delete_category(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait LocationRepo: Send + Sync {
    async fn create_location(&self, new: NewLocation, created_at: DateTime<Utc>) -> RepoResult<Location>;
    async fn get_location(&self, id: Id) -> RepoResult<Location>;
    /// Posts at the location stay, with their location cleared.
    async fn delete_location(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create_post(&self, author_id: Id, form: PostForm, created_at: DateTime<Utc>) -> RepoResult<Post>;
    async fn get_post(&self, id: Id) -> RepoResult<Post>;
    async fn update_post(&self, id: Id, form: PostForm) -> RepoResult<Post>;
    /// Removes the post and its comments.
    async fn delete_post(&self, id: Id) -> RepoResult<()>;
    async fn count_posts(&self, filter: &PostFilter) -> RepoResult<usize>;
    /// Matching posts, newest publication first, annotated with comment counts.
    async fn find_posts(&self, filter: &PostFilter, offset: usize, limit: usize) -> RepoResult<Vec<PostWithCommentCount>>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Comments of a post, oldest first, with their authors.
    async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<CommentWithAuthor>>;
    async fn get_comment(&self, id: Id) -> RepoResult<Comment>;
    async fn create_comment(&self, post_id: Id, author_id: Id, form: CommentForm, created_at: DateTime<Utc>) -> RepoResult<Comment>;
    async fn update_comment(&self, id: Id, form: CommentForm) -> RepoResult<Comment>;
    async fn delete_comment(&self, id: Id) -> RepoResult<()>;
}

pub trait Repo: UserRepo + CategoryRepo + LocationRepo + PostRepo + CommentRepo {}

impl<T> Repo for T where T: UserRepo + CategoryRepo + LocationRepo + PostRepo + CommentRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

    #[derive(Default)]
    struct State {
        users: HashMap<Id, User>,
        categories: HashMap<Id, Category>,
        locations: HashMap<Id, Location>,
        posts: HashMap<Id, Post>,
        comments: HashMap<Id, Comment>,
        next_id: Id,
    }

    impl State {
        fn next_id(&mut self) -> Id {
            self.next_id += 1;
            self.next_id
        }

        fn category_of(&self, post: &Post) -> Option<&Category> {
            post.category_id.and_then(|id| self.categories.get(&id))
        }

        fn check_post_refs(&self, form: &PostForm) -> RepoResult<()> {
            if let Some(id) = form.category_id {
                if !self.categories.contains_key(&id) { return Err(RepoError::NotFound); }
            }
            if let Some(id) = form.location_id {
                if !self.locations.contains_key(&id) { return Err(RepoError::NotFound); }
            }
            Ok(())
        }

        fn remove_post(&mut self, id: Id) -> Option<Post> {
            let post = self.posts.remove(&id)?;
            self.comments.retain(|_, c| c.post_id != id);
            Some(post)
        }
    }

    /// Process-local store for development and tests. State is lost on exit.
    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self::default()
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|e| RepoError::Internal(e.to_string()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|e| RepoError::Internal(e.to_string()))
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn create_user(&self, new: NewUser, joined_at: DateTime<Utc>) -> RepoResult<User> {
            let mut s = self.write()?;
            if s.users.values().any(|u| u.username == new.username) {
                return Err(RepoError::Conflict);
            }
            let id = s.next_id();
            let user = User {
                id,
                username: new.username,
                first_name: String::new(),
                last_name: String::new(),
                email: new.email,
                date_joined: joined_at,
                password_hash: new.password_hash,
            };
            s.users.insert(id, user.clone());
            Ok(user)
        }
        async fn get_user(&self, id: Id) -> RepoResult<User> {
            self.read()?.users.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn get_user_by_username(&self, username: &str) -> RepoResult<User> {
            self.read()?
                .users
                .values()
                .find(|u| u.username == username)
                .cloned()
                .ok_or(RepoError::NotFound)
        }
        async fn update_user(&self, id: Id, upd: ProfileUpdate) -> RepoResult<User> {
            let mut s = self.write()?;
            if s.users.values().any(|u| u.username == upd.username && u.id != id) {
                return Err(RepoError::Conflict);
            }
            let user = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
            user.username = upd.username;
            user.first_name = upd.first_name;
            user.last_name = upd.last_name;
            user.email = upd.email;
            Ok(user.clone())
        }
        async fn delete_user(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            s.users.remove(&id).ok_or(RepoError::NotFound)?;
            let owned: Vec<Id> = s.posts.values().filter(|p| p.author_id == id).map(|p| p.id).collect();
            for post_id in owned {
                s.remove_post(post_id);
            }
            s.comments.retain(|_, c| c.author_id != id);
            Ok(())
        }
    }

    #[async_trait]
    impl CategoryRepo for InMemRepo {
        async fn create_category(&self, new: NewCategory, created_at: DateTime<Utc>) -> RepoResult<Category> {
            let mut s = self.write()?;
            if s.categories.values().any(|c| c.slug == new.slug) {
                return Err(RepoError::Conflict);
            }
            let id = s.next_id();
            let category = Category {
                id,
                title: new.title,
                description: new.description,
                slug: new.slug,
                is_published: new.is_published,
                created_at,
            };
            s.categories.insert(id, category.clone());
            Ok(category)
        }
        async fn get_category(&self, id: Id) -> RepoResult<Category> {
            self.read()?.categories.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn get_category_by_slug(&self, slug: &str) -> RepoResult<Category> {
            self.read()?
                .categories
                .values()
                .find(|c| c.slug == slug)
                .cloned()
                .ok_or(RepoError::NotFound)
        }
        async fn delete_category(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            s.categories.remove(&id).ok_or(RepoError::NotFound)?;
            for post in s.posts.values_mut().filter(|p| p.category_id == Some(id)) {
                post.category_id = None;
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LocationRepo for InMemRepo {
        async fn create_location(&self, new: NewLocation, created_at: DateTime<Utc>) -> RepoResult<Location> {
            let mut s = self.write()?;
            let id = s.next_id();
            let location = Location { id, name: new.name, is_published: new.is_published, created_at };
            s.locations.insert(id, location.clone());
            Ok(location)
        }
        async fn get_location(&self, id: Id) -> RepoResult<Location> {
            self.read()?.locations.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn delete_location(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            s.locations.remove(&id).ok_or(RepoError::NotFound)?;
            for post in s.posts.values_mut().filter(|p| p.location_id == Some(id)) {
                post.location_id = None;
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn create_post(&self, author_id: Id, form: PostForm, created_at: DateTime<Utc>) -> RepoResult<Post> {
            let mut s = self.write()?;
            if !s.users.contains_key(&author_id) { return Err(RepoError::NotFound); }
            s.check_post_refs(&form)?;
            let id = s.next_id();
            let post = Post {
                id,
                title: form.title,
                text: form.text,
                pub_date: form.pub_date,
                is_published: form.is_published,
                created_at,
                author_id,
                category_id: form.category_id,
                location_id: form.location_id,
                image: form.image,
            };
            s.posts.insert(id, post.clone());
            Ok(post)
        }
        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            self.read()?.posts.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn update_post(&self, id: Id, form: PostForm) -> RepoResult<Post> {
            let mut s = self.write()?;
            s.check_post_refs(&form)?;
            let post = s.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
            post.title = form.title;
            post.text = form.text;
            post.pub_date = form.pub_date;
            post.is_published = form.is_published;
            post.category_id = form.category_id;
            post.location_id = form.location_id;
            post.image = form.image;
            Ok(post.clone())
        }
        async fn delete_post(&self, id: Id) -> RepoResult<()> {
            self.write()?.remove_post(id).map(|_| ()).ok_or(RepoError::NotFound)
        }
        async fn count_posts(&self, filter: &PostFilter) -> RepoResult<usize> {
            let s = self.read()?;
            Ok(s.posts.values().filter(|p| filter.matches(p, s.category_of(p))).count())
        }
        async fn find_posts(&self, filter: &PostFilter, offset: usize, limit: usize) -> RepoResult<Vec<PostWithCommentCount>> {
            let s = self.read()?;
            let mut v: Vec<&Post> = s.posts.values()
                .filter(|p| filter.matches(p, s.category_of(p)))
                .collect();
            v.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id))); // newest first
            Ok(v.into_iter()
                .skip(offset)
                .take(limit)
                .map(|p| PostWithCommentCount {
                    post: p.clone(),
                    comment_count: s.comments.values().filter(|c| c.post_id == p.id).count() as i64,
                })
                .collect())
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<CommentWithAuthor>> {
            let s = self.read()?;
            let mut v: Vec<&Comment> = s.comments.values().filter(|c| c.post_id == post_id).collect();
            v.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))); // ascending
            v.into_iter()
                .map(|c| {
                    let author = s.users.get(&c.author_id).ok_or_else(|| {
                        RepoError::Internal(format!("comment {} has no author", c.id))
                    })?;
                    Ok(CommentWithAuthor {
                        id: c.id,
                        text: c.text.clone(),
                        created_at: c.created_at,
                        post_id: c.post_id,
                        author: UserSummary { id: author.id, username: author.username.clone() },
                    })
                })
                .collect()
        }
        async fn get_comment(&self, id: Id) -> RepoResult<Comment> {
            self.read()?.comments.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn create_comment(&self, post_id: Id, author_id: Id, form: CommentForm, created_at: DateTime<Utc>) -> RepoResult<Comment> {
            let mut s = self.write()?;
            if !s.posts.contains_key(&post_id) || !s.users.contains_key(&author_id) {
                return Err(RepoError::NotFound);
            }
            let id = s.next_id();
            let comment = Comment { id, text: form.text, created_at, post_id, author_id };
            s.comments.insert(id, comment.clone());
            Ok(comment)
        }
        async fn update_comment(&self, id: Id, form: CommentForm) -> RepoResult<Comment> {
            let mut s = self.write()?;
            let comment = s.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
            comment.text = form.text;
            Ok(comment.clone())
        }
        async fn delete_comment(&self, id: Id) -> RepoResult<()> {
            self.write()?.comments.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};

    const USER_COLUMNS: &str = "id, username, first_name, last_name, email, date_joined, password_hash";
    const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";
    const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";
    const POST_COLUMNS: &str = "p.id, p.title, p.text, p.pub_date, p.is_published, p.created_at, \
                                p.author_id, p.category_id, p.location_id, p.image";
    const COMMENT_COLUMNS: &str = "c.id, c.text, c.created_at, c.post_id, c.author_id";

    /// `PostFilter` as SQL over `posts p LEFT JOIN categories cat`; binds $1..$3.
    const POST_FILTER_SQL: &str = "($1::BIGINT IS NULL OR p.author_id = $1) \
         AND ($2::BIGINT IS NULL OR p.category_id = $2) \
         AND ($3::TIMESTAMPTZ IS NULL OR (p.is_published AND cat.is_published IS TRUE AND p.pub_date <= $3))";

    fn map_err(e: sqlx::Error) -> RepoError {
        match &e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("23505") => RepoError::Conflict,   // unique_violation
                Some("23503") => RepoError::NotFound,   // foreign_key_violation
                _ => RepoError::Internal(e.to_string()),
            },
            _ => RepoError::Internal(e.to_string()),
        }
    }

    fn expect_one(rows: u64) -> RepoResult<()> {
        if rows == 0 { Err(RepoError::NotFound) } else { Ok(()) }
    }

    #[derive(sqlx::FromRow)]
    struct CommentAuthorRow {
        #[sqlx(flatten)]
        comment: Comment,
        author_username: String,
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
            sqlx::migrate!("./migrations").run(&self.pool).await
        }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn create_user(&self, new: NewUser, joined_at: DateTime<Utc>) -> RepoResult<User> {
            sqlx::query_as::<_, User>(&format!(
                "INSERT INTO users (username, email, password_hash, date_joined) VALUES ($1,$2,$3,$4) RETURNING {USER_COLUMNS}"
            ))
            .bind(&new.username).bind(&new.email).bind(&new.password_hash).bind(joined_at)
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn get_user(&self, id: Id) -> RepoResult<User> {
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn get_user_by_username(&self, username: &str) -> RepoResult<User> {
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn update_user(&self, id: Id, upd: ProfileUpdate) -> RepoResult<User> {
            sqlx::query_as::<_, User>(&format!(
                "UPDATE users SET username = $2, first_name = $3, last_name = $4, email = $5 WHERE id = $1 RETURNING {USER_COLUMNS}"
            ))
            .bind(id).bind(&upd.username).bind(&upd.first_name).bind(&upd.last_name).bind(&upd.email)
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn delete_user(&self, id: Id) -> RepoResult<()> {
            // posts and comments go with ON DELETE CASCADE
            let res = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await.map_err(map_err)?;
            expect_one(res.rows_affected())
        }
    }

    #[async_trait]
    impl CategoryRepo for PgRepo {
        async fn create_category(&self, new: NewCategory, created_at: DateTime<Utc>) -> RepoResult<Category> {
            sqlx::query_as::<_, Category>(&format!(
                "INSERT INTO categories (title, description, slug, is_published, created_at) VALUES ($1,$2,$3,$4,$5) RETURNING {CATEGORY_COLUMNS}"
            ))
            .bind(&new.title).bind(&new.description).bind(&new.slug).bind(new.is_published).bind(created_at)
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn get_category(&self, id: Id) -> RepoResult<Category> {
            sqlx::query_as::<_, Category>(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn get_category_by_slug(&self, slug: &str) -> RepoResult<Category> {
            sqlx::query_as::<_, Category>(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1"))
                .bind(slug)
                .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn delete_category(&self, id: Id) -> RepoResult<()> {
            // posts.category_id is ON DELETE SET NULL
            let res = sqlx::query("DELETE FROM categories WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await.map_err(map_err)?;
            expect_one(res.rows_affected())
        }
    }

    #[async_trait]
    impl LocationRepo for PgRepo {
        async fn create_location(&self, new: NewLocation, created_at: DateTime<Utc>) -> RepoResult<Location> {
            sqlx::query_as::<_, Location>(&format!(
                "INSERT INTO locations (name, is_published, created_at) VALUES ($1,$2,$3) RETURNING {LOCATION_COLUMNS}"
            ))
            .bind(&new.name).bind(new.is_published).bind(created_at)
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn get_location(&self, id: Id) -> RepoResult<Location> {
            sqlx::query_as::<_, Location>(&format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn delete_location(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM locations WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await.map_err(map_err)?;
            expect_one(res.rows_affected())
        }
    }

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn create_post(&self, author_id: Id, form: PostForm, created_at: DateTime<Utc>) -> RepoResult<Post> {
            sqlx::query_as::<_, Post>(&format!(r#"
                INSERT INTO posts AS p (title, text, pub_date, is_published, created_at, author_id, category_id, location_id, image)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
                RETURNING {POST_COLUMNS}
            "#))
            .bind(&form.title).bind(&form.text).bind(form.pub_date).bind(form.is_published).bind(created_at)
            .bind(author_id).bind(form.category_id).bind(form.location_id).bind(&form.image)
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1"))
                .bind(id)
                .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn update_post(&self, id: Id, form: PostForm) -> RepoResult<Post> {
            sqlx::query_as::<_, Post>(&format!(r#"
                UPDATE posts p SET title = $2, text = $3, pub_date = $4, is_published = $5,
                       category_id = $6, location_id = $7, image = $8
                WHERE p.id = $1
                RETURNING {POST_COLUMNS}
            "#))
            .bind(id).bind(&form.title).bind(&form.text).bind(form.pub_date).bind(form.is_published)
            .bind(form.category_id).bind(form.location_id).bind(&form.image)
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn delete_post(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM posts WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await.map_err(map_err)?;
            expect_one(res.rows_affected())
        }
        async fn count_posts(&self, filter: &PostFilter) -> RepoResult<usize> {
            let n: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM posts p LEFT JOIN categories cat ON cat.id = p.category_id WHERE {POST_FILTER_SQL}"
            ))
            .bind(filter.author_id).bind(filter.category_id).bind(filter.visible_at)
            .fetch_one(&self.pool).await.map_err(map_err)?;
            Ok(n.max(0) as usize)
        }
        async fn find_posts(&self, filter: &PostFilter, offset: usize, limit: usize) -> RepoResult<Vec<PostWithCommentCount>> {
            sqlx::query_as::<_, PostWithCommentCount>(&format!(r#"
                SELECT {POST_COLUMNS}, COUNT(c.id) AS comment_count
                FROM posts p
                LEFT JOIN categories cat ON cat.id = p.category_id
                LEFT JOIN comments c ON c.post_id = p.id
                WHERE {POST_FILTER_SQL}
                GROUP BY p.id
                ORDER BY p.pub_date DESC, p.id DESC
                LIMIT $4 OFFSET $5
            "#))
            .bind(filter.author_id).bind(filter.category_id).bind(filter.visible_at)
            .bind(limit as i64).bind(offset as i64)
            .fetch_all(&self.pool).await.map_err(map_err)
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn list_comments(&self, post_id: Id) -> RepoResult<Vec<CommentWithAuthor>> {
            let rows = sqlx::query_as::<_, CommentAuthorRow>(&format!(r#"
                SELECT {COMMENT_COLUMNS}, u.username AS author_username
                FROM comments c
                JOIN users u ON u.id = c.author_id
                WHERE c.post_id = $1
                ORDER BY c.created_at ASC, c.id ASC
            "#))
            .bind(post_id)
            .fetch_all(&self.pool).await.map_err(map_err)?;
            Ok(rows.into_iter().map(|r| CommentWithAuthor {
                id: r.comment.id,
                text: r.comment.text,
                created_at: r.comment.created_at,
                post_id: r.comment.post_id,
                author: UserSummary { id: r.comment.author_id, username: r.author_username },
            }).collect())
        }
        async fn get_comment(&self, id: Id) -> RepoResult<Comment> {
            sqlx::query_as::<_, Comment>(&format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = $1"))
                .bind(id)
                .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn create_comment(&self, post_id: Id, author_id: Id, form: CommentForm, created_at: DateTime<Utc>) -> RepoResult<Comment> {
            sqlx::query_as::<_, Comment>(&format!(
                "INSERT INTO comments AS c (text, created_at, post_id, author_id) VALUES ($1,$2,$3,$4) RETURNING {COMMENT_COLUMNS}"
            ))
            .bind(&form.text).bind(created_at).bind(post_id).bind(author_id)
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn update_comment(&self, id: Id, form: CommentForm) -> RepoResult<Comment> {
            sqlx::query_as::<_, Comment>(&format!(
                "UPDATE comments c SET text = $2 WHERE c.id = $1 RETURNING {COMMENT_COLUMNS}"
            ))
            .bind(id).bind(&form.text)
            .fetch_one(&self.pool).await.map_err(map_err)
        }
        async fn delete_comment(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM comments WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await.map_err(map_err)?;
            expect_one(res.rows_affected())
        }
    }
}
