#![cfg(feature = "postgres-store")]

use blogicum::filter::PostFilter;
use blogicum::models::{CommentForm, NewCategory, NewUser, PostForm};
use blogicum::repo::pg::PgRepo;
use blogicum::repo::{CategoryRepo, CommentRepo, PostRepo, RepoError, UserRepo};
use chrono::{Duration, Utc};
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;

/// Connects and migrates, or returns `None` so the test can be skipped.
async fn repo(test: &str) -> Option<PgRepo> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(u) => u,
        Err(_) => {
            eprintln!("skipping {test}: no DATABASE_URL set");
            return None;
        }
    };
    let pool = match PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("skipping {test}: db connect failed: {e}");
            return None;
        }
    };
    let repo = PgRepo::new(pool.clone());
    repo.migrate().await.expect("migrate");
    sqlx::query("TRUNCATE comments, posts, categories, locations, users RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .expect("truncate");
    Some(repo)
}

#[tokio::test]
#[serial]
async fn visibility_filter_matches_in_sql() {
    let Some(r) = repo("visibility_filter_matches_in_sql").await else { return };
    let now = Utc::now();
    let ann = r
        .create_user(NewUser { username: "ann".into(), email: String::new(), password_hash: "x".into() }, now)
        .await
        .unwrap();
    assert!(matches!(
        r.create_user(NewUser { username: "ann".into(), email: String::new(), password_hash: "x".into() }, now).await,
        Err(RepoError::Conflict)
    ));
    let cat = r
        .create_category(
            NewCategory { title: "T".into(), description: String::new(), slug: "t".into(), is_published: true },
            now,
        )
        .await
        .unwrap();
    let form = |pub_date| PostForm {
        title: "t".into(),
        text: "x".into(),
        pub_date,
        is_published: true,
        category_id: Some(cat.id),
        location_id: None,
        image: None,
    };
    let past = r.create_post(ann.id, form(now - Duration::hours(1)), now).await.unwrap();
    r.create_post(ann.id, form(now + Duration::hours(1)), now).await.unwrap();
    r.create_comment(past.id, ann.id, CommentForm { text: "c".into() }, now).await.unwrap();

    assert_eq!(r.count_posts(&PostFilter::publicly_visible(now)).await.unwrap(), 1);
    assert_eq!(r.count_posts(&PostFilter::all().by_author(ann.id)).await.unwrap(), 2);
    let found = r.find_posts(&PostFilter::publicly_visible(now), 0, 10).await.unwrap();
    assert_eq!(found[0].post.id, past.id);
    assert_eq!(found[0].comment_count, 1);

    r.delete_category(cat.id).await.unwrap();
    assert_eq!(r.get_post(past.id).await.unwrap().category_id, None);
    assert_eq!(r.count_posts(&PostFilter::publicly_visible(now)).await.unwrap(), 0);

    r.delete_user(ann.id).await.unwrap();
    assert!(matches!(r.get_post(past.id).await, Err(RepoError::NotFound)));
}
