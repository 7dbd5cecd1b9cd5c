#![cfg(feature = "inmem-store")]

use blogicum::{
    constants::POSTS_PER_PAGE,
    feed::{get_post_detail, list_posts, FeedScope, ResolvedScope},
    models::{Category, CommentForm, NewCategory, NewUser, PostForm, User},
    repo::{inmem::InMemRepo, CategoryRepo, CommentRepo, PostRepo, RepoError, UserRepo},
    viewer::Viewer,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

async fn user(r: &InMemRepo, name: &str) -> User {
    r.create_user(NewUser { username: name.into(), email: String::new(), password_hash: "x".into() }, now())
        .await
        .unwrap()
}

async fn category(r: &InMemRepo, slug: &str, published: bool) -> Category {
    r.create_category(
        NewCategory { title: slug.into(), description: String::new(), slug: slug.into(), is_published: published },
        now(),
    )
    .await
    .unwrap()
}

fn form(category_id: Option<i64>, pub_date: DateTime<Utc>, published: bool) -> PostForm {
    PostForm {
        title: "t".into(),
        text: "x".into(),
        pub_date,
        is_published: published,
        category_id,
        location_id: None,
        image: None,
    }
}

fn viewer_of(u: &User) -> Viewer {
    Viewer::user(u.id, u.username.clone())
}

#[tokio::test]
async fn scheduled_post_stays_out_of_feed_but_author_can_open_it() {
    let r = InMemRepo::new();
    let ann = user(&r, "ann").await;
    let bob = user(&r, "bob").await;
    let cat = category(&r, "travel", true).await;
    let a = r.create_post(ann.id, form(Some(cat.id), now() - Duration::days(1), true), now()).await.unwrap();
    let b = r.create_post(ann.id, form(Some(cat.id), now() + Duration::days(1), true), now()).await.unwrap();

    let feed = list_posts(&r, FeedScope::Global, &Viewer::Anonymous, now(), None).await.unwrap();
    let ids: Vec<_> = feed.page.items.iter().map(|p| p.post.id).collect();
    assert_eq!(ids, vec![a.id]);

    assert!(get_post_detail(&r, &viewer_of(&ann), b.id, now()).await.is_ok());
    assert!(matches!(get_post_detail(&r, &viewer_of(&bob), b.id, now()).await, Err(RepoError::NotFound)));
    assert!(matches!(get_post_detail(&r, &Viewer::Anonymous, b.id, now()).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn global_feed_excludes_every_hidden_kind() {
    let r = InMemRepo::new();
    let ann = user(&r, "ann").await;
    let open = category(&r, "open", true).await;
    let closed = category(&r, "closed", false).await;
    let past = now() - Duration::hours(1);
    let visible = r.create_post(ann.id, form(Some(open.id), past, true), now()).await.unwrap();
    r.create_post(ann.id, form(Some(open.id), past, false), now()).await.unwrap();
    r.create_post(ann.id, form(Some(closed.id), past, true), now()).await.unwrap();
    r.create_post(ann.id, form(None, past, true), now()).await.unwrap();

    let feed = list_posts(&r, FeedScope::Global, &viewer_of(&ann), now(), None).await.unwrap();
    assert_eq!(feed.page.count, 1);
    assert_eq!(feed.page.items[0].post.id, visible.id);
}

#[tokio::test]
async fn unpublished_category_feed_is_not_found() {
    let r = InMemRepo::new();
    let ann = user(&r, "ann").await;
    let hidden = category(&r, "hidden", false).await;
    r.create_post(ann.id, form(Some(hidden.id), now() - Duration::days(1), true), now()).await.unwrap();

    let res = list_posts(&r, FeedScope::Category { slug: "hidden" }, &Viewer::Anonymous, now(), None).await;
    assert!(matches!(res, Err(RepoError::NotFound)));
    let res = list_posts(&r, FeedScope::Category { slug: "missing" }, &Viewer::Anonymous, now(), None).await;
    assert!(matches!(res, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn category_feed_only_lists_its_own_posts() {
    let r = InMemRepo::new();
    let ann = user(&r, "ann").await;
    let travel = category(&r, "travel", true).await;
    let food = category(&r, "food", true).await;
    let t = r.create_post(ann.id, form(Some(travel.id), now() - Duration::days(1), true), now()).await.unwrap();
    r.create_post(ann.id, form(Some(food.id), now() - Duration::days(1), true), now()).await.unwrap();

    let feed = list_posts(&r, FeedScope::Category { slug: "travel" }, &Viewer::Anonymous, now(), None).await.unwrap();
    assert!(matches!(feed.scope, ResolvedScope::Category(ref c) if c.id == travel.id));
    assert_eq!(feed.page.items.len(), 1);
    assert_eq!(feed.page.items[0].post.id, t.id);
}

#[tokio::test]
async fn owner_profile_is_a_superset_of_public_profile() {
    let r = InMemRepo::new();
    let ann = user(&r, "ann").await;
    let bob = user(&r, "bob").await;
    let cat = category(&r, "travel", true).await;
    r.create_post(ann.id, form(Some(cat.id), now() - Duration::days(1), true), now()).await.unwrap();
    r.create_post(ann.id, form(Some(cat.id), now() - Duration::days(1), false), now()).await.unwrap();
    r.create_post(ann.id, form(Some(cat.id), now() + Duration::days(3), true), now()).await.unwrap();
    r.create_post(bob.id, form(Some(cat.id), now() - Duration::days(1), true), now()).await.unwrap();

    let scope = FeedScope::Profile { username: "ann" };
    let own = list_posts(&r, scope, &viewer_of(&ann), now(), None).await.unwrap();
    let seen = list_posts(&r, scope, &viewer_of(&bob), now(), None).await.unwrap();
    assert_eq!(own.page.count, 3);
    assert_eq!(seen.page.count, 1);
    for p in &seen.page.items {
        assert!(own.page.items.iter().any(|o| o.post.id == p.post.id));
    }
    // newest publication first, scheduled post included for the owner
    assert!(own.page.items[0].post.pub_date > now());

    let missing = list_posts(&r, FeedScope::Profile { username: "nobody" }, &Viewer::Anonymous, now(), None).await;
    assert!(matches!(missing, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn feed_pages_clamp_and_count_comments() {
    let r = InMemRepo::new();
    let ann = user(&r, "ann").await;
    let cat = category(&r, "travel", true).await;
    let mut newest = None;
    for i in 0..(POSTS_PER_PAGE * 2 + 1) {
        let p = r
            .create_post(ann.id, form(Some(cat.id), now() - Duration::minutes(i as i64 + 1), true), now())
            .await
            .unwrap();
        newest.get_or_insert(p.id);
    }
    let newest = newest.unwrap();
    for text in ["one", "two", "three"] {
        r.create_comment(newest, ann.id, CommentForm { text: text.into() }, now()).await.unwrap();
    }

    let first = list_posts(&r, FeedScope::Global, &Viewer::Anonymous, now(), Some("abc")).await.unwrap();
    assert_eq!(first.page.number, 1);
    assert_eq!(first.page.num_pages, 3);
    assert!(first.page.has_next && !first.page.has_previous);
    assert_eq!(first.page.items[0].post.id, newest);
    assert_eq!(first.page.items[0].comment_count, 3);
    assert_eq!(first.page.items[1].comment_count, 0);

    let last = list_posts(&r, FeedScope::Global, &Viewer::Anonymous, now(), Some("99")).await.unwrap();
    assert_eq!(last.page.number, 3);
    assert_eq!(last.page.items.len(), 1);
    assert!(!last.page.has_next);
}

#[tokio::test]
async fn empty_feed_is_a_single_empty_page() {
    let r = InMemRepo::new();
    let feed = list_posts(&r, FeedScope::Global, &Viewer::Anonymous, now(), Some("4")).await.unwrap();
    assert_eq!(feed.page.number, 1);
    assert_eq!(feed.page.num_pages, 1);
    assert!(feed.page.items.is_empty());
}
