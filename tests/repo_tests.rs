#![cfg(feature = "inmem-store")]

use blogicum::{
    filter::PostFilter,
    models::{CommentForm, NewCategory, NewLocation, NewUser, PostForm, ProfileUpdate},
    repo::{inmem::InMemRepo, RepoError},
};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use blogicum::repo::{CategoryRepo, CommentRepo, LocationRepo, PostRepo, UserRepo};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn new_user(name: &str) -> NewUser {
    NewUser { username: name.into(), email: format!("{name}@example.com"), password_hash: "x".into() }
}

fn new_category(slug: &str, published: bool) -> NewCategory {
    NewCategory { title: slug.to_uppercase(), description: String::new(), slug: slug.into(), is_published: published }
}

fn form(category_id: Option<i64>, pub_date: DateTime<Utc>) -> PostForm {
    PostForm {
        title: "Hello".into(),
        text: "World".into(),
        pub_date,
        is_published: true,
        category_id,
        location_id: None,
        image: None,
    }
}

#[tokio::test]
async fn usernames_and_slugs_are_unique() {
    let r = InMemRepo::new();
    r.create_user(new_user("ann"), now()).await.unwrap();
    assert!(matches!(r.create_user(new_user("ann"), now()).await, Err(RepoError::Conflict)));

    r.create_category(new_category("travel", true), now()).await.unwrap();
    assert!(matches!(
        r.create_category(new_category("travel", false), now()).await,
        Err(RepoError::Conflict)
    ));
}

#[tokio::test]
async fn profile_update_rejects_taken_username() {
    let r = InMemRepo::new();
    let ann = r.create_user(new_user("ann"), now()).await.unwrap();
    r.create_user(new_user("bob"), now()).await.unwrap();

    let upd = |name: &str| ProfileUpdate {
        username: name.into(),
        first_name: "Ann".into(),
        last_name: "Lee".into(),
        email: String::new(),
    };
    assert!(matches!(r.update_user(ann.id, upd("bob")).await, Err(RepoError::Conflict)));
    let renamed = r.update_user(ann.id, upd("annie")).await.unwrap();
    assert_eq!(renamed.username, "annie");
    assert_eq!(renamed.first_name, "Ann");
    assert_eq!(r.get_user_by_username("annie").await.unwrap().id, ann.id);
}

#[tokio::test]
async fn post_refs_must_exist() {
    let r = InMemRepo::new();
    let ann = r.create_user(new_user("ann"), now()).await.unwrap();
    assert!(matches!(r.create_post(ann.id, form(Some(999), now()), now()).await, Err(RepoError::NotFound)));
    assert!(matches!(r.create_post(999, form(None, now()), now()).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn deleting_category_uncategorises_and_hides_posts() {
    let r = InMemRepo::new();
    let ann = r.create_user(new_user("ann"), now()).await.unwrap();
    let cat = r.create_category(new_category("travel", true), now()).await.unwrap();
    let post = r.create_post(ann.id, form(Some(cat.id), now() - Duration::hours(1)), now()).await.unwrap();
    assert_eq!(r.count_posts(&PostFilter::publicly_visible(now())).await.unwrap(), 1);

    r.delete_category(cat.id).await.unwrap();
    let post = r.get_post(post.id).await.unwrap();
    assert_eq!(post.category_id, None);
    // an uncategorised post is never publicly visible
    assert_eq!(r.count_posts(&PostFilter::publicly_visible(now())).await.unwrap(), 0);
    assert_eq!(r.count_posts(&PostFilter::all().by_author(ann.id)).await.unwrap(), 1);
}

#[tokio::test]
async fn deleting_location_keeps_post() {
    let r = InMemRepo::new();
    let ann = r.create_user(new_user("ann"), now()).await.unwrap();
    let loc = r.create_location(NewLocation { name: "Oslo".into(), is_published: true }, now()).await.unwrap();
    let mut f = form(None, now());
    f.location_id = Some(loc.id);
    let post = r.create_post(ann.id, f, now()).await.unwrap();

    r.delete_location(loc.id).await.unwrap();
    assert_eq!(r.get_post(post.id).await.unwrap().location_id, None);
    assert!(matches!(r.get_location(loc.id).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn deleting_user_cascades_to_posts_and_comments() {
    let r = InMemRepo::new();
    let ann = r.create_user(new_user("ann"), now()).await.unwrap();
    let bob = r.create_user(new_user("bob"), now()).await.unwrap();
    let anns = r.create_post(ann.id, form(None, now()), now()).await.unwrap();
    let bobs = r.create_post(bob.id, form(None, now()), now()).await.unwrap();
    let on_anns = r.create_comment(anns.id, bob.id, CommentForm { text: "hi".into() }, now()).await.unwrap();
    let by_ann = r.create_comment(bobs.id, ann.id, CommentForm { text: "yo".into() }, now()).await.unwrap();

    r.delete_user(ann.id).await.unwrap();
    assert!(matches!(r.get_post(anns.id).await, Err(RepoError::NotFound)));
    assert!(matches!(r.get_comment(on_anns.id).await, Err(RepoError::NotFound)));
    assert!(matches!(r.get_comment(by_ann.id).await, Err(RepoError::NotFound)));
    assert!(r.get_post(bobs.id).await.is_ok());
}

#[tokio::test]
async fn comments_list_oldest_first_with_authors() {
    let r = InMemRepo::new();
    let ann = r.create_user(new_user("ann"), now()).await.unwrap();
    let bob = r.create_user(new_user("bob"), now()).await.unwrap();
    let post = r.create_post(ann.id, form(None, now()), now()).await.unwrap();

    let later = r.create_comment(post.id, bob.id, CommentForm { text: "second".into() }, now()).await.unwrap();
    let earlier = r
        .create_comment(post.id, ann.id, CommentForm { text: "first".into() }, now() - Duration::minutes(5))
        .await
        .unwrap();

    let list = r.list_comments(post.id).await.unwrap();
    let ids: Vec<_> = list.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![earlier.id, later.id]);
    assert_eq!(list[0].author.username, "ann");
    assert_eq!(list[1].author.username, "bob");
}

#[tokio::test]
async fn find_posts_orders_newest_first_and_counts_comments() {
    let r = InMemRepo::new();
    let ann = r.create_user(new_user("ann"), now()).await.unwrap();
    let cat = r.create_category(new_category("travel", true), now()).await.unwrap();
    let old = r.create_post(ann.id, form(Some(cat.id), now() - Duration::days(2)), now()).await.unwrap();
    let new = r.create_post(ann.id, form(Some(cat.id), now() - Duration::days(1)), now()).await.unwrap();
    for text in ["a", "b"] {
        r.create_comment(old.id, ann.id, CommentForm { text: text.into() }, now()).await.unwrap();
    }

    let found = r.find_posts(&PostFilter::publicly_visible(now()), 0, 10).await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].post.id, new.id);
    assert_eq!(found[0].comment_count, 0);
    assert_eq!(found[1].post.id, old.id);
    assert_eq!(found[1].comment_count, 2);

    let second = r.find_posts(&PostFilter::publicly_visible(now()), 1, 10).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].post.id, old.id);
}

#[tokio::test]
async fn deleting_post_removes_its_comments() {
    let r = InMemRepo::new();
    let ann = r.create_user(new_user("ann"), now()).await.unwrap();
    let post = r.create_post(ann.id, form(None, now()), now()).await.unwrap();
    let c = r.create_comment(post.id, ann.id, CommentForm { text: "x".into() }, now()).await.unwrap();

    r.delete_post(post.id).await.unwrap();
    assert!(matches!(r.get_comment(c.id).await, Err(RepoError::NotFound)));
    assert!(matches!(r.delete_post(post.id).await, Err(RepoError::NotFound)));
}
