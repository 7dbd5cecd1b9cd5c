use std::collections::HashSet;
use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidateEmail};

use crate::auth::{self, Authenticated, Role};
use crate::clock::Clock;
use crate::constants::{ALLOWED_IMAGE_MIME, DEFAULT_LOGIN_URL, IMAGE_SIZE_LIMIT};
use crate::error::ApiError;
use crate::feed::{self, FeedScope, ResolvedScope};
use crate::models::*;
use crate::policy::{self, Access};
use crate::repo::{Repo, RepoError};
use crate::require_role;
use crate::storage::{ImageStore, ImageStoreError};
use crate::viewer::Viewer;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::resource("/posts")
                    .route(web::get().to(index))
                    .route(web::post().to(create_post)),
            )
            .service(
                web::resource("/posts/{id}")
                    .route(web::get().to(post_detail))
                    .route(web::put().to(update_post))
                    .route(web::delete().to(delete_post)),
            )
            .service(web::resource("/posts/{id}/comments").route(web::post().to(create_comment)))
            .service(
                web::resource("/posts/{post_id}/comments/{comment_id}")
                    .route(web::put().to(update_comment))
                    .route(web::delete().to(delete_comment)),
            )
            .service(web::resource("/category/{slug}").route(web::get().to(category_posts)))
            .service(web::resource("/profile").route(web::put().to(edit_profile)))
            .service(web::resource("/profile/{username}").route(web::get().to(profile)))
            .service(web::resource("/auth/registration").route(web::post().to(register)))
            .service(web::resource("/auth/login").route(web::post().to(login)))
            .service(web::resource("/auth/me").route(web::get().to(auth_me)))
            .service(web::resource("/images").route(web::post().to(upload_image)))
            .service(web::resource("/admin/categories").route(web::post().to(admin_create_category)))
            .service(web::resource("/admin/categories/{id}").route(web::delete().to(admin_delete_category)))
            .service(web::resource("/admin/locations").route(web::post().to(admin_create_location)))
            .service(web::resource("/admin/locations/{id}").route(web::delete().to(admin_delete_location))),
    );
    // public fetch route (no /api/v1 prefix so <img src="/images/{hash}"> works)
    cfg.route("/images/{hash}", web::get().to(get_image));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub image_store: Arc<dyn ImageStore>,
    pub clock: Arc<dyn Clock>,
    pub login_url: String,
    pub admin_usernames: Arc<HashSet<String>>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repo>, image_store: Arc<dyn ImageStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            image_store,
            clock,
            login_url: DEFAULT_LOGIN_URL.to_string(),
            admin_usernames: Arc::new(HashSet::new()),
        }
    }

    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }

    pub fn with_admins(mut self, usernames: HashSet<String>) -> Self {
        self.admin_usernames = Arc::new(usernames);
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

pub fn post_detail_url(post_id: Id) -> String {
    format!("/api/v1/posts/{post_id}")
}

/// Soft deny: bounce the viewer to a post's detail page.
fn redirect_to_post(post_id: Id) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, post_detail_url(post_id)))
        .finish()
}

// ---------------- Feeds ----------------

#[utoipa::path(
    get,
    path = "/api/v1/posts",
    params(("page" = Option<String>, Query, description = "Page number; out of range clamps to the last page")),
    responses((status = 200, description = "Published posts, newest first", body = PostPage))
)]
pub async fn index(viewer: Viewer, data: web::Data<AppState>, query: web::Query<PageQuery>) -> Result<HttpResponse, ApiError> {
    let feed = feed::list_posts(data.repo.as_ref(), FeedScope::Global, &viewer, data.clock.now(), query.page.as_deref()).await?;
    Ok(HttpResponse::Ok().json(feed.page))
}

#[utoipa::path(
    get,
    path = "/api/v1/category/{slug}",
    params(("slug" = String, Path, description = "Category slug"), ("page" = Option<String>, Query, description = "Page number")),
    responses(
        (status = 200, description = "Category posts", body = CategoryFeed),
        (status = 404, description = "Category missing or unpublished")
    )
)]
pub async fn category_posts(
    viewer: Viewer,
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let slug = path.into_inner();
    let feed = feed::list_posts(data.repo.as_ref(), FeedScope::Category { slug: &slug }, &viewer, data.clock.now(), query.page.as_deref()).await?;
    match feed.scope {
        ResolvedScope::Category(category) => Ok(HttpResponse::Ok().json(CategoryFeed { category, page: feed.page })),
        _ => Err(ApiError::Internal),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/profile/{username}",
    params(("username" = String, Path, description = "Profile owner"), ("page" = Option<String>, Query, description = "Page number")),
    responses(
        (status = 200, description = "Profile with posts; the owner also sees drafts", body = ProfileFeed),
        (status = 404, description = "User not found")
    )
)]
pub async fn profile(
    viewer: Viewer,
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let username = path.into_inner();
    let feed = feed::list_posts(data.repo.as_ref(), FeedScope::Profile { username: &username }, &viewer, data.clock.now(), query.page.as_deref()).await?;
    match feed.scope {
        ResolvedScope::Profile(profile) => Ok(HttpResponse::Ok().json(ProfileFeed { profile, page: feed.page })),
        _ => Err(ApiError::Internal),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 302, description = "Not logged in"),
        (status = 403, description = "Username reserved for an administrator"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn edit_profile(auth: Authenticated, data: web::Data<AppState>, payload: web::Json<ProfileUpdate>) -> Result<HttpResponse, ApiError> {
    let upd = payload.into_inner();
    upd.validate()?;
    if !is_valid_username(&upd.username) {
        return Err(ApiError::BadRequest("invalid username".into()));
    }
    if !upd.email.is_empty() && !upd.email.validate_email() {
        return Err(ApiError::BadRequest("invalid email".into()));
    }
    // admin names are granted by name at login, so nobody may rename into one
    let current = data.repo.get_user(auth.user.id).await?;
    if upd.username != current.username && data.admin_usernames.contains(&upd.username) {
        warn!(user_id = current.id, requested = %upd.username, "rename into reserved admin name refused");
        return Err(ApiError::Forbidden);
    }
    let user = data.repo.update_user(current.id, upd).await?;
    Ok(HttpResponse::Ok().json(user))
}

// ---------------- Posts ----------------

/// Category, location and image named by the form must exist.
async fn check_post_refs(data: &AppState, form: &PostForm) -> Result<(), ApiError> {
    form.validate()?;
    if let Some(id) = form.category_id {
        data.repo.get_category(id).await.map_err(|e| match e {
            RepoError::NotFound => ApiError::BadRequest(format!("unknown category {id}")),
            other => other.into(),
        })?;
    }
    if let Some(id) = form.location_id {
        data.repo.get_location(id).await.map_err(|e| match e {
            RepoError::NotFound => ApiError::BadRequest(format!("unknown location {id}")),
            other => other.into(),
        })?;
    }
    if let Some(hash) = form.image.as_deref() {
        let known = data.image_store.exists(hash).await.map_err(|e| {
            tracing::error!("image_store exists error: {e}");
            ApiError::Internal
        })?;
        if !known {
            return Err(ApiError::BadRequest(format!("unknown image {hash}")));
        }
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = PostForm,
    responses(
        (status = 201, description = "Post created; author is the caller", body = Post),
        (status = 302, description = "Not logged in"),
        (status = 400, description = "Invalid form")
    )
)]
pub async fn create_post(auth: Authenticated, data: web::Data<AppState>, payload: web::Json<PostForm>) -> Result<HttpResponse, ApiError> {
    let form = payload.into_inner();
    check_post_refs(&data, &form).await?;
    let post = data.repo.create_post(auth.user.id, form, data.clock.now()).await?;
    info!(post_id = post.id, author = %auth.user.username, "post created");
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post with comments", body = PostDetail),
        (status = 404, description = "Missing or not visible")
    )
)]
pub async fn post_detail(viewer: Viewer, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let detail = feed::get_post_detail(data.repo.as_ref(), &viewer, path.into_inner(), data.clock.now()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}",
    request_body = PostForm,
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post updated", body = Post),
        (status = 302, description = "Not the author (redirect to detail) or not logged in"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn update_post(
    auth: Authenticated,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<PostForm>,
) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    if let Access::Redirect { post_id } = policy::modify_access(&auth.viewer(), &post, post.id) {
        warn!(post_id, user = %auth.user.username, "edit denied: not the author");
        return Ok(redirect_to_post(post_id));
    }
    let form = payload.into_inner();
    check_post_refs(&data, &form).await?;
    let post = data.repo.update_post(post.id, form).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post and its comments deleted"),
        (status = 302, description = "Not the author (redirect to detail) or not logged in"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post(auth: Authenticated, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    if let Access::Redirect { post_id } = policy::modify_access(&auth.viewer(), &post, post.id) {
        warn!(post_id, user = %auth.user.username, "delete denied: not the author");
        return Ok(redirect_to_post(post_id));
    }
    data.repo.delete_post(post.id).await?;
    info!(post_id = post.id, "post deleted");
    Ok(HttpResponse::NoContent().finish())
}

// ---------------- Comments ----------------

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/comments",
    request_body = CommentForm,
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 302, description = "Not logged in"),
        (status = 404, description = "Post missing")
    )
)]
pub async fn create_comment(
    auth: Authenticated,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<CommentForm>,
) -> Result<HttpResponse, ApiError> {
    let form = payload.into_inner();
    form.validate()?;
    let now = data.clock.now();
    // post and author come from the path and the token, never from the body.
    // Any existing post takes comments, published or not.
    let post = data.repo.get_post(path.into_inner()).await?;
    let comment = data.repo.create_comment(post.id, auth.user.id, form, now).await?;
    Ok(HttpResponse::Created().json(comment))
}

/// Ownership gate shared by comment edit and delete. Denied viewers go to the
/// post named in the path.
async fn owned_comment(auth: &Authenticated, data: &AppState, post_id: Id, comment_id: Id) -> Result<Result<Comment, HttpResponse>, ApiError> {
    let comment = data.repo.get_comment(comment_id).await?;
    match policy::modify_access(&auth.viewer(), &comment, post_id) {
        Access::Granted => Ok(Ok(comment)),
        Access::Redirect { post_id } => {
            warn!(comment_id, user = %auth.user.username, "comment change denied: not the author");
            Ok(Err(redirect_to_post(post_id)))
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/posts/{post_id}/comments/{comment_id}",
    request_body = CommentForm,
    params(("post_id" = Id, Path, description = "Post id"), ("comment_id" = Id, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 302, description = "Not the author (redirect to post) or not logged in"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn update_comment(
    auth: Authenticated,
    data: web::Data<AppState>,
    path: web::Path<(Id, Id)>,
    payload: web::Json<CommentForm>,
) -> Result<HttpResponse, ApiError> {
    let (post_id, comment_id) = path.into_inner();
    let comment = match owned_comment(&auth, &data, post_id, comment_id).await? {
        Ok(c) => c,
        Err(redirect) => return Ok(redirect),
    };
    let form = payload.into_inner();
    form.validate()?;
    let comment = data.repo.update_comment(comment.id, form).await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{post_id}/comments/{comment_id}",
    params(("post_id" = Id, Path, description = "Post id"), ("comment_id" = Id, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 302, description = "Not the author (redirect to post) or not logged in"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(auth: Authenticated, data: web::Data<AppState>, path: web::Path<(Id, Id)>) -> Result<HttpResponse, ApiError> {
    let (post_id, comment_id) = path.into_inner();
    let comment = match owned_comment(&auth, &data, post_id, comment_id).await? {
        Ok(c) => c,
        Err(redirect) => return Ok(redirect),
    };
    data.repo.delete_comment(comment.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ---------------- Accounts ----------------

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: Id,
    pub username: String,
    pub roles: Vec<Role>,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/registration",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid username or password"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn register(data: web::Data<AppState>, payload: web::Json<RegisterRequest>) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    req.validate()?;
    if !is_valid_username(&req.username) {
        return Err(ApiError::BadRequest("invalid username".into()));
    }
    if !req.email.is_empty() && !req.email.validate_email() {
        return Err(ApiError::BadRequest("invalid email".into()));
    }
    let password_hash = auth::hash_password(&req.password).map_err(|e| {
        tracing::error!("{e}");
        ApiError::Internal
    })?;
    let user = data
        .repo
        .create_user(NewUser { username: req.username, email: req.email, password_hash }, data.clock.now())
        .await?;
    info!(user_id = user.id, "user registered");
    Ok(HttpResponse::Created().json(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(data: web::Data<AppState>, payload: web::Json<LoginRequest>) -> Result<HttpResponse, ApiError> {
    let user = match data.repo.get_user_by_username(&payload.username).await {
        Ok(u) => u,
        Err(RepoError::NotFound) => return Err(ApiError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };
    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }
    let mut roles = vec![Role::User];
    if data.admin_usernames.contains(&user.username) {
        roles.push(Role::Admin);
    }
    let token = auth::create_jwt(user.id, &user.username, roles).map_err(|e| {
        tracing::error!("{e}");
        ApiError::Internal
    })?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 302, description = "Not logged in"),
        (status = 404, description = "Account no longer exists")
    )
)]
pub async fn auth_me(auth: Authenticated, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    // the token keeps the name it was issued with; report the stored one
    let user = data.repo.get_user(auth.user.id).await?;
    Ok(HttpResponse::Ok().json(MeResponse { id: user.id, username: user.username, roles: auth.roles }))
}

// ---------------- Images ----------------

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageUploadResponse {
    pub hash: String,
    pub mime: String,
    pub size: usize,
    pub duplicate: bool, // true when the same bytes were already stored
}

#[utoipa::path(
    post,
    path = "/api/v1/images",
    responses(
        (status = 201, description = "Image stored (new)", body = ImageUploadResponse),
        (status = 200, description = "Image already existed", body = ImageUploadResponse),
        (status = 302, description = "Not logged in"),
        (status = 413, description = "Payload too large"),
        (status = 415, description = "Unsupported media type")
    )
)]
pub async fn upload_image(_auth: Authenticated, data: web::Data<AppState>, mut payload: Multipart) -> Result<HttpResponse, ApiError> {
    use actix_web::http::StatusCode;
    while let Some(mut field) = payload.try_next().await.map_err(|e| ApiError::BadRequest(e.to_string()))? {
        if field.content_disposition().get_name() != Some("file") {
            continue;
        }
        let mut bytes: Vec<u8> = Vec::new();
        let mut hasher = Sha256::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| ApiError::BadRequest(e.to_string()))? {
            if bytes.len() + chunk.len() > IMAGE_SIZE_LIMIT {
                return Ok(HttpResponse::build(StatusCode::PAYLOAD_TOO_LARGE).finish());
            }
            hasher.update(&chunk);
            bytes.extend_from_slice(&chunk);
        }
        let hash = format!("{:x}", hasher.finalize());
        let mime = infer::get(&bytes).map(|t| t.mime_type().to_string()).unwrap_or_default();
        if !ALLOWED_IMAGE_MIME.contains(&mime.as_str()) {
            return Ok(HttpResponse::UnsupportedMediaType().finish());
        }
        let (status, duplicate) = match data.image_store.save(&hash, &bytes).await {
            Ok(()) => (StatusCode::CREATED, false),
            Err(ImageStoreError::Duplicate) => (StatusCode::OK, true),
            Err(e) => {
                tracing::error!("image_store save error: {e}");
                return Err(ApiError::Internal);
            }
        };
        let resp = ImageUploadResponse { hash, mime, size: bytes.len(), duplicate };
        return Ok(HttpResponse::build(status).json(resp));
    }
    Err(ApiError::BadRequest("missing 'file' field".into()))
}

#[utoipa::path(
    get,
    path = "/images/{hash}",
    params(("hash" = String, Path, description = "sha256 of the image bytes")),
    responses(
        (status = 200, description = "Image bytes with sniffed content type"),
        (status = 404, description = "No such image")
    )
)]
pub async fn get_image(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    match data.image_store.load(&path.into_inner()).await {
        Ok((bytes, mime)) => Ok(HttpResponse::Ok().insert_header((header::CONTENT_TYPE, mime)).body(bytes)),
        Err(ImageStoreError::NotFound) => Err(ApiError::NotFound),
        Err(e) => {
            tracing::error!("image_store load error: {e}");
            Err(ApiError::Internal)
        }
    }
}

// ---------------- Admin maintenance ----------------

#[utoipa::path(
    post,
    path = "/api/v1/admin/categories",
    request_body = NewCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 403, description = "Admins only"),
        (status = 409, description = "Slug taken")
    )
)]
pub async fn admin_create_category(auth: Authenticated, data: web::Data<AppState>, payload: web::Json<NewCategory>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let new = payload.into_inner();
    new.validate()?;
    if !is_valid_slug(&new.slug) {
        return Err(ApiError::BadRequest("slug may contain only latin letters, digits, '-' and '_'".into()));
    }
    let category = data.repo.create_category(new, data.clock.now()).await?;
    Ok(HttpResponse::Created().json(category))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/categories/{id}",
    params(("id" = Id, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted; its posts lose their category"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn admin_delete_category(auth: Authenticated, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let id = path.into_inner();
    data.repo.delete_category(id).await?;
    info!(category_id = id, "category deleted; its posts are now uncategorised");
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/locations",
    request_body = NewLocation,
    responses(
        (status = 201, description = "Location created", body = Location),
        (status = 403, description = "Admins only")
    )
)]
pub async fn admin_create_location(auth: Authenticated, data: web::Data<AppState>, payload: web::Json<NewLocation>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    let new = payload.into_inner();
    new.validate()?;
    let location = data.repo.create_location(new, data.clock.now()).await?;
    Ok(HttpResponse::Created().json(location))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/locations/{id}",
    params(("id" = Id, Path, description = "Location id")),
    responses(
        (status = 204, description = "Location deleted; its posts lose their location"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Location not found")
    )
)]
pub async fn admin_delete_location(auth: Authenticated, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    require_role!(auth, Role::Admin);
    data.repo.delete_location(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
