use crate::models::{
    Category, CategoryFeed, Comment, CommentForm, CommentFormDescriptor, CommentWithAuthor, Location, NewCategory,
    NewLocation, Post, PostDetail, PostForm, PostPage, PostWithCommentCount, ProfileFeed, ProfileUpdate, User,
    UserSummary,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::index,
        crate::routes::category_posts,
        crate::routes::profile,
        crate::routes::edit_profile,
        crate::routes::create_post,
        crate::routes::post_detail,
        crate::routes::update_post,
        crate::routes::delete_post,
        crate::routes::create_comment,
        crate::routes::update_comment,
        crate::routes::delete_comment,
        crate::routes::register,
        crate::routes::login,
        crate::routes::auth_me,
        crate::routes::upload_image,
        crate::routes::get_image,
        crate::routes::admin_create_category,
        crate::routes::admin_delete_category,
        crate::routes::admin_create_location,
        crate::routes::admin_delete_location,
    ),
    components(schemas(
        User, UserSummary, Category, NewCategory, Location, NewLocation,
        Post, PostForm, PostWithCommentCount, PostPage, PostDetail,
        Comment, CommentForm, CommentWithAuthor, CommentFormDescriptor,
        CategoryFeed, ProfileFeed, ProfileUpdate,
        crate::routes::RegisterRequest, crate::routes::LoginRequest, crate::routes::TokenResponse,
        crate::routes::MeResponse, crate::routes::ImageUploadResponse, crate::auth::Role,
    )),
    tags(
        (name = "posts", description = "Feeds, post detail and authoring"),
        (name = "comments", description = "Comment lifecycle"),
        (name = "auth", description = "Registration and login"),
    )
)]
pub struct ApiDoc;
