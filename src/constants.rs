/// Posts shown per feed page.
pub const POSTS_PER_PAGE: usize = 10;

/// Upper bound for titles and names.
pub const MAX_LENGTH: u64 = 256;

/// Upper bound for category slugs.
pub const SLUG_MAX_LENGTH: u64 = 50;

pub const IMAGE_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

pub const ALLOWED_IMAGE_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

pub const DEFAULT_LOGIN_URL: &str = "/api/v1/auth/login";
