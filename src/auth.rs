use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::future::{ready, Ready};
use utoipa::ToSchema;

use crate::constants::DEFAULT_LOGIN_URL;
use crate::error::ApiError;
use crate::models::Id;
use crate::routes::AppState;
use crate::viewer::{UserRef, Viewer};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub exp: usize,
    pub roles: Vec<Role>,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("JWT_SECRET not set")]
    MissingSecret,
    #[error("jwt: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("malformed subject")]
    BadSubject,
    #[error("password hashing failed")]
    Hash,
}

fn jwt_secret() -> Result<String, AuthError> {
    env::var("JWT_SECRET").map_err(|_| AuthError::MissingSecret)
}

/// Validate a JWT and return its claims.
pub fn decode_jwt(token: &str) -> Result<Claims, AuthError> {
    let secret = jwt_secret()?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

/// Issue a 24h token for a user.
pub fn create_jwt(user_id: Id, username: &str, roles: Vec<Role>) -> Result<String, AuthError> {
    let secret = jwt_secret()?;
    let expiration = (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: expiration,
        roles,
    };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))?)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AuthError::Hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

fn user_ref(claims: &Claims) -> Result<UserRef, AuthError> {
    let id = claims.sub.parse::<Id>().map_err(|_| AuthError::BadSubject)?;
    Ok(UserRef { id, username: claims.username.clone() })
}

/// `None` when no bearer header is present.
fn bearer_claims(req: &HttpRequest, pl: &mut Payload) -> Option<Result<Claims, AuthError>> {
    let bearer = BearerAuth::from_request(req, pl).into_inner().ok()?;
    Some(decode_jwt(bearer.token()))
}

/// Identity of the current request; never fails. A bad token reads as anonymous.
impl FromRequest for Viewer {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let viewer = match bearer_claims(req, pl) {
            None => Viewer::Anonymous,
            Some(res) => match res.and_then(|c| user_ref(&c)) {
                Ok(u) => Viewer::User(u),
                Err(e) => {
                    tracing::debug!("ignoring invalid bearer token: {e}");
                    Viewer::Anonymous
                }
            },
        };
        ready(Ok(viewer))
    }
}

/// Extractor guarding every create/update/delete entry point.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: UserRef,
    pub roles: Vec<Role>,
}

impl Authenticated {
    pub fn viewer(&self) -> Viewer {
        Viewer::User(self.user.clone())
    }
}

/// Where unauthenticated writers are sent, remembering the requested path.
fn login_redirect(req: &HttpRequest) -> String {
    let base = req
        .app_data::<web::Data<AppState>>()
        .map(|s| s.login_url.clone())
        .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string());
    format!("{}?next={}", base, urlencoding::encode(req.path()))
}

impl FromRequest for Authenticated {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let res = bearer_claims(req, pl)
            .and_then(|r| r.ok())
            .and_then(|claims| {
                let user = user_ref(&claims).ok()?;
                Some(Authenticated { user, roles: claims.roles })
            })
            .ok_or_else(|| ApiError::Unauthenticated { login_url: login_redirect(req) });
        ready(res)
    }
}

/// Helper macro for role-guarding handlers that return `ApiError`.
#[macro_export]
macro_rules! require_role {
    ($auth:expr, $role:pat) => {
        if !$auth.roles.iter().any(|r| matches!(r, $role)) {
            return Err($crate::error::ApiError::Forbidden);
        }
    };
}
