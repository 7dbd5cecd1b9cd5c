use std::collections::HashSet;
use std::path::PathBuf;

use crate::constants::DEFAULT_LOGIN_URL;

/// Process configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub media_root: PathBuf,
    pub login_url: String,
    pub frontend_url: String,
    pub enable_hsts: bool,
    /// Usernames granted the admin role at login.
    pub admin_usernames: HashSet<String>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        use std::env;

        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set (copy .env.example to .env)"))?;
        if secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: env::var("DATABASE_URL").ok(),
            media_root: env::var("MEDIA_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("media")),
            login_url: env::var("LOGIN_URL").unwrap_or_else(|_| DEFAULT_LOGIN_URL.into()),
            frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".into()),
            enable_hsts: env::var("ENABLE_HSTS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            admin_usernames: parse_list(&env::var("BOOTSTRAP_ADMIN_USERNAMES").unwrap_or_default()),
        })
    }
}

fn parse_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
