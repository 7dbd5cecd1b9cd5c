use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use blogicum::clock::SystemClock;
use blogicum::openapi::ApiDoc;
use blogicum::repo::Repo;
use blogicum::settings::Settings;
use blogicum::storage::build_image_store;
use blogicum::{config, AppState, SecurityHeaders};

#[cfg(feature = "postgres-store")]
async fn build_repo(settings: &Settings) -> anyhow::Result<Arc<dyn Repo>> {
    use blogicum::repo::pg::PgRepo;
    use sqlx::postgres::PgPoolOptions;

    let db_url = settings
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for postgres-store"))?;
    let pool = PgPoolOptions::new().max_connections(5).connect(db_url).await?;
    let repo = PgRepo::new(pool);
    repo.migrate().await?;
    info!("Using Postgres repository backend");
    Ok(Arc::new(repo))
}

#[cfg(not(feature = "postgres-store"))]
async fn build_repo(_settings: &Settings) -> anyhow::Result<Arc<dyn Repo>> {
    info!("Using in-memory repository backend (data is lost on restart)");
    Ok(Arc::new(blogicum::repo::inmem::InMemRepo::new()))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds; production sets the environment externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let settings = Settings::from_env()?;
    info!("Bootstrapping blogicum");
    info!("Frontend URL: {}", settings.frontend_url);

    let repo = build_repo(&settings).await?;
    let image_store = build_image_store(&settings).await?;
    let state = AppState::new(repo, image_store, Arc::new(SystemClock))
        .with_login_url(settings.login_url.clone())
        .with_admins(settings.admin_usernames.clone());
    let openapi = ApiDoc::openapi();

    let frontend_url = settings.frontend_url.clone();
    let enable_hsts = settings.enable_hsts;
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::new(enable_hsts))
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
    })
    .bind(settings.bind_addr.as_str())?;

    info!("Listening on http://{}", settings.bind_addr);
    server.run().await?;
    Ok(())
}
