#![cfg(feature = "inmem-store")]

use actix_web::{test, web, App, HttpResponse};
use blogicum::clock::SystemClock;
use blogicum::repo::inmem::InMemRepo;
use blogicum::storage::FsImageStore;
use blogicum::{config, AppState, SecurityHeaders};
use std::sync::Arc;

fn state(media: &tempfile::TempDir) -> web::Data<AppState> {
    web::Data::new(AppState::new(
        Arc::new(InMemRepo::new()),
        Arc::new(FsImageStore::new(media.path())),
        Arc::new(SystemClock),
    ))
}

#[actix_web::test]
async fn baseline_headers_present() {
    let media = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new().wrap(SecurityHeaders::new(false)).app_data(state(&media)).configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/v1/posts").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert!(headers.get("content-security-policy").is_some());
    assert_eq!(headers.get("referrer-policy").unwrap(), "same-origin");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("strict-transport-security").is_none()); // not enabled
}

#[actix_web::test]
async fn hsts_only_when_enabled() {
    let media = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new().wrap(SecurityHeaders::new(true)).app_data(state(&media)).configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/v1/posts").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().get("strict-transport-security").is_some(), "HSTS header missing");
}

#[actix_web::test]
async fn headers_also_stamped_on_errors_and_redirects() {
    let media = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new().wrap(SecurityHeaders::new(false)).app_data(state(&media)).configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/v1/posts/404").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    assert!(resp.headers().get("x-frame-options").is_some());

    let req = test::TestRequest::post().uri("/api/v1/posts").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    assert!(resp.headers().get("content-security-policy").is_some());
}

#[actix_web::test]
async fn existing_csp_header_preserved() {
    let app = test::init_service(App::new().wrap(SecurityHeaders::default()).route(
        "/custom",
        web::get().to(|| async {
            HttpResponse::Ok()
                .insert_header((actix_web::http::header::CONTENT_SECURITY_POLICY, "custom-src 'none'"))
                .finish()
        }),
    ))
    .await;
    let req = test::TestRequest::get().uri("/custom").to_request();
    let resp = test::call_service(&app, req).await;
    let csp = resp.headers().get("content-security-policy").unwrap().to_str().unwrap();
    assert_eq!(csp, "custom-src 'none'");
}
