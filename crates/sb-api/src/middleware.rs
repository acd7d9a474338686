//! serene/crates/sb-api/src/middleware.rs
//!
//! Access logging, CORS and response headers for the site.

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};

/// Access log: remote-ip "request-line" status size "referrer" "user-agent" time.
pub fn access_log() -> Logger {
    Logger::new(r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %Dms"#)
}

// The comment routes need PATCH and DELETE plus the bearer header.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600)
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::REFERRER_POLICY, "strict-origin-when-cross-origin"))
        .add((header::X_FRAME_OPTIONS, "DENY"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    #[actix_web::test]
    async fn responses_carry_security_headers() {
        let app = test::init_service(
            App::new()
                .wrap(security_headers())
                .wrap(access_log())
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(res.status().is_success());
        assert_eq!(res.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(res.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    }

    #[actix_web::test]
    async fn preflight_allows_comment_edits() {
        let app = test::init_service(
            App::new()
                .wrap(cors_policy())
                .route("/api/blogs/p1/comments/c1", web::patch().to(|| async { HttpResponse::NoContent().finish() })),
        )
        .await;

        let req = test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/api/blogs/p1/comments/c1")
            .insert_header((header::ORIGIN, "https://serene.spa"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.status().is_success());
        let allowed = res
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(allowed.contains("PATCH"));
    }
}
