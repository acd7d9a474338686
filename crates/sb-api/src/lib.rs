//! # sb-api
//!
//! The web routing and orchestration layer for Serene.

pub mod handlers;
pub mod middleware;

use actix_web::web;

pub use handlers::AppState;

/// Configures the blog pages and the JSON API.
///
/// Mounted at the root by the binary; the JSON routes live under `/api`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/blog/{post_id}", web::get().to(handlers::view_post))
        .service(
            web::scope("/api")
                .service(
                    web::resource("/session")
                        .route(web::post().to(handlers::sign_in))
                        .route(web::delete().to(handlers::sign_out)),
                )
                .route("/blogs/{post_id}", web::get().to(handlers::post_view))
                .route("/blogs/{post_id}/comments", web::post().to(handlers::add_comment))
                .service(
                    web::resource("/blogs/{post_id}/comments/{comment_id}")
                        .route(web::patch().to(handlers::edit_comment))
                        .route(web::delete().to(handlers::delete_comment)),
                )
                .route("/appointments", web::post().to(handlers::book_appointment))
                .route("/admin/reviews", web::get().to(handlers::list_reviews))
                .route("/admin/reviews/{review_id}", web::delete().to(handlers::delete_review))
                .route(
                    "/admin/reviews/{review_id}/{action}",
                    web::post().to(handlers::moderate_review),
                ),
        );
}
