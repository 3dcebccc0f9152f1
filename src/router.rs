use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::state::AppState;
use crate::web_pages::GENERATED_URL_PREFIX;
use crate::{api, web_pages};

/// Builds the full application router.
///
/// ```text
/// GET    /                      -> web_pages::index
/// GET    /gallery               -> web_pages::gallery   (?page=N)
/// GET    /download/{filename}   -> web_pages::download_image
/// GET    /static/generated/*    -> upload directory
/// POST   /api/generate          -> api::generate_image
/// DELETE /api/delete/{id}       -> api::delete_image
/// GET    /api/models            -> api::list_models
/// ```
pub fn build_router(state: AppState) -> Router {
    let generated = ServeDir::new(state.storage.base_dir());

    Router::new()
        .route("/", get(web_pages::index))
        .route("/gallery", get(web_pages::gallery))
        .route("/download/{filename}", get(web_pages::download_image))
        .route("/api/generate", post(api::generate_image))
        .route("/api/delete/{id}", delete(api::delete_image))
        .route("/api/models", get(api::list_models))
        .nest_service(GENERATED_URL_PREFIX, generated)
        .fallback(web_pages::not_found)
        .layer(DefaultBodyLimit::max(state.config.max_content_length))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
