use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers::{self, catalog, favorites};
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Authors
        .route(
            "/authors",
            get(catalog::list_authors).post(catalog::create_author),
        )
        .route(
            "/authors/:id",
            get(catalog::get_author)
                .put(catalog::update_author)
                .delete(catalog::delete_author),
        )
        // Books
        .route("/books", get(catalog::list_books).post(catalog::create_book))
        .route(
            "/books/:id",
            get(catalog::get_book)
                .put(catalog::update_book)
                .delete(catalog::delete_book),
        )
        // Favorites
        .route(
            "/users/:user_id/favorites",
            get(favorites::list_favorites).post(favorites::add_favorite),
        )
        .route(
            "/users/:user_id/favorites/:book_id",
            delete(favorites::remove_favorite),
        )
        .route(
            "/users/:user_id/recommendations",
            get(favorites::recommendations),
        )
}
