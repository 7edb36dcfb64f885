use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    api::AppState,
    error::AppResult,
    middleware::RequestId,
    models::{Book, BookId, Favorite, FavoriteWithRecommendations, UserId},
};

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub book_id: BookId,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub book_id: BookId,
}

/// List a user's favorites
pub async fn list_favorites(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<Vec<Favorite>>> {
    Ok(Json(state.favorites.list_favorites(user_id).await?))
}

/// Add a favorite and respond with books similar to it
pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<UserId>,
    Json(request): Json<AddFavoriteRequest>,
) -> AppResult<(StatusCode, Json<FavoriteWithRecommendations>)> {
    tracing::info!(
        request_id = %request_id,
        user_id,
        book_id = request.book_id,
        "Processing add favorite request"
    );

    let result = state
        .favorites
        .add_favorite(user_id, request.book_id)
        .await?;

    tracing::info!(
        request_id = %request_id,
        recommended = result.recommended.len(),
        "Favorite stored"
    );

    Ok((StatusCode::CREATED, Json(result)))
}

/// Remove a favorite
pub async fn remove_favorite(
    State(state): State<AppState>,
    Path((user_id, book_id)): Path<(UserId, BookId)>,
) -> AppResult<StatusCode> {
    state.favorites.remove_favorite(user_id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Recommendations for a book without favoriting it
pub async fn recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state
        .favorites
        .recommendations_for(user_id, query.book_id)
        .await?;
    Ok(Json(books))
}
