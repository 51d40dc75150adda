use crate::interface_adapters::http::error_response;
use crate::interface_adapters::net::client::spawn_arena_serializer;
use crate::interface_adapters::state::AppState;
use crate::use_cases::ArenaError;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
pub struct ArenaCreateRequest {
    arena_id: String,
}

#[derive(Debug, serde::Serialize)]
struct ArenaCreateResponse {
    // The arena id that was created.
    arena_id: String,
}

pub async fn create_arena_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ArenaCreateRequest>,
) -> impl IntoResponse {
    let arena_id = payload.arena_id.trim().to_string();
    if arena_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "arena_id is required");
    }

    match state.arena_registry.create_arena(arena_id.clone()).await {
        Ok(arena) => {
            // Create serializers so clients can subscribe immediately.
            spawn_arena_serializer(&arena);
            (StatusCode::CREATED, Json(ArenaCreateResponse { arena_id })).into_response()
        }
        Err(ArenaError::AlreadyExists) => {
            error_response(StatusCode::CONFLICT, "arena already exists")
        }
    }
}

pub async fn delete_arena_handler(
    State(state): State<Arc<AppState>>,
    Path(arena_id): Path<String>,
) -> impl IntoResponse {
    if state.arena_registry.remove_arena(&arena_id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "arena not found")
    }
}
