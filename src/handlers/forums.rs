use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::{
    AppState,
    error::Result,
    models::{CreateForumRequest, CreateThreadRequest, Forum, ForumListQuery, Thread, User},
    services::Creation,
};

/// 201 with the new record, or 409 with the one already there.
fn creation_response<T: serde::Serialize>(creation: Creation<T>) -> Response {
    match creation {
        Creation::Created(value) => (StatusCode::CREATED, Json(value)).into_response(),
        Creation::Exists(value) => (StatusCode::CONFLICT, Json(value)).into_response(),
    }
}

pub async fn create_forum(
    State(state): State<AppState>,
    Json(payload): Json<CreateForumRequest>,
) -> Result<Response> {
    let creation = state.forums.create_forum(payload).await?;
    Ok(creation_response(creation))
}

pub async fn get_forum(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Forum>> {
    let forum = state.forums.get_forum(&slug).await?;
    Ok(Json(forum))
}

pub async fn create_thread(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<CreateThreadRequest>,
) -> Result<Response> {
    let creation = state.forums.create_thread(&slug, payload).await?;
    Ok(creation_response(creation))
}

pub async fn get_forum_users(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<ForumListQuery>,
) -> Result<Json<Vec<User>>> {
    let users = state
        .forums
        .get_forum_users(&slug, &params.user_page())
        .await?;
    Ok(Json(users))
}

pub async fn get_forum_threads(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<ForumListQuery>,
) -> Result<Json<Vec<Thread>>> {
    let threads = state
        .forums
        .get_forum_threads(&slug, &params.thread_page())
        .await?;
    Ok(Json(threads))
}
