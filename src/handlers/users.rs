use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::{
    AppState,
    error::Result,
    models::{CreateUserRequest, UpdateUserRequest, User},
    services::Creation,
};

pub async fn create_user(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Response> {
    let response = match state.users.create_user(&nickname, payload).await? {
        Creation::Created(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Creation::Exists(users) => (StatusCode::CONFLICT, Json(users)).into_response(),
    };

    Ok(response)
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
) -> Result<Json<User>> {
    let user = state.users.get_user(&nickname).await?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(nickname): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    let user = state.users.update_user(&nickname, payload).await?;
    Ok(Json(user))
}
