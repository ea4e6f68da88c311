use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    AppState,
    error::Result,
    models::{NewPost, Post, PostsQuery, Thread, UpdateThreadRequest, VoteRequest},
};

pub async fn create_posts(
    State(state): State<AppState>,
    Path(slug_or_id): Path<String>,
    Json(payload): Json<Vec<NewPost>>,
) -> Result<(StatusCode, Json<Vec<Post>>)> {
    let posts = state.posts.create_posts(&slug_or_id, payload).await?;
    Ok((StatusCode::CREATED, Json(posts)))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(slug_or_id): Path<String>,
) -> Result<Json<Thread>> {
    let thread = state.threads.get_thread(&slug_or_id).await?;
    Ok(Json(thread))
}

pub async fn update_thread(
    State(state): State<AppState>,
    Path(slug_or_id): Path<String>,
    Json(payload): Json<UpdateThreadRequest>,
) -> Result<Json<Thread>> {
    let thread = state.threads.update_thread(&slug_or_id, payload).await?;
    Ok(Json(thread))
}

pub async fn get_posts(
    State(state): State<AppState>,
    Path(slug_or_id): Path<String>,
    Query(params): Query<PostsQuery>,
) -> Result<Json<Vec<Post>>> {
    let posts = state
        .posts
        .get_posts(&slug_or_id, params.sort(), &params.page())
        .await?;
    Ok(Json(posts))
}

pub async fn vote(
    State(state): State<AppState>,
    Path(slug_or_id): Path<String>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<Thread>> {
    let thread = state.threads.vote(&slug_or_id, payload).await?;
    Ok(Json(thread))
}
