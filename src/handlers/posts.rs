use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::{
    AppState,
    error::Result,
    models::{Post, PostDetails, Related, UpdatePostRequest},
};

#[derive(Debug, Default, Deserialize)]
pub struct PostDetailsQuery {
    pub related: Option<String>,
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PostDetailsQuery>,
) -> Result<Json<PostDetails>> {
    let related = Related::parse(params.related.as_deref());
    let details = state.posts.get_post_details(id, related).await?;
    Ok(Json(details))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>> {
    let post = state.posts.update_post(id, payload).await?;
    Ok(Json(post))
}
