use axum::{extract::State, response::Json};

use crate::{AppState, error::Result, models::ServiceStatus};

pub async fn status(State(state): State<AppState>) -> Result<Json<ServiceStatus>> {
    let status = state.service.status().await?;
    Ok(Json(status))
}

pub async fn clear(State(state): State<AppState>) -> Result<()> {
    state.service.clear().await?;
    tracing::info!("All forum data cleared");
    Ok(())
}
