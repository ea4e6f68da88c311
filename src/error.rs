use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

}

impl AppError {
    pub fn thread_not_found(key: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("Can't find thread by slug or id: {}", key))
    }

    pub fn user_not_found(nickname: &str) -> Self {
        AppError::NotFound(format!("Can't find user by nickname: {}", nickname))
    }

    pub fn forum_not_found(slug: &str) -> Self {
        AppError::NotFound(format!("Can't find forum by slug: {}", slug))
    }

    pub fn post_not_found(id: i64) -> Self {
        AppError::NotFound(format!("Can't find post with id: {}", id))
    }

    pub fn parent_conflict() -> Self {
        AppError::Conflict("Parent post was created in another thread".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Migration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                "Internal server error"
            }
            AppError::Migration(ref e) => {
                tracing::error!("Migration error: {:?}", e);
                "Internal server error"
            }
            AppError::Validation(ref message)
            | AppError::NotFound(ref message)
            | AppError::Conflict(ref message) => message.as_str(),
        };

        let body = Json(json!({
            "message": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// Validation helper
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let error_messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error.message.as_ref().unwrap_or(&"Invalid value".into())
                    )
                })
            })
            .collect();

        AppError::Validation(error_messages.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            AppError::thread_not_found("abc").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::parent_conflict().status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Validation("voice".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn migration_failure_is_opaque_server_error() {
        let err = AppError::from(sqlx::migrate::MigrateError::VersionMissing(20240101000000));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_message_names_the_missing_key() {
        let err = AppError::user_not_found("j.doe");
        assert_eq!(err.to_string(), "Not found: Can't find user by nickname: j.doe");
    }
}
