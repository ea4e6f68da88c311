use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Forum {
    pub title: String,
    pub user: String,
    pub slug: String,
    pub posts: i64,
    pub threads: i64,
}

#[derive(Debug, Validate, Deserialize)]
pub struct CreateForumRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(min = 1))]
    pub user: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: String,
}
