use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{VoteOutcome, non_empty};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Thread {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub forum: String,
    pub message: String,
    pub votes: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub created: DateTime<Utc>,
}

impl Thread {
    /// Applies a ledger outcome to this copy of the aggregate.
    pub fn apply_vote(&mut self, outcome: VoteOutcome) {
        self.votes += outcome.delta();
    }
}

/// A thread as handed to the store; forum and author are already canonical.
#[derive(Debug, Clone)]
pub struct NewThread {
    pub title: String,
    pub author: String,
    pub forum: String,
    pub message: String,
    pub slug: Option<String>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct CreateThreadRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(min = 1))]
    pub author: String,
    #[validate(length(min = 1))]
    pub message: String,
    pub slug: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

impl CreateThreadRequest {
    /// Empty slugs are stored as absent so they never collide.
    pub fn slug(&self) -> Option<String> {
        non_empty(&self.slug).map(str::to_string)
    }
}

#[derive(Debug, Default, Validate, Deserialize)]
pub struct UpdateThreadRequest {
    pub title: Option<String>,
    pub message: Option<String>,
}

impl UpdateThreadRequest {
    pub fn apply_to(&self, mut thread: Thread) -> Thread {
        if let Some(title) = non_empty(&self.title) {
            thread.title = title.to_string();
        }
        if let Some(message) = non_empty(&self.message) {
            thread.message = message.to_string();
        }
        thread
    }
}

/// The `{slug_or_id}` path segment: numeric values address a thread by id,
/// anything else by slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadRef {
    Id(i64),
    Slug(String),
}

impl From<&str> for ThreadRef {
    fn from(value: &str) -> Self {
        match value.parse::<i64>() {
            Ok(id) => ThreadRef::Id(id),
            Err(_) => ThreadRef::Slug(value.to_string()),
        }
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadRef::Id(id) => write!(f, "{}", id),
            ThreadRef::Slug(slug) => f.write_str(slug),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Voice;

    #[test]
    fn numeric_reference_resolves_by_id() {
        assert_eq!(ThreadRef::from("42"), ThreadRef::Id(42));
        assert_eq!(ThreadRef::from("rust-2024"), ThreadRef::Slug("rust-2024".into()));
        assert_eq!(ThreadRef::from("-3"), ThreadRef::Id(-3));
    }

    #[test]
    fn apply_vote_uses_outcome_delta() {
        let mut thread = Thread {
            id: 1,
            title: "t".into(),
            author: "a".into(),
            forum: "f".into(),
            message: "m".into(),
            votes: 1,
            slug: None,
            created: Utc::now(),
        };
        thread.apply_vote(VoteOutcome::Changed(Voice::Down));
        assert_eq!(thread.votes, -1);
        thread.apply_vote(VoteOutcome::Unchanged);
        assert_eq!(thread.votes, -1);
    }

    #[test]
    fn blank_slug_is_absent() {
        let request = CreateThreadRequest {
            title: "t".into(),
            author: "a".into(),
            message: "m".into(),
            slug: Some("".into()),
            created: None,
        };
        assert_eq!(request.slug(), None);
    }
}
