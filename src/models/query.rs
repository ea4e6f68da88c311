//! Query-string parameters for the list endpoints.
//!
//! Every field is taken as raw text and parsed leniently: a malformed value
//! falls back to its default instead of rejecting the request.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{PostPage, PostSort};

pub const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PostsQuery {
    pub limit: Option<String>,
    pub since: Option<String>,
    pub desc: Option<String>,
    pub sort: Option<String>,
}

impl PostsQuery {
    pub fn page(&self) -> PostPage {
        let since = self
            .since
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(-1);
        PostPage::new(since, parse_flag(self.desc.as_deref()), parse_limit(self.limit.as_deref()))
    }

    pub fn sort(&self) -> PostSort {
        PostSort::parse_lenient(self.sort.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ForumListQuery {
    pub limit: Option<String>,
    pub since: Option<String>,
    pub desc: Option<String>,
}

/// Page over a forum's users, keyed by nickname.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPage {
    pub since: Option<String>,
    pub desc: bool,
    pub limit: Option<i64>,
}

/// Page over a forum's threads, keyed by creation time (inclusive).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadPage {
    pub since: Option<DateTime<Utc>>,
    pub desc: bool,
    pub limit: Option<i64>,
}

impl ForumListQuery {
    pub fn user_page(&self) -> UserPage {
        UserPage {
            since: self
                .since
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            desc: parse_flag(self.desc.as_deref()),
            limit: positive(parse_limit(self.limit.as_deref())),
        }
    }

    pub fn thread_page(&self) -> ThreadPage {
        ThreadPage {
            since: self
                .since
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            desc: parse_flag(self.desc.as_deref()),
            limit: positive(parse_limit(self.limit.as_deref())),
        }
    }
}

pub fn parse_limit(value: Option<&str>) -> i64 {
    value
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_LIMIT)
}

/// Accepts the usual spellings of a boolean; anything else is `false`.
pub fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(str::trim),
        Some("1" | "t" | "T" | "true" | "TRUE" | "True")
    )
}

fn positive(limit: i64) -> Option<i64> {
    (limit > 0).then_some(limit)
}
