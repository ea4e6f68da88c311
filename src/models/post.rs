use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{Forum, Thread, User};

/// Materialized path of a post: ancestor ids from the branch root down to
/// the post itself.
///
/// The derived `Ord` compares element-wise and treats a proper prefix as
/// smaller, so sorting by path yields a pre-order walk of the reply tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostPath(Vec<i64>);

impl PostPath {
    pub fn root(id: i64) -> Self {
        Self(vec![id])
    }

    /// Path of a new reply with id `id` under the post owning `self`.
    pub fn child(&self, id: i64) -> Self {
        let mut ids = Vec::with_capacity(self.0.len() + 1);
        ids.extend_from_slice(&self.0);
        ids.push(id);
        Self(ids)
    }

    /// Id of the top-level post this path descends from.
    pub fn branch_root(&self) -> Option<i64> {
        self.0.first().copied()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

impl From<Vec<i64>> for PostPath {
    fn from(ids: Vec<i64>) -> Self {
        Self(ids)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub parent: i64,
    pub author: String,
    pub message: String,
    pub is_edited: bool,
    pub forum: String,
    pub thread: i64,
    pub created: DateTime<Utc>,
    #[serde(skip)]
    pub path: PostPath,
}

impl Post {
    pub fn is_branch_root(&self) -> bool {
        self.parent == 0
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PostRow {
    pub id: i64,
    pub parent: i64,
    pub author: String,
    pub message: String,
    pub is_edited: bool,
    pub forum: String,
    pub thread: i64,
    pub created: DateTime<Utc>,
    pub path: Vec<i64>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            parent: row.parent,
            author: row.author,
            message: row.message,
            is_edited: row.is_edited,
            forum: row.forum,
            thread: row.thread,
            created: row.created,
            path: row.path.into(),
        }
    }
}

// One entry of a create-posts batch
#[derive(Debug, Clone, Validate, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub parent: i64,
    #[validate(length(min = 1))]
    pub author: String,
    #[validate(length(min = 1))]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub message: Option<String>,
}

/// Traversal order for a thread's posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostSort {
    #[default]
    Flat,
    Tree,
    ParentTree,
}

impl FromStr for PostSort {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(PostSort::Flat),
            "tree" => Ok(PostSort::Tree),
            "parent_tree" => Ok(PostSort::ParentTree),
            _ => Err(format!("Unknown PostSort: {}", s)),
        }
    }
}

impl PostSort {
    /// Unknown or missing values fall back to flat ordering.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        value.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

/// Cursor page over a thread's posts.
///
/// `since` is the id of the last post the caller saw (`None` starts from the
/// beginning); `limit` caps the page (`None` is unbounded). For the
/// parent-tree order the limit counts branch roots, not posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostPage {
    pub since: Option<i64>,
    pub desc: bool,
    pub limit: Option<usize>,
}

impl PostPage {
    /// Builds a page from wire values: negative `since` and non-positive
    /// `limit` mean "no cursor" and "no limit".
    pub fn new(since: i64, desc: bool, limit: i64) -> Self {
        Self {
            since: (since >= 0).then_some(since),
            desc,
            limit: usize::try_from(limit).ok().filter(|limit| *limit > 0),
        }
    }

    pub fn first(limit: usize) -> Self {
        Self {
            since: None,
            desc: false,
            limit: Some(limit),
        }
    }

    pub fn sql_limit(&self) -> Option<i64> {
        self.limit.and_then(|limit| i64::try_from(limit).ok())
    }
}

/// Which related objects to attach to a post detail lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Related {
    pub user: bool,
    pub thread: bool,
    pub forum: bool,
}

impl Related {
    /// Parses a comma separated list; unknown tokens are ignored.
    pub fn parse(value: Option<&str>) -> Self {
        let mut related = Related::default();
        for token in value.unwrap_or_default().split(',') {
            match token.trim() {
                "user" => related.user = true,
                "thread" => related.thread = true,
                "forum" => related.forum = true,
                _ => {}
            }
        }
        related
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetails {
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum: Option<Forum>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_order_is_preorder() {
        let a = PostPath::root(1);
        let b = a.child(2);
        let d = b.child(4);
        let c = PostPath::root(3);
        let mut paths = vec![c.clone(), d.clone(), a.clone(), b.clone()];
        paths.sort();
        assert_eq!(paths, vec![a, b, d, c]);
    }

    #[test]
    fn child_path_extends_parent() {
        let parent = PostPath::from(vec![5, 9]);
        let child = parent.child(12);
        assert_eq!(child.as_slice(), &[5, 9, 12]);
        assert_eq!(child.branch_root(), Some(5));
    }

    #[test]
    fn unknown_sort_defaults_to_flat() {
        assert_eq!(PostSort::parse_lenient(Some("tree")), PostSort::Tree);
        assert_eq!(PostSort::parse_lenient(Some("parent_tree")), PostSort::ParentTree);
        assert_eq!(PostSort::parse_lenient(Some("random")), PostSort::Flat);
        assert_eq!(PostSort::parse_lenient(None), PostSort::Flat);
    }

    #[test]
    fn page_sentinels_map_to_none() {
        let page = PostPage::new(-1, true, 0);
        assert_eq!(page.since, None);
        assert_eq!(page.limit, None);
        assert!(page.desc);

        let page = PostPage::new(7, false, 10);
        assert_eq!(page.since, Some(7));
        assert_eq!(page.limit, Some(10));
    }

    #[test]
    fn related_ignores_unknown_tokens() {
        let related = Related::parse(Some("user,bogus,forum"));
        assert!(related.user);
        assert!(!related.thread);
        assert!(related.forum);
        assert_eq!(Related::parse(None), Related::default());
    }
}
