//! Storage ports.
//!
//! Each trait is the narrow interface one group of services calls. Both
//! backends implement all of them: [`postgres::PgStore`] over a sqlx pool and
//! [`memory::MemoryStore`] over ordered maps.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::Result,
    models::{
        Forum, NewPost, NewThread, Post, PostPage, ServiceStatus, Thread, ThreadPage, User,
        UserPage, Voice, VoteOutcome,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the nickname or email is taken.
    async fn create_user(&self, user: &User) -> Result<()>;
    async fn get_user_by_nickname(&self, nickname: &str) -> Result<Option<User>>;
    /// Users whose nickname or email matches, for conflict reporting.
    async fn get_users_by_email_or_nickname(&self, email: &str, nickname: &str)
    -> Result<Vec<User>>;
    /// Replaces the profile fields; `None` when the user does not exist.
    async fn update_user(&self, user: &User) -> Result<Option<User>>;
}

#[async_trait]
pub trait ForumRepository: Send + Sync {
    async fn create_forum(&self, forum: &Forum) -> Result<Forum>;
    async fn get_forum_by_slug(&self, slug: &str) -> Result<Option<Forum>>;
    /// Users who posted or opened a thread in the forum, ordered by nickname.
    async fn get_forum_users(&self, slug: &str, page: &UserPage) -> Result<Vec<User>>;
    /// Threads of the forum ordered by creation time.
    async fn get_forum_threads(&self, slug: &str, page: &ThreadPage) -> Result<Vec<Thread>>;
}

#[async_trait]
pub trait ThreadRepository: Send + Sync {
    async fn create_thread(&self, thread: &NewThread) -> Result<Thread>;
    async fn get_thread_by_id(&self, id: i64) -> Result<Option<Thread>>;
    async fn get_thread_by_slug(&self, slug: &str) -> Result<Option<Thread>>;
    async fn update_thread(&self, thread: &Thread) -> Result<Thread>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Inserts a non-empty batch in one statement. All posts share one
    /// `created` timestamp and come back in input order with ids and paths
    /// assigned. A missing or foreign parent fails the whole batch with
    /// `Conflict`.
    async fn create_posts(&self, forum: &str, thread: i64, posts: &[NewPost])
    -> Result<Vec<Post>>;
    async fn get_post(&self, id: i64) -> Result<Option<Post>>;
    /// Owning thread of each listed post that exists.
    async fn get_post_threads(&self, ids: &[i64]) -> Result<HashMap<i64, i64>>;
    /// Sets the message; marks the post edited only when the text changes.
    async fn update_post_message(&self, id: i64, message: &str) -> Result<Option<Post>>;

    /// Posts ordered by `(created, id)`.
    async fn get_posts_flat(&self, thread: i64, page: &PostPage) -> Result<Vec<Post>>;
    /// Posts ordered by materialized path (pre-order walk).
    async fn get_posts_tree(&self, thread: i64, page: &PostPage) -> Result<Vec<Post>>;
    /// Whole branches, `page.limit` branch roots at a time.
    async fn get_posts_parent_tree(&self, thread: i64, page: &PostPage) -> Result<Vec<Post>>;
}

#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Records `voice` for `(nickname, thread)` and moves the thread's
    /// aggregate by the outcome's delta, atomically.
    async fn cast_vote(&self, thread: i64, nickname: &str, voice: Voice) -> Result<VoteOutcome>;
    /// Sum of the ledger's voices for a thread.
    async fn recount_votes(&self, thread: i64) -> Result<i64>;
}

#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn status(&self) -> Result<ServiceStatus>;
    async fn clear(&self) -> Result<()>;
}
