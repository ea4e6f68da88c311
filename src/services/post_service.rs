//! Post retrieval and creation on top of the post store.
//!
//! Every thread-scoped call first resolves the `{slug_or_id}` key; a batch
//! is then checked as a whole (parents, then authors) before anything is
//! written, so a rejected batch leaves no trace.

use std::{collections::BTreeSet, sync::Arc};

use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{NewPost, Post, PostDetails, PostPage, PostSort, Related, UpdatePostRequest},
    repository::{ForumRepository, PostRepository, ThreadRepository, UserRepository},
    services::thread_service::resolve_thread,
};

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    threads: Arc<dyn ThreadRepository>,
    users: Arc<dyn UserRepository>,
    forums: Arc<dyn ForumRepository>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        threads: Arc<dyn ThreadRepository>,
        users: Arc<dyn UserRepository>,
        forums: Arc<dyn ForumRepository>,
    ) -> Self {
        Self {
            posts,
            threads,
            users,
            forums,
        }
    }

    pub async fn create_posts(&self, thread_key: &str, batch: Vec<NewPost>) -> Result<Vec<Post>> {
        let thread = resolve_thread(self.threads.as_ref(), thread_key).await?;
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        for post in &batch {
            post.validate()?;
        }

        let parents: Vec<i64> = batch
            .iter()
            .map(|post| post.parent)
            .filter(|parent| *parent != 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !parents.is_empty() {
            let owners = self.posts.get_post_threads(&parents).await?;
            if let Some(parent) = parents
                .iter()
                .find(|parent| owners.get(*parent) != Some(&thread.id))
            {
                tracing::warn!(
                    "Rejecting batch for thread {}: parent {} is missing or foreign",
                    thread.id,
                    parent
                );
                return Err(AppError::parent_conflict());
            }
        }

        let authors: BTreeSet<&str> = batch.iter().map(|post| post.author.as_str()).collect();
        for author in authors {
            if self.users.get_user_by_nickname(author).await?.is_none() {
                return Err(AppError::user_not_found(author));
            }
        }

        let created = self
            .posts
            .create_posts(&thread.forum, thread.id, &batch)
            .await?;
        tracing::debug!("Created {} posts in thread {}", created.len(), thread.id);
        Ok(created)
    }

    pub async fn get_posts(
        &self,
        thread_key: &str,
        sort: PostSort,
        page: &PostPage,
    ) -> Result<Vec<Post>> {
        let thread = resolve_thread(self.threads.as_ref(), thread_key).await?;
        tracing::debug!("Listing posts of thread {} ({:?}, {:?})", thread.id, sort, page);

        match sort {
            PostSort::Flat => self.posts.get_posts_flat(thread.id, page).await,
            PostSort::Tree => self.posts.get_posts_tree(thread.id, page).await,
            PostSort::ParentTree => self.posts.get_posts_parent_tree(thread.id, page).await,
        }
    }

    pub async fn get_post_details(&self, id: i64, related: Related) -> Result<PostDetails> {
        let post = self
            .posts
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::post_not_found(id))?;

        let author = if related.user {
            Some(
                self.users
                    .get_user_by_nickname(&post.author)
                    .await?
                    .ok_or_else(|| AppError::user_not_found(&post.author))?,
            )
        } else {
            None
        };

        let thread = if related.thread {
            Some(
                self.threads
                    .get_thread_by_id(post.thread)
                    .await?
                    .ok_or_else(|| AppError::thread_not_found(post.thread))?,
            )
        } else {
            None
        };

        let forum = if related.forum {
            Some(
                self.forums
                    .get_forum_by_slug(&post.forum)
                    .await?
                    .ok_or_else(|| AppError::forum_not_found(&post.forum))?,
            )
        } else {
            None
        };

        Ok(PostDetails {
            post,
            author,
            thread,
            forum,
        })
    }

    /// Replaces the message; an absent or empty message leaves the post as is.
    pub async fn update_post(&self, id: i64, request: UpdatePostRequest) -> Result<Post> {
        let post = self
            .posts
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::post_not_found(id))?;

        match request.message.as_deref() {
            Some(message) if !message.is_empty() && message != post.message => self
                .posts
                .update_post_message(id, message)
                .await?
                .ok_or_else(|| AppError::post_not_found(id)),
            _ => Ok(post),
        }
    }
}
