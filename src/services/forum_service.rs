use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{
        CreateForumRequest, CreateThreadRequest, Forum, NewThread, Thread, ThreadPage, User,
        UserPage,
    },
    repository::{ForumRepository, ThreadRepository, UserRepository},
    services::Creation,
};

pub struct ForumService {
    forums: Arc<dyn ForumRepository>,
    threads: Arc<dyn ThreadRepository>,
    users: Arc<dyn UserRepository>,
}

impl ForumService {
    pub fn new(
        forums: Arc<dyn ForumRepository>,
        threads: Arc<dyn ThreadRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            forums,
            threads,
            users,
        }
    }

    pub async fn create_forum(&self, request: CreateForumRequest) -> Result<Creation<Forum>> {
        request.validate()?;

        let owner = self
            .users
            .get_user_by_nickname(&request.user)
            .await?
            .ok_or_else(|| AppError::user_not_found(&request.user))?;

        if let Some(existing) = self.forums.get_forum_by_slug(&request.slug).await? {
            tracing::warn!("Forum {} already exists", existing.slug);
            return Ok(Creation::Exists(existing));
        }

        let forum = Forum {
            title: request.title,
            user: owner.nickname,
            slug: request.slug,
            posts: 0,
            threads: 0,
        };

        match self.forums.create_forum(&forum).await {
            Ok(created) => Ok(Creation::Created(created)),
            Err(AppError::Conflict(message)) => self
                .forums
                .get_forum_by_slug(&forum.slug)
                .await?
                .map(Creation::Exists)
                .ok_or(AppError::Conflict(message)),
            Err(e) => Err(e),
        }
    }

    pub async fn get_forum(&self, slug: &str) -> Result<Forum> {
        self.forums
            .get_forum_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::forum_not_found(slug))
    }

    /// Opens a thread in the forum, or returns the thread already holding
    /// the requested slug.
    pub async fn create_thread(
        &self,
        forum_slug: &str,
        request: CreateThreadRequest,
    ) -> Result<Creation<Thread>> {
        request.validate()?;

        let author = self
            .users
            .get_user_by_nickname(&request.author)
            .await?
            .ok_or_else(|| AppError::user_not_found(&request.author))?;
        let forum = self.get_forum(forum_slug).await?;

        let slug = request.slug();
        if let Some(slug) = &slug {
            if let Some(existing) = self.threads.get_thread_by_slug(slug).await? {
                tracing::warn!("Thread {} already exists in forum {}", slug, existing.forum);
                return Ok(Creation::Exists(existing));
            }
        }

        let thread = NewThread {
            title: request.title,
            author: author.nickname,
            forum: forum.slug,
            message: request.message,
            slug,
            created: request.created.unwrap_or_else(Utc::now),
        };

        let created = self.threads.create_thread(&thread).await?;
        tracing::debug!("Created thread {} in forum {}", created.id, created.forum);
        Ok(Creation::Created(created))
    }

    pub async fn get_forum_users(&self, slug: &str, page: &UserPage) -> Result<Vec<User>> {
        let forum = self.get_forum(slug).await?;
        self.forums.get_forum_users(&forum.slug, page).await
    }

    pub async fn get_forum_threads(&self, slug: &str, page: &ThreadPage) -> Result<Vec<Thread>> {
        let forum = self.get_forum(slug).await?;
        self.forums.get_forum_threads(&forum.slug, page).await
    }
}
