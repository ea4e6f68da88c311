use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{Thread, ThreadRef, UpdateThreadRequest, Voice, VoteRequest},
    repository::{ThreadRepository, UserRepository, VoteRepository},
};

/// Resolves a `{slug_or_id}` path segment: numeric keys by id, the rest by
/// slug.
pub async fn resolve_thread(threads: &dyn ThreadRepository, key: &str) -> Result<Thread> {
    let reference = ThreadRef::from(key);
    let thread = match &reference {
        ThreadRef::Id(id) => threads.get_thread_by_id(*id).await?,
        ThreadRef::Slug(slug) => threads.get_thread_by_slug(slug).await?,
    };

    thread.ok_or_else(|| AppError::thread_not_found(reference))
}

pub struct ThreadService {
    threads: Arc<dyn ThreadRepository>,
    users: Arc<dyn UserRepository>,
    votes: Arc<dyn VoteRepository>,
}

impl ThreadService {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        users: Arc<dyn UserRepository>,
        votes: Arc<dyn VoteRepository>,
    ) -> Self {
        Self {
            threads,
            users,
            votes,
        }
    }

    pub async fn get_thread(&self, key: &str) -> Result<Thread> {
        resolve_thread(self.threads.as_ref(), key).await
    }

    pub async fn update_thread(&self, key: &str, request: UpdateThreadRequest) -> Result<Thread> {
        request.validate()?;

        let thread = self.get_thread(key).await?;
        if request.title.is_none() && request.message.is_none() {
            return Ok(thread);
        }

        self.threads.update_thread(&request.apply_to(thread)).await
    }

    /// Casts or changes a vote and returns the thread with its aggregate
    /// moved by the ledger outcome.
    pub async fn vote(&self, key: &str, request: VoteRequest) -> Result<Thread> {
        request.validate()?;

        let mut thread = self.get_thread(key).await?;
        let voter = self
            .users
            .get_user_by_nickname(&request.nickname)
            .await?
            .ok_or_else(|| AppError::user_not_found(&request.nickname))?;
        let voice = Voice::try_from(request.voice)?;

        let outcome = self
            .votes
            .cast_vote(thread.id, &voter.nickname, voice)
            .await?;
        tracing::debug!(
            "Vote by {} on thread {}: {:?}",
            voter.nickname,
            thread.id,
            outcome
        );

        thread.apply_vote(outcome);
        Ok(thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Forum, NewThread, User},
        repository::{ForumRepository, MemoryStore},
    };
    use chrono::Utc;

    async fn setup() -> (ThreadService, Arc<MemoryStore>, Thread) {
        let store = Arc::new(MemoryStore::new());
        for nickname in ["author", "voter"] {
            store
                .create_user(&User {
                    nickname: nickname.into(),
                    fullname: nickname.into(),
                    about: String::new(),
                    email: format!("{}@example.com", nickname),
                })
                .await
                .unwrap();
        }
        store
            .create_forum(&Forum {
                title: "General".into(),
                user: "author".into(),
                slug: "general".into(),
                posts: 0,
                threads: 0,
            })
            .await
            .unwrap();
        let thread = store
            .create_thread(&NewThread {
                title: "Hello".into(),
                author: "author".into(),
                forum: "general".into(),
                message: "First!".into(),
                slug: Some("hello".into()),
                created: Utc::now(),
            })
            .await
            .unwrap();

        let service = ThreadService::new(store.clone(), store.clone(), store.clone());
        (service, store, thread)
    }

    fn vote(voice: i32) -> VoteRequest {
        VoteRequest {
            nickname: "voter".into(),
            voice,
        }
    }

    #[tokio::test]
    async fn resolves_by_id_and_slug() {
        let (threads, _, thread) = setup().await;
        assert_eq!(threads.get_thread(&thread.id.to_string()).await.unwrap(), thread);
        assert_eq!(threads.get_thread("hello").await.unwrap(), thread);

        let err = threads.get_thread("nope").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Not found: Can't find thread by slug or id: nope"
        );
        assert!(threads.get_thread("999").await.is_err());
    }

    #[tokio::test]
    async fn vote_sequence_moves_aggregate() {
        let (threads, store, thread) = setup().await;

        assert_eq!(threads.vote("hello", vote(1)).await.unwrap().votes, 1);
        assert_eq!(threads.vote("hello", vote(1)).await.unwrap().votes, 1);
        assert_eq!(threads.vote("hello", vote(-1)).await.unwrap().votes, -1);

        let stored = store.get_thread_by_id(thread.id).await.unwrap().unwrap();
        assert_eq!(stored.votes, -1);
        assert_eq!(store.recount_votes(thread.id).await.unwrap(), -1);
    }

    #[tokio::test]
    async fn vote_rejects_unknown_voter_and_bad_voice() {
        let (threads, _, _) = setup().await;

        let err = threads
            .vote(
                "hello",
                VoteRequest {
                    nickname: "ghost".into(),
                    voice: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = threads.vote("hello", vote(0)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_keeps_blank_fields() {
        let (threads, _, thread) = setup().await;
        let updated = threads
            .update_thread(
                "hello",
                UpdateThreadRequest {
                    title: Some("Hello again".into()),
                    message: Some(" ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Hello again");
        assert_eq!(updated.message, thread.message);
    }
}
