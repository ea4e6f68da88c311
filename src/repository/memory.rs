//! In-process backend.
//!
//! All state sits behind one `tokio::sync::RwLock`, so every port method is
//! atomic with respect to every other. Posts are indexed per thread by
//! `(created, id)`, by materialized path and by branch root, which lets the
//! three traversals run as ordered range scans.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    ops::Bound,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, Result},
    models::{
        Forum, NewPost, NewThread, Post, PostPage, PostPath, ServiceStatus, Thread, ThreadPage,
        User, UserPage, Voice, VoteOutcome,
    },
    repository::{
        ForumRepository, PostRepository, ServiceRepository, ThreadRepository, UserRepository,
        VoteRepository,
    },
};

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<String, User>,
    forums: HashMap<String, Forum>,
    forum_users: HashMap<String, BTreeSet<String>>,
    threads: BTreeMap<i64, Thread>,
    thread_slugs: HashMap<String, i64>,
    posts: HashMap<i64, Post>,
    thread_posts: HashMap<i64, ThreadIndex>,
    votes: HashMap<(String, i64), Voice>,
    last_thread_id: i64,
    last_post_id: i64,
}

/// Ordered views over one thread's posts.
#[derive(Default)]
struct ThreadIndex {
    by_created: BTreeSet<(DateTime<Utc>, i64)>,
    by_path: BTreeMap<PostPath, i64>,
    roots: BTreeSet<i64>,
}

fn take_page<I: Iterator>(iter: I, limit: Option<usize>) -> std::iter::Take<I> {
    iter.take(limit.unwrap_or(usize::MAX))
}

impl MemoryState {
    fn email_owner(&self, email: &str) -> Option<&User> {
        self.users.values().find(|user| user.email == email)
    }

    fn remember_forum_user(&mut self, forum: &str, nickname: &str) {
        self.forum_users
            .entry(forum.to_string())
            .or_default()
            .insert(nickname.to_string());
    }

    fn collect(&self, ids: impl Iterator<Item = i64>) -> Vec<Post> {
        ids.filter_map(|id| self.posts.get(&id).cloned()).collect()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.nickname) || state.email_owner(&user.email).is_some() {
            return Err(AppError::Conflict(format!(
                "User {} or email {} already exists",
                user.nickname, user.email
            )));
        }
        state.users.insert(user.nickname.clone(), user.clone());
        Ok(())
    }

    async fn get_user_by_nickname(&self, nickname: &str) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(nickname).cloned())
    }

    async fn get_users_by_email_or_nickname(
        &self,
        email: &str,
        nickname: &str,
    ) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|user| user.nickname == nickname || user.email == email)
            .cloned()
            .collect())
    }

    async fn update_user(&self, user: &User) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.nickname) {
            return Ok(None);
        }
        if let Some(owner) = state.email_owner(&user.email) {
            if owner.nickname != user.nickname {
                return Err(AppError::Conflict(format!(
                    "This email is already registered by user: {}",
                    owner.nickname
                )));
            }
        }
        state.users.insert(user.nickname.clone(), user.clone());
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl ForumRepository for MemoryStore {
    async fn create_forum(&self, forum: &Forum) -> Result<Forum> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&forum.user) {
            return Err(AppError::user_not_found(&forum.user));
        }
        if state.forums.contains_key(&forum.slug) {
            return Err(AppError::Conflict(format!("Forum {} already exists", forum.slug)));
        }
        let forum = Forum {
            posts: 0,
            threads: 0,
            ..forum.clone()
        };
        state.forums.insert(forum.slug.clone(), forum.clone());
        Ok(forum)
    }

    async fn get_forum_by_slug(&self, slug: &str) -> Result<Option<Forum>> {
        Ok(self.state.read().await.forums.get(slug).cloned())
    }

    async fn get_forum_users(&self, slug: &str, page: &UserPage) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let Some(nicknames) = state.forum_users.get(slug) else {
            return Ok(Vec::new());
        };

        let lower = match &page.since {
            Some(since) if !page.desc => Bound::Excluded(since.clone()),
            _ => Bound::Unbounded,
        };
        let upper = match &page.since {
            Some(since) if page.desc => Bound::Excluded(since.clone()),
            _ => Bound::Unbounded,
        };
        let range = nicknames.range((lower, upper));
        let limit = page.limit.and_then(|limit| usize::try_from(limit).ok());

        let selected: Vec<&String> = if page.desc {
            take_page(range.rev(), limit).collect()
        } else {
            take_page(range, limit).collect()
        };

        Ok(selected
            .into_iter()
            .filter_map(|nickname| state.users.get(nickname).cloned())
            .collect())
    }

    async fn get_forum_threads(&self, slug: &str, page: &ThreadPage) -> Result<Vec<Thread>> {
        let state = self.state.read().await;
        let mut threads: Vec<&Thread> = state
            .threads
            .values()
            .filter(|thread| thread.forum == slug)
            .filter(|thread| match page.since {
                Some(since) if page.desc => thread.created <= since,
                Some(since) => thread.created >= since,
                None => true,
            })
            .collect();

        threads.sort_by_key(|thread| (thread.created, thread.id));
        if page.desc {
            threads.reverse();
        }
        let limit = page.limit.and_then(|limit| usize::try_from(limit).ok());

        Ok(take_page(threads.into_iter(), limit).cloned().collect())
    }
}

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn create_thread(&self, new_thread: &NewThread) -> Result<Thread> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&new_thread.author) {
            return Err(AppError::user_not_found(&new_thread.author));
        }
        if !state.forums.contains_key(&new_thread.forum) {
            return Err(AppError::forum_not_found(&new_thread.forum));
        }
        if let Some(slug) = &new_thread.slug {
            if state.thread_slugs.contains_key(slug) {
                return Err(AppError::Conflict(format!("Thread {} already exists", slug)));
            }
        }

        state.last_thread_id += 1;
        let thread = Thread {
            id: state.last_thread_id,
            title: new_thread.title.clone(),
            author: new_thread.author.clone(),
            forum: new_thread.forum.clone(),
            message: new_thread.message.clone(),
            votes: 0,
            slug: new_thread.slug.clone(),
            created: new_thread.created,
        };

        if let Some(slug) = &thread.slug {
            state.thread_slugs.insert(slug.clone(), thread.id);
        }
        if let Some(forum) = state.forums.get_mut(&thread.forum) {
            forum.threads += 1;
        }
        state.remember_forum_user(&thread.forum, &thread.author);
        state.threads.insert(thread.id, thread.clone());
        Ok(thread)
    }

    async fn get_thread_by_id(&self, id: i64) -> Result<Option<Thread>> {
        Ok(self.state.read().await.threads.get(&id).cloned())
    }

    async fn get_thread_by_slug(&self, slug: &str) -> Result<Option<Thread>> {
        let state = self.state.read().await;
        Ok(state
            .thread_slugs
            .get(slug)
            .and_then(|id| state.threads.get(id))
            .cloned())
    }

    async fn update_thread(&self, thread: &Thread) -> Result<Thread> {
        let mut state = self.state.write().await;
        let stored = state
            .threads
            .get_mut(&thread.id)
            .ok_or_else(|| AppError::thread_not_found(thread.id))?;
        stored.title = thread.title.clone();
        stored.message = thread.message.clone();
        Ok(stored.clone())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create_posts(
        &self,
        forum: &str,
        thread: i64,
        posts: &[NewPost],
    ) -> Result<Vec<Post>> {
        let mut state = self.state.write().await;

        // Validate the whole batch before assigning any id.
        for post in posts {
            if !state.users.contains_key(&post.author) {
                return Err(AppError::user_not_found(&post.author));
            }
            if post.parent != 0 {
                match state.posts.get(&post.parent) {
                    Some(parent) if parent.thread == thread => {}
                    _ => return Err(AppError::parent_conflict()),
                }
            }
        }

        let created = Utc::now();
        let mut inserted = Vec::with_capacity(posts.len());
        for new_post in posts {
            state.last_post_id += 1;
            let id = state.last_post_id;
            let path = if new_post.parent == 0 {
                PostPath::root(id)
            } else {
                state.posts[&new_post.parent].path.child(id)
            };

            let post = Post {
                id,
                parent: new_post.parent,
                author: new_post.author.clone(),
                message: new_post.message.clone(),
                is_edited: false,
                forum: forum.to_string(),
                thread,
                created,
                path,
            };

            let index = state.thread_posts.entry(thread).or_default();
            index.by_created.insert((post.created, post.id));
            index.by_path.insert(post.path.clone(), post.id);
            if post.is_branch_root() {
                index.roots.insert(post.id);
            }
            state.remember_forum_user(forum, &post.author);
            state.posts.insert(id, post.clone());
            inserted.push(post);
        }

        if let Some(forum) = state.forums.get_mut(forum) {
            forum.posts += inserted.len() as i64;
        }

        Ok(inserted)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        Ok(self.state.read().await.posts.get(&id).cloned())
    }

    async fn get_post_threads(&self, ids: &[i64]) -> Result<HashMap<i64, i64>> {
        let state = self.state.read().await;
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| state.posts.get(&id).map(|post| (id, post.thread)))
            .collect())
    }

    async fn update_post_message(&self, id: i64, message: &str) -> Result<Option<Post>> {
        let mut state = self.state.write().await;
        let Some(post) = state.posts.get_mut(&id) else {
            return Ok(None);
        };
        if post.message != message {
            post.message = message.to_string();
            post.is_edited = true;
        }
        Ok(Some(post.clone()))
    }

    async fn get_posts_flat(&self, thread: i64, page: &PostPage) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let Some(index) = state.thread_posts.get(&thread) else {
            return Ok(Vec::new());
        };

        // The flat cursor is a bare id bound; it need not name an existing post.
        let after_cursor = |id: &i64| match page.since {
            Some(since) if page.desc => *id < since,
            Some(since) => *id > since,
            None => true,
        };

        let ids: Vec<i64> = if page.desc {
            take_page(
                index.by_created.iter().rev().map(|(_, id)| *id).filter(after_cursor),
                page.limit,
            )
            .collect()
        } else {
            take_page(
                index.by_created.iter().map(|(_, id)| *id).filter(after_cursor),
                page.limit,
            )
            .collect()
        };

        Ok(state.collect(ids.into_iter()))
    }

    async fn get_posts_tree(&self, thread: i64, page: &PostPage) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let Some(index) = state.thread_posts.get(&thread) else {
            return Ok(Vec::new());
        };

        let cursor = match page.since {
            Some(since) => match state.posts.get(&since) {
                Some(post) => Some(post.path.clone()),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let ids: Vec<i64> = match (cursor, page.desc) {
            (None, false) => take_page(index.by_path.values(), page.limit)
                .copied()
                .collect(),
            (None, true) => take_page(index.by_path.values().rev(), page.limit)
                .copied()
                .collect(),
            (Some(path), false) => take_page(
                index
                    .by_path
                    .range((Bound::Excluded(path), Bound::Unbounded))
                    .map(|(_, id)| id),
                page.limit,
            )
            .copied()
            .collect(),
            (Some(path), true) => {
                take_page(index.by_path.range(..path).rev().map(|(_, id)| id), page.limit)
                    .copied()
                    .collect()
            }
        };

        Ok(state.collect(ids.into_iter()))
    }

    async fn get_posts_parent_tree(&self, thread: i64, page: &PostPage) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let Some(index) = state.thread_posts.get(&thread) else {
            return Ok(Vec::new());
        };

        let cursor_root = match page.since {
            Some(since) => match state.posts.get(&since).and_then(|p| p.path.branch_root()) {
                Some(root) => Some(root),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let roots: Vec<i64> = match (cursor_root, page.desc) {
            (None, false) => take_page(index.roots.iter(), page.limit).copied().collect(),
            (None, true) => take_page(index.roots.iter().rev(), page.limit)
                .copied()
                .collect(),
            (Some(root), false) => take_page(
                index.roots.range((Bound::Excluded(root), Bound::Unbounded)),
                page.limit,
            )
            .copied()
            .collect(),
            (Some(root), true) => take_page(index.roots.range(..root).rev(), page.limit)
                .copied()
                .collect(),
        };

        // Each branch is a contiguous run of the path index starting at [root].
        let ids = roots.into_iter().flat_map(move |root| {
            index
                .by_path
                .range(PostPath::root(root)..)
                .take_while(move |(path, _)| path.branch_root() == Some(root))
                .map(|(_, id)| *id)
        });

        Ok(state.collect(ids))
    }
}

#[async_trait]
impl VoteRepository for MemoryStore {
    async fn cast_vote(&self, thread: i64, nickname: &str, voice: Voice) -> Result<VoteOutcome> {
        let mut state = self.state.write().await;
        if !state.threads.contains_key(&thread) {
            return Err(AppError::thread_not_found(thread));
        }
        if !state.users.contains_key(nickname) {
            return Err(AppError::user_not_found(nickname));
        }

        let key = (nickname.to_string(), thread);
        let outcome = match state.votes.get(&key) {
            None => VoteOutcome::Created(voice),
            Some(existing) if *existing == voice => VoteOutcome::Unchanged,
            Some(_) => VoteOutcome::Changed(voice),
        };

        if outcome != VoteOutcome::Unchanged {
            state.votes.insert(key, voice);
            if let Some(stored) = state.threads.get_mut(&thread) {
                stored.apply_vote(outcome);
            }
        }

        Ok(outcome)
    }

    async fn recount_votes(&self, thread: i64) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .votes
            .iter()
            .filter(|((_, voted_thread), _)| *voted_thread == thread)
            .map(|(_, voice)| i64::from(voice.value()))
            .sum())
    }
}

#[async_trait]
impl ServiceRepository for MemoryStore {
    async fn status(&self) -> Result<ServiceStatus> {
        let state = self.state.read().await;
        Ok(ServiceStatus {
            user: state.users.len() as i64,
            forum: state.forums.len() as i64,
            thread: state.threads.len() as i64,
            post: state.posts.len() as i64,
        })
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        // Ids keep growing across clears, like a sequence after TRUNCATE.
        let (last_thread_id, last_post_id) = (state.last_thread_id, state.last_post_id);
        *state = MemoryState {
            last_thread_id,
            last_post_id,
            ..MemoryState::default()
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        for nickname in ["alice", "bob"] {
            store
                .create_user(&User {
                    nickname: nickname.into(),
                    fullname: nickname.to_uppercase(),
                    about: String::new(),
                    email: format!("{}@example.com", nickname),
                })
                .await
                .unwrap();
        }
        store
            .create_forum(&Forum {
                title: "Rust".into(),
                user: "alice".into(),
                slug: "rust".into(),
                posts: 0,
                threads: 0,
            })
            .await
            .unwrap();
        let thread = store
            .create_thread(&NewThread {
                title: "Paths".into(),
                author: "alice".into(),
                forum: "rust".into(),
                message: "Let's talk trees".into(),
                slug: Some("paths".into()),
                created: Utc::now(),
            })
            .await
            .unwrap();
        (store, thread.id)
    }

    fn reply(parent: i64, text: &str) -> NewPost {
        NewPost {
            parent,
            author: "bob".into(),
            message: text.into(),
        }
    }

    fn ids(posts: &[Post]) -> Vec<i64> {
        posts.iter().map(|post| post.id).collect()
    }

    #[tokio::test]
    async fn batch_shares_created_and_builds_paths() {
        let (store, thread) = seeded().await;
        let roots = store
            .create_posts("rust", thread, &[reply(0, "a"), reply(0, "b")])
            .await
            .unwrap();
        assert_eq!(roots[0].created, roots[1].created);
        assert!(roots[0].id < roots[1].id);
        assert_eq!(roots[0].path.as_slice(), &[roots[0].id]);

        let child = store
            .create_posts("rust", thread, &[reply(roots[0].id, "a.1")])
            .await
            .unwrap();
        assert_eq!(child[0].path.as_slice(), &[roots[0].id, child[0].id]);

        let forum = store.get_forum_by_slug("rust").await.unwrap().unwrap();
        assert_eq!(forum.posts, 3);
    }

    #[tokio::test]
    async fn foreign_parent_fails_whole_batch() {
        let (store, thread) = seeded().await;
        let other = store
            .create_thread(&NewThread {
                title: "Other".into(),
                author: "bob".into(),
                forum: "rust".into(),
                message: "elsewhere".into(),
                slug: None,
                created: Utc::now(),
            })
            .await
            .unwrap();
        let foreign = store
            .create_posts("rust", other.id, &[reply(0, "x")])
            .await
            .unwrap();

        let err = store
            .create_posts("rust", thread, &[reply(0, "ok"), reply(foreign[0].id, "bad")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(
            store
                .get_posts_flat(thread, &PostPage::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn tree_and_parent_tree_scenario() {
        let (store, thread) = seeded().await;
        let a = store.create_posts("rust", thread, &[reply(0, "A")]).await.unwrap()[0].clone();
        let b = store.create_posts("rust", thread, &[reply(a.id, "B")]).await.unwrap()[0].clone();
        let c = store.create_posts("rust", thread, &[reply(0, "C")]).await.unwrap()[0].clone();

        let tree = store.get_posts_tree(thread, &PostPage::default()).await.unwrap();
        assert_eq!(ids(&tree), vec![a.id, b.id, c.id]);

        let first = store
            .get_posts_parent_tree(thread, &PostPage::first(1))
            .await
            .unwrap();
        assert_eq!(ids(&first), vec![a.id, b.id]);

        let next = store
            .get_posts_parent_tree(thread, &PostPage::new(b.id, false, 1))
            .await
            .unwrap();
        assert_eq!(ids(&next), vec![c.id]);
    }

    #[tokio::test]
    async fn tree_is_preorder_with_deep_branches() {
        let (store, thread) = seeded().await;
        let r1 = store.create_posts("rust", thread, &[reply(0, "r1")]).await.unwrap()[0].id;
        let r2 = store.create_posts("rust", thread, &[reply(0, "r2")]).await.unwrap()[0].id;
        let r1a = store.create_posts("rust", thread, &[reply(r1, "r1a")]).await.unwrap()[0].id;
        let r2a = store.create_posts("rust", thread, &[reply(r2, "r2a")]).await.unwrap()[0].id;
        let r1aa = store.create_posts("rust", thread, &[reply(r1a, "r1aa")]).await.unwrap()[0].id;
        let r1b = store.create_posts("rust", thread, &[reply(r1, "r1b")]).await.unwrap()[0].id;

        let tree = store.get_posts_tree(thread, &PostPage::default()).await.unwrap();
        assert_eq!(ids(&tree), vec![r1, r1a, r1aa, r1b, r2, r2a]);

        // Cursor excludes itself and continues after the cursor's subtree position.
        let after = store
            .get_posts_tree(thread, &PostPage::new(r1aa, false, 2))
            .await
            .unwrap();
        assert_eq!(ids(&after), vec![r1b, r2]);

        let desc = store
            .get_posts_tree(thread, &PostPage::new(r1b, true, 0))
            .await
            .unwrap();
        assert_eq!(ids(&desc), vec![r1aa, r1a, r1]);
    }

    #[tokio::test]
    async fn flat_cursor_never_repeats_since() {
        let (store, thread) = seeded().await;
        let batch = store
            .create_posts("rust", thread, &[reply(0, "1"), reply(0, "2"), reply(0, "3")])
            .await
            .unwrap();
        let all = ids(&batch);

        let asc = store
            .get_posts_flat(thread, &PostPage::new(all[0], false, 0))
            .await
            .unwrap();
        assert_eq!(ids(&asc), vec![all[1], all[2]]);

        let desc = store
            .get_posts_flat(thread, &PostPage::new(all[2], true, 1))
            .await
            .unwrap();
        assert_eq!(ids(&desc), vec![all[1]]);

        let past_end = store
            .get_posts_flat(thread, &PostPage::new(9_999, false, 0))
            .await
            .unwrap();
        assert!(past_end.is_empty());

        // Bounds that name no post still cut by id.
        let from_zero = store
            .get_posts_flat(thread, &PostPage::new(0, false, 0))
            .await
            .unwrap();
        assert_eq!(ids(&from_zero), all);

        let below_max = store
            .get_posts_flat(thread, &PostPage::new(9_999, true, 2))
            .await
            .unwrap();
        assert_eq!(ids(&below_max), vec![all[2], all[1]]);
    }

    #[tokio::test]
    async fn parent_tree_desc_keeps_branches_whole() {
        let (store, thread) = seeded().await;
        let r1 = store.create_posts("rust", thread, &[reply(0, "r1")]).await.unwrap()[0].id;
        let r2 = store.create_posts("rust", thread, &[reply(0, "r2")]).await.unwrap()[0].id;
        let r3 = store.create_posts("rust", thread, &[reply(0, "r3")]).await.unwrap()[0].id;
        let r2a = store.create_posts("rust", thread, &[reply(r2, "r2a")]).await.unwrap()[0].id;
        let r2aa = store.create_posts("rust", thread, &[reply(r2a, "r2aa")]).await.unwrap()[0].id;
        let r3a = store.create_posts("rust", thread, &[reply(r3, "r3a")]).await.unwrap()[0].id;

        let page = store
            .get_posts_parent_tree(thread, &PostPage::new(-1, true, 2))
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![r3, r3a, r2, r2a, r2aa]);

        // A cursor deep inside a branch pages from that branch's root.
        let rest = store
            .get_posts_parent_tree(thread, &PostPage::new(r2aa, true, 2))
            .await
            .unwrap();
        assert_eq!(ids(&rest), vec![r1]);
    }

    #[tokio::test]
    async fn empty_thread_returns_empty_pages() {
        let (store, thread) = seeded().await;
        let page = PostPage::default();
        assert!(store.get_posts_flat(thread, &page).await.unwrap().is_empty());
        assert!(store.get_posts_tree(thread, &page).await.unwrap().is_empty());
        assert!(store.get_posts_parent_tree(thread, &page).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ledger_is_idempotent_and_matches_aggregate() {
        let (store, thread) = seeded().await;

        let outcome = store.cast_vote(thread, "bob", Voice::Up).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Created(Voice::Up));
        let outcome = store.cast_vote(thread, "bob", Voice::Up).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Unchanged);
        let outcome = store.cast_vote(thread, "bob", Voice::Down).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Changed(Voice::Down));
        store.cast_vote(thread, "alice", Voice::Down).await.unwrap();

        let stored = store.get_thread_by_id(thread).await.unwrap().unwrap();
        assert_eq!(stored.votes, -2);
        assert_eq!(store.recount_votes(thread).await.unwrap(), -2);
    }

    #[tokio::test]
    async fn concurrent_first_votes_count_once() {
        let (store, thread) = seeded().await;
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.cast_vote(thread, "bob", Voice::Up).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store.get_thread_by_id(thread).await.unwrap().unwrap();
        assert_eq!(stored.votes, 1);
        assert_eq!(store.recount_votes(thread).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn forum_users_page_by_nickname() {
        let (store, thread) = seeded().await;
        store.create_posts("rust", thread, &[reply(0, "hi")]).await.unwrap();

        let all = store.get_forum_users("rust", &UserPage::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|u| u.nickname.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);

        let page = UserPage {
            since: Some("bob".into()),
            desc: true,
            limit: Some(10),
        };
        let before = store.get_forum_users("rust", &page).await.unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].nickname, "alice");
    }

    #[tokio::test]
    async fn clear_resets_counts() {
        let (store, thread) = seeded().await;
        store.create_posts("rust", thread, &[reply(0, "x")]).await.unwrap();
        let status = store.status().await.unwrap();
        assert_eq!(
            status,
            ServiceStatus {
                user: 2,
                forum: 1,
                thread: 1,
                post: 1
            }
        );

        store.clear().await.unwrap();
        assert_eq!(store.status().await.unwrap(), ServiceStatus::default());
    }
}
