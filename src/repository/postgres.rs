//! PostgreSQL backend.
//!
//! All SQL is runtime-checked (`sqlx::query`, not `sqlx::query!`) so the crate
//! builds without a database. Post paths live in a `BIGINT[]` column filled
//! by a `BEFORE INSERT` trigger (see `migrations/`); array comparison in
//! PostgreSQL is the same prefix-is-smaller ordering the traversals rely on.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::{
    error::{AppError, Result},
    models::{
        Forum, NewPost, NewThread, Post, PostPage, PostRow, ServiceStatus, Thread, ThreadPage,
        User, UserPage, Voice, VoteOutcome,
    },
    repository::{
        ForumRepository, PostRepository, ServiceRepository, ThreadRepository, UserRepository,
        VoteRepository,
    },
};

const POST_COLUMNS: &str = "id, parent, author, message, is_edited, forum, thread, created, path";
const THREAD_COLUMNS: &str = "id, title, author, forum, message, votes, slug, created";

// SQLSTATEs raised by the posts_set_path trigger.
const PARENT_MISSING: &str = "P0002";
const PARENT_IN_OTHER_THREAD: &str = "P0003";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Turns constraint violations into domain errors; everything else stays a
/// database error.
fn classify(err: sqlx::Error, context: impl FnOnce() -> String) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Conflict(context());
        }
        if db_err.is_foreign_key_violation() {
            return AppError::NotFound(context());
        }
        if matches!(
            db_err.code().as_deref(),
            Some(PARENT_MISSING | PARENT_IN_OTHER_THREAD)
        ) {
            return AppError::parent_conflict();
        }
    }
    AppError::Database(err)
}

fn push_limit(query: &mut QueryBuilder<'_, Postgres>, limit: Option<i64>) {
    if let Some(limit) = limit {
        query.push(" LIMIT ").push_bind(limit);
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (nickname, fullname, about, email) VALUES ($1, $2, $3, $4)")
            .bind(&user.nickname)
            .bind(&user.fullname)
            .bind(&user.about)
            .bind(&user.email)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                classify(e, || {
                    format!("User {} or email {} already exists", user.nickname, user.email)
                })
            })?;
        Ok(())
    }

    async fn get_user_by_nickname(&self, nickname: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT nickname, fullname, about, email FROM users WHERE nickname = $1",
        )
        .bind(nickname)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_users_by_email_or_nickname(
        &self,
        email: &str,
        nickname: &str,
    ) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT nickname, fullname, about, email FROM users WHERE email = $1 OR nickname = $2",
        )
        .bind(email)
        .bind(nickname)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<Option<User>> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET fullname = $2, about = $3, email = $4
            WHERE nickname = $1
            RETURNING nickname, fullname, about, email
            "#,
        )
        .bind(&user.nickname)
        .bind(&user.fullname)
        .bind(&user.about)
        .bind(&user.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            classify(e, || {
                format!("This email is already registered: {}", user.email)
            })
        })?;

        Ok(updated)
    }
}

#[async_trait]
impl ForumRepository for PgStore {
    async fn create_forum(&self, forum: &Forum) -> Result<Forum> {
        let created = sqlx::query_as::<_, Forum>(
            r#"
            INSERT INTO forums (title, "user", slug) VALUES ($1, $2, $3)
            RETURNING title, "user", slug, posts, threads
            "#,
        )
        .bind(&forum.title)
        .bind(&forum.user)
        .bind(&forum.slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match classify(e, String::new) {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("Forum {} already exists", forum.slug))
            }
            AppError::NotFound(_) => AppError::user_not_found(&forum.user),
            other => other,
        })?;

        Ok(created)
    }

    async fn get_forum_by_slug(&self, slug: &str) -> Result<Option<Forum>> {
        let forum = sqlx::query_as::<_, Forum>(
            r#"SELECT title, "user", slug, posts, threads FROM forums WHERE slug = $1"#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(forum)
    }

    async fn get_forum_users(&self, slug: &str, page: &UserPage) -> Result<Vec<User>> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT u.nickname, u.fullname, u.about, u.email
            FROM forum_users fu
            JOIN users u ON u.nickname = fu.nickname
            WHERE fu.forum = "#,
        );
        query.push_bind(slug);

        if let Some(since) = &page.since {
            query.push(if page.desc {
                " AND fu.nickname < "
            } else {
                " AND fu.nickname > "
            });
            query.push_bind(since);
        }

        query.push(if page.desc {
            " ORDER BY fu.nickname DESC"
        } else {
            " ORDER BY fu.nickname ASC"
        });
        push_limit(&mut query, page.limit);

        let users = query.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn get_forum_threads(&self, slug: &str, page: &ThreadPage) -> Result<Vec<Thread>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM threads WHERE forum = ",
            THREAD_COLUMNS
        ));
        query.push_bind(slug);

        if let Some(since) = page.since {
            query.push(if page.desc {
                " AND created <= "
            } else {
                " AND created >= "
            });
            query.push_bind(since);
        }

        query.push(if page.desc {
            " ORDER BY created DESC, id DESC"
        } else {
            " ORDER BY created ASC, id ASC"
        });
        push_limit(&mut query, page.limit);

        let threads = query
            .build_query_as::<Thread>()
            .fetch_all(&self.pool)
            .await?;
        Ok(threads)
    }
}

#[async_trait]
impl ThreadRepository for PgStore {
    async fn create_thread(&self, thread: &NewThread) -> Result<Thread> {
        let created = sqlx::query_as::<_, Thread>(&format!(
            r#"
            INSERT INTO threads (title, author, forum, message, slug, created)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            THREAD_COLUMNS
        ))
        .bind(&thread.title)
        .bind(&thread.author)
        .bind(&thread.forum)
        .bind(&thread.message)
        .bind(&thread.slug)
        .bind(thread.created)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            classify(e, || {
                format!(
                    "Thread {} conflicts or references a missing author/forum",
                    thread.slug.as_deref().unwrap_or(&thread.title)
                )
            })
        })?;

        Ok(created)
    }

    async fn get_thread_by_id(&self, id: i64) -> Result<Option<Thread>> {
        let thread = sqlx::query_as::<_, Thread>(&format!(
            "SELECT {} FROM threads WHERE id = $1",
            THREAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(thread)
    }

    async fn get_thread_by_slug(&self, slug: &str) -> Result<Option<Thread>> {
        let thread = sqlx::query_as::<_, Thread>(&format!(
            "SELECT {} FROM threads WHERE slug = $1",
            THREAD_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(thread)
    }

    async fn update_thread(&self, thread: &Thread) -> Result<Thread> {
        sqlx::query_as::<_, Thread>(&format!(
            "UPDATE threads SET title = $2, message = $3 WHERE id = $1 RETURNING {}",
            THREAD_COLUMNS
        ))
        .bind(thread.id)
        .bind(&thread.title)
        .bind(&thread.message)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::thread_not_found(thread.id))
    }
}

#[async_trait]
impl PostRepository for PgStore {
    async fn create_posts(
        &self,
        forum: &str,
        thread: i64,
        posts: &[NewPost],
    ) -> Result<Vec<Post>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let created = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut insert = QueryBuilder::<Postgres>::new(
            "INSERT INTO posts (parent, author, message, forum, thread, created) ",
        );
        insert.push_values(posts, |mut row, post| {
            row.push_bind(post.parent)
                .push_bind(&post.author)
                .push_bind(&post.message)
                .push_bind(forum)
                .push_bind(thread)
                .push_bind(created);
        });
        insert.push(format!(" RETURNING {}", POST_COLUMNS));

        let mut rows = insert
            .build_query_as::<PostRow>()
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| classify(e, || "Can't find post author".to_string()))?;

        sqlx::query("UPDATE forums SET posts = posts + $2 WHERE slug = $1")
            .bind(forum)
            .bind(rows.len() as i64)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        // Ids come from one sequence in row order, so sorting restores input order.
        rows.sort_by_key(|row| row.id);
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {} FROM posts WHERE id = $1",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    async fn get_post_threads(&self, ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query("SELECT id, thread FROM posts WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<(i64, i64)> { Ok((row.try_get("id")?, row.try_get("thread")?)) })
            .collect()
    }

    async fn update_post_message(&self, id: i64, message: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            UPDATE posts
            SET is_edited = is_edited OR message <> $2, message = $2
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(id)
        .bind(message)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    async fn get_posts_flat(&self, thread: i64, page: &PostPage) -> Result<Vec<Post>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM posts WHERE thread = ",
            POST_COLUMNS
        ));
        query.push_bind(thread);

        if let Some(since) = page.since {
            query.push(if page.desc { " AND id < " } else { " AND id > " });
            query.push_bind(since);
        }

        query.push(if page.desc {
            " ORDER BY created DESC, id DESC"
        } else {
            " ORDER BY created ASC, id ASC"
        });
        push_limit(&mut query, page.sql_limit());

        let rows = query
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn get_posts_tree(&self, thread: i64, page: &PostPage) -> Result<Vec<Post>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM posts WHERE thread = ",
            POST_COLUMNS
        ));
        query.push_bind(thread);

        if let Some(since) = page.since {
            query.push(if page.desc {
                " AND path < (SELECT path FROM posts WHERE id = "
            } else {
                " AND path > (SELECT path FROM posts WHERE id = "
            });
            query.push_bind(since).push(")");
        }

        query.push(if page.desc {
            " ORDER BY path DESC"
        } else {
            " ORDER BY path ASC, id ASC"
        });
        push_limit(&mut query, page.sql_limit());

        let rows = query
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn get_posts_parent_tree(&self, thread: i64, page: &PostPage) -> Result<Vec<Post>> {
        // Pick the branch roots first, then pull each selected branch whole.
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM posts WHERE path[1] IN (SELECT id FROM posts WHERE thread = ",
            POST_COLUMNS
        ));
        query.push_bind(thread).push(" AND parent = 0");

        if let Some(since) = page.since {
            query.push(if page.desc {
                " AND id < (SELECT path[1] FROM posts WHERE id = "
            } else {
                " AND id > (SELECT path[1] FROM posts WHERE id = "
            });
            query.push_bind(since).push(")");
        }

        query.push(if page.desc {
            " ORDER BY id DESC"
        } else {
            " ORDER BY id ASC"
        });
        push_limit(&mut query, page.sql_limit());

        query.push(if page.desc {
            ") ORDER BY path[1] DESC, path ASC, id ASC"
        } else {
            ") ORDER BY path[1] ASC, path ASC, id ASC"
        });

        let rows = query
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }
}

#[async_trait]
impl VoteRepository for PgStore {
    async fn cast_vote(&self, thread: i64, nickname: &str, voice: Voice) -> Result<VoteOutcome> {
        let mut tx = self.pool.begin().await?;

        // The unique key serializes racing first votes; the WHERE clause turns a
        // repeated voice into a no-op that returns no row.
        let row = sqlx::query(
            r#"
            INSERT INTO votes (nickname, thread, voice) VALUES ($1, $2, $3)
            ON CONFLICT (nickname, thread)
            DO UPDATE SET voice = EXCLUDED.voice WHERE votes.voice <> EXCLUDED.voice
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(nickname)
        .bind(thread)
        .bind(voice.value())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            classify(e, || {
                format!("Can't find user {} or thread {}", nickname, thread)
            })
        })?;

        let outcome = match row {
            None => VoteOutcome::Unchanged,
            Some(row) if row.try_get::<bool, _>("inserted")? => VoteOutcome::Created(voice),
            Some(_) => VoteOutcome::Changed(voice),
        };

        if outcome != VoteOutcome::Unchanged {
            sqlx::query("UPDATE threads SET votes = votes + $2 WHERE id = $1")
                .bind(thread)
                .bind(outcome.delta())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn recount_votes(&self, thread: i64) -> Result<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(voice), 0)::BIGINT FROM votes WHERE thread = $1")
                .bind(thread)
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }
}

#[async_trait]
impl ServiceRepository for PgStore {
    async fn status(&self) -> Result<ServiceStatus> {
        let row = sqlx::query(
            r#"
            SELECT (SELECT count(*) FROM users) AS "user",
                   (SELECT count(*) FROM forums) AS forum,
                   (SELECT count(*) FROM threads) AS thread,
                   (SELECT count(*) FROM posts) AS post
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ServiceStatus {
            user: row.try_get("user")?,
            forum: row.try_get("forum")?,
            thread: row.try_get("thread")?,
            post: row.try_get("post")?,
        })
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("TRUNCATE TABLE votes, forum_users, posts, threads, forums, users CASCADE")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
