pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod services;

use axum::{
    Router,
    http::{
        HeaderValue, Method, StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    routing::{get, post},
};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    config::Config,
    repository::{
        ForumRepository, MemoryStore, PgStore, PostRepository, ServiceRepository,
        ThreadRepository, UserRepository, VoteRepository,
    },
    services::{ForumService, PostService, ThreadService, UserService},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub forums: Arc<ForumService>,
    pub threads: Arc<ThreadService>,
    pub posts: Arc<PostService>,
    pub service: Arc<dyn ServiceRepository>,
}

impl AppState {
    /// Wires every service to the ports of one store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + ForumRepository
            + ThreadRepository
            + PostRepository
            + VoteRepository
            + ServiceRepository
            + 'static,
    {
        Self {
            users: Arc::new(UserService::new(store.clone())),
            forums: Arc::new(ForumService::new(
                store.clone(),
                store.clone(),
                store.clone(),
            )),
            threads: Arc::new(ThreadService::new(
                store.clone(),
                store.clone(),
                store.clone(),
            )),
            posts: Arc::new(PostService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
            )),
            service: store,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }
}

pub fn create_app(state: AppState, config: &Config) -> Router {
    let origins = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([ACCEPT, CONTENT_TYPE]);

    let api = Router::new()
        // User routes
        .route("/user/{nickname}/create", post(handlers::users::create_user))
        .route(
            "/user/{nickname}/profile",
            get(handlers::users::get_user).post(handlers::users::update_user),
        )
        // Forum routes
        .route("/forum/create", post(handlers::forums::create_forum))
        .route("/forum/{slug}/details", get(handlers::forums::get_forum))
        .route("/forum/{slug}/create", post(handlers::forums::create_thread))
        .route("/forum/{slug}/users", get(handlers::forums::get_forum_users))
        .route(
            "/forum/{slug}/threads",
            get(handlers::forums::get_forum_threads),
        )
        // Thread routes
        .route(
            "/thread/{slug_or_id}/create",
            post(handlers::threads::create_posts),
        )
        .route(
            "/thread/{slug_or_id}/details",
            get(handlers::threads::get_thread).post(handlers::threads::update_thread),
        )
        .route(
            "/thread/{slug_or_id}/posts",
            get(handlers::threads::get_posts),
        )
        .route("/thread/{slug_or_id}/vote", post(handlers::threads::vote))
        // Post routes
        .route(
            "/post/{id}/details",
            get(handlers::posts::get_post).post(handlers::posts::update_post),
        )
        // Service routes
        .route("/service/status", get(handlers::service::status))
        .route("/service/clear", post(handlers::service::clear));

    Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(config.request_timeout_secs),
                ))
                .layer(cors),
        )
        .with_state(state)
}
