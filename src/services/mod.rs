pub mod forum_service;
pub mod post_service;
pub mod thread_service;
pub mod user_service;

pub use forum_service::ForumService;
pub use post_service::PostService;
pub use thread_service::ThreadService;
pub use user_service::UserService;

/// Result of a create call that reports clashes with existing records
/// instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Creation<T, C = T> {
    Created(T),
    Exists(C),
}
