pub mod forum;
pub mod post;
pub mod query;
pub mod service;
pub mod thread;
pub mod user;
pub mod vote;

pub use forum::*;
pub use post::*;
pub use query::*;
pub use service::*;
pub use thread::*;
pub use user::*;
pub use vote::*;
