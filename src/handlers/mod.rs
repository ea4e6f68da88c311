pub mod forums;
pub mod posts;
pub mod service;
pub mod threads;
pub mod users;
