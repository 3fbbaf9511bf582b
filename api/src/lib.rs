//! Microblogging service: accounts, posts, likes and a follow graph over a
//! JSON/form HTTP API.

pub mod auth;
pub mod config;
pub mod dto;
pub mod errors;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod states;

pub use config::Config;
pub use routes::router;
pub use states::AppState;
