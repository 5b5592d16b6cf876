pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod specs;
pub mod template;
pub mod types;

pub use app::{router, AppState};
