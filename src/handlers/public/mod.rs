// handlers/public/mod.rs - Endpoints that never resolve a caller identity
pub mod config;
pub mod specs;
pub mod status;

pub use config::config_get;
pub use specs::{schemas_get, views_get};
pub use status::{health, not_found, root};
