// handlers/protected/mod.rs - Endpoints scoped to the resolved caller identity
pub mod query_results;

pub use query_results::post as query_results_post;
