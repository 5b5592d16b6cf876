pub mod auth;
pub mod extract;
pub mod response;

pub use auth::caller_identity_middleware;
pub use extract::{ApiBody, ApiQuery};
pub use response::{ApiResponse, ApiResult};
