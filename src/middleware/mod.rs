pub mod auth;
pub mod error_sink;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use error_sink::{error_sink_middleware, panic_response};
pub use response::{ApiResponse, ApiResult};
