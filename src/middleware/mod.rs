pub mod auth;
pub mod rate_limit;
pub mod response;

pub use auth::jwt_auth_middleware;
pub use rate_limit::{build_rate_limiter, prune_task, rate_limit_middleware, IpRateLimiter};
pub use response::{ApiResponse, ApiResult};
