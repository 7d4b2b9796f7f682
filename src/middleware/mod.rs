// 认证中间件只挂在账号路由上，限流和错误日志全局生效
mod auth;
mod error_handler;
mod rate_limit;

pub use auth::auth_middleware;
pub use error_handler::log_errors;
pub use rate_limit::{RateLimiter, rate_limit};
