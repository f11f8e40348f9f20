pub mod admin;
pub mod auth;
pub mod certificates;
pub mod community;
pub mod courses;
pub mod enrollments;
pub mod error_code;
pub mod health;
pub mod helpers;
pub mod instructor;
pub mod notifications;
pub mod payments;
pub mod routes;
pub mod sse;
pub mod types;

/// ts-rs 生成的前端类型文件
pub const TS_EXPORT_PATH: &str = "../frontend/src/api/types.generated.ts";

pub use error_code::ErrorCode;
pub use health::{AppStartTime, HealthService, health_routes};
pub use helpers::{
    created_response, error_response, json_error_handler, message_response, paginated_response,
    query_error_handler, success_response,
};
pub use routes::{api_scope, configure_routes};
pub use types::{ApiResponse, ListQuery, PaginatedResponse, PaginationInfo, ReasonRequest};
