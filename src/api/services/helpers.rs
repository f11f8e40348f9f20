//! API 帮助函数

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError, error};
use serde::Serialize;
use tracing::{error, warn};

use crate::errors::LmsError;
use crate::services::Page;

use super::error_code::ErrorCode;
use super::types::{ApiResponse, PaginatedResponse, PaginationInfo};

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 201 Created
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

/// 只有消息、没有数据的成功响应
pub fn message_response(message: &str) -> HttpResponse {
    json_response::<()>(StatusCode::OK, ErrorCode::Success, message, None)
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 分页列表响应
pub fn paginated_response<T, U>(page: Page<T>, map: impl FnMut(T) -> U) -> HttpResponse
where
    U: Serialize,
{
    let pagination = PaginationInfo::from(&page);
    HttpResponse::Ok()
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(PaginatedResponse {
            code: ErrorCode::Success as i32,
            message: "OK".to_string(),
            data: page.items.into_iter().map(map).collect(),
            pagination,
        })
}

/// LmsError → HTTP 响应（自动映射 HTTP 状态码和 ErrorCode）
impl ResponseError for LmsError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_server_error() {
            error!("{}", self);
        }
        error_response(self.http_status(), ErrorCode::from(self), self.message())
    }
}

/// JSON 请求体解析失败 → 400 + 统一响应格式
pub fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("Rejected JSON payload: {}", err);
    let message = format!("Invalid request body: {}", err);
    error::InternalError::from_response(
        err,
        error_response(StatusCode::BAD_REQUEST, ErrorCode::PayloadInvalid, &message),
    )
    .into()
}

/// 查询参数解析失败 → 400
pub fn query_error_handler(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid query string: {}", err);
    error::InternalError::from_response(
        err,
        error_response(StatusCode::BAD_REQUEST, ErrorCode::PayloadInvalid, &message),
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_lms_error_renders_api_response() {
        let resp = LmsError::payment_required("Course requires payment").error_response();
        assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], ErrorCode::PaymentRequired as i32);
        assert_eq!(json["message"], "Course requires payment");
        assert!(json["data"].is_null());
    }

    #[actix_web::test]
    async fn test_paginated_response_shape() {
        let page = Page {
            items: vec![1, 2],
            total: 5,
            page: 1,
            page_size: 2,
        };
        let resp = paginated_response(page, |n| n * 10);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"], serde_json::json!([10, 20]));
        assert_eq!(json["pagination"]["total_pages"], 3);
    }
}
