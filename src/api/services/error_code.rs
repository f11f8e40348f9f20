//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};
use ts_rs::TS;

use super::TS_EXPORT_PATH;
use crate::errors::LmsError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，ts-rs 自动生成 TypeScript 类型。
/// 按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 4000-4099: 选课与进度错误
/// - 5000-5099: 支付错误
/// - 6000-6099: 证书错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[ts(rename = "ErrorCode")]
#[ts(repr(enum))]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    NotFound = 1004,
    InternalServerError = 1005,
    Conflict = 1009,
    PayloadInvalid = 1013,
    ServiceUnavailable = 1030,

    // 认证错误 2000-2099
    AuthFailed = 2000,
    TokenInvalid = 2002,
    PermissionDenied = 2003,

    // 选课与进度错误 4000-4099
    PaymentRequired = 4002,

    // 支付错误 5000-5099
    PaymentFailed = 5000,

    // 证书错误 6000-6099
    CertificateRenderFailed = 6000,
    BlobStorageError = 6001,
}

impl From<&LmsError> for ErrorCode {
    fn from(err: &LmsError) -> Self {
        match err {
            LmsError::Validation(_) => ErrorCode::BadRequest,
            LmsError::NotFound(_) => ErrorCode::NotFound,
            LmsError::Conflict(_) => ErrorCode::Conflict,
            LmsError::Unauthorized(_) => ErrorCode::AuthFailed,
            LmsError::Forbidden(_) => ErrorCode::PermissionDenied,
            LmsError::PaymentRequired(_) => ErrorCode::PaymentRequired,
            LmsError::Payment(_) => ErrorCode::PaymentFailed,
            LmsError::Certificate(_) => ErrorCode::CertificateRenderFailed,
            LmsError::BlobStorage(_) => ErrorCode::BlobStorageError,
            LmsError::DatabaseConnection(_) => ErrorCode::ServiceUnavailable,
            LmsError::Serialization(_) => ErrorCode::PayloadInvalid,
            LmsError::DatabaseConfig(_)
            | LmsError::DatabaseOperation(_)
            | LmsError::FileOperation(_)
            | LmsError::Internal(_) => ErrorCode::InternalServerError,
        }
    }
}
