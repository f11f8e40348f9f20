use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum LmsError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
    PaymentRequired(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Serialization(String),
    Certificate(String),
    BlobStorage(String),
    Payment(String),
    Internal(String),
}

impl LmsError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LmsError::Validation(_) => "E001",
            LmsError::NotFound(_) => "E002",
            LmsError::Conflict(_) => "E003",
            LmsError::Unauthorized(_) => "E004",
            LmsError::Forbidden(_) => "E005",
            LmsError::PaymentRequired(_) => "E006",
            LmsError::DatabaseConfig(_) => "E007",
            LmsError::DatabaseConnection(_) => "E008",
            LmsError::DatabaseOperation(_) => "E009",
            LmsError::FileOperation(_) => "E010",
            LmsError::Serialization(_) => "E011",
            LmsError::Certificate(_) => "E012",
            LmsError::BlobStorage(_) => "E013",
            LmsError::Payment(_) => "E014",
            LmsError::Internal(_) => "E015",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            LmsError::Validation(_) => "Validation Error",
            LmsError::NotFound(_) => "Resource Not Found",
            LmsError::Conflict(_) => "Conflict",
            LmsError::Unauthorized(_) => "Unauthorized",
            LmsError::Forbidden(_) => "Forbidden",
            LmsError::PaymentRequired(_) => "Payment Required",
            LmsError::DatabaseConfig(_) => "Database Configuration Error",
            LmsError::DatabaseConnection(_) => "Database Connection Error",
            LmsError::DatabaseOperation(_) => "Database Operation Error",
            LmsError::FileOperation(_) => "File Operation Error",
            LmsError::Serialization(_) => "Serialization Error",
            LmsError::Certificate(_) => "Certificate Error",
            LmsError::BlobStorage(_) => "Blob Storage Error",
            LmsError::Payment(_) => "Payment Error",
            LmsError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            LmsError::Validation(msg)
            | LmsError::NotFound(msg)
            | LmsError::Conflict(msg)
            | LmsError::Unauthorized(msg)
            | LmsError::Forbidden(msg)
            | LmsError::PaymentRequired(msg)
            | LmsError::DatabaseConfig(msg)
            | LmsError::DatabaseConnection(msg)
            | LmsError::DatabaseOperation(msg)
            | LmsError::FileOperation(msg)
            | LmsError::Serialization(msg)
            | LmsError::Certificate(msg)
            | LmsError::BlobStorage(msg)
            | LmsError::Payment(msg)
            | LmsError::Internal(msg) => msg,
        }
    }

    /// HTTP status the API layer answers with
    pub fn http_status(&self) -> StatusCode {
        match self {
            LmsError::Validation(_) | LmsError::Payment(_) => StatusCode::BAD_REQUEST,
            LmsError::NotFound(_) => StatusCode::NOT_FOUND,
            LmsError::Conflict(_) => StatusCode::CONFLICT,
            LmsError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            LmsError::Forbidden(_) => StatusCode::FORBIDDEN,
            LmsError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            LmsError::DatabaseConnection(_) | LmsError::BlobStorage(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            LmsError::DatabaseConfig(_)
            | LmsError::DatabaseOperation(_)
            | LmsError::FileOperation(_)
            | LmsError::Serialization(_)
            | LmsError::Certificate(_)
            | LmsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Server-side failures are logged at error level, client mistakes are not
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }

    /// 格式化为彩色输出（用于 Server 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for LmsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for LmsError {}

// 便捷的构造函数
impl LmsError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        LmsError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        LmsError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        LmsError::Conflict(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        LmsError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        LmsError::Forbidden(msg.into())
    }

    pub fn payment_required<T: Into<String>>(msg: T) -> Self {
        LmsError::PaymentRequired(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        LmsError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        LmsError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        LmsError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        LmsError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        LmsError::Serialization(msg.into())
    }

    pub fn certificate<T: Into<String>>(msg: T) -> Self {
        LmsError::Certificate(msg.into())
    }

    pub fn blob_storage<T: Into<String>>(msg: T) -> Self {
        LmsError::BlobStorage(msg.into())
    }

    pub fn payment<T: Into<String>>(msg: T) -> Self {
        LmsError::Payment(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        LmsError::Internal(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for LmsError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => {
                LmsError::DatabaseConnection(err.to_string())
            }
            _ => LmsError::DatabaseOperation(err.to_string()),
        }
    }
}

impl From<std::io::Error> for LmsError {
    fn from(err: std::io::Error) -> Self {
        LmsError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for LmsError {
    fn from(err: serde_json::Error) -> Self {
        LmsError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for LmsError {
    fn from(err: chrono::ParseError) -> Self {
        LmsError::Validation(format!("Invalid date: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for LmsError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        LmsError::Unauthorized(format!("Invalid token: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, LmsError>;
