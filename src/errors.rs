use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum FramelinkerError {
    BadRequest(String),
    Validation(String),
    StorageUnavailable(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Serialization(String),
    Upstream(String),
    Config(String),
}

impl FramelinkerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            FramelinkerError::BadRequest(_) => "E001",
            FramelinkerError::Validation(_) => "E002",
            FramelinkerError::StorageUnavailable(_) => "E003",
            FramelinkerError::DatabaseConfig(_) => "E004",
            FramelinkerError::DatabaseConnection(_) => "E005",
            FramelinkerError::DatabaseOperation(_) => "E006",
            FramelinkerError::Serialization(_) => "E007",
            FramelinkerError::Upstream(_) => "E008",
            FramelinkerError::Config(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            FramelinkerError::BadRequest(_) => "Bad Request",
            FramelinkerError::Validation(_) => "Validation Error",
            FramelinkerError::StorageUnavailable(_) => "Storage Unavailable",
            FramelinkerError::DatabaseConfig(_) => "Database Configuration Error",
            FramelinkerError::DatabaseConnection(_) => "Database Connection Error",
            FramelinkerError::DatabaseOperation(_) => "Database Operation Error",
            FramelinkerError::Serialization(_) => "Serialization Error",
            FramelinkerError::Upstream(_) => "Upstream Error",
            FramelinkerError::Config(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            FramelinkerError::BadRequest(msg)
            | FramelinkerError::Validation(msg)
            | FramelinkerError::StorageUnavailable(msg)
            | FramelinkerError::DatabaseConfig(msg)
            | FramelinkerError::DatabaseConnection(msg)
            | FramelinkerError::DatabaseOperation(msg)
            | FramelinkerError::Serialization(msg)
            | FramelinkerError::Upstream(msg)
            | FramelinkerError::Config(msg) => msg,
        }
    }

    /// HTTP 状态码映射
    pub fn http_status(&self) -> StatusCode {
        match self {
            FramelinkerError::BadRequest(_) | FramelinkerError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            FramelinkerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于启动失败时打印到终端）
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

impl fmt::Display for FramelinkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for FramelinkerError {}

// 便捷的构造函数
impl FramelinkerError {
    pub fn bad_request<T: Into<String>>(msg: T) -> Self {
        FramelinkerError::BadRequest(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        FramelinkerError::Validation(msg.into())
    }

    pub fn storage_unavailable<T: Into<String>>(msg: T) -> Self {
        FramelinkerError::StorageUnavailable(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        FramelinkerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        FramelinkerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        FramelinkerError::DatabaseOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        FramelinkerError::Serialization(msg.into())
    }

    pub fn upstream<T: Into<String>>(msg: T) -> Self {
        FramelinkerError::Upstream(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        FramelinkerError::Config(msg.into())
    }
}

impl From<sea_orm::DbErr> for FramelinkerError {
    fn from(err: sea_orm::DbErr) -> Self {
        FramelinkerError::DatabaseOperation(err.to_string())
    }
}

impl From<redis::RedisError> for FramelinkerError {
    fn from(err: redis::RedisError) -> Self {
        FramelinkerError::StorageUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for FramelinkerError {
    fn from(err: std::io::Error) -> Self {
        FramelinkerError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for FramelinkerError {
    fn from(err: serde_json::Error) -> Self {
        FramelinkerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FramelinkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            FramelinkerError::bad_request("x").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FramelinkerError::validation("x").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FramelinkerError::storage_unavailable("x").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            FramelinkerError::upstream("x").http_status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_format_simple() {
        let err = FramelinkerError::storage_unavailable("redis down");
        assert_eq!(err.format_simple(), "Storage Unavailable: redis down");
        assert_eq!(err.code(), "E003");
        assert_eq!(err.to_string(), err.format_simple());
    }
}
