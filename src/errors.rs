use std::fmt;

use crate::storage::UrlRecord;

#[derive(Debug, Clone)]
pub enum LinkVaultError {
    /// Full URL 已存在，携带已存储的记录
    Conflict(Box<UrlRecord>),
    EmptyUserId,
    InvalidToken(String),
    SignatureInvalid,
    Unauthorized(String),
    Unsupported(String),
    Validation(String),
    Cancelled,
    DeadlineExceeded,
    KeyExhausted(String),
    FileOperation(String),
    Serialization(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Config(String),
}

impl LinkVaultError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LinkVaultError::Conflict(_) => "E001",
            LinkVaultError::EmptyUserId => "E002",
            LinkVaultError::InvalidToken(_) => "E003",
            LinkVaultError::SignatureInvalid => "E004",
            LinkVaultError::Unauthorized(_) => "E005",
            LinkVaultError::Unsupported(_) => "E006",
            LinkVaultError::Validation(_) => "E007",
            LinkVaultError::Cancelled => "E008",
            LinkVaultError::DeadlineExceeded => "E009",
            LinkVaultError::KeyExhausted(_) => "E010",
            LinkVaultError::FileOperation(_) => "E011",
            LinkVaultError::Serialization(_) => "E012",
            LinkVaultError::DatabaseConfig(_) => "E013",
            LinkVaultError::DatabaseConnection(_) => "E014",
            LinkVaultError::DatabaseOperation(_) => "E015",
            LinkVaultError::Config(_) => "E016",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            LinkVaultError::Conflict(_) => "URL Conflict",
            LinkVaultError::EmptyUserId => "Empty User ID",
            LinkVaultError::InvalidToken(_) => "Invalid Token",
            LinkVaultError::SignatureInvalid => "Signature Invalid",
            LinkVaultError::Unauthorized(_) => "Unauthorized",
            LinkVaultError::Unsupported(_) => "Unsupported Operation",
            LinkVaultError::Validation(_) => "Validation Error",
            LinkVaultError::Cancelled => "Operation Cancelled",
            LinkVaultError::DeadlineExceeded => "Deadline Exceeded",
            LinkVaultError::KeyExhausted(_) => "Short Key Exhausted",
            LinkVaultError::FileOperation(_) => "File Operation Error",
            LinkVaultError::Serialization(_) => "Serialization Error",
            LinkVaultError::DatabaseConfig(_) => "Database Configuration Error",
            LinkVaultError::DatabaseConnection(_) => "Database Connection Error",
            LinkVaultError::DatabaseOperation(_) => "Database Operation Error",
            LinkVaultError::Config(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            LinkVaultError::Conflict(existing) => &existing.full,
            LinkVaultError::EmptyUserId => "token carries an empty user id",
            LinkVaultError::SignatureInvalid => "token signature is not valid",
            LinkVaultError::Cancelled => "request context was cancelled",
            LinkVaultError::DeadlineExceeded => "request deadline has passed",
            LinkVaultError::InvalidToken(msg)
            | LinkVaultError::Unauthorized(msg)
            | LinkVaultError::Unsupported(msg)
            | LinkVaultError::Validation(msg)
            | LinkVaultError::KeyExhausted(msg)
            | LinkVaultError::FileOperation(msg)
            | LinkVaultError::Serialization(msg)
            | LinkVaultError::DatabaseConfig(msg)
            | LinkVaultError::DatabaseConnection(msg)
            | LinkVaultError::DatabaseOperation(msg)
            | LinkVaultError::Config(msg) => msg,
        }
    }

    /// The record that caused a `Conflict`, if this is one.
    pub fn conflicting_record(&self) -> Option<&UrlRecord> {
        match self {
            LinkVaultError::Conflict(existing) => Some(existing),
            _ => None,
        }
    }

    /// 格式化为彩色输出
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

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for LinkVaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for LinkVaultError {}

// 便捷的构造函数
impl LinkVaultError {
    pub fn conflict(existing: UrlRecord) -> Self {
        LinkVaultError::Conflict(Box::new(existing))
    }

    pub fn invalid_token<T: Into<String>>(msg: T) -> Self {
        LinkVaultError::InvalidToken(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        LinkVaultError::Unauthorized(msg.into())
    }

    pub fn unsupported<T: Into<String>>(msg: T) -> Self {
        LinkVaultError::Unsupported(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        LinkVaultError::Validation(msg.into())
    }

    pub fn key_exhausted<T: Into<String>>(msg: T) -> Self {
        LinkVaultError::KeyExhausted(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        LinkVaultError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        LinkVaultError::Serialization(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        LinkVaultError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        LinkVaultError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        LinkVaultError::DatabaseOperation(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        LinkVaultError::Config(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for LinkVaultError {
    fn from(err: sea_orm::DbErr) -> Self {
        LinkVaultError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for LinkVaultError {
    fn from(err: std::io::Error) -> Self {
        LinkVaultError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for LinkVaultError {
    fn from(err: serde_json::Error) -> Self {
        LinkVaultError::Serialization(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for LinkVaultError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::InvalidSignature => LinkVaultError::SignatureInvalid,
            _ => LinkVaultError::InvalidToken(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkVaultError>;
