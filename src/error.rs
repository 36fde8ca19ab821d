//! Storage error types / 存储错误类型

use thiserror::Error;

/// Storage operation errors / 存储操作错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// Configuration could not be resolved (raised at construction) / 配置解析失败
    #[error("Configuration error: {0}")]
    Config(String),

    /// Write on a handle that was not opened for writing / 只读句柄写入
    #[error("File was opened for read-only access: {0}")]
    ReadOnly(String),

    /// Operation on a closed handle / 句柄已关闭
    #[error("File is closed: {0}")]
    Closed(String),

    /// The remote provider reported a failure / 服务端返回错误
    #[error("QiniuStorageError: {status} {message}")]
    Provider { status: u16, message: String },

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Invalid Content-Range header: {0}")]
    InvalidContentRange(String),

    #[error("Cipher error: {0}")]
    Cipher(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }
}

/// Result type for storage operations / 存储操作结果
pub type StorageResult<T> = Result<T, StorageError>;
