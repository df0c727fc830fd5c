// ==========================================
// 批量导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 仅用于整次调用失败（致命错误）；行级问题进入 ImportResult
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件/数据源相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("数据源读取失败: {0}")]
    SourceReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== Schema 错误 =====
    #[error("Schema 定义错误 ({kind}): {message}")]
    SchemaError { kind: String, message: String },

    // ===== 存储错误 =====
    #[error("存储不可用: {0}")]
    Repository(#[from] RepositoryError),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::SourceReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            ImportError::SourceReadError(err.to_string())
        } else {
            ImportError::CsvParseError(err.to_string())
        }
    }
}

/// Result 类型别名
pub type ImporterResult<T> = Result<T, ImportError>;
