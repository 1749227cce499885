//! 错误定义模块

use thiserror::Error;

/// EMR系统统一错误类型
#[derive(Error, Debug)]
pub enum EmrError {
    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("主键冲突: {0}")]
    DuplicateKey(String),

    #[error("模式冲突: {0}")]
    SchemaConflict(String),

    #[error("患者编号已达上限 (P9999)")]
    ExhaustedCodeSpace,

    #[error("存储不可用: {0}")]
    StorageUnavailable(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// EMR系统统一结果类型
pub type Result<T> = std::result::Result<T, EmrError>;
