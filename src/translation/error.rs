//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。
//!
//! 只有构造、配置和输入错误会返回给调用方；解析过程中的后端失败与存储失败
//! 会被记录并吸收，对应的片段回退为原文。

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 后端认证失败
    #[error("认证失败: {0}")]
    AuthFailure(String),

    /// 网络错误（请求被拒绝或返回非成功状态）
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 后端返回的结果数量与请求不一致
    #[error("响应格式错误: 期望 {expected} 条，得到 {actual} 条")]
    MalformedResponse { expected: usize, actual: usize },

    /// 持久化存储不可用
    #[error("存储不可用: {0}")]
    StoreUnavailable(String),

    /// 缓存读写错误
    #[error("缓存错误: {0}")]
    CacheError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    ///
    /// 同一轮翻译内不会自动重试，这里只是给调用方的提示。
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::NetworkError(_) => true,
            TranslationError::MalformedResponse { .. } => true,
            TranslationError::AuthFailure(_) => true,
            TranslationError::StoreUnavailable(_) => true,
            TranslationError::CacheError(_) => true,
            TranslationError::ConfigError(_) => false,
            TranslationError::InvalidInput(_) => false,
            TranslationError::ParseError(_) => false,
            TranslationError::SerializationError(_) => false,
            TranslationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            TranslationError::AuthFailure(_) => ErrorSeverity::Error,
            TranslationError::NetworkError(_) => ErrorSeverity::Warning,
            TranslationError::MalformedResponse { .. } => ErrorSeverity::Warning,
            TranslationError::StoreUnavailable(_) => ErrorSeverity::Warning,
            TranslationError::CacheError(_) => ErrorSeverity::Warning,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::InvalidInput(_) => ErrorCategory::Input,
            TranslationError::AuthFailure(_) => ErrorCategory::Auth,
            TranslationError::NetworkError(_) => ErrorCategory::Network,
            // 数量不一致按网络失败处理
            TranslationError::MalformedResponse { .. } => ErrorCategory::Network,
            TranslationError::StoreUnavailable(_) => ErrorCategory::Storage,
            TranslationError::CacheError(_) => ErrorCategory::Storage,
            TranslationError::ParseError(_) => ErrorCategory::Parsing,
            TranslationError::SerializationError(_) => ErrorCategory::Serialization,
            TranslationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let current_msg = self.to_string();
        let new_msg = format!("{} (上下文: {})", current_msg, context);

        match &mut self {
            TranslationError::ConfigError(ref mut msg)
            | TranslationError::InvalidInput(ref mut msg)
            | TranslationError::AuthFailure(ref mut msg)
            | TranslationError::NetworkError(ref mut msg)
            | TranslationError::StoreUnavailable(ref mut msg)
            | TranslationError::CacheError(ref mut msg)
            | TranslationError::ParseError(ref mut msg)
            | TranslationError::SerializationError(ref mut msg)
            | TranslationError::InternalError(ref mut msg) => *msg = new_msg,
            TranslationError::MalformedResponse { .. } => {
                return TranslationError::NetworkError(new_msg);
            }
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Auth,
    Network,
    Storage,
    Parsing,
    Serialization,
    Internal,
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::InternalError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

#[cfg(feature = "microsoft-backend")]
impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        TranslationError::NetworkError(format!("HTTP请求失败: {}", error))
    }
}

#[cfg(feature = "redb-store")]
impl From<redb::Error> for TranslationError {
    fn from(error: redb::Error) -> Self {
        TranslationError::CacheError(format!("redb错误: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误，不中断流程
    pub fn log_error(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }

    /// 创建网络错误
    pub fn network_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::NetworkError(msg.to_string())
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ConfigError(msg.to_string())
    }

    /// 创建输入验证错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::InvalidInput(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_response_is_network_category() {
        let err = TranslationError::MalformedResponse {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.is_retryable());
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_with_context_keeps_variant() {
        let err = TranslationError::AuthFailure("401".to_string()).with_context("edge token");
        match err {
            TranslationError::AuthFailure(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("edge token"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_config_error_is_critical() {
        let err = helpers::config_error("批次大小不能为0");
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(!err.is_retryable());
    }
}
