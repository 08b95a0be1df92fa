//! # livetrans
//!
//! 增量式的 HTML 文档翻译引擎：对文档做一次全量翻译，之后持续观察文档变更，
//! 只翻译新出现或被修改的文本。
//!
//! ## 模块组织
//!
//! - `document` - 可观察的文档树，产生变更记录
//! - `parsers` - HTML 解析、DOM 操作、选择器和序列化
//! - `translation` - 翻译引擎、管道、后端、缓存和配置
//! - `env` - 环境变量定义

pub mod document;
pub mod env;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use document::{Document, MutationRecord};
pub use translation::{
    EngineConfig, EngineOptions, TranslationBackend, TranslationEngine, TranslationError,
    TranslationResult,
};
