//! 翻译模块
//!
//! 采用分层的模块化架构：
//! - **core**: 翻译引擎、写回与引擎选项
//! - **pipeline**: 节点分类、文本收集、术语切分与片段解析
//! - **backend**: 翻译后端接口与默认的微软翻译实现
//! - **storage**: 内容哈希、翻译缓存和持久化存储
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::rc::Rc;
//!
//! use livetrans::document::Document;
//! use livetrans::translation::{EngineConfig, EngineOptions, TranslationEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let document = Rc::new(Document::parse("<body><p>Hello</p></body>")?);
//! let options = EngineOptions::builder(EngineConfig::with_lang("zh-Hans")).build();
//! let engine = TranslationEngine::new(document.clone(), options)?;
//!
//! engine.translate_all("body").await?;
//! engine.start_observing("body")?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 翻译后端 - 批量翻译接口与实现
pub mod backend;

/// 配置管理模块 - 语言、选择器、标记、批次、缓存和手动词典
pub mod config;

/// 核心翻译引擎模块
pub mod core;

/// 错误处理模块 - 统一的错误类型和处理机制
pub mod error;

/// 文本处理管道模块
pub mod pipeline;

/// 存储管理模块 - 翻译缓存与持久化存储
pub mod storage;

// ============================================================================
// 公共 API 导出
// ============================================================================

pub use backend::{FnBackend, IdentityBackend, TranslationBackend};
#[cfg(feature = "microsoft-backend")]
pub use backend::{DetectedLanguage, LanguageInfo, MicrosoftBackend};

pub use config::{ConfigManager, DictEntrySpec, EngineConfig, ManualDictionary};

pub use self::core::{
    CoordinatorState, EngineOptions, EngineOptionsBuilder, EngineStatsSnapshot, NodeState,
    TranslationEngine,
};

pub use error::{TranslationError, TranslationResult};

pub use pipeline::{Classification, NodeClassifier, ResolutionStats, TermDictionary, TermSegmenter};

#[cfg(feature = "redb-store")]
pub use storage::RedbStoreProvider;
pub use storage::{
    content_hash, CacheStats, KeyValueStore, MemoryStoreProvider, NullStoreProvider,
    StoreProvider, TranslationCache,
};
