//! 翻译系统核心模块
//!
//! - **引擎层** (`engine.rs`): 待翻译集合、变更消费与单飞排空循环
//! - **写回层** (`apply.rs`): 把解析结果写回文本节点
//! - **选项** (`options.rs`): 引擎配置与运行时协作者
//!
//! ## 模块依赖关系
//!
//! ```text
//! TranslationEngine (engine.rs)
//!     ├── NodeClassifier (pipeline/classifier.rs)
//!     ├── ApplyPlan (apply.rs)
//!     │       ├── TextFragment (pipeline/collector.rs)
//!     │       └── TermSegmenter (pipeline/segmenter.rs)
//!     └── Resolver (pipeline/resolver.rs)
//!             ├── TermDictionary (pipeline/dictionary.rs)
//!             ├── TranslationCache (storage/cache.rs)
//!             └── TranslationBackend (backend/mod.rs)
//! ```

pub mod apply;
pub mod engine;
pub mod options;

pub use apply::{ApplyOutcome, ApplyPlan};
pub use engine::{
    node_id, CoordinatorState, EngineStatsSnapshot, NodeId, NodeState, TranslationEngine,
};
pub use options::{EngineOptions, EngineOptionsBuilder, PassHook};
