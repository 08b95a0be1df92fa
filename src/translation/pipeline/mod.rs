//! 翻译管道模块
//!
//! 节点分类、文本收集、术语切分、可翻译性过滤和片段解析

pub mod classifier;
pub mod collector;
pub mod dictionary;
pub mod filters;
pub mod resolver;
pub mod segmenter;

// 重新导出主要类型
pub use classifier::{Classification, NodeClassifier};
pub use collector::{extract_direct_fragments, extract_own_text, TextFragment};
pub use dictionary::{TermDictionary, TermEntry};
pub use filters::{is_translatable, partition_translatable};
pub use resolver::{ResolutionStats, Resolver};
pub use segmenter::TermSegmenter;
