//! 翻译配置管理模块
//!
//! 提供统一的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{
    system_language, ConfigManager, DictEntrySpec, EngineConfig, ManualDictionary,
};

/// 配置常量
pub mod constants {
    // 批次处理相关
    pub const DEFAULT_BATCH_SIZE: usize = 100;
    pub const MAX_BATCH_SIZE: usize = 1000;

    // 翻译状态标记
    pub const DEFAULT_PENDING_MARKER: &str = "livetrans-pending";
    pub const DEFAULT_DONE_MARKER: &str = "livetrans-done";

    // 缓存命名空间前缀
    pub const CACHE_NAMESPACE_PREFIX: &str = "livetrans";

    // 默认观察/翻译的根元素
    pub const DEFAULT_ROOT_SELECTOR: &str = "body";

    // 词典中对所有目标语言生效的分组
    pub const ALL_LANGUAGES_KEY: &str = "all";

    // 默认忽略的元素，其内容不会被翻译
    pub const DEFAULT_IGNORE_SELECTORS: &[&str] = &[
        "style",
        "script",
        "noscript",
        "kbd",
        "code",
        "pre",
        "input",
        "textarea",
        "[contenteditable=\"true\"]",
        ".livetrans-ignore",
    ];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "livetrans.toml",
        ".livetrans.toml",
        "livetrans.json",
        "~/.config/livetrans/config.toml",
        "/etc/livetrans/config.toml",
    ];

    // 依次尝试加载的 .env 文件
    pub const ENV_FILES: &[&str] = &[".env.local", ".env"];
}
