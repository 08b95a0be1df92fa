//! 引擎构造选项
//!
//! `EngineOptions` = `EngineConfig` + 运行时协作者（翻译后端、缓存存储、钩子）。
//! 未指定的协作者按配置和启用的 feature 选择默认实现。

use std::fmt;
use std::rc::Rc;

use crate::translation::backend::TranslationBackend;
use crate::translation::config::EngineConfig;
use crate::translation::storage::{MemoryStoreProvider, NullStoreProvider, StoreProvider};

/// 翻译轮次前后的钩子
pub type PassHook = Box<dyn Fn()>;

/// 引擎选项
pub struct EngineOptions {
    pub config: EngineConfig,
    pub backend: Rc<dyn TranslationBackend>,
    pub store_provider: Rc<dyn StoreProvider>,
    pub before_pass: Option<PassHook>,
    pub after_pass: Option<PassHook>,
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .field("before_pass", &self.before_pass.is_some())
            .field("after_pass", &self.after_pass.is_some())
            .finish()
    }
}

impl EngineOptions {
    pub fn builder(config: EngineConfig) -> EngineOptionsBuilder {
        EngineOptionsBuilder {
            config,
            backend: None,
            store_provider: None,
            before_pass: None,
            after_pass: None,
        }
    }

    /// 全部使用默认协作者
    pub fn new(config: EngineConfig) -> Self {
        Self::builder(config).build()
    }
}

/// `EngineOptions` 构建器
pub struct EngineOptionsBuilder {
    config: EngineConfig,
    backend: Option<Rc<dyn TranslationBackend>>,
    store_provider: Option<Rc<dyn StoreProvider>>,
    before_pass: Option<PassHook>,
    after_pass: Option<PassHook>,
}

impl EngineOptionsBuilder {
    pub fn backend<B: TranslationBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Rc::new(backend));
        self
    }

    pub fn shared_backend(mut self, backend: Rc<dyn TranslationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn store_provider<P: StoreProvider + 'static>(mut self, provider: P) -> Self {
        self.store_provider = Some(Rc::new(provider));
        self
    }

    pub fn shared_store_provider(mut self, provider: Rc<dyn StoreProvider>) -> Self {
        self.store_provider = Some(provider);
        self
    }

    pub fn before_pass<F: Fn() + 'static>(mut self, hook: F) -> Self {
        self.before_pass = Some(Box::new(hook));
        self
    }

    pub fn after_pass<F: Fn() + 'static>(mut self, hook: F) -> Self {
        self.after_pass = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> EngineOptions {
        let backend = self.backend.unwrap_or_else(default_backend);
        let store_provider = self
            .store_provider
            .unwrap_or_else(|| default_store_provider(&self.config));

        EngineOptions {
            config: self.config,
            backend,
            store_provider,
            before_pass: self.before_pass,
            after_pass: self.after_pass,
        }
    }
}

#[cfg(feature = "microsoft-backend")]
fn default_backend() -> Rc<dyn TranslationBackend> {
    Rc::new(crate::translation::backend::MicrosoftBackend::new())
}

#[cfg(not(feature = "microsoft-backend"))]
fn default_backend() -> Rc<dyn TranslationBackend> {
    tracing::warn!("未启用任何翻译后端，文本将保持原样");
    Rc::new(crate::translation::backend::IdentityBackend)
}

/// 缓存关闭时使用空存储；启用 redb 时持久化到缓存目录，否则只在进程内缓存
fn default_store_provider(config: &EngineConfig) -> Rc<dyn StoreProvider> {
    if !config.cache_enabled {
        tracing::debug!("翻译缓存已禁用");
        return Rc::new(NullStoreProvider);
    }

    #[cfg(feature = "redb-store")]
    {
        use crate::translation::storage::{default_cache_dir, RedbStoreProvider};

        let dir = config.cache_dir.clone().or_else(default_cache_dir);
        match dir {
            Some(dir) => return Rc::new(RedbStoreProvider::new(dir)),
            None => tracing::warn!("无法确定缓存目录，改用内存缓存"),
        }
    }

    Rc::new(MemoryStoreProvider::new())
}
