//! 翻译缓存
//!
//! 按语言对划分命名空间，键为原文的内容哈希。存储在首次使用时才打开，
//! 打开失败时退化为空存储，引擎继续工作但不再持久化。

use std::cell::Cell;
use std::rc::Rc;

use futures::future::join_all;
use tokio::sync::OnceCell;

use super::hasher::content_hash;
use super::store::{KeyValueStore, NullStore, StoreProvider};
use crate::translation::config::constants::CACHE_NAMESPACE_PREFIX;
use crate::translation::error::helpers::log_error;
use crate::translation::error::TranslationError;

/// 计算语言对对应的命名空间
pub fn cache_namespace(to_lang: &str, from_lang: &str) -> String {
    if from_lang.is_empty() {
        format!("{}-{}", CACHE_NAMESPACE_PREFIX, to_lang)
    } else {
        format!("{}-{}-{}", CACHE_NAMESPACE_PREFIX, to_lang, from_lang)
    }
}

/// 缓存统计信息
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub failed_writes: u64,
}

/// 翻译缓存
pub struct TranslationCache {
    namespace: String,
    provider: Rc<dyn StoreProvider>,
    store: OnceCell<Box<dyn KeyValueStore>>,
    degraded: Cell<bool>,
    closed: Cell<bool>,
    stats: Cell<CacheStats>,
}

impl TranslationCache {
    pub fn new(provider: Rc<dyn StoreProvider>, to_lang: &str, from_lang: &str) -> Self {
        Self {
            namespace: cache_namespace(to_lang, from_lang),
            provider,
            store: OnceCell::new(),
            degraded: Cell::new(false),
            closed: Cell::new(false),
            stats: Cell::new(CacheStats::default()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 存储是否打开失败
    pub fn is_degraded(&self) -> bool {
        self.degraded.get()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    async fn store(&self) -> &dyn KeyValueStore {
        self.store
            .get_or_init(|| async {
                match self.provider.open(&self.namespace).await {
                    Ok(store) => {
                        tracing::debug!("翻译缓存已就绪: {}", self.namespace);
                        store
                    }
                    Err(e) => {
                        let e = match e {
                            TranslationError::StoreUnavailable(_) => e,
                            other => TranslationError::StoreUnavailable(other.to_string()),
                        };
                        log_error(&e.with_context(&self.namespace));
                        self.degraded.set(true);
                        Box::new(NullStore) as Box<dyn KeyValueStore>
                    }
                }
            })
            .await
            .as_ref()
    }

    /// 读取缓存的译文，空字符串视为未命中
    pub async fn get(&self, text: &str) -> Option<String> {
        if self.closed.get() {
            return None;
        }

        let key = content_hash(text);
        let result = match self.store().await.get(&key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("读取缓存失败 {}: {}", key, e);
                None
            }
        };

        self.update_stats(|stats| {
            if result.is_some() {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        });
        result
    }

    /// 写入译文，失败只记录日志
    pub async fn set(&self, text: &str, translated: &str) {
        if self.closed.get() {
            return;
        }

        let key = content_hash(text);
        match self.store().await.put(&key, translated).await {
            Ok(()) => self.update_stats(|stats| stats.writes += 1),
            Err(e) => {
                tracing::warn!("写入缓存失败 {}: {}", key, e);
                self.update_stats(|stats| stats.failed_writes += 1);
            }
        }
    }

    /// 批量写入，各条写入互不影响
    pub async fn set_batch(&self, texts: &[String], translations: &[String]) {
        if texts.len() != translations.len() {
            tracing::warn!(
                "批量写入缓存的数量不一致: {} 条原文, {} 条译文",
                texts.len(),
                translations.len()
            );
        }

        join_all(
            texts
                .iter()
                .zip(translations.iter())
                .map(|(text, translated)| self.set(text, translated)),
        )
        .await;
    }

    /// 释放存储句柄，之后的读写均被忽略
    pub async fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        if let Some(store) = self.store.get() {
            if let Err(e) = store.close().await {
                tracing::warn!("关闭缓存失败 {}: {}", self.namespace, e);
            }
        }
    }

    fn update_stats(&self, f: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}
