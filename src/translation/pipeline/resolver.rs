//! 片段解析管线
//!
//! 对一批片段依次尝试：手动词典 → 缓存 → 不可翻译过滤 → 分块网络翻译。
//! 返回的映射覆盖所有提交的片段；网络失败的分块回退为原文且不写缓存。

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::dictionary::TermDictionary;
use super::filters::partition_translatable;
use crate::translation::backend::TranslationBackend;
use crate::translation::error::helpers::log_error;
use crate::translation::error::TranslationError;
use crate::translation::storage::TranslationCache;

/// 解析统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionStats {
    pub from_dictionary: u64,
    pub from_cache: u64,
    pub untranslatable: u64,
    pub from_network: u64,
    pub network_calls: u64,
    pub network_failures: u64,
    /// 网络失败后回退为原文的片段数
    pub fallbacks: u64,
}

/// 解析管线
pub struct Resolver {
    dictionary: Rc<TermDictionary>,
    cache: Rc<TranslationCache>,
    backend: Rc<dyn TranslationBackend>,
    to_lang: String,
    from_lang: String,
    batch_size: usize,
    stats: Cell<ResolutionStats>,
}

impl Resolver {
    pub fn new(
        dictionary: Rc<TermDictionary>,
        cache: Rc<TranslationCache>,
        backend: Rc<dyn TranslationBackend>,
        to_lang: &str,
        from_lang: &str,
        batch_size: usize,
    ) -> Self {
        Self {
            dictionary,
            cache,
            backend,
            to_lang: to_lang.to_string(),
            from_lang: from_lang.to_string(),
            batch_size: batch_size.max(1),
            stats: Cell::new(ResolutionStats::default()),
        }
    }

    pub fn stats(&self) -> ResolutionStats {
        self.stats.get()
    }

    /// 解析片段，空片段被忽略
    pub async fn resolve(&self, fragments: &[String]) -> HashMap<String, String> {
        let mut resolved: HashMap<String, String> = HashMap::new();

        // 去重，保持首次出现的顺序
        let mut seen: HashSet<&str> = HashSet::new();
        let unique: Vec<&str> = fragments
            .iter()
            .map(String::as_str)
            .filter(|text| !text.is_empty() && seen.insert(text))
            .collect();

        let mut remaining: Vec<&str> = Vec::new();
        for text in unique {
            if let Some(translated) = self.dictionary.lookup(text) {
                resolved.insert(text.to_string(), translated.to_string());
                self.update_stats(|s| s.from_dictionary += 1);
                continue;
            }

            if let Some(cached) = self.cache.get(text).await {
                resolved.insert(text.to_string(), cached);
                self.update_stats(|s| s.from_cache += 1);
                continue;
            }

            remaining.push(text);
        }

        // 纯数字、标点之类的片段原样保留
        let (translatable, untranslatable) = partition_translatable(remaining);
        for text in &untranslatable {
            resolved.insert(text.to_string(), text.to_string());
        }
        self.update_stats(|s| s.untranslatable += untranslatable.len() as u64);

        let to_fetch: Vec<String> = translatable.into_iter().map(str::to_string).collect();

        for chunk in to_fetch.chunks(self.batch_size) {
            self.resolve_chunk(chunk, &mut resolved).await;
        }

        tracing::debug!(
            "解析完成: {} 个片段, {} 个经网络翻译",
            resolved.len(),
            to_fetch.len()
        );
        resolved
    }

    async fn resolve_chunk(&self, chunk: &[String], resolved: &mut HashMap<String, String>) {
        self.update_stats(|s| s.network_calls += 1);

        let result = self
            .backend
            .translate(chunk, &self.to_lang, &self.from_lang)
            .await
            .and_then(|translations| {
                if translations.len() == chunk.len() {
                    Ok(translations)
                } else {
                    Err(TranslationError::MalformedResponse {
                        expected: chunk.len(),
                        actual: translations.len(),
                    })
                }
            });

        match result {
            Ok(translations) => {
                let mut cache_texts = Vec::with_capacity(chunk.len());
                let mut cache_values = Vec::with_capacity(chunk.len());

                for (text, translated) in chunk.iter().zip(translations) {
                    if translated.is_empty() {
                        // 空结果不缓存，回退为原文
                        resolved.insert(text.clone(), text.clone());
                        continue;
                    }
                    cache_texts.push(text.clone());
                    cache_values.push(translated.clone());
                    resolved.insert(text.clone(), translated);
                }

                self.cache.set_batch(&cache_texts, &cache_values).await;
                self.update_stats(|s| s.from_network += cache_texts.len() as u64);
            }
            Err(e) => {
                log_error(&e.with_context(format!(
                    "{} 批量翻译 {} 个片段",
                    self.backend.name(),
                    chunk.len()
                )));
                for text in chunk {
                    resolved.insert(text.clone(), text.clone());
                }
                self.update_stats(|s| {
                    s.network_failures += 1;
                    s.fallbacks += chunk.len() as u64;
                });
            }
        }
    }

    fn update_stats(&self, f: impl FnOnce(&mut ResolutionStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::translation::backend::FnBackend;
    use crate::translation::error::TranslationResult;
    use crate::translation::pipeline::dictionary::TermEntry;
    use crate::translation::storage::{content_hash, MemoryStoreProvider};

    type Calls = Rc<RefCell<Vec<Vec<String>>>>;

    fn recording_backend(calls: Calls, fail: bool) -> Rc<dyn TranslationBackend> {
        Rc::new(FnBackend::new(move |texts: Vec<String>, _to: String, _from: String| {
            let calls = calls.clone();
            async move {
                calls.borrow_mut().push(texts.clone());
                if fail {
                    return Err(TranslationError::NetworkError("down".to_string()));
                }
                Ok::<_, TranslationError>(texts.iter().map(|t| format!("[{}]", t)).collect())
            }
        }))
    }

    fn resolver(
        provider: &MemoryStoreProvider,
        backend: Rc<dyn TranslationBackend>,
        batch_size: usize,
    ) -> Resolver {
        let dictionary = TermDictionary::from_entries(vec![TermEntry::new(
            "Acme", "阿克米", false, true,
        )]);
        Resolver::new(
            Rc::new(dictionary),
            Rc::new(TranslationCache::new(Rc::new(provider.clone()), "zh", "")),
            backend,
            "zh",
            "",
            batch_size,
        )
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_pipeline_order_and_dedup() {
        let provider = MemoryStoreProvider::new();
        let calls: Calls = Rc::default();
        let r = resolver(&provider, recording_backend(calls.clone(), false), 100);

        let map = r
            .resolve(&strings(&["Acme", "Hello", "Hello", "42", "", "World"]))
            .await;

        assert_eq!(map["Acme"], "阿克米");
        assert_eq!(map["Hello"], "[Hello]");
        assert_eq!(map["42"], "42");
        assert!(!map.contains_key(""));
        assert_eq!(*calls.borrow(), vec![strings(&["Hello", "World"])]);

        let stats = r.stats();
        assert_eq!(stats.from_dictionary, 1);
        assert_eq!(stats.untranslatable, 1);
        assert_eq!(stats.from_network, 2);
        assert_eq!(stats.network_calls, 1);
    }

    #[tokio::test]
    async fn test_untranslatable_kept_and_not_cached() {
        let provider = MemoryStoreProvider::new();
        let calls: Calls = Rc::default();
        let r = resolver(&provider, recording_backend(calls.clone(), false), 100);

        let map = r.resolve(&strings(&["1.", "Hi", "…", "There"])).await;

        assert_eq!(map["1."], "1.");
        assert_eq!(map["…"], "…");
        assert_eq!(*calls.borrow(), vec![strings(&["Hi", "There"])]);
        assert_eq!(r.stats().untranslatable, 2);
        assert_eq!(provider.len("livetrans-zh"), 2);
    }

    #[tokio::test]
    async fn test_second_pass_served_from_cache() {
        let provider = MemoryStoreProvider::new();
        let calls: Calls = Rc::default();
        let r = resolver(&provider, recording_backend(calls.clone(), false), 100);

        r.resolve(&strings(&["Hello"])).await;
        let map = r.resolve(&strings(&["Hello"])).await;

        assert_eq!(map["Hello"], "[Hello]");
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(r.stats().from_cache, 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_without_cache_write() {
        let provider = MemoryStoreProvider::new();
        let calls: Calls = Rc::default();
        let r = resolver(&provider, recording_backend(calls, true), 100);

        let map = r.resolve(&strings(&["Hello"])).await;

        assert_eq!(map["Hello"], "Hello");
        assert_eq!(provider.value("livetrans-zh", &content_hash("Hello")), None);
        assert_eq!(r.stats().network_failures, 1);
        assert_eq!(r.stats().fallbacks, 1);
    }

    #[tokio::test]
    async fn test_chunking_and_cardinality_mismatch() {
        let provider = MemoryStoreProvider::new();
        let calls: Calls = Rc::default();
        let recorded = calls.clone();
        let backend: Rc<dyn TranslationBackend> = Rc::new(FnBackend::new(
            move |texts: Vec<String>, _to: String, _from: String| {
                let recorded = recorded.clone();
                async move {
                    recorded.borrow_mut().push(texts.clone());
                    let out: TranslationResult<Vec<String>> = if texts.contains(&"c".to_string()) {
                        Ok(vec!["only one".to_string()])
                    } else {
                        Ok(texts.iter().map(|t| t.to_uppercase()).collect())
                    };
                    out
                }
            },
        ));
        let r = resolver(&provider, backend, 2);

        let map = r.resolve(&strings(&["a", "b", "c", "d"])).await;

        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(map["a"], "A");
        assert_eq!(map["b"], "B");
        // 第二块数量不一致，整块回退
        assert_eq!(map["c"], "c");
        assert_eq!(map["d"], "d");
        assert_eq!(provider.len("livetrans-zh"), 2);
    }
}
