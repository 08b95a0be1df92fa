// 集成测试公共模块
//
// 提供测试文档、记录调用的翻译后端、总是失败的后端与存储

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;

use livetrans::document::Document;
use livetrans::translation::storage::{KeyValueStore, MemoryStoreProvider, StoreProvider};
use livetrans::translation::{
    EngineConfig, EngineOptions, TranslationBackend, TranslationEngine, TranslationError,
    TranslationResult,
};
use markup5ever_rcdom::Handle;
use tokio::sync::Notify;

pub const SIMPLE_PAGE: &str = "<!DOCTYPE html><html><head><title>t</title></head>\
<body><h1>Welcome</h1><p>Hello</p><p>World</p></body></html>";

pub const MIXED_PAGE: &str = "<html><body>\
<p>Hello <b>bold</b> world</p>\
<pre>let x = 1; <span class=\"tr\">comment</span></pre>\
<code>raw()</code>\
<div class=\"livetrans-ignore\"><span>skip me</span></div>\
<p>2024</p>\
</body></html>";

pub type CallLog = Rc<RefCell<Vec<Vec<String>>>>;

/// 记录每次调用的后端，译文为 `[原文]`
#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub calls: CallLog,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// 所有调用中提交的片段
    pub fn submitted(&self) -> Vec<String> {
        self.calls.borrow().iter().flatten().cloned().collect()
    }
}

#[async_trait(?Send)]
impl TranslationBackend for RecordingBackend {
    async fn translate(
        &self,
        texts: &[String],
        _to_lang: &str,
        _from_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        self.calls.borrow_mut().push(texts.to_vec());
        Ok(texts.iter().map(|text| format!("[{}]", text)).collect())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// 总是返回网络错误的后端
#[derive(Clone, Default)]
pub struct FailingBackend {
    pub calls: CallLog,
}

#[async_trait(?Send)]
impl TranslationBackend for FailingBackend {
    async fn translate(
        &self,
        texts: &[String],
        _to_lang: &str,
        _from_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        self.calls.borrow_mut().push(texts.to_vec());
        Err(TranslationError::NetworkError("503 Service Unavailable".to_string()))
    }
}

/// 每次调用都先通知 `started`，再等 `gate` 放行，用来在解析途中插入操作
#[derive(Clone, Default)]
pub struct GatedBackend {
    pub started: Rc<Notify>,
    pub gate: Rc<Notify>,
    pub inner: RecordingBackend,
}

impl GatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 等待下一次调用进入后端
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// 放行一次调用
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait(?Send)]
impl TranslationBackend for GatedBackend {
    async fn translate(
        &self,
        texts: &[String],
        to_lang: &str,
        from_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        self.started.notify_one();
        self.gate.notified().await;
        self.inner.translate(texts, to_lang, from_lang).await
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// 无法打开的存储
#[derive(Clone, Copy, Default)]
pub struct FailingStoreProvider;

#[async_trait(?Send)]
impl StoreProvider for FailingStoreProvider {
    async fn open(&self, namespace: &str) -> TranslationResult<Box<dyn KeyValueStore>> {
        Err(TranslationError::StoreUnavailable(format!(
            "{} is locked",
            namespace
        )))
    }
}

pub fn document(html: &str) -> Rc<Document> {
    Rc::new(Document::parse(html).expect("HTML should parse"))
}

pub fn config(to_lang: &str) -> EngineConfig {
    EngineConfig::with_lang(to_lang)
}

/// 用记录后端和内存存储创建引擎
pub fn engine_with<B: TranslationBackend + 'static>(
    document: &Rc<Document>,
    config: EngineConfig,
    backend: B,
    provider: MemoryStoreProvider,
) -> TranslationEngine {
    let options = EngineOptions::builder(config)
        .backend(backend)
        .store_provider(provider)
        .build();
    TranslationEngine::new(document.clone(), options).expect("engine should build")
}

pub fn select(document: &Document, selector: &str) -> Handle {
    document
        .query_selector(selector)
        .expect("selector should parse")
        .unwrap_or_else(|| panic!("no element matches {}", selector))
}

pub fn text_of(document: &Document, selector: &str) -> String {
    livetrans::parsers::html::dom::text_content(&select(document, selector))
}
