//! 错误处理集成测试
//!
//! 测试错误分类、配置校验以及失败后的回退行为

use livetrans::translation::error::helpers::{config_error, network_error};
use livetrans::translation::error::{ErrorCategory, ErrorSeverity};
use livetrans::translation::storage::MemoryStoreProvider;
use livetrans::translation::{
    EngineOptions, FnBackend, TranslationEngine, TranslationError, TranslationResult,
};

mod common;

use common::{config, document, engine_with, text_of, RecordingBackend, SIMPLE_PAGE};

fn engine_error(cfg: livetrans::EngineConfig) -> TranslationError {
    let options = EngineOptions::builder(cfg)
        .backend(RecordingBackend::new())
        .store_provider(MemoryStoreProvider::new())
        .build();
    match TranslationEngine::new(document(SIMPLE_PAGE), options) {
        Ok(_) => panic!("engine construction should fail"),
        Err(e) => e,
    }
}

/// 测试错误分类
#[test]
fn test_error_taxonomy() {
    let network = network_error("timeout");
    assert!(network.is_retryable());
    assert_eq!(network.severity(), ErrorSeverity::Warning);
    assert_eq!(network.category(), ErrorCategory::Network);

    let malformed = TranslationError::MalformedResponse {
        expected: 3,
        actual: 2,
    };
    assert!(malformed.is_retryable());
    assert_eq!(malformed.category(), ErrorCategory::Network);

    let config = config_error("bad");
    assert!(!config.is_retryable());
    assert_eq!(config.severity(), ErrorSeverity::Critical);
    assert_eq!(config.category(), ErrorCategory::Configuration);

    assert_eq!(
        TranslationError::StoreUnavailable("locked".to_string()).category(),
        ErrorCategory::Storage
    );
    assert!(ErrorSeverity::Critical > ErrorSeverity::Warning);
}

/// 上下文信息附加在错误消息之后
#[test]
fn test_error_context() {
    let err = network_error("timeout").with_context("批次 1");
    assert!(matches!(err, TranslationError::NetworkError(_)));
    assert!(err.to_string().contains("timeout"));
    assert!(err.to_string().contains("批次 1"));

    let malformed = TranslationError::MalformedResponse {
        expected: 2,
        actual: 1,
    }
    .with_context("microsoft");
    assert!(matches!(malformed, TranslationError::NetworkError(_)));
}

/// 非法配置在构造引擎时被拒绝
#[test]
fn test_invalid_configuration_rejected() {
    let mut cfg = config("zh");
    cfg.batch_size = 0;
    assert!(matches!(engine_error(cfg), TranslationError::ConfigError(_)));

    let mut cfg = config("zh");
    cfg.done_marker = "has space".to_string();
    assert!(matches!(engine_error(cfg), TranslationError::ConfigError(_)));

    let mut cfg = config("zh");
    cfg.done_marker = cfg.pending_marker.clone();
    assert!(matches!(engine_error(cfg), TranslationError::ConfigError(_)));

    let mut cfg = config("zh");
    cfg.ignore.push("div[".to_string());
    assert!(matches!(engine_error(cfg), TranslationError::ConfigError(_)));

    let mut cfg = config("zh");
    cfg.force.push(":::".to_string());
    assert!(matches!(engine_error(cfg), TranslationError::ConfigError(_)));

    assert!(matches!(engine_error(config("  ")), TranslationError::ConfigError(_)));
}

/// 返回数量不一致时整批回退为原文
#[tokio::test]
async fn test_malformed_response_falls_back() {
    let doc = document(SIMPLE_PAGE);
    let backend = FnBackend::new(|texts: Vec<String>, _to: String, _from: String| async move {
        let mut out: Vec<String> = texts.iter().map(|t| format!("!{}", t)).collect();
        out.pop();
        TranslationResult::Ok(out)
    });
    let provider = MemoryStoreProvider::new();
    let engine = engine_with(&doc, config("zh"), backend, provider.clone());

    engine.translate_all("body").await.unwrap();

    assert_eq!(text_of(&doc, "h1"), "Welcome");
    assert_eq!(text_of(&doc, "p"), "Hello");
    assert_eq!(provider.len("livetrans-zh"), 0);

    let stats = engine.stats();
    assert_eq!(stats.resolution.network_failures, 1);
    assert_eq!(stats.resolution.fallbacks, 3);
}

/// 空译文回退为原文且不写缓存
#[tokio::test]
async fn test_empty_translation_not_cached() {
    let doc = document("<body><p>Hello</p><p>World</p></body>");
    let backend = FnBackend::new(|texts: Vec<String>, _to: String, _from: String| async move {
        TranslationResult::Ok(
            texts
                .iter()
                .map(|t| if t == "Hello" { String::new() } else { format!("~{}", t) })
                .collect::<Vec<String>>(),
        )
    });
    let provider = MemoryStoreProvider::new();
    let engine = engine_with(&doc, config("zh"), backend, provider.clone());

    engine.translate_all("body").await.unwrap();

    let paragraphs = doc.query_selector_all("p").unwrap();
    assert_eq!(livetrans::parsers::html::dom::text_content(&paragraphs[0]), "Hello");
    assert_eq!(livetrans::parsers::html::dom::text_content(&paragraphs[1]), "~World");
    assert_eq!(provider.len("livetrans-zh"), 1);
}

/// 销毁后的引擎拒绝新的操作
#[tokio::test]
async fn test_destroyed_engine_rejects_work() {
    let doc = document(SIMPLE_PAGE);
    let backend = RecordingBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());

    engine.destroy().await;

    let err = engine.translate_all("body").await.unwrap_err();
    assert!(matches!(err, TranslationError::InvalidInput(_)));
    assert!(engine.start_observing("body").is_err());

    engine.process_mutations().await;
    assert_eq!(backend.call_count(), 0);
    assert_eq!(text_of(&doc, "p"), "Hello");
}
