//! 增量翻译集成测试
//!
//! 测试变更记录的消费、单飞排空循环以及引擎自身写入不会被重新排队

use std::cell::Cell;
use std::rc::Rc;

use livetrans::document::Document;
use livetrans::translation::storage::MemoryStoreProvider;
use livetrans::translation::{
    CoordinatorState, EngineOptions, FnBackend, NodeState, TranslationEngine, TranslationError,
};

mod common;

use common::{
    config, document, engine_with, select, text_of, GatedBackend, RecordingBackend, SIMPLE_PAGE,
};

fn append_paragraph(doc: &Document, parent_selector: &str, text: &str) -> markup5ever_rcdom::Handle {
    let parent = select(doc, parent_selector);
    let p = doc.create_element("p", &[("class", "late")]);
    let t = doc.create_text(text);
    doc.append_child(&p, &t);
    doc.append_child(&parent, &p);
    p
}

/// 新插入的子树被翻译，已翻译的内容不受影响
#[tokio::test]
async fn test_inserted_subtree_is_translated() {
    let doc = document(SIMPLE_PAGE);
    let backend = RecordingBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());

    engine.translate_all("body").await.unwrap();
    engine.start_observing("body").unwrap();

    let p = append_paragraph(&doc, "body", "Fresh");
    assert_eq!(doc.pending_records(), 1);

    engine.process_mutations().await;

    assert_eq!(text_of(&doc, ".late"), "[Fresh]");
    assert_eq!(engine.node_state(&p), NodeState::Done);
    assert_eq!(backend.call_count(), 2);
    assert_eq!(backend.calls.borrow()[1], vec!["Fresh"]);
    assert_eq!(text_of(&doc, "h1"), "[Welcome]");
}

/// 引擎自身的写入不产生新的翻译任务
#[tokio::test]
async fn test_own_writes_are_not_requeued() {
    let doc = document("<body></body>");
    let backend = RecordingBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());
    engine.start_observing("body").unwrap();

    append_paragraph(&doc, "body", "Hello");
    engine.process_mutations().await;
    engine.process_mutations().await;

    assert_eq!(backend.call_count(), 1);
    assert_eq!(engine.pending_len(), 0);
    assert_eq!(doc.pending_records(), 0);
    assert_eq!(text_of(&doc, "p"), "[Hello]");
}

/// 已翻译元素的文本被外部修改后重新翻译
#[tokio::test]
async fn test_text_change_retranslates_done_element() {
    let doc = document("<body><p>Hello</p></body>");
    let backend = RecordingBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());
    engine.translate_all("body").await.unwrap();
    engine.start_observing("body").unwrap();

    let p = select(&doc, "p");
    let text_node = p.children.borrow()[0].clone();
    doc.set_text(&text_node, "Goodbye");
    engine.process_mutations().await;

    assert_eq!(text_of(&doc, "p"), "[Goodbye]");
    assert_eq!(engine.node_state(&p), NodeState::Done);
}

/// 忽略区域内的文本变化被丢弃，强制区域内的不会
#[tokio::test]
async fn test_text_change_in_ignored_region() {
    let doc = document("<body><pre><span>a</span></pre><pre class=\"tr\">b</pre></body>");
    let backend = RecordingBackend::new();
    let mut cfg = config("zh");
    cfg.force.push(".tr".to_string());
    let engine = engine_with(&doc, cfg, backend.clone(), MemoryStoreProvider::new());
    engine.start_observing("body").unwrap();

    let span = select(&doc, "span");
    let span_text = span.children.borrow()[0].clone();
    doc.set_text(&span_text, "changed");

    let forced = select(&doc, ".tr");
    let forced_text = forced.children.borrow()[0].clone();
    doc.set_text(&forced_text, "forced");

    engine.process_mutations().await;

    assert_eq!(text_of(&doc, "span"), "changed");
    assert_eq!(text_of(&doc, ".tr"), "[forced]");
    assert_eq!(backend.submitted(), vec!["forced"]);
}

/// 轮次进行中到达的变更在同一次排空中处理
#[tokio::test]
async fn test_mutation_during_pass_is_drained() {
    let doc = document("<body></body>");
    let inserted = Rc::new(Cell::new(false));
    let calls = Rc::new(Cell::new(0));

    let backend = {
        let doc = doc.clone();
        let inserted = inserted.clone();
        let calls = calls.clone();
        FnBackend::new(move |texts: Vec<String>, _to: String, _from: String| {
            let doc = doc.clone();
            let inserted = inserted.clone();
            let calls = calls.clone();
            async move {
                calls.set(calls.get() + 1);
                if !inserted.replace(true) {
                    append_paragraph(&doc, "body", "Late");
                }
                Ok::<_, TranslationError>(
                    texts.iter().map(|t| format!("<{}>", t)).collect::<Vec<String>>(),
                )
            }
        })
    };

    let after = Rc::new(Cell::new(0));
    let options = EngineOptions::builder(config("zh"))
        .backend(backend)
        .store_provider(MemoryStoreProvider::new())
        .after_pass({
            let after = after.clone();
            move || after.set(after.get() + 1)
        })
        .build();
    let engine = TranslationEngine::new(doc.clone(), options).unwrap();
    engine.start_observing("body").unwrap();

    let first = doc.create_element("p", &[]);
    let first_text = doc.create_text("First");
    doc.append_child(&first, &first_text);
    doc.append_child(&select(&doc, "body"), &first);

    engine.process_mutations().await;

    assert_eq!(text_of(&doc, "p"), "<First>");
    assert_eq!(text_of(&doc, ".late"), "<Late>");
    assert_eq!(calls.get(), 2);
    assert_eq!(engine.stats().passes, 2);
    assert_eq!(after.get(), 1);
    assert_eq!(engine.state(), CoordinatorState::Idle);
}

/// 停止观察后变更不再被记录
#[tokio::test]
async fn test_stop_observing() {
    let doc = document("<body></body>");
    let backend = RecordingBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());

    engine.start_observing("body").unwrap();
    assert!(engine.is_observing());
    engine.stop_observing();
    assert!(!engine.is_observing());

    append_paragraph(&doc, "body", "Ignored");
    engine.process_mutations().await;

    assert_eq!(backend.call_count(), 0);
    assert_eq!(text_of(&doc, "p"), "Ignored");
}

/// 全量翻译期间暂停观察，结束后恢复
#[tokio::test]
async fn test_sweep_resumes_observer() {
    let doc = document(SIMPLE_PAGE);
    let backend = RecordingBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());

    engine.start_observing("body").unwrap();
    engine.translate_all("body").await.unwrap();

    // 全量翻译自身的写入没有留下记录
    assert_eq!(doc.pending_records(), 0);
    assert!(doc.is_observing());

    append_paragraph(&doc, "body", "After");
    engine.process_mutations().await;
    assert_eq!(text_of(&doc, ".late"), "[After]");
}

/// `run` 循环处理变更，销毁后退出
#[tokio::test]
async fn test_run_loop_until_destroyed() {
    let doc = document("<body></body>");
    let backend = RecordingBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());
    engine.start_observing("body").unwrap();

    let driver = async {
        let p = append_paragraph(&doc, "body", "Live");
        for _ in 0..100 {
            if engine.node_state(&p) == NodeState::Done {
                break;
            }
            tokio::task::yield_now().await;
        }
        engine.destroy().await;
    };

    tokio::join!(engine.run(), driver);

    assert_eq!(text_of(&doc, "p"), "[Live]");
    assert!(!engine.is_observing());
}

/// 全量翻译途中停止观察，结束后不会恢复
#[tokio::test]
async fn test_stop_observing_during_sweep_stays_stopped() {
    let doc = document(SIMPLE_PAGE);
    let backend = GatedBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());
    engine.start_observing("body").unwrap();

    let (result, ()) = tokio::join!(engine.translate_all("body"), async {
        backend.wait_started().await;
        engine.stop_observing();
        backend.release();
    });
    result.unwrap();

    assert!(!engine.is_observing());
    assert!(!doc.is_observing());
    append_paragraph(&doc, "body", "Unwatched");
    assert_eq!(doc.pending_records(), 0);
}

/// 全量翻译途中销毁引擎，观察不会被重新挂上
#[tokio::test]
async fn test_destroy_during_sweep_detaches_observer() {
    let doc = document(SIMPLE_PAGE);
    let backend = GatedBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());
    engine.start_observing("body").unwrap();

    let (result, ()) = tokio::join!(engine.translate_all("body"), async {
        backend.wait_started().await;
        engine.destroy().await;
        backend.release();
    });
    result.unwrap();

    assert!(!doc.is_observing());
    for i in 0..10 {
        append_paragraph(&doc, "body", &format!("late {}", i));
    }
    assert_eq!(doc.pending_records(), 0);
}

/// 全量翻译途中切换根元素，只观察新的根
#[tokio::test]
async fn test_switch_root_during_sweep() {
    let doc = document("<body><main><p>A</p></main><aside><p>B</p></aside></body>");
    let backend = GatedBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());
    engine.start_observing("main").unwrap();

    let (result, switched) = tokio::join!(engine.translate_all("main"), async {
        backend.wait_started().await;
        let switched = engine.start_observing("aside");
        backend.release();
        switched
    });
    result.unwrap();
    switched.unwrap();

    append_paragraph(&doc, "main", "in main");
    assert_eq!(doc.pending_records(), 0);
    append_paragraph(&doc, "aside", "in aside");
    assert_eq!(doc.pending_records(), 1);
}

/// 轮次进行中的全量翻译请求直接返回
#[tokio::test]
async fn test_sweep_while_in_flight_is_noop() {
    let doc = document(SIMPLE_PAGE);
    let backend = GatedBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());

    let (first, second) = tokio::join!(engine.translate_all("body"), async {
        backend.wait_started().await;
        assert_eq!(engine.state(), CoordinatorState::Running);
        let second = engine.translate_all("body").await;
        backend.release();
        second
    });
    first.unwrap();
    second.unwrap();

    assert_eq!(backend.inner.call_count(), 1);
    assert_eq!(engine.stats().sweeps, 1);
    assert_eq!(engine.stats().passes, 1);
    assert_eq!(text_of(&doc, "p"), "[Hello]");
}

/// 轮次进行中的变更只入队，由正在运行的排空循环接着处理
#[tokio::test]
async fn test_mutations_during_pass_are_enqueued_and_drained() {
    let doc = document("<body></body>");
    let backend = GatedBackend::new();
    let engine = engine_with(&doc, config("zh"), backend.clone(), MemoryStoreProvider::new());
    engine.start_observing("body").unwrap();
    append_paragraph(&doc, "body", "First");

    let ((), ()) = tokio::join!(engine.process_mutations(), async {
        backend.wait_started().await;
        let late = append_paragraph(&doc, "body", "Late");
        engine.process_mutations().await;

        assert_eq!(engine.pending_len(), 1);
        assert_eq!(engine.node_state(&late), NodeState::Pending);
        assert_eq!(engine.state(), CoordinatorState::Running);
        backend.release();

        // 第二轮开始时协调器处于排空状态
        backend.wait_started().await;
        assert_eq!(engine.state(), CoordinatorState::Draining);
        backend.release();
    });

    assert_eq!(engine.state(), CoordinatorState::Idle);
    assert_eq!(engine.stats().passes, 2);
    assert_eq!(backend.inner.submitted(), vec!["First", "Late"]);
    let texts: Vec<String> = doc
        .query_selector_all("p")
        .unwrap()
        .iter()
        .map(livetrans::parsers::html::dom::text_content)
        .collect();
    assert_eq!(texts, vec!["[First]", "[Late]"]);
    assert_eq!(engine.pending_len(), 0);
}

/// 解析期间文本被改动的元素重新排队，用新文本再翻译一次
#[tokio::test]
async fn test_element_edited_during_resolution_is_requeued() {
    let doc = document("<body><p>Hello</p></body>");
    let edited = Rc::new(Cell::new(false));

    let backend = {
        let doc = doc.clone();
        let edited = edited.clone();
        FnBackend::new(move |texts: Vec<String>, _to: String, _from: String| {
            let doc = doc.clone();
            let edited = edited.clone();
            async move {
                if !edited.replace(true) {
                    let text_node = select(&doc, "p").children.borrow()[0].clone();
                    doc.set_text(&text_node, "Goodbye");
                }
                Ok::<_, TranslationError>(
                    texts.iter().map(|t| format!("[{}]", t)).collect::<Vec<String>>(),
                )
            }
        })
    };
    let engine = engine_with(&doc, config("zh"), backend, MemoryStoreProvider::new());

    engine.translate_all("body").await.unwrap();

    let p = select(&doc, "p");
    assert_eq!(text_of(&doc, "p"), "[Goodbye]");
    assert_eq!(engine.node_state(&p), NodeState::Done);
    let stats = engine.stats();
    assert_eq!(stats.requeued, 1);
    assert_eq!(stats.passes, 2);
}
