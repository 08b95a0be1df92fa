//! 翻译引擎
//!
//! `TranslationEngine` 持有待翻译元素集合，消费文档的变更记录，并以单飞方式
//! 调度翻译轮次：同一时刻最多只有一个轮次在运行，运行期间到达的变更被并入
//! 下一次排空循环，不会丢失。
//!
//! ## 工作流程
//! 1. 分类：根据强制/忽略选择器筛出需要翻译的元素，标记为 pending
//! 2. 收集：提取元素的直接文本片段，经术语切分得到待解析片段
//! 3. 解析：词典 → 缓存 → 不可翻译过滤 → 分块网络翻译
//! 4. 写回：把译文写回文本节点，消化自身写入产生的变更后再切换为 done
//!
//! ## 使用示例
//! ```rust,ignore
//! let document = Rc::new(Document::parse(html)?);
//! let options = EngineOptions::builder(EngineConfig::with_lang("zh")).build();
//! let engine = TranslationEngine::new(document.clone(), options)?;
//! engine.translate_all("body").await?;
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tokio::sync::Notify;

use super::apply::ApplyPlan;
use super::options::{EngineOptions, PassHook};
use crate::document::{Document, MutationRecord};
use crate::parsers::html::dom::{add_class, get_parent_node, has_class, is_element, remove_class};
use crate::parsers::html::selector::SelectorList;
use crate::translation::config::constants::{DEFAULT_IGNORE_SELECTORS, DEFAULT_ROOT_SELECTOR};
use crate::translation::config::EngineConfig;
use crate::translation::error::helpers::{config_error, validation_error};
use crate::translation::error::TranslationResult;
use crate::translation::pipeline::{
    NodeClassifier, ResolutionStats, Resolver, TermDictionary, TermSegmenter,
};
use crate::translation::storage::{CacheStats, TranslationCache};

/// 协调器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinatorState {
    /// 没有轮次在运行
    Idle,
    /// 轮次进行中
    Running,
    /// 上一轮结束时仍有待处理元素，紧接着继续下一轮
    Draining,
}

/// 元素的翻译状态，由元素上的标记 class 推导
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Untranslated,
    Pending,
    Done,
}

/// 节点标识，即 `Rc` 指针地址
pub type NodeId = usize;

pub fn node_id(node: &Handle) -> NodeId {
    Rc::as_ptr(node) as NodeId
}

/// 引擎统计快照
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    /// 执行过的翻译轮次
    pub passes: u64,
    /// 全量翻译次数
    pub sweeps: u64,
    pub elements_done: u64,
    pub text_writes: u64,
    /// 因内容在解析期间被改动而重新排队的元素数
    pub requeued: u64,
    pub resolution: ResolutionStats,
    pub cache: CacheStats,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    passes: u64,
    sweeps: u64,
    elements_done: u64,
    text_writes: u64,
    requeued: u64,
}

/// 待翻译元素集合，重复加入无效果
#[derive(Default)]
struct PendingSet {
    nodes: Vec<Handle>,
    ids: HashSet<NodeId>,
}

impl PendingSet {
    fn insert(&mut self, node: &Handle) -> bool {
        if !self.ids.insert(node_id(node)) {
            return false;
        }
        self.nodes.push(node.clone());
        true
    }

    fn take(&mut self) -> Vec<Handle> {
        self.ids.clear();
        std::mem::take(&mut self.nodes)
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// 增量翻译引擎
pub struct TranslationEngine {
    document: Rc<Document>,
    config: EngineConfig,
    classifier: NodeClassifier,
    segmenter: TermSegmenter,
    resolver: Resolver,
    cache: Rc<TranslationCache>,
    before_pass: Option<PassHook>,
    after_pass: Option<PassHook>,

    pending: RefCell<PendingSet>,
    in_flight: Cell<bool>,
    state: Cell<CoordinatorState>,
    observed_root: RefCell<Option<Handle>>,
    destroyed: Cell<bool>,
    shutdown: Notify,
    counters: Cell<Counters>,
}

impl TranslationEngine {
    /// 创建引擎，配置或选择器无效时返回 `ConfigError`
    pub fn new(document: Rc<Document>, options: EngineOptions) -> TranslationResult<Self> {
        let EngineOptions {
            config,
            backend,
            store_provider,
            before_pass,
            after_pass,
        } = options;
        config.validate()?;

        let ignore: Vec<&str> = DEFAULT_IGNORE_SELECTORS
            .iter()
            .copied()
            .chain(config.ignore.iter().map(String::as_str))
            .collect();
        let ignore = SelectorList::from_selectors(ignore.as_slice())
            .map_err(|e| config_error(format!("忽略选择器无效: {}", e)))?;
        let force = SelectorList::from_selectors(config.force.as_slice())
            .map_err(|e| config_error(format!("强制选择器无效: {}", e)))?;

        let dictionary = Rc::new(TermDictionary::from_config(
            &config.manual_dictionary,
            &config.to_lang,
        ));
        let segmenter = TermSegmenter::new(&dictionary);
        let cache = Rc::new(TranslationCache::new(
            store_provider,
            &config.to_lang,
            &config.from_lang,
        ));
        let resolver = Resolver::new(
            dictionary.clone(),
            cache.clone(),
            backend.clone(),
            &config.to_lang,
            &config.from_lang,
            config.batch_size,
        );

        tracing::info!(
            "翻译引擎已创建: {} → {}，后端 {}，词典 {} 条，忽略选择器 {} 个，强制选择器 {} 个",
            if config.from_lang.is_empty() { "auto" } else { config.from_lang.as_str() },
            config.to_lang,
            backend.name(),
            dictionary.len(),
            ignore.len(),
            force.len()
        );

        Ok(Self {
            document,
            classifier: NodeClassifier::new(force, ignore, &config.done_marker),
            config,
            segmenter,
            resolver,
            cache,
            before_pass,
            after_pass,
            pending: RefCell::new(PendingSet::default()),
            in_flight: Cell::new(false),
            state: Cell::new(CoordinatorState::Idle),
            observed_root: RefCell::new(None),
            destroyed: Cell::new(false),
            shutdown: Notify::new(),
            counters: Cell::new(Counters::default()),
        })
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> CoordinatorState {
        self.state.get()
    }

    pub fn is_observing(&self) -> bool {
        self.observed_root.borrow().is_some()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn node_state(&self, node: &Handle) -> NodeState {
        if has_class(node, &self.config.pending_marker) {
            NodeState::Pending
        } else if has_class(node, &self.config.done_marker) {
            NodeState::Done
        } else {
            NodeState::Untranslated
        }
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        let counters = self.counters.get();
        EngineStatsSnapshot {
            passes: counters.passes,
            sweeps: counters.sweeps,
            elements_done: counters.elements_done,
            text_writes: counters.text_writes,
            requeued: counters.requeued,
            resolution: self.resolver.stats(),
            cache: self.cache.stats(),
        }
    }

    /// 源语言与目标语言相同时所有翻译操作均为空操作
    fn same_language(&self) -> bool {
        !self.config.from_lang.is_empty()
            && self.config.from_lang.eq_ignore_ascii_case(&self.config.to_lang)
    }

    fn ensure_alive(&self) -> TranslationResult<()> {
        if self.destroyed.get() {
            return Err(validation_error("引擎已销毁"));
        }
        Ok(())
    }

    fn find_root(&self, root_selector: &str) -> TranslationResult<Handle> {
        let selector = if root_selector.trim().is_empty() {
            DEFAULT_ROOT_SELECTOR
        } else {
            root_selector
        };

        self.document
            .query_selector(selector)
            .map_err(|e| validation_error(format!("根选择器无效: {}", e)))?
            .ok_or_else(|| validation_error(format!("未找到根元素: {}", selector)))
    }

    /// 开始观察根元素下的变更
    pub fn start_observing(&self, root_selector: &str) -> TranslationResult<()> {
        if self.same_language() {
            tracing::debug!("源语言与目标语言相同，不启动观察");
            return Ok(());
        }
        self.ensure_alive()?;

        let root = self.find_root(root_selector)?;
        if self.is_observing() {
            // 切换根元素前保留已到达的变更
            self.absorb_records();
            self.document.disconnect();
        }
        self.document.observe(&root);
        *self.observed_root.borrow_mut() = Some(root);

        tracing::info!("开始观察文档变更: {}", root_selector);
        Ok(())
    }

    /// 停止观察，未处理的变更记录被丢弃
    pub fn stop_observing(&self) {
        if self.observed_root.borrow_mut().take().is_some() {
            self.document.disconnect();
            tracing::info!("已停止观察文档变更");
        }
    }

    /// 全量翻译根元素下的全部内容，轮次结束后返回
    ///
    /// 翻译期间暂停观察，结束后恢复。已有轮次在运行时直接返回。
    pub async fn translate_all(&self, root_selector: &str) -> TranslationResult<()> {
        if self.same_language() {
            tracing::debug!("源语言与目标语言相同，跳过全量翻译");
            return Ok(());
        }
        self.ensure_alive()?;

        if self.in_flight.get() {
            tracing::debug!("已有翻译轮次在运行，忽略全量翻译请求");
            return Ok(());
        }

        let root = self.find_root(root_selector)?;

        if self.is_observing() {
            self.absorb_records();
            self.document.disconnect();
        }

        let accepted = self.classifier.collect_accepted(&root);
        tracing::info!("全量翻译开始: {} 个候选元素", accepted.len());
        for element in accepted.iter() {
            self.enqueue(element);
        }
        self.update_counters(|c| c.sweeps += 1);

        self.drain().await;

        // 期间可能已停止观察、切换根元素或被销毁，以当前状态为准
        if !self.destroyed.get() {
            if let Some(root) = self.observed_root.borrow().clone() {
                self.document.observe(&root);
            }
        }
        tracing::info!("全量翻译完成");
        Ok(())
    }

    /// 消费文档的变更记录并排空待翻译集合
    ///
    /// 已有轮次在运行时只把变更并入待翻译集合，由正在运行的排空循环处理。
    pub async fn process_mutations(&self) {
        if self.same_language() || self.destroyed.get() {
            return;
        }

        let queued = self.absorb_records();
        if queued > 0 {
            tracing::debug!("变更产生 {} 个待翻译元素", queued);
        }

        if self.in_flight.get() || self.pending.borrow().is_empty() {
            return;
        }
        self.drain().await;
    }

    /// 持续等待文档变更并处理，直到引擎被销毁
    pub async fn run(&self) {
        while !self.destroyed.get() {
            tokio::select! {
                _ = self.document.changed() => self.process_mutations().await,
                _ = self.shutdown.notified() => break,
            }
        }
        tracing::debug!("变更处理循环已退出");
    }

    /// 停止观察、清空待翻译集合并释放缓存
    pub async fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }

        self.stop_observing();
        let pending = self.pending.borrow_mut().take();
        for element in pending.iter() {
            remove_class(element, &self.config.pending_marker);
        }
        self.cache.close().await;
        self.shutdown.notify_one();

        tracing::info!("翻译引擎已销毁");
    }

    /// 排空循环
    async fn drain(&self) {
        if self.in_flight.replace(true) {
            return;
        }
        self.state.set(CoordinatorState::Running);
        fire(&self.before_pass);

        loop {
            let elements = self.pending.borrow_mut().take();
            if elements.is_empty() {
                break;
            }

            self.run_pass(elements).await;
            self.absorb_records();

            if self.pending.borrow().is_empty() {
                break;
            }
            tracing::debug!("轮次结束时仍有 {} 个待翻译元素，继续", self.pending_len());
            self.state.set(CoordinatorState::Draining);
        }

        self.state.set(CoordinatorState::Idle);
        self.in_flight.set(false);
        fire(&self.after_pass);
    }

    async fn run_pass(&self, elements: Vec<Handle>) {
        self.update_counters(|c| c.passes += 1);
        tracing::debug!("翻译轮次开始: {} 个元素", elements.len());

        for chunk in elements.chunks(self.config.batch_size) {
            self.translate_elements(chunk).await;
        }
    }

    async fn translate_elements(&self, elements: &[Handle]) {
        let plans: Vec<Option<ApplyPlan>> = elements
            .iter()
            .map(|element| ApplyPlan::for_element(element, &self.segmenter))
            .collect();

        let segments: Vec<String> = plans
            .iter()
            .flatten()
            .flat_map(|plan| plan.segments())
            .map(str::to_string)
            .collect();
        let resolved = if segments.is_empty() {
            HashMap::new()
        } else {
            self.resolver.resolve(&segments).await
        };

        let mut writes = 0;
        let mut stale = Vec::new();
        for (element, plan) in elements.iter().zip(plans.iter()) {
            if let Some(plan) = plan {
                let outcome = plan.apply(&self.document, &resolved);
                writes += outcome.written;
                if outcome.is_stale() {
                    stale.push(element.clone());
                }
            }
        }

        // 先消化本轮写入产生的变更记录（所属元素仍是 pending，会被丢弃），再切换标记
        self.absorb_records();

        let mut done = 0;
        for element in elements.iter() {
            if stale.iter().any(|s| Rc::ptr_eq(s, element)) {
                self.pending.borrow_mut().insert(element);
                continue;
            }
            remove_class(element, &self.config.pending_marker);
            add_class(element, &self.config.done_marker);
            done += 1;
        }

        if !stale.is_empty() {
            tracing::debug!("{} 个元素在解析期间被修改，重新排队", stale.len());
        }
        self.update_counters(|c| {
            c.elements_done += done;
            c.text_writes += writes as u64;
            c.requeued += stale.len() as u64;
        });
    }

    /// 把变更记录转换为待翻译元素，返回新加入的数量
    fn absorb_records(&self) -> usize {
        let mut queued = 0;
        for record in self.document.take_records() {
            match record {
                MutationRecord::SubtreeInserted(node) if is_element(&node) => {
                    for element in self.classifier.collect_accepted(&node).iter() {
                        if self.enqueue(element) {
                            queued += 1;
                        }
                    }
                }
                MutationRecord::SubtreeInserted(node) | MutationRecord::TextChanged(node) => {
                    if let Some(parent) = self.text_owner(&node) {
                        if self.enqueue(&parent) {
                            queued += 1;
                        }
                    }
                }
            }
        }
        queued
    }

    /// 文本节点所属的需要重新翻译的元素
    fn text_owner(&self, text_node: &Handle) -> Option<Handle> {
        let parent = get_parent_node(text_node)?;
        if !is_element(&parent) {
            return None;
        }
        // 引擎自身写入触发的记录
        if has_class(&parent, &self.config.pending_marker) {
            return None;
        }
        if self.classifier.is_text_change_ignored(&parent) {
            return None;
        }
        Some(parent)
    }

    /// 标记为 pending 并加入集合
    fn enqueue(&self, element: &Handle) -> bool {
        if !self.pending.borrow_mut().insert(element) {
            return false;
        }
        remove_class(element, &self.config.done_marker);
        add_class(element, &self.config.pending_marker);
        true
    }

    fn update_counters(&self, f: impl FnOnce(&mut Counters)) {
        let mut counters = self.counters.get();
        f(&mut counters);
        self.counters.set(counters);
    }
}

fn fire(hook: &Option<PassHook>) {
    if let Some(hook) = hook {
        hook();
    }
}
