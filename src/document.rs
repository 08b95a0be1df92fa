//! 可观察的文档树
//!
//! `Document` 包装 html5ever 的 `RcDom`，所有会影响翻译状态的修改都经由这里完成。
//! 被观察根节点内的子树插入与文本修改会生成 `MutationRecord` 并唤醒等待者；
//! 属性修改（包括翻译标记的切换）不会产生记录。

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, RcDom};
use tokio::sync::Notify;

use crate::parsers::html::dom::{
    attach_child, create_element, create_text, detach_node, get_parent_node, html_to_dom,
    is_element, is_inclusive_descendant, is_text, write_text,
};
use crate::parsers::html::selector::{SelectorError, SelectorList};
use crate::parsers::html::serializer::serialize_document;

/// 树变更记录
#[derive(Debug, Clone)]
pub enum MutationRecord {
    /// 新插入的子树根节点
    SubtreeInserted(Handle),
    /// 内容被修改的文本节点
    TextChanged(Handle),
}

impl MutationRecord {
    pub fn node(&self) -> &Handle {
        match self {
            MutationRecord::SubtreeInserted(node) | MutationRecord::TextChanged(node) => node,
        }
    }
}

#[derive(Default)]
struct ObserverState {
    roots: Vec<Handle>,
    records: VecDeque<MutationRecord>,
}

/// 可观察的 HTML 文档
pub struct Document {
    dom: RcDom,
    observer: RefCell<ObserverState>,
    notify: Notify,
}

impl Document {
    pub fn from_dom(dom: RcDom) -> Self {
        Self {
            dom,
            observer: RefCell::new(ObserverState::default()),
            notify: Notify::new(),
        }
    }

    /// 解析 UTF-8 HTML 字符串
    pub fn parse(html: &str) -> std::io::Result<Self> {
        Self::from_bytes(html.as_bytes(), "utf-8")
    }

    /// 按指定字符集解析 HTML 字节
    pub fn from_bytes(data: &[u8], encoding: &str) -> std::io::Result<Self> {
        Ok(Self::from_dom(html_to_dom(data, encoding)?))
    }

    /// 文档节点
    pub fn root(&self) -> Handle {
        self.dom.document.clone()
    }

    pub fn dom(&self) -> &RcDom {
        &self.dom
    }

    pub fn serialize(&self, encoding: &str) -> std::io::Result<Vec<u8>> {
        serialize_document(&self.dom.document, encoding)
    }

    /// 按文档顺序查找第一个匹配的元素
    pub fn query_selector(&self, selector: &str) -> Result<Option<Handle>, SelectorError> {
        Ok(SelectorList::parse(selector)?.query_first(&self.dom.document))
    }

    /// 按文档顺序查找所有匹配的元素
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Handle>, SelectorError> {
        Ok(SelectorList::parse(selector)?.query_all(&self.dom.document))
    }

    pub fn create_element(&self, tag: &str, attributes: &[(&str, &str)]) -> Handle {
        create_element(tag, attributes)
    }

    pub fn create_text(&self, text: &str) -> Handle {
        create_text(text)
    }

    /// 追加子节点
    pub fn append_child(&self, parent: &Handle, child: &Handle) {
        attach_child(parent, child, None);
        self.record_insertion(parent, child);
    }

    /// 在 `reference` 之前插入，`reference` 不是 `parent` 的子节点时追加到末尾
    pub fn insert_before(&self, parent: &Handle, child: &Handle, reference: Option<&Handle>) {
        let index = reference.and_then(|reference| {
            parent
                .children
                .borrow()
                .iter()
                .position(|c| Rc::ptr_eq(c, reference))
        });
        attach_child(parent, child, index);
        self.record_insertion(parent, child);
    }

    /// 移除子节点，`child` 不属于 `parent` 时返回 `false`
    pub fn remove_child(&self, parent: &Handle, child: &Handle) -> bool {
        match get_parent_node(child) {
            Some(current) if Rc::ptr_eq(&current, parent) => detach_node(child),
            _ => false,
        }
    }

    /// 修改文本节点内容
    pub fn set_text(&self, text_node: &Handle, text: &str) -> bool {
        if !write_text(text_node, text) {
            return false;
        }
        if self.is_observed(text_node) {
            self.push_record(MutationRecord::TextChanged(text_node.clone()));
        }
        true
    }

    /// 用单个文本节点替换元素的全部子节点
    pub fn set_text_content(&self, element: &Handle, text: &str) -> Option<Handle> {
        if !is_element(element) {
            return None;
        }

        let children: Vec<Handle> = element.children.borrow().clone();
        for child in children.iter() {
            detach_node(child);
        }

        let text_node = create_text(text);
        attach_child(element, &text_node, None);
        if self.is_observed(&text_node) {
            self.push_record(MutationRecord::TextChanged(text_node.clone()));
        }
        Some(text_node)
    }

    /// 开始观察 `root` 及其后代
    pub fn observe(&self, root: &Handle) {
        let mut observer = self.observer.borrow_mut();
        if !observer.roots.iter().any(|r| Rc::ptr_eq(r, root)) {
            observer.roots.push(root.clone());
        }
    }

    /// 停止观察并丢弃尚未取走的记录
    pub fn disconnect(&self) {
        let mut observer = self.observer.borrow_mut();
        observer.roots.clear();
        observer.records.clear();
    }

    pub fn is_observing(&self) -> bool {
        !self.observer.borrow().roots.is_empty()
    }

    /// 取走全部待处理记录
    pub fn take_records(&self) -> Vec<MutationRecord> {
        self.observer.borrow_mut().records.drain(..).collect()
    }

    pub fn pending_records(&self) -> usize {
        self.observer.borrow().records.len()
    }

    /// 等待下一次变更通知
    pub async fn changed(&self) {
        self.notify.notified().await;
    }

    fn record_insertion(&self, parent: &Handle, child: &Handle) {
        if self.is_observed(parent) {
            self.push_record(MutationRecord::SubtreeInserted(child.clone()));
        }
    }

    fn is_observed(&self, node: &Handle) -> bool {
        let observer = self.observer.borrow();
        observer
            .roots
            .iter()
            .any(|root| is_inclusive_descendant(node, root))
    }

    fn push_record(&self, record: MutationRecord) {
        tracing::trace!(
            "记录变更: {}",
            if is_text(record.node()) { "text" } else { "subtree" }
        );
        self.observer.borrow_mut().records.push_back(record);
        self.notify.notify_one();
    }
}
