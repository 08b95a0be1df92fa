//! 节点分类
//!
//! 根据强制/忽略选择器和节点当前的完成标记决定节点是否需要翻译。

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::{get_parent_node, has_class, is_element};
use crate::parsers::html::selector::SelectorList;

/// 分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// 翻译该节点自身的文本，并继续遍历子节点
    Accept,
    /// 跳过自身文本，但继续遍历子节点
    Skip,
    /// 跳过整个子树
    Reject,
}

/// 节点分类器
#[derive(Debug, Clone)]
pub struct NodeClassifier {
    force: SelectorList,
    ignore: SelectorList,
    done_marker: String,
}

impl NodeClassifier {
    pub fn new(force: SelectorList, ignore: SelectorList, done_marker: &str) -> Self {
        Self {
            force,
            ignore,
            done_marker: done_marker.to_string(),
        }
    }

    /// 对元素分类，规则按顺序匹配
    pub fn classify(&self, node: &Handle) -> Classification {
        if !is_element(node) {
            return Classification::Reject;
        }

        if has_class(node, &self.done_marker) {
            return Classification::Skip;
        }

        if self.force.matches(node) || self.force.matches_ancestor(node) {
            return Classification::Accept;
        }

        // 只有在命中忽略规则时才需要检查后代
        let ignored = self.ignore.matches(node) || self.ignore.matches_ancestor(node);
        if ignored {
            return if self.force.matches_descendant(node) {
                Classification::Skip
            } else {
                Classification::Reject
            };
        }

        Classification::Accept
    }

    /// 文本变化是否应被忽略：所属元素或其祖先命中忽略规则且未被强制
    pub fn is_text_change_ignored(&self, element: &Handle) -> bool {
        let mut current = Some(element.clone());
        while let Some(node) = current {
            if !is_element(&node) {
                break;
            }
            if self.ignore.matches(&node) && !self.force.matches(&node) {
                return true;
            }
            current = get_parent_node(&node);
        }
        false
    }

    /// 按文档顺序收集 `root`（含自身）下所有被接受的元素
    pub fn collect_accepted(&self, root: &Handle) -> Vec<Handle> {
        let mut accepted = Vec::new();
        self.walk(root, &mut accepted);
        accepted
    }

    fn walk(&self, node: &Handle, accepted: &mut Vec<Handle>) {
        if !is_element(node) {
            // 文档节点等容器只向下遍历
            for child in node.children.borrow().iter() {
                if is_element(child) {
                    self.walk(child, accepted);
                }
            }
            return;
        }

        match self.classify(node) {
            Classification::Reject => return,
            Classification::Accept => accepted.push(node.clone()),
            Classification::Skip => {}
        }

        let children: Vec<Handle> = node
            .children
            .borrow()
            .iter()
            .filter(|child| is_element(child))
            .cloned()
            .collect();
        for child in children.iter() {
            self.walk(child, accepted);
        }
    }
}
