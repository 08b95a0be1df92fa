//! 文本收集器
//!
//! 只收集元素的直接文本子节点，不进入子元素。每个片段记录被剥离的首尾空白，
//! 写回译文时原样补回。

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::get_text;

/// 元素的一个直接文本片段
#[derive(Debug, Clone)]
pub struct TextFragment {
    /// 文本节点
    pub node: Handle,
    /// 去除首尾空白后的文本
    pub text: String,
    pub leading_whitespace: String,
    pub trailing_whitespace: String,
}

impl TextFragment {
    /// 拆分文本节点内容，纯空白返回 `None`
    fn from_node(node: &Handle) -> Option<Self> {
        let raw = get_text(node)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let leading_len = raw.len() - raw.trim_start().len();
        let trailing_start = raw.trim_end().len();

        Some(Self {
            node: node.clone(),
            text: trimmed.to_string(),
            leading_whitespace: raw[..leading_len].to_string(),
            trailing_whitespace: raw[trailing_start..].to_string(),
        })
    }

    /// 补回空白后的完整内容
    pub fn rebuild(&self, translated: &str) -> String {
        format!(
            "{}{}{}",
            self.leading_whitespace, translated, self.trailing_whitespace
        )
    }

    /// 片段文本的字符数
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// 收集元素的直接文本片段，忽略纯空白节点
pub fn extract_direct_fragments(element: &Handle) -> Vec<TextFragment> {
    element
        .children
        .borrow()
        .iter()
        .filter_map(TextFragment::from_node)
        .collect()
}

/// 元素自身文本：各直接文本片段去空白后以单个空格连接，为空时返回 `None`
pub fn extract_own_text(element: &Handle) -> Option<String> {
    let parts: Vec<String> = extract_direct_fragments(element)
        .into_iter()
        .map(|fragment| fragment.text)
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
