//! 选择器解析与匹配
//!
//! 支持翻译规则所需的 CSS 选择器子集：
//!
//! - 逗号分隔的选择器列表
//! - 后代（空白）与子代（`>`）组合符
//! - 类型选择器 `tag` / `*`，以及 `.class`、`#id`、`[attr]`、`[attr=value]`、`[attr="value"]`
//!
//! ```rust
//! use livetrans::parsers::html::selector::SelectorList;
//!
//! let list = SelectorList::parse("pre, .notranslate, [contenteditable=\"true\"]").unwrap();
//! assert_eq!(list.len(), 3);
//! ```

use std::fmt;

use markup5ever_rcdom::Handle;
use thiserror::Error;

use super::dom::{get_node_attr, get_node_name, get_parent_node, has_class, is_element};

/// 选择器解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无效的选择器 '{selector}' (位置 {position}): {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrMatch {
    Exists,
    Equals(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    matcher: AttrMatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.ids.is_empty() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, node: &Handle) -> bool {
        let Some(name) = get_node_name(node) else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if tag != "*" && !tag.eq_ignore_ascii_case(name) {
                return false;
            }
        }

        if !self.ids.is_empty() {
            let id = get_node_attr(node, "id");
            if !self.ids.iter().all(|wanted| id.as_deref() == Some(wanted.as_str())) {
                return false;
            }
        }

        if !self.classes.iter().all(|class| has_class(node, class)) {
            return false;
        }

        self.attrs.iter().all(|attr| match &attr.matcher {
            AttrMatch::Exists => get_node_attr(node, &attr.name).is_some(),
            AttrMatch::Equals(value) => {
                get_node_attr(node, &attr.name).as_deref() == Some(value.as_str())
            }
        })
    }
}

/// 单个复合选择器链，最右侧为主体
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, node: &Handle) -> bool {
        match self.parts.len() {
            0 => false,
            n => self.matches_from(n - 1, node),
        }
    }

    fn matches_from(&self, index: usize, node: &Handle) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match combinator {
            Combinator::Child => match parent_element(node) {
                Some(parent) => self.matches_from(index - 1, &parent),
                None => false,
            },
            Combinator::Descendant => {
                let mut current = parent_element(node);
                while let Some(ancestor) = current {
                    if self.matches_from(index - 1, &ancestor) {
                        return true;
                    }
                    current = parent_element(&ancestor);
                }
                false
            }
        }
    }
}

fn parent_element(node: &Handle) -> Option<Handle> {
    get_parent_node(node).filter(is_element)
}

/// 选择器列表
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SelectorList {
    source: Vec<String>,
    selectors: Vec<Complex>,
}

impl fmt::Debug for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SelectorList").field(&self.source).finish()
    }
}

impl SelectorList {
    /// 解析逗号分隔的选择器列表
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser::new(input);
        let mut list = SelectorList::default();

        loop {
            parser.skip_whitespace();
            let start = parser.pos;
            let complex = parser.parse_complex()?;
            list.source.push(parser.slice(start, parser.pos).trim().to_string());
            list.selectors.push(complex);

            parser.skip_whitespace();
            match parser.peek() {
                None => break,
                Some(',') => parser.pos += 1,
                Some(c) => return Err(parser.error(format!("意外的字符 '{}'", c))),
            }
        }

        Ok(list)
    }

    /// 由多条选择器构造，重复项只保留第一次出现
    pub fn from_selectors<S: AsRef<str>>(selectors: &[S]) -> Result<Self, SelectorError> {
        let mut list = SelectorList::default();
        for selector in selectors {
            let parsed = SelectorList::parse(selector.as_ref())?;
            for (source, complex) in parsed.source.into_iter().zip(parsed.selectors) {
                if !list.source.contains(&source) {
                    list.source.push(source);
                    list.selectors.push(complex);
                }
            }
        }
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// 规范化后的各条选择器文本
    pub fn sources(&self) -> &[String] {
        &self.source
    }

    /// 元素是否匹配列表中的任一选择器
    pub fn matches(&self, node: &Handle) -> bool {
        is_element(node) && self.selectors.iter().any(|s| s.matches(node))
    }

    /// 是否存在匹配的严格祖先元素
    pub fn matches_ancestor(&self, node: &Handle) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut current = parent_element(node);
        while let Some(ancestor) = current {
            if self.matches(&ancestor) {
                return true;
            }
            current = parent_element(&ancestor);
        }
        false
    }

    /// 是否存在匹配的严格后代元素
    pub fn matches_descendant(&self, node: &Handle) -> bool {
        if self.is_empty() {
            return false;
        }
        node.children
            .borrow()
            .iter()
            .any(|child| self.matches(child) || self.matches_descendant(child))
    }

    /// 按文档顺序查找第一个匹配的元素（包含 `root` 自身）
    pub fn query_first(&self, root: &Handle) -> Option<Handle> {
        if self.matches(root) {
            return Some(root.clone());
        }
        root.children
            .borrow()
            .iter()
            .find_map(|child| self.query_first(child))
    }

    /// 按文档顺序查找所有匹配的元素（包含 `root` 自身）
    pub fn query_all(&self, root: &Handle) -> Vec<Handle> {
        let mut found = Vec::new();
        self.collect(root, &mut found);
        found
    }

    fn collect(&self, node: &Handle, found: &mut Vec<Handle>) {
        if self.matches(node) {
            found.push(node.clone());
        }
        for child in node.children.borrow().iter() {
            self.collect(child, found);
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn error(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError {
            selector: self.input.to_string(),
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;

        loop {
            let compound = self.parse_compound()?;
            parts.push((combinator, compound));

            let had_whitespace = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinator = Combinator::Child;
                }
                Some(_) if had_whitespace => combinator = Combinator::Descendant,
                Some(c) => return Err(self.error(format!("意外的字符 '{}'", c))),
            }
        }

        Ok(Complex { parts })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();

        if self.peek() == Some('*') {
            self.pos += 1;
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                _ => break,
            }
        }

        if compound.is_empty() {
            return Err(self.error("缺少选择器"));
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("缺少标识符"));
        }
        Ok(self.slice(start, self.pos))
    }

    fn parse_attr(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let matcher = match self.peek() {
            Some(']') => AttrMatch::Exists,
            Some('=') => {
                self.pos += 1;
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => self.parse_quoted(quote)?,
                    _ => self.parse_ident()?,
                };
                self.skip_whitespace();
                AttrMatch::Equals(value)
            }
            _ => return Err(self.error("属性选择器只支持 [attr] 与 [attr=value]")),
        };

        if self.peek() != Some(']') {
            return Err(self.error("属性选择器缺少 ']'"));
        }
        self.pos += 1;

        Ok(AttrSelector { name, matcher })
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, SelectorError> {
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.slice(start, self.pos);
                self.pos += 1;
                return Ok(value);
            }
            self.pos += 1;
        }
        Err(self.error("引号未闭合"))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
