//! 手动术语词典
//!
//! 构造时把配置中的条目统一成 `TermEntry`，目标语言的条目覆盖 `all` 分组中的同名条目。
//! 术语按原样存储，大小写折叠只在查找时进行。

use std::collections::HashMap;

use crate::translation::config::constants::ALL_LANGUAGES_KEY;
use crate::translation::config::ManualDictionary;

/// 规范化后的词典条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    pub term: String,
    pub to: String,
    /// 只在整段文本等于术语时匹配
    pub standalone: bool,
    pub case_sensitive: bool,
}

impl TermEntry {
    pub fn new(term: &str, to: &str, standalone: bool, case_sensitive: bool) -> Self {
        Self {
            term: term.to_string(),
            to: to.to_string(),
            standalone,
            case_sensitive,
        }
    }

    /// 整段文本是否等于该术语
    pub fn equals(&self, text: &str) -> bool {
        if self.case_sensitive {
            text == self.term
        } else {
            text.to_lowercase() == self.term.to_lowercase()
        }
    }

    /// 文本中是否出现该术语（不考虑词边界）
    pub fn occurs_in(&self, text: &str) -> bool {
        if self.case_sensitive {
            text.contains(&self.term)
        } else {
            text.to_lowercase().contains(&self.term.to_lowercase())
        }
    }
}

/// 单个目标语言的术语表
#[derive(Debug, Clone, Default)]
pub struct TermDictionary {
    entries: HashMap<String, TermEntry>,
    /// 按术语长度降序排列
    ordered: Vec<String>,
}

impl TermDictionary {
    /// 从配置构造目标语言的术语表
    pub fn from_config(dictionary: &ManualDictionary, to_lang: &str) -> Self {
        let mut entries: HashMap<String, TermEntry> = HashMap::new();

        for group in [ALL_LANGUAGES_KEY, to_lang] {
            if let Some(terms) = dictionary.get(group) {
                for (term, spec) in terms {
                    let (to, standalone, case_sensitive) = spec.normalize();
                    entries.insert(
                        term.clone(),
                        TermEntry::new(term, &to, standalone, case_sensitive),
                    );
                }
            }
        }

        Self::from_entries(entries.into_values())
    }

    pub fn from_entries<I: IntoIterator<Item = TermEntry>>(entries: I) -> Self {
        let entries: HashMap<String, TermEntry> = entries
            .into_iter()
            .filter(|entry| !entry.term.is_empty())
            .map(|entry| (entry.term.clone(), entry))
            .collect();

        let mut ordered: Vec<String> = entries.keys().cloned().collect();
        // 长度相同时按字典序，保证顺序稳定
        ordered.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });

        Self { entries, ordered }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 按长度降序遍历条目
    pub fn iter_longest_first(&self) -> impl Iterator<Item = &TermEntry> {
        self.ordered.iter().filter_map(|term| self.entries.get(term))
    }

    /// 查找整段文本对应的译文
    ///
    /// 先精确匹配键，再在不区分大小写的条目中折叠比较。
    pub fn lookup(&self, text: &str) -> Option<&str> {
        if let Some(entry) = self.entries.get(text) {
            return Some(entry.to.as_str());
        }
        self.iter_longest_first()
            .find(|entry| !entry.case_sensitive && entry.equals(text))
            .map(|entry| entry.to.as_str())
    }
}
