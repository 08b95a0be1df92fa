//! 术语切分
//!
//! 把含有非独立术语的文本切成有序片段，术语片段走词典，其余片段走翻译后端。
//! 片段按顺序直接拼接即可还原原文。

use regex::{Regex, RegexBuilder};

use super::dictionary::{TermDictionary, TermEntry};

/// 术语切分器
#[derive(Debug, Clone, Default)]
pub struct TermSegmenter {
    /// 按长度降序
    terms: Vec<TermEntry>,
    /// 非独立术语的词边界正则，顺序与 `terms` 中的出现顺序一致
    patterns: Vec<Regex>,
}

impl TermSegmenter {
    pub fn new(dictionary: &TermDictionary) -> Self {
        let terms: Vec<TermEntry> = dictionary.iter_longest_first().cloned().collect();

        let patterns = terms
            .iter()
            .filter(|entry| !entry.standalone)
            .filter_map(|entry| {
                let pattern = format!(r"\b{}\b", regex::escape(&entry.term));
                match RegexBuilder::new(&pattern)
                    .case_insensitive(!entry.case_sensitive)
                    .build()
                {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        tracing::warn!("术语 '{}' 无法编译为正则，已跳过: {}", entry.term, e);
                        None
                    }
                }
            })
            .collect();

        Self { terms, patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// 切分文本
    pub fn segment(&self, text: &str) -> Vec<String> {
        if self.terms.is_empty() || text.is_empty() {
            return vec![text.to_string()];
        }

        // 整段等于独立术语时作为一个整体查词典
        if self
            .terms
            .iter()
            .any(|entry| entry.standalone && entry.equals(text))
        {
            return vec![text.to_string()];
        }

        if !self.terms.iter().any(|entry| entry.occurs_in(text)) {
            return vec![text.to_string()];
        }

        let mut parts = Vec::new();
        let mut rest = text;

        while !rest.is_empty() {
            // 取出现位置最靠前的术语，位置相同时取更长的
            let earliest = self
                .patterns
                .iter()
                .filter_map(|pattern| pattern.find(rest))
                .min_by_key(|m| m.start());

            let Some(found) = earliest else {
                parts.push(rest.to_string());
                break;
            };

            if found.start() > 0 {
                parts.push(rest[..found.start()].to_string());
            }
            parts.push(found.as_str().to_string());
            rest = &rest[found.end()..];
        }

        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter(entries: Vec<TermEntry>) -> TermSegmenter {
        TermSegmenter::new(&TermDictionary::from_entries(entries))
    }

    #[test]
    fn test_brand_name_split() {
        let s = segmenter(vec![TermEntry::new("Acme", "阿克米", false, true)]);
        assert_eq!(
            s.segment("Acme Corp builds routers"),
            vec!["Acme", " Corp builds routers"]
        );
    }

    #[test]
    fn test_no_dictionary_or_no_term() {
        assert_eq!(TermSegmenter::default().segment("Hello"), vec!["Hello"]);
        let s = segmenter(vec![TermEntry::new("Acme", "阿克米", false, true)]);
        assert_eq!(s.segment("Nothing here"), vec!["Nothing here"]);
    }

    #[test]
    fn test_standalone_exact_match_shortcut() {
        let s = segmenter(vec![
            TermEntry::new("Home", "首页", true, false),
            TermEntry::new("Acme", "阿克米", false, true),
        ]);
        assert_eq!(s.segment("home"), vec!["home"]);
        // 独立术语不参与切分
        assert_eq!(s.segment("Back Home"), vec!["Back Home"]);
    }

    #[test]
    fn test_word_boundaries_respected() {
        let s = segmenter(vec![TermEntry::new("Acme", "阿克米", false, true)]);
        assert_eq!(s.segment("Acmeist style"), vec!["Acmeist style"]);
    }

    #[test]
    fn test_longest_term_wins_and_matched_slice_is_kept() {
        let s = segmenter(vec![
            TermEntry::new("acme", "阿克米", false, false),
            TermEntry::new("acme cloud", "阿克米云", false, false),
        ]);
        assert_eq!(
            s.segment("Try ACME Cloud or Acme"),
            vec!["Try ", "ACME Cloud", " or ", "Acme"]
        );
    }

    #[test]
    fn test_segments_join_back_to_input() {
        let s = segmenter(vec![
            TermEntry::new("Rust", "Rust", false, true),
            TermEntry::new("Cargo", "Cargo", false, true),
            TermEntry::new("crate", "包", false, false),
        ]);
        for text in [
            "Rust",
            " Rust and Cargo ",
            "A CRATE for Rust, built with Cargo.",
            "Cargo Cargo Cargo",
            "no match at all",
            "  ",
        ] {
            assert_eq!(s.segment(text).concat(), text);
        }
    }
}
