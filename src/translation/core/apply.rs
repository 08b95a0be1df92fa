//! 译文写回
//!
//! 每个待翻译元素先生成一个 `ApplyPlan`，记录要解析的片段和写回方式；
//! 解析完成后按计划把译文写回文本节点。

use std::collections::HashMap;

use markup5ever_rcdom::Handle;

use crate::document::Document;
use crate::parsers::html::dom::{child_element_count, get_text};
use crate::translation::pipeline::collector::{extract_direct_fragments, TextFragment};
use crate::translation::pipeline::segmenter::TermSegmenter;

/// 单个元素的写回计划
#[derive(Debug, Clone)]
pub enum ApplyPlan {
    /// 只有一个文本片段，整体翻译后写回
    Whole {
        fragment: TextFragment,
        parts: Vec<String>,
    },
    /// 文本片段被子元素隔开，逐个片段翻译
    PerFragment(Vec<(TextFragment, Vec<String>)>),
    /// 多个片段合并翻译，再按原长度比例拆回各片段
    Proportional {
        fragments: Vec<TextFragment>,
        parts: Vec<String>,
    },
}

impl ApplyPlan {
    /// 为元素生成计划，没有可翻译文本时返回 `None`
    pub fn for_element(element: &Handle, segmenter: &TermSegmenter) -> Option<Self> {
        let mut fragments = extract_direct_fragments(element);

        match fragments.len() {
            0 => None,
            1 => {
                let fragment = fragments.remove(0);
                let parts = segmenter.segment(&fragment.text);
                Some(ApplyPlan::Whole { fragment, parts })
            }
            _ if child_element_count(element) > 0 => Some(ApplyPlan::PerFragment(
                fragments
                    .into_iter()
                    .map(|fragment| {
                        let parts = segmenter.segment(&fragment.text);
                        (fragment, parts)
                    })
                    .collect(),
            )),
            _ => {
                let joined = fragments
                    .iter()
                    .map(|fragment| fragment.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                let parts = segmenter.segment(&joined);
                Some(ApplyPlan::Proportional { fragments, parts })
            }
        }
    }

    /// 计划中需要解析的全部片段
    pub fn segments(&self) -> Vec<&str> {
        match self {
            ApplyPlan::Whole { parts, .. } | ApplyPlan::Proportional { parts, .. } => {
                parts.iter().map(String::as_str).collect()
            }
            ApplyPlan::PerFragment(items) => items
                .iter()
                .flat_map(|(_, parts)| parts.iter().map(String::as_str))
                .collect(),
        }
    }

    /// 写回译文
    pub fn apply(&self, document: &Document, resolved: &HashMap<String, String>) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        match self {
            ApplyPlan::Whole { fragment, parts } => {
                outcome.record(write_fragment(document, fragment, &assemble(parts, resolved)));
            }
            ApplyPlan::PerFragment(items) => {
                for (fragment, parts) in items {
                    outcome.record(write_fragment(document, fragment, &assemble(parts, resolved)));
                }
            }
            ApplyPlan::Proportional { fragments, parts } => {
                let translated = assemble(parts, resolved);
                let lengths: Vec<usize> = fragments.iter().map(TextFragment::char_len).collect();
                let pieces = split_proportionally(&translated, &lengths);

                for (fragment, piece) in fragments.iter().zip(pieces.iter()) {
                    outcome.record(write_fragment(document, fragment, piece));
                }
            }
        }
        outcome
    }
}

/// 写回结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// 实际修改的文本节点数
    pub written: usize,
    /// 解析期间已被改动、因此未写回的片段数
    pub stale: usize,
}

impl ApplyOutcome {
    pub fn is_stale(&self) -> bool {
        self.stale > 0
    }

    fn record(&mut self, write: FragmentWrite) {
        match write {
            FragmentWrite::Written => self.written += 1,
            FragmentWrite::Stale => self.stale += 1,
            FragmentWrite::Unchanged => {}
        }
    }
}

enum FragmentWrite {
    Written,
    Unchanged,
    Stale,
}

/// 按顺序拼接各片段的译文，缺失的片段保留原文
pub fn assemble(parts: &[String], resolved: &HashMap<String, String>) -> String {
    parts
        .iter()
        .map(|part| resolved.get(part).map(String::as_str).unwrap_or(part))
        .collect()
}

/// 按字符长度比例拆分译文
///
/// 前面每段取 `round(总长 × 原长 / 原总长)` 个字符，余下的全部归最后一段。
pub fn split_proportionally(translated: &str, lengths: &[usize]) -> Vec<String> {
    if lengths.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = translated.chars().collect();
    let total_len: usize = lengths.iter().sum();
    if total_len == 0 {
        let mut pieces = vec![String::new(); lengths.len()];
        if let Some(last) = pieces.last_mut() {
            *last = translated.to_string();
        }
        return pieces;
    }

    let mut pieces = Vec::with_capacity(lengths.len());
    let mut cursor = 0;
    for (i, &len) in lengths.iter().enumerate() {
        let take = if i + 1 == lengths.len() {
            chars.len() - cursor
        } else {
            let share = (chars.len() as f64 * len as f64 / total_len as f64).round() as usize;
            share.min(chars.len() - cursor)
        };
        pieces.push(chars[cursor..cursor + take].iter().collect());
        cursor += take;
    }
    pieces
}

fn write_fragment(document: &Document, fragment: &TextFragment, translated: &str) -> FragmentWrite {
    // 节点内容在解析期间被改动过，不能用旧文本的译文覆盖
    if get_text(&fragment.node).as_deref() != Some(fragment.rebuild(&fragment.text).as_str()) {
        return FragmentWrite::Stale;
    }
    if translated == fragment.text {
        return FragmentWrite::Unchanged;
    }
    if document.set_text(&fragment.node, &fragment.rebuild(translated)) {
        FragmentWrite::Written
    } else {
        FragmentWrite::Unchanged
    }
}
