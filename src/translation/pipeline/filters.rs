//! 文本过滤器
//!
//! 判断片段是否含有可翻译字符。只由数字、空白、ASCII 标点和常见中文标点组成的片段
//! 不发送到翻译后端，直接解析为原文。

/// 额外视为不可翻译的中文标点
const CJK_PUNCTUATION: &[char] = &[
    '，', '。', '？', '！', '；', '：', '“', '”', '‘', '’', '【', '】', '（', '）', '·', '《',
    '》', '…',
];

fn is_untranslatable_char(c: char) -> bool {
    c.is_ascii_digit()
        || c.is_whitespace()
        || c.is_ascii_punctuation()
        || CJK_PUNCTUATION.contains(&c)
}

/// 片段是否含有需要翻译的字符
pub fn is_translatable(text: &str) -> bool {
    !text.is_empty() && !text.chars().all(is_untranslatable_char)
}

/// 保序拆分为（需要翻译的, 不需要翻译的）
pub fn partition_translatable<'a, I>(texts: I) -> (Vec<&'a str>, Vec<&'a str>)
where
    I: IntoIterator<Item = &'a str>,
{
    texts.into_iter().partition(|text| is_translatable(text))
}
