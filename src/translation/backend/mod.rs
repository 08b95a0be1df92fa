//! 翻译后端
//!
//! 引擎只通过 `TranslationBackend` 调用后端；词典与缓存层与具体后端无关。

#[cfg(feature = "microsoft-backend")]
pub mod microsoft;

use std::future::Future;

use async_trait::async_trait;

use crate::translation::error::TranslationResult;

#[cfg(feature = "microsoft-backend")]
pub use microsoft::{DetectedLanguage, LanguageInfo, MicrosoftBackend};

/// 批量翻译接口
///
/// 返回结果必须与输入等长且顺序一致，否则整批按失败处理。
#[async_trait(?Send)]
pub trait TranslationBackend {
    async fn translate(
        &self,
        texts: &[String],
        to_lang: &str,
        from_lang: &str,
    ) -> TranslationResult<Vec<String>>;

    /// 后端名称，用于日志
    fn name(&self) -> &str {
        "custom"
    }
}

/// 把异步闭包适配为后端
pub struct FnBackend<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnBackend<F>
where
    F: Fn(Vec<String>, String, String) -> Fut,
    Fut: Future<Output = TranslationResult<Vec<String>>>,
{
    pub fn new(f: F) -> Self {
        Self {
            name: "fn".to_string(),
            f,
        }
    }

    pub fn named(name: &str, f: F) -> Self {
        Self {
            name: name.to_string(),
            f,
        }
    }
}

#[async_trait(?Send)]
impl<F, Fut> TranslationBackend for FnBackend<F>
where
    F: Fn(Vec<String>, String, String) -> Fut + 'static,
    Fut: Future<Output = TranslationResult<Vec<String>>> + 'static,
{
    async fn translate(
        &self,
        texts: &[String],
        to_lang: &str,
        from_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        (self.f)(texts.to_vec(), to_lang.to_string(), from_lang.to_string()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 原样返回输入的后端
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityBackend;

#[async_trait(?Send)]
impl TranslationBackend for IdentityBackend {
    async fn translate(
        &self,
        texts: &[String],
        _to_lang: &str,
        _from_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        Ok(texts.to_vec())
    }

    fn name(&self) -> &str {
        "identity"
    }
}
