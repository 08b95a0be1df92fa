//! 微软翻译后端
//!
//! 通过 Edge 的公开授权接口获取 Bearer token，缓存 10 分钟后重新获取。

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TranslationBackend;
use crate::translation::error::{TranslationError, TranslationResult};

pub const AUTH_URL: &str = "https://edge.microsoft.com/translate/auth";
pub const API_BASE_URL: &str = "https://api.cognitive.microsofttranslator.com";
pub const API_VERSION: &str = "3.0";
pub const TOKEN_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Serialize)]
struct TextItem<'a> {
    #[serde(rename = "Text")]
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateItem {
    translations: Vec<TranslationItem>,
}

#[derive(Debug, Deserialize)]
struct TranslationItem {
    text: String,
    to: String,
}

/// 语言检测结果
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLanguage {
    pub language: String,
    pub score: f64,
    #[serde(default)]
    pub is_translation_supported: bool,
    #[serde(default)]
    pub is_transliteration_supported: bool,
}

/// 支持的语言
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInfo {
    pub name: String,
    pub native_name: String,
    pub dir: String,
}

#[derive(Debug, Deserialize)]
struct LanguagesResponse {
    #[serde(default)]
    translation: BTreeMap<String, LanguageInfo>,
}

struct CachedToken {
    token: String,
    fetched_at: Instant,
}

/// 微软翻译后端
pub struct MicrosoftBackend {
    client: reqwest::Client,
    auth_url: String,
    api_base_url: String,
    token: RefCell<Option<CachedToken>>,
}

impl Default for MicrosoftBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrosoftBackend {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            auth_url: AUTH_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            token: RefCell::new(None),
        }
    }

    /// 替换接口地址
    pub fn with_endpoints(mut self, auth_url: &str, api_base_url: &str) -> Self {
        self.auth_url = auth_url.to_string();
        self.api_base_url = api_base_url.trim_end_matches('/').to_string();
        self
    }

    /// 翻译接口地址，只在指定源语言时带 `from`
    pub fn translate_url(&self, to_lang: &str, from_lang: &str) -> String {
        let mut url = format!(
            "{}/translate?api-version={}&to={}",
            self.api_base_url, API_VERSION, to_lang
        );
        if !from_lang.is_empty() {
            url.push_str("&from=");
            url.push_str(from_lang);
        }
        url
    }

    /// 获取授权 token，未过期时直接使用缓存
    async fn auth_token(&self) -> TranslationResult<String> {
        if let Some(cached) = self.token.borrow().as_ref() {
            if cached.fetched_at.elapsed() < TOKEN_TTL {
                return Ok(cached.token.clone());
            }
        }

        let fetched_at = Instant::now();
        let response = self
            .client
            .get(&self.auth_url)
            .send()
            .await
            .map_err(|e| {
                self.clear_token();
                TranslationError::AuthFailure(format!("获取授权失败: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            self.clear_token();
            return Err(TranslationError::AuthFailure(format!(
                "获取授权失败: {}",
                status
            )));
        }

        let token = response
            .text()
            .await
            .map_err(|e| TranslationError::AuthFailure(format!("读取授权失败: {}", e)))?;
        if token.trim().is_empty() {
            return Err(TranslationError::AuthFailure("授权接口返回空 token".to_string()));
        }

        tracing::debug!("已获取新的翻译授权");
        *self.token.borrow_mut() = Some(CachedToken {
            token: token.clone(),
            fetched_at,
        });
        Ok(token)
    }

    fn clear_token(&self) {
        self.token.borrow_mut().take();
    }

    async fn post_texts(&self, url: &str, texts: &[&str]) -> TranslationResult<reqwest::Response> {
        let token = self.auth_token().await?;
        let body: Vec<TextItem<'_>> = texts.iter().map(|&text| TextItem { text }).collect();

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.clear_token();
            }
            return Err(TranslationError::NetworkError(format!(
                "请求失败: {} {}",
                status,
                url
            )));
        }
        Ok(response)
    }

    /// 检测文本语言，空白文本被忽略
    pub async fn detect_language(&self, texts: &[String]) -> TranslationResult<Vec<DetectedLanguage>> {
        let filtered: Vec<&str> = texts
            .iter()
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
            .collect();
        if filtered.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/detect?api-version={}", self.api_base_url, API_VERSION);
        let response = self.post_texts(&url, &filtered).await?;
        Ok(response.json().await?)
    }

    /// 支持的翻译语言，`display_lang` 决定语言名称的显示语言
    pub async fn supported_languages(
        &self,
        display_lang: &str,
    ) -> TranslationResult<BTreeMap<String, LanguageInfo>> {
        let url = format!(
            "{}/languages?api-version={}&scope=translation",
            self.api_base_url, API_VERSION
        );
        let mut request = self.client.get(&url);
        if !display_lang.is_empty() {
            request = request.header(reqwest::header::ACCEPT_LANGUAGE, display_lang);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::NetworkError(format!(
                "获取支持语言失败: {}",
                status
            )));
        }

        let languages: LanguagesResponse = response.json().await?;
        Ok(languages.translation)
    }

    /// 把语言代码解析为后端使用的规范代码，如 `zh-CN` → `zh-Hans`
    pub async fn resolve_language(&self, lang: &str) -> TranslationResult<String> {
        let url = self.translate_url(lang, "");
        let response = match self.post_texts(&url, &[""]).await {
            Ok(response) => response,
            Err(TranslationError::NetworkError(msg)) => {
                tracing::warn!("解析语言代码失败，使用原值 {}: {}", lang, msg);
                return Ok(lang.to_string());
            }
            Err(e) => return Err(e),
        };

        let items: Vec<TranslateItem> = response.json().await?;
        Ok(items
            .into_iter()
            .next()
            .and_then(|item| item.translations.into_iter().next())
            .map(|translation| translation.to)
            .unwrap_or_else(|| lang.to_string()))
    }
}

/// 把响应按顺序填回，空白输入保持原样
fn merge_results(
    texts: &[String],
    positions: &[usize],
    items: Vec<TranslateItem>,
) -> TranslationResult<Vec<String>> {
    if items.len() != positions.len() {
        return Err(TranslationError::MalformedResponse {
            expected: positions.len(),
            actual: items.len(),
        });
    }

    let mut out = texts.to_vec();
    for (position, item) in positions.iter().zip(items) {
        let Some(translation) = item.translations.into_iter().next() else {
            return Err(TranslationError::NetworkError(
                "响应中缺少 translations 字段".to_string(),
            ));
        };
        out[*position] = translation.text;
    }
    Ok(out)
}

#[async_trait(?Send)]
impl TranslationBackend for MicrosoftBackend {
    async fn translate(
        &self,
        texts: &[String],
        to_lang: &str,
        from_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        let positions: Vec<usize> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, _)| i)
            .collect();
        if positions.is_empty() {
            return Ok(texts.to_vec());
        }

        let filtered: Vec<&str> = positions.iter().map(|&i| texts[i].as_str()).collect();
        let url = self.translate_url(to_lang, from_lang);
        let response = self.post_texts(&url, &filtered).await?;
        let items: Vec<TranslateItem> = response.json().await?;

        merge_results(texts, &positions, items)
    }

    fn name(&self) -> &str {
        "microsoft"
    }
}
