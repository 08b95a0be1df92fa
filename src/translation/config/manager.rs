//! 配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::constants;
use crate::env::EnvVar;
use crate::translation::error::{TranslationError, TranslationResult};

/// 词典条目：纯字符串等价于 `{ to, standalone = true, case_sensitive = true }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DictEntrySpec {
    Text(String),
    Entry {
        to: String,
        #[serde(default = "default_true")]
        standalone: bool,
        #[serde(default = "default_true", alias = "case")]
        case_sensitive: bool,
    },
}

impl DictEntrySpec {
    /// 统一为 (译文, 独立匹配, 区分大小写)
    pub fn normalize(&self) -> (String, bool, bool) {
        match self {
            DictEntrySpec::Text(to) => (to.clone(), true, true),
            DictEntrySpec::Entry {
                to,
                standalone,
                case_sensitive,
            } => (to.clone(), *standalone, *case_sensitive),
        }
    }
}

fn default_true() -> bool {
    true
}

/// 语言代码（或 `all`）→ 术语 → 条目
pub type ManualDictionary = BTreeMap<String, BTreeMap<String, DictEntrySpec>>;

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    // 语言
    pub to_lang: String,
    pub from_lang: String,

    // 选择器，追加在默认忽略列表之后
    pub ignore: Vec<String>,
    pub force: Vec<String>,

    // 状态标记
    pub pending_marker: String,
    pub done_marker: String,

    // 批次配置
    pub batch_size: usize,

    // 缓存配置
    pub cache_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    pub manual_dictionary: ManualDictionary,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            to_lang: system_language().unwrap_or_default(),
            from_lang: String::new(),
            ignore: Vec::new(),
            force: Vec::new(),
            pending_marker: constants::DEFAULT_PENDING_MARKER.to_string(),
            done_marker: constants::DEFAULT_DONE_MARKER.to_string(),
            batch_size: constants::DEFAULT_BATCH_SIZE,
            cache_enabled: true,
            cache_dir: None,
            manual_dictionary: ManualDictionary::new(),
        }
    }
}

impl EngineConfig {
    /// 创建带指定目标语言的默认配置
    pub fn with_lang(to_lang: &str) -> Self {
        Self {
            to_lang: to_lang.to_string(),
            ..Self::default()
        }
    }

    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.to_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError("目标语言不能为空".to_string()));
        }

        if self.batch_size == 0 {
            return Err(TranslationError::ConfigError("批次大小不能为0".to_string()));
        }

        if self.batch_size > constants::MAX_BATCH_SIZE {
            return Err(TranslationError::ConfigError(format!(
                "批次大小不能超过 {}",
                constants::MAX_BATCH_SIZE
            )));
        }

        for (name, marker) in [
            ("pending_marker", &self.pending_marker),
            ("done_marker", &self.done_marker),
        ] {
            if marker.is_empty() || marker.chars().any(char::is_whitespace) {
                return Err(TranslationError::ConfigError(format!(
                    "{} 必须是非空且不含空白的 class 名: '{}'",
                    name, marker
                )));
            }
        }

        if self.pending_marker == self.done_marker {
            return Err(TranslationError::ConfigError(
                "pending_marker 与 done_marker 不能相同".to_string(),
            ));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{cache, translation};

        if let Some(to_lang) = env_override::<_, translation::ToLang>() {
            self.to_lang = to_lang;
        }

        if let Some(from_lang) = env_override::<_, translation::FromLang>() {
            self.from_lang = from_lang;
        }

        if let Some(batch_size) = env_override::<_, translation::BatchSize>() {
            self.batch_size = batch_size;
        }

        if let Some(marker) = env_override::<_, translation::PendingMarker>() {
            self.pending_marker = marker;
        }

        if let Some(marker) = env_override::<_, translation::DoneMarker>() {
            self.done_marker = marker;
        }

        // 缓存相关环境变量
        if let Some(enabled) = env_override::<_, cache::Enabled>() {
            self.cache_enabled = enabled;
        }

        if let Some(dir) = env_override::<_, cache::Dir>() {
            tracing::info!("环境变量覆盖缓存目录: {}", dir.display());
            self.cache_dir = Some(dir);
        }
    }
}

/// 只在变量确实被设置时覆盖，非法值记录警告后忽略
fn env_override<T, V: EnvVar<T>>() -> Option<T> {
    std::env::var_os(V::NAME)?;
    match V::get() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("忽略无效的环境变量: {}", e);
            None
        }
    }
}

/// 从系统区域设置推导语言代码，如 `zh_CN.UTF-8` → `zh-CN`
pub fn system_language() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find_map(|value| locale_to_lang(&value))
}

fn locale_to_lang(locale: &str) -> Option<String> {
    let base = locale.split(['.', '@']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

/// 配置管理器
pub struct ConfigManager {
    config: EngineConfig,
}

impl ConfigManager {
    /// 加载 `.env`、配置文件和环境变量后创建
    pub fn new() -> TranslationResult<Self> {
        let config = Self::load(None)?;
        config.validate()?;

        Ok(Self { config })
    }

    /// 只从指定文件加载（仍应用环境变量覆盖）
    pub fn from_file<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        let config = Self::load(Some(path.as_ref()))?;
        config.validate()?;

        Ok(Self { config })
    }

    /// 加载配置但不验证，供调用方在合并命令行参数后再验证
    ///
    /// 未指定 `path` 时在搜索路径中查找配置文件。
    pub fn load(path: Option<&Path>) -> TranslationResult<EngineConfig> {
        let mut config = match path {
            Some(path) => {
                Self::load_dotenv();
                Self::load_from_file(path)?
            }
            None => Self::load_config()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// 直接使用给定配置
    pub fn from_config(config: EngineConfig) -> TranslationResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_config(self) -> EngineConfig {
        self.config
    }

    /// 从搜索路径加载配置
    fn load_config() -> TranslationResult<EngineConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        // 查找配置文件
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            let path = Path::new(expanded_path.as_ref());
            if path.exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(EngineConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &Path) -> TranslationResult<EngineConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranslationError::ConfigError(format!("读取配置文件失败 {}: {}", path.display(), e))
        })?;

        Self::parse(&content, path.extension().and_then(|ext| ext.to_str()))
    }

    /// 按扩展名解析配置内容，`json` 之外均按 TOML 处理
    pub fn parse(content: &str, extension: Option<&str>) -> TranslationResult<EngineConfig> {
        if extension == Some("json") {
            serde_json::from_str(content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        for env_file in constants::ENV_FILES {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslationResult<()> {
        let mut config = EngineConfig::with_lang("zh-Hans");
        config.force.push(".livetrans-force".to_string());
        config.manual_dictionary.insert(
            constants::ALL_LANGUAGES_KEY.to_string(),
            BTreeMap::from([(
                "Acme".to_string(),
                DictEntrySpec::Entry {
                    to: "Acme".to_string(),
                    standalone: false,
                    case_sensitive: true,
                },
            )]),
        );

        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
