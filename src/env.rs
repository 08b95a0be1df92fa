//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，供配置管理器覆盖文件配置使用。

use std::env;
use std::fmt;
use std::path::PathBuf;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "LIVETRANS_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 目标语言
    pub struct ToLang;
    impl EnvVar<String> for ToLang {
        const NAME: &'static str = "LIVETRANS_TO_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Target language code (BCP 47, e.g. zh-Hans)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_lang(value, Self::NAME, false)
        }
    }

    /// 源语言，空字符串表示自动检测
    pub struct FromLang;
    impl EnvVar<String> for FromLang {
        const NAME: &'static str = "LIVETRANS_FROM_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Source language code, empty for auto detection";

        fn parse(value: &str) -> EnvResult<String> {
            parse_lang(value, Self::NAME, true)
        }
    }

    /// 单次网络请求的最大片段数
    pub struct BatchSize;
    impl EnvVar<usize> for BatchSize {
        const NAME: &'static str = "LIVETRANS_BATCH_SIZE";
        const DEFAULT: Option<usize> = Some(100);
        const DESCRIPTION: &'static str = "Fragments per network translation request";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 1000)
        }
    }

    /// 处理中标记
    pub struct PendingMarker;
    impl EnvVar<String> for PendingMarker {
        const NAME: &'static str = "LIVETRANS_PENDING_MARKER";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Class token marking elements being translated";

        fn parse(value: &str) -> EnvResult<String> {
            parse_class_token(value, Self::NAME)
        }
    }

    /// 已完成标记
    pub struct DoneMarker;
    impl EnvVar<String> for DoneMarker {
        const NAME: &'static str = "LIVETRANS_DONE_MARKER";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Class token marking translated elements";

        fn parse(value: &str) -> EnvResult<String> {
            parse_class_token(value, Self::NAME)
        }
    }
}

/// 缓存相关环境变量
pub mod cache {
    use super::*;

    /// 缓存启用状态
    pub struct Enabled;
    impl EnvVar<bool> for Enabled {
        const NAME: &'static str = "LIVETRANS_CACHE_ENABLED";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Enable the persistent translation cache";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 缓存目录
    pub struct Dir;
    impl EnvVar<PathBuf> for Dir {
        const NAME: &'static str = "LIVETRANS_CACHE_DIR";
        const DEFAULT: Option<PathBuf> = None;
        const DESCRIPTION: &'static str = "Directory holding the on-disk cache databases";

        fn parse(value: &str) -> EnvResult<PathBuf> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
            Ok(PathBuf::from(shellexpand::tilde(trimmed).as_ref()))
        }
    }
}

fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn parse_lang(value: &str, var_name: &str, allow_empty: bool) -> EnvResult<String> {
    let lang = value.trim();
    if lang.is_empty() {
        return if allow_empty {
            Ok(String::new())
        } else {
            Err(EnvError {
                variable: var_name.to_string(),
                message: "Language code must not be empty".to_string(),
            })
        };
    }

    if !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid language code '{}'", lang),
        });
    }

    Ok(lang.to_string())
}

fn parse_class_token(value: &str, var_name: &str) -> EnvResult<String> {
    let token = value.trim();
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid class token '{}'", value),
        });
    }
    Ok(token.to_string())
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    let rows: [(&str, &str); 8] = [
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (translation::ToLang::NAME, translation::ToLang::DESCRIPTION),
        (translation::FromLang::NAME, translation::FromLang::DESCRIPTION),
        (translation::BatchSize::NAME, translation::BatchSize::DESCRIPTION),
        (translation::PendingMarker::NAME, translation::PendingMarker::DESCRIPTION),
        (translation::DoneMarker::NAME, translation::DoneMarker::DESCRIPTION),
        (cache::Enabled::NAME, cache::Enabled::DESCRIPTION),
        (cache::Dir::NAME, cache::Dir::DESCRIPTION),
    ];

    for (name, description) in rows {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    }

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_parsing() {
        assert!(cache::Enabled::parse("true").unwrap());
        assert!(cache::Enabled::parse("1").unwrap());
        assert!(cache::Enabled::parse("YES").unwrap());
        assert!(!cache::Enabled::parse("off").unwrap());
        assert!(cache::Enabled::parse("maybe").is_err());
    }

    #[test]
    fn test_lang_parsing() {
        assert_eq!(translation::ToLang::parse(" zh-Hans ").unwrap(), "zh-Hans");
        assert!(translation::ToLang::parse("").is_err());
        assert!(translation::ToLang::parse("zh_CN!").is_err());
        assert_eq!(translation::FromLang::parse("").unwrap(), "");
    }

    #[test]
    fn test_batch_size_bounds() {
        assert_eq!(translation::BatchSize::parse("100").unwrap(), 100);
        assert!(translation::BatchSize::parse("0").is_err());
        assert!(translation::BatchSize::parse("5000").is_err());
        assert!(translation::BatchSize::parse("many").is_err());
    }

    #[test]
    fn test_marker_parsing() {
        assert_eq!(
            translation::DoneMarker::parse("my-done").unwrap(),
            "my-done"
        );
        assert!(translation::DoneMarker::parse("two words").is_err());
    }

    #[test]
    fn test_env_docs_list_every_variable() {
        let docs = generate_env_docs();
        assert!(docs.contains("LIVETRANS_TO_LANG"));
        assert!(docs.contains("LIVETRANS_CACHE_DIR"));
    }
}
