use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::parsing::{GrammarVariant, MarkerStyle};
use crate::services::NanPolicy;
use crate::workflow::QueryPolicy;

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_VAR: &str = "EXERCISE_FINDER_CONFIG";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_max_tokens: u32,
    // --- 分块配置 ---
    /// 每块最多页数
    pub pages_per_chunk: usize,
    /// 无页码标记时的字符上限
    pub max_chars: usize,
    /// 两次调用之间的等待秒数
    pub pacing_secs: u64,
    // --- 查询与解析 ---
    pub query_policy: QueryPolicy,
    pub marker_style: MarkerStyle,
    pub grammar: GrammarVariant,
    /// 页面内容是否保留页码标记行
    pub include_page_header: bool,
    pub nan_policy: NanPolicy,
    // --- 输出 ---
    pub output_csv: String,
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o".to_string(),
            llm_max_tokens: 4096,
            pages_per_chunk: 25,
            max_chars: 50_000,
            pacing_secs: 65,
            query_policy: QueryPolicy::Stateless,
            marker_style: MarkerStyle::Any,
            grammar: GrammarVariant::Strict,
            include_page_header: false,
            nan_policy: NanPolicy::Last,
            output_csv: "ejercicios.csv".to_string(),
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 默认配置 + 环境变量覆盖
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// 从 TOML 文件加载，缺失的字段取默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
            key: CONFIG_PATH_VAR.to_string(),
            reason: format!("无法读取 {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: origin.to_string(),
            source,
        })
    }

    /// 完整加载流程：配置文件（如果设置了 `EXERCISE_FINDER_CONFIG`）→ 环境变量覆盖 → 校验
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(Path::new(&path))?,
            _ => Self::default(),
        };
        let config = base.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// 用环境变量覆盖已有字段
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        Ok(Self {
            llm_api_key: env_string("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", "u32")?.unwrap_or(self.llm_max_tokens),
            pages_per_chunk: env_parse("PAGES_PER_CHUNK", "usize")?
                .unwrap_or(self.pages_per_chunk),
            max_chars: env_parse("MAX_CHARS", "usize")?.unwrap_or(self.max_chars),
            pacing_secs: env_parse("PACING_SECS", "u64")?.unwrap_or(self.pacing_secs),
            query_policy: env_named("QUERY_POLICY", QueryPolicy::from_name)?
                .unwrap_or(self.query_policy),
            marker_style: env_named("MARKER_STYLE", MarkerStyle::from_name)?
                .unwrap_or(self.marker_style),
            grammar: env_named("GRAMMAR", GrammarVariant::from_name)?.unwrap_or(self.grammar),
            include_page_header: env_parse("INCLUDE_PAGE_HEADER", "bool")?
                .unwrap_or(self.include_page_header),
            nan_policy: env_named("NAN_POLICY", NanPolicy::from_name)?.unwrap_or(self.nan_policy),
            output_csv: env_string("OUTPUT_CSV").unwrap_or(self.output_csv),
            output_log_file: env_string("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?
                .unwrap_or(self.verbose_logging),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pages_per_chunk == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pages_per_chunk".to_string(),
                reason: "每块页数必须大于 0".to_string(),
            });
        }
        if self.max_chars == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_chars".to_string(),
                reason: "字符上限必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok()
}

fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn env_named<T>(var_name: &str, lookup: fn(&str) -> Option<T>) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => lookup(&value)
            .map(Some)
            .ok_or_else(|| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>()
                    .rsplit("::")
                    .next()
                    .unwrap_or_default()
                    .to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.pages_per_chunk, 25);
        assert_eq!(config.max_chars, 50_000);
        assert_eq!(config.pacing_interval(), Duration::from_secs(65));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_override() {
        let config = Config::from_toml_str(
            r#"
            pages_per_chunk = 10
            pacing_secs = 0
            query_policy = "rolling"
            marker_style = "accented"
            grammar = "tolerant"
            nan_policy = "drop"
            "#,
            "inline",
        )
        .unwrap();

        assert_eq!(config.pages_per_chunk, 10);
        assert_eq!(config.pacing_secs, 0);
        assert_eq!(config.query_policy, QueryPolicy::Rolling);
        assert_eq!(config.marker_style, MarkerStyle::Accented);
        assert_eq!(config.grammar, GrammarVariant::Tolerant);
        assert_eq!(config.nan_policy, NanPolicy::Drop);
        // 未指定的字段保持默认
        assert_eq!(config.max_chars, 50_000);
    }

    #[test]
    fn test_toml_rejects_unknown_policy() {
        let result = Config::from_toml_str(r#"query_policy = "parallel""#, "inline");
        assert!(matches!(result, Err(ConfigError::TomlParseFailed { .. })));
    }

    #[test]
    fn test_zero_chunk_size_is_invalid() {
        let config = Config {
            pages_per_chunk: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
