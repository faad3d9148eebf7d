use crate::core::api::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECONDS, DEFAULT_USER_AGENT};
use crate::core::query::QueryOptions;
use crate::utils::error::{ClientError, Result};
use crate::utils::validation::{validate_path, validate_positive_number, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern compiles"));

const SESSION_FILE_NAME: &str = ".bike-rental-session.json";
const MAX_RETRY: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 未設定時使用 `$HOME/.bike-rental-session.json`
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 單車列表與單台單車
    pub bikes_stale_seconds: u64,
    /// 最便宜前五名與統計
    pub highlights_stale_seconds: u64,
    pub retry: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bikes_stale_seconds: 5 * 60,
            highlights_stale_seconds: 10 * 60,
            retry: 1,
        }
    }
}

impl ClientConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ClientError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ClientError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BIKE_RENTAL_API})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 命令列參數優先於設定檔
    pub fn with_overrides(mut self, base_url: Option<String>, session_file: Option<PathBuf>) -> Self {
        if let Some(base_url) = base_url {
            self.api.base_url = base_url;
        }
        if let Some(file) = session_file {
            self.session.file = Some(file.to_string_lossy().into_owned());
        }
        self
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_positive_number("api.timeout_seconds", self.api.timeout_seconds, 1)?;

        if let Some(file) = &self.session.file {
            validate_path("session.file", file)?;
        }

        if self.cache.retry > MAX_RETRY {
            return Err(ClientError::InvalidConfigValueError {
                field: "cache.retry".to_string(),
                value: self.cache.retry.to_string(),
                reason: format!("Retry count must be at most {}", MAX_RETRY),
            });
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    pub fn session_file(&self) -> PathBuf {
        match &self.session.file {
            Some(file) => PathBuf::from(file),
            None => std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(SESSION_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(SESSION_FILE_NAME)),
        }
    }

    pub fn query_defaults(&self) -> QueryOptions {
        QueryOptions::default().retry(self.cache.retry)
    }

    pub fn bikes_stale_time(&self) -> Duration {
        Duration::from_secs(self.cache.bikes_stale_seconds)
    }

    pub fn highlights_stale_time(&self) -> Duration {
        Duration::from_secs(self.cache.highlights_stale_seconds)
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
