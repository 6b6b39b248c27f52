/*
 * Responsibility
 * - 環境変数や設定の読み込み (API_BASE_URL, ページサイズ, debounce, 再接続ポリシーなど)
 * - 設定値のバリデーション (不正なら起動失敗)
 */
use std::fmt;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<&str>) -> Self {
        match value
            .unwrap_or("development")
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub const DEFAULT_API_BASE_URL: &str = "https://localhost:7052";

#[derive(Clone, Debug)]
pub struct Config {
    pub app_env: AppEnv,
    pub api_base_url: Url,

    pub page_size: u32,
    pub search_debounce: Duration,
    pub notification_capacity: usize,

    // SSE 再接続ポリシー
    pub stream_max_retries: u32,
    pub stream_retry_initial: Duration,
    pub stream_retry_max: Duration,

    pub request_timeout: Duration,
    // ローカルの自己署名証明書 (https://localhost:7052) 用
    pub accept_invalid_certs: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the process env in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let api_base_url = lookup("API_BASE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url =
            Url::parse(&api_base_url).map_err(|_| ConfigError::Invalid("API_BASE_URL"))?;
        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("API_BASE_URL"));
        }

        let page_size: u32 = parse_or(&lookup, "PAGE_SIZE", 10)?;
        if page_size == 0 {
            return Err(ConfigError::Invalid("PAGE_SIZE"));
        }

        let search_debounce_ms: u64 = parse_or(&lookup, "SEARCH_DEBOUNCE_MS", 500)?;

        let notification_capacity: usize = parse_or(&lookup, "NOTIFICATION_CAPACITY", 5)?;
        if notification_capacity == 0 {
            return Err(ConfigError::Invalid("NOTIFICATION_CAPACITY"));
        }

        let stream_max_retries: u32 = parse_or(&lookup, "STREAM_MAX_RETRIES", 5)?;
        let stream_retry_initial_ms: u64 = parse_or(&lookup, "STREAM_RETRY_INITIAL_MS", 1_000)?;
        let stream_retry_max_ms: u64 = parse_or(&lookup, "STREAM_RETRY_MAX_MS", 30_000)?;
        if stream_retry_max_ms < stream_retry_initial_ms {
            return Err(ConfigError::Invalid("STREAM_RETRY_MAX_MS"));
        }

        let request_timeout_seconds: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECONDS", 30)?;

        let accept_invalid_certs = match lookup("ACCEPT_INVALID_CERTS") {
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("ACCEPT_INVALID_CERTS"))?,
            None => !app_env.is_production(),
        };

        Ok(Self {
            app_env,
            api_base_url,
            page_size,
            search_debounce: Duration::from_millis(search_debounce_ms),
            notification_capacity,
            stream_max_retries,
            stream_retry_initial: Duration::from_millis(stream_retry_initial_ms),
            stream_retry_max: Duration::from_millis(stream_retry_max_ms),
            request_timeout: Duration::from_secs(request_timeout_seconds),
            accept_invalid_certs,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        _ => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
