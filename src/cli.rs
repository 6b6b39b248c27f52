/*
 * Responsibility
 * - コマンドライン引数の定義 (clap)
 * - 環境変数 (Config::from_env) の値を上書きする
 */
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::config::{Config, ConfigError};

/// Terminal client for the Post Tracker API.
///
/// Every flag overrides the matching environment variable.
#[derive(Parser, Debug, Default)]
#[command(name = "post-tracker", version, about)]
pub struct Args {
    /// Base URL of the API (API_BASE_URL), e.g. https://localhost:7052
    #[arg(long, value_name = "URL")]
    pub api_base_url: Option<Url>,

    /// Posts per page (PAGE_SIZE)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Search debounce in milliseconds (SEARCH_DEBOUNCE_MS)
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Max live notifications kept on screen (NOTIFICATION_CAPACITY)
    #[arg(long)]
    pub notification_capacity: Option<usize>,

    /// Accept self-signed TLS certificates (ACCEPT_INVALID_CERTS)
    #[arg(long, default_value_t = false)]
    pub insecure: bool,
}

impl Args {
    pub fn apply(&self, config: &mut Config) -> Result<(), ConfigError> {
        if let Some(url) = &self.api_base_url {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid("--api-base-url"));
            }
            config.api_base_url = url.clone();
        }
        if let Some(page_size) = self.page_size {
            if page_size == 0 {
                return Err(ConfigError::Invalid("--page-size"));
            }
            config.page_size = page_size;
        }
        if let Some(ms) = self.debounce_ms {
            config.search_debounce = Duration::from_millis(ms);
        }
        if let Some(capacity) = self.notification_capacity {
            if capacity == 0 {
                return Err(ConfigError::Invalid("--notification-capacity"));
            }
            config.notification_capacity = capacity;
        }
        if self.insecure {
            config.accept_invalid_certs = true;
        }
        Ok(())
    }
}
