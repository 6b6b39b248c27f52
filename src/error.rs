/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - ConfigError / RepoError / io::Error を統一的に変換
 * - 画面に出すメッセージ (user_message) を決める
 */
use thiserror::Error;

use crate::config::ConfigError;
use crate::repos::error::RepoError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },
}

impl AppError {
    pub fn validation(field: &'static str, message: &'static str) -> Self {
        Self::Validation { field, message }
    }

    /// Text shown to the user. Transport details only go to the log.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => e.to_string(),
            AppError::Repo(RepoError::Status { message, .. }) if !message.is_empty() => {
                message.clone()
            }
            AppError::Repo(_) => "An unexpected error occurred".to_string(),
            AppError::Io(_) => "An unexpected error occurred".to_string(),
            AppError::Validation { message, .. } => (*message).to_string(),
        }
    }
}
