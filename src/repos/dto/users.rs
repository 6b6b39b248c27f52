/*
 * Responsibility
 * - /api/user 系の request/response DTO
 * - 送信前の形式チェック用に validate() を持たせる
 * - register 失敗時のエラー配列をフィールドごとに振り分ける
 */
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserData {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub is_authenticated: bool,
    pub user: Option<UserData>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        if self.password.trim().is_empty() {
            return Err(AppError::validation("password", "password is required"));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    pub user: Option<UserData>,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.username.trim().is_empty() {
            return Err(AppError::validation("username", "username is required"));
        }
        validate_email(&self.email)?;
        if self.password.trim().is_empty() {
            return Err(AppError::validation("password", "password is required"));
        }

        Ok(())
    }
}

/// One entry of the error array returned by `POST /api/user/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiFieldError {
    #[serde(default)]
    pub code: String,
    pub description: String,
}

/// Register errors routed to the form field they talk about.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SignupErrors {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SignupErrors {
    pub fn from_field_errors(errors: &[ApiFieldError]) -> Self {
        let mut out = Self::default();
        for e in errors {
            let lower = e.description.to_lowercase();
            // 最後に来たものが勝つ (フォームには 1 フィールド 1 メッセージ)
            if lower.contains("email") {
                out.email = Some(e.description.clone());
            } else if lower.contains("username") {
                out.username = Some(e.description.clone());
            } else if lower.contains("password") {
                out.password = Some(e.description.clone());
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.username.is_none() && self.password.is_none()
    }
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::validation("email", "email is required"));
    }
    if !email.contains('@') {
        return Err(AppError::validation("email", "email is invalid"));
    }
    Ok(())
}
