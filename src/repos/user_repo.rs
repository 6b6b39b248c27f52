/*
 * Responsibility
 * - セッション (cookie) 系の API 呼び出し: check-auth / login / logout / register
 * - パスの大文字小文字はサーバー側の実装に合わせる (User/login, user/register)
 */
use crate::repos::client::ApiClient;
use crate::repos::dto::users::{
    ApiFieldError, AuthStatus, LoginRequest, LoginResponse, RegisterRequest, SignupErrors,
    UserData,
};
use crate::repos::error::{RepoError, RepoResult};

const CHECK_AUTH_PATH: &str = "api/user/check-auth";
const LOGIN_PATH: &str = "api/User/login";
const LOGOUT_PATH: &str = "api/User/logout";
const REGISTER_PATH: &str = "api/user/register";

pub async fn check_auth(client: &ApiClient) -> RepoResult<AuthStatus> {
    client.get_json(CHECK_AUTH_PATH, &()).await
}

/// Returns the logged-in user, or `None` when the server accepted the request
/// without returning a user.
pub async fn login(client: &ApiClient, req: &LoginRequest) -> RepoResult<Option<UserData>> {
    let resp: LoginResponse = client.post_json(LOGIN_PATH, req).await?;
    if resp.user.is_none() {
        tracing::warn!(message = %resp.message, "login response carried no user");
    }
    Ok(resp.user)
}

pub async fn logout(client: &ApiClient) -> RepoResult<()> {
    client.post_unit(LOGOUT_PATH, &serde_json::json!({})).await
}

#[derive(Debug)]
pub enum RegisterOutcome {
    Registered,
    Rejected(SignupErrors),
}

pub async fn register(client: &ApiClient, req: &RegisterRequest) -> RepoResult<RegisterOutcome> {
    match client.post_unit(REGISTER_PATH, req).await {
        Ok(()) => Ok(RegisterOutcome::Registered),
        Err(RepoError::Status { status, message }) => {
            // 400 系はエラー配列 [{code, description}] が返る
            match serde_json::from_str::<Vec<ApiFieldError>>(&message) {
                Ok(errors) => Ok(RegisterOutcome::Rejected(
                    SignupErrors::from_field_errors(&errors),
                )),
                Err(_) => Err(RepoError::Status { status, message }),
            }
        }
        Err(e) => Err(e),
    }
}
