/*
 * Responsibility
 * - 起動時の check-auth → 未ログインなら login / signup プロンプト
 * - 失敗時の文言はサーバーの message を優先し、無ければ固定文言
 * - logout はサーバー側の成否に関わらず cookie ごとセッションを捨てる
 * - 入出力は AsyncBufRead / AsyncWrite で受ける (テストでは in-memory)
 */
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, Lines};

use crate::config::Config;
use crate::error::AppError;
use crate::repos::client::ApiClient;
use crate::repos::dto::users::{LoginRequest, RegisterRequest, UserData};
use crate::repos::error::RepoError;
use crate::repos::user_repo::{self, RegisterOutcome};
use crate::ui::command::{self, AUTH_HELP, AuthCommand};

pub const LOGIN_FAILED: &str = "Login failed";
pub const SIGNUP_OK: &str = "Signup successful! You can now log in.";
pub const SIGNUP_FAILED: &str = "Signup failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFlow {
    /// The server may report a session without user details.
    LoggedIn(Option<UserData>),
    Quit,
}

pub async fn authenticate<R, W>(
    client: &ApiClient,
    input: &mut Lines<R>,
    out: &mut W,
) -> Result<AuthFlow, AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match user_repo::check_auth(client).await {
        Ok(status) if status.is_authenticated => {
            tracing::info!("existing session found");
            return Ok(AuthFlow::LoggedIn(status.user));
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "check-auth failed; treating as logged out"),
    }

    write_line(out, AUTH_HELP).await?;
    loop {
        out.write_all(b"> ").await?;
        out.flush().await?;

        let Some(line) = input.next_line().await? else {
            return Ok(AuthFlow::Quit);
        };

        let cmd = match command::parse_auth(&line) {
            Ok(cmd) => cmd,
            Err(command::CommandError::Empty) => continue,
            Err(e) => {
                write_line(out, &e.to_string()).await?;
                continue;
            }
        };

        match cmd {
            AuthCommand::Login { email, password } => {
                if let Some(user) = login(client, email, password, out).await? {
                    write_line(out, &format!("Welcome, {}.", user.username)).await?;
                    return Ok(AuthFlow::LoggedIn(Some(user)));
                }
            }
            AuthCommand::Signup {
                username,
                email,
                password,
            } => signup(client, username, email, password, out).await?,
            AuthCommand::Help => write_line(out, AUTH_HELP).await?,
            AuthCommand::Quit => return Ok(AuthFlow::Quit),
        }
    }
}

/// Ends the session on the server. The returned client starts with an empty
/// cookie store, so the local session is gone even when the server call failed.
pub async fn sign_out(config: &Config, client: &ApiClient) -> Result<ApiClient, AppError> {
    if let Err(e) = user_repo::logout(client).await {
        tracing::error!(error = %e, "logout failed; dropping the local session anyway");
    }
    Ok(ApiClient::new(config)?)
}

async fn login<W>(
    client: &ApiClient,
    email: String,
    password: String,
    out: &mut W,
) -> Result<Option<UserData>, AppError>
where
    W: AsyncWrite + Unpin,
{
    let req = LoginRequest { email, password };
    if let Err(e) = req.validate() {
        write_line(out, &e.user_message()).await?;
        return Ok(None);
    }

    match user_repo::login(client, &req).await {
        Ok(Some(user)) => Ok(Some(user)),
        Ok(None) => {
            write_line(out, LOGIN_FAILED).await?;
            Ok(None)
        }
        Err(e) => {
            tracing::warn!(error = %e, "login failed");
            let message = match e {
                RepoError::Status { message, .. } if !message.is_empty() => message,
                _ => LOGIN_FAILED.to_string(),
            };
            write_line(out, &message).await?;
            Ok(None)
        }
    }
}

async fn signup<W>(
    client: &ApiClient,
    username: String,
    email: String,
    password: String,
    out: &mut W,
) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    let req = RegisterRequest {
        email,
        password,
        username,
    };
    if let Err(e) = req.validate() {
        return write_line(out, &e.user_message()).await;
    }

    match user_repo::register(client, &req).await {
        Ok(RegisterOutcome::Registered) => write_line(out, SIGNUP_OK).await,
        Ok(RegisterOutcome::Rejected(errors)) if !errors.is_empty() => {
            let fields = [
                ("username", errors.username),
                ("email", errors.email),
                ("password", errors.password),
            ];
            for (field, message) in fields {
                if let Some(message) = message {
                    write_line(out, &format!("{field}: {message}")).await?;
                }
            }
            Ok(())
        }
        Ok(RegisterOutcome::Rejected(_)) => write_line(out, SIGNUP_FAILED).await,
        Err(e) => {
            tracing::warn!(error = %e, "signup failed");
            write_line(out, SIGNUP_FAILED).await
        }
    }
}

pub(crate) async fn write_line<W>(out: &mut W, text: &str) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}
