/*
 * Responsibility
 * - 入力行 → コマンドの変換 (ホーム画面 / 認証画面)
 * - 引数の形式チェックまで。状態には触らない
 */
use thiserror::Error;

use crate::services::notifications::NotificationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the raw search query (empty clears it).
    Search(String),
    ToggleTitles,
    Next,
    Previous,
    Reload(NotificationId),
    Dismiss(NotificationId),
    Refresh,
    Logout,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCommand {
    Login {
        email: String,
        password: String,
    },
    Signup {
        username: String,
        email: String,
        password: String,
    },
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty input")]
    Empty,
    #[error("unknown command: {0} (type `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid notification id: {0}")]
    InvalidId(String),
}

pub const HOME_HELP: &str = "\
commands:
  search <text>    search posts (no text clears the search)
  titles           toggle searching titles only
  next | n         next page
  prev | p         previous page
  reload <id>      reload page 1 and close notification <id>
  dismiss <id>     close notification <id>
  refresh          fetch the current page again
  logout           end the session
  quit | q         exit";

pub const AUTH_HELP: &str = "\
commands:
  login <email> <password>
  signup <username> <email> <password>
  quit";

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    match name.to_ascii_lowercase().as_str() {
        "" => Err(CommandError::Empty),
        // 検索語はスペースを含めてそのまま渡す
        "search" | "s" | "/" => Ok(Command::Search(rest.to_string())),
        "titles" | "t" => Ok(Command::ToggleTitles),
        "next" | "n" => Ok(Command::Next),
        "prev" | "previous" | "p" => Ok(Command::Previous),
        "reload" => parse_id(rest, "reload <id>").map(Command::Reload),
        "dismiss" | "close" => parse_id(rest, "dismiss <id>").map(Command::Dismiss),
        "refresh" => Ok(Command::Refresh),
        "logout" => Ok(Command::Logout),
        "help" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

pub fn parse_auth(line: &str) -> Result<AuthCommand, CommandError> {
    let mut words = line.split_whitespace();
    let name = words.next().ok_or(CommandError::Empty)?;
    let args: Vec<&str> = words.collect();

    match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("login", [email, password]) => Ok(AuthCommand::Login {
            email: email.to_string(),
            password: password.to_string(),
        }),
        ("login", _) => Err(CommandError::Usage("login <email> <password>")),
        ("signup" | "register", [username, email, password]) => Ok(AuthCommand::Signup {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }),
        ("signup" | "register", _) => Err(CommandError::Usage(
            "signup <username> <email> <password>",
        )),
        ("help" | "?", _) => Ok(AuthCommand::Help),
        ("quit" | "q" | "exit", _) => Ok(AuthCommand::Quit),
        (other, _) => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_id(arg: &str, usage: &'static str) -> Result<NotificationId, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    arg.parse()
        .map_err(|_| CommandError::InvalidId(arg.to_string()))
}
