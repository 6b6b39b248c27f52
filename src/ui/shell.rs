/*
 * Responsibility
 * - 端末 (stdin/stdout) 上のメインループ
 * - 認証 → ホーム → logout で認証に戻る
 * - ホームは tokio::select! 1 本で入力行とバックグラウンドイベントを捌く (状態変更はここだけ)
 */
use std::io::IsTerminal;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use crate::config::Config;
use crate::error::AppError;
use crate::repos::client::ApiClient;
use crate::repos::dto::users::UserData;
use crate::repos::post_repo::RemotePosts;
use crate::services::live_updates::{LiveUpdateListener, RetryPolicy};
use crate::ui::auth::{self, AuthFlow, write_line};
use crate::ui::command::{self, CommandError, HOME_HELP};
use crate::ui::home::{Flow, HomeSettings, HomeView};

enum HomeExit {
    Logout,
    Quit,
}

pub async fn run(config: &Config, mut client: ApiClient) -> Result<(), AppError> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut out = tokio::io::stdout();
    let clear_screen = std::io::stdout().is_terminal();

    loop {
        let user = match auth::authenticate(&client, &mut input, &mut out).await? {
            AuthFlow::LoggedIn(user) => user,
            AuthFlow::Quit => return Ok(()),
        };

        let exit = run_home(
            config,
            &client,
            user.as_ref(),
            &mut input,
            &mut out,
            clear_screen,
        )
        .await?;

        match exit {
            HomeExit::Logout => {
                client = auth::sign_out(config, &client).await?;
                write_line(&mut out, "Logged out.").await?;
            }
            HomeExit::Quit => return Ok(()),
        }
    }
}

async fn run_home<R, W>(
    config: &Config,
    client: &ApiClient,
    user: Option<&UserData>,
    input: &mut Lines<R>,
    out: &mut W,
    clear_screen: bool,
) -> Result<HomeExit, AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let settings = HomeSettings {
        page_size: config.page_size,
        notification_capacity: config.notification_capacity,
        search_debounce: config.search_debounce,
    };
    let live = LiveUpdateListener::spawn(client.clone(), RetryPolicy::from_config(config));
    let mut view = HomeView::new(RemotePosts::new(client.clone()), settings, Some(live));
    view.start();
    draw(out, &view.render(user), clear_screen).await?;

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    return Ok(HomeExit::Quit);
                };
                let flow = match command::parse(&line) {
                    Ok(cmd) => view.handle_command(cmd),
                    Err(CommandError::Empty) => Flow::Unchanged,
                    Err(e) => {
                        write_line(out, &e.to_string()).await?;
                        Flow::Unchanged
                    }
                };

                match flow {
                    Flow::Continue => draw(out, &view.render(user), clear_screen).await?,
                    Flow::Unchanged => {}
                    Flow::ShowHelp => write_line(out, HOME_HELP).await?,
                    Flow::Logout => return Ok(HomeExit::Logout),
                    Flow::Quit => return Ok(HomeExit::Quit),
                }
            }
            event = view.next_event() => {
                if let Some(event) = event {
                    view.apply(event);
                    draw(out, &view.render(user), clear_screen).await?;
                }
            }
        }
    }
}

async fn draw<W>(out: &mut W, screen: &str, clear_screen: bool) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    if clear_screen {
        out.write_all(b"\x1b[2J\x1b[H").await?;
    }
    out.write_all(screen.as_bytes()).await?;
    out.write_all(b"> ").await?;
    out.flush().await?;
    Ok(())
}
