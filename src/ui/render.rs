/*
 * Responsibility
 * - HomeState → 表示用テキスト (トップバー, 検索行, テーブル, ページャ, 通知)
 * - 状態は読むだけ。副作用なし
 */
use std::fmt::Write;

use crate::repos::dto::posts::Post;
use crate::repos::dto::users::UserData;
use crate::state::{HomeState, SearchState};
use crate::ui::home::StreamStatus;

const TITLE_WIDTH: usize = 32;
const BODY_WIDTH: usize = 56;

pub const EMPTY_STATE: &str = "No posts available.";
pub const LOADING: &str = "Loading...";

pub fn render_home(
    state: &HomeState,
    search: &SearchState,
    stream: StreamStatus,
    user: Option<&UserData>,
) -> String {
    let mut out = String::new();

    // fetch 失敗後はエラー文言だけを出す
    if let Some(error) = state.error() {
        let _ = writeln!(out, "{error}");
        return out;
    }

    render_top_bar(&mut out, user, stream);
    render_search(&mut out, search);
    render_table(&mut out, state);
    if !state.posts().is_empty() {
        render_pagination(&mut out, state);
    }
    render_toasts(&mut out, state);

    out
}

fn render_top_bar(out: &mut String, user: Option<&UserData>, stream: StreamStatus) {
    let who = match user {
        Some(u) => format!("{} <{}>", u.username, u.email),
        None => "signed in".to_string(),
    };
    let live = match stream {
        StreamStatus::Connecting => "live: connecting".to_string(),
        StreamStatus::Connected => "live: on".to_string(),
        StreamStatus::Reconnecting { attempt, retry_in } => format!(
            "live: reconnecting in {}s (attempt {attempt})",
            retry_in.as_secs_f32()
        ),
        StreamStatus::Offline => "live: off".to_string(),
    };
    let _ = writeln!(out, "Post Tracker | {who} | {live} | logout");
}

fn render_search(out: &mut String, search: &SearchState) {
    let mark = if search.titles_only { "x" } else { " " };
    let _ = writeln!(
        out,
        "Search: [{}]  [{mark}] Search Titles",
        if search.query.is_empty() {
            "Search posts..."
        } else {
            search.query.as_str()
        }
    );
}

fn render_table(out: &mut String, state: &HomeState) {
    let posts = state.posts();
    let id_w = column_width("ID", posts.iter().map(|p| p.id.as_str()));
    let user_w = column_width("User ID", posts.iter().map(|p| p.user_id.as_str()));
    let title_w = TITLE_WIDTH;

    let _ = writeln!(
        out,
        "{:^id_w$} | {:^user_w$} | {:<title_w$} | Body",
        "ID", "User ID", "Title"
    );
    let _ = writeln!(out, "{}", "-".repeat(id_w + user_w + title_w + BODY_WIDTH + 9));

    if state.is_loading() {
        let _ = writeln!(out, "{LOADING}");
    } else if posts.is_empty() {
        let _ = writeln!(out, "{EMPTY_STATE}");
    } else {
        for post in posts {
            render_row(out, post, id_w, user_w);
        }
    }
}

fn render_row(out: &mut String, post: &Post, id_w: usize, user_w: usize) {
    let title_w = TITLE_WIDTH;
    let _ = writeln!(
        out,
        "{:^id_w$} | {:^user_w$} | {:<title_w$} | {}",
        post.id,
        post.user_id,
        truncate(&post.title, TITLE_WIDTH),
        truncate(&flatten(&post.body), BODY_WIDTH),
    );
}

fn render_pagination(out: &mut String, state: &HomeState) {
    let prev = if state.can_go_previous() {
        "« Prev"
    } else {
        "« Prev (disabled)"
    };
    let next = if state.can_go_next() {
        "Next »"
    } else {
        "(disabled) Next »"
    };
    let _ = writeln!(
        out,
        "{prev}  [{} / {}]  {next}",
        state.current_page(),
        state.total_pages()
    );
}

fn render_toasts(out: &mut String, state: &HomeState) {
    if state.notification_count() == 0 {
        return;
    }
    let _ = writeln!(out);
    for n in state.notifications() {
        let _ = writeln!(
            out,
            "* {}  [{}]  (reload {id} | dismiss {id})",
            n.message,
            n.created_at.format("%H:%M:%S"),
            id = n.id
        );
    }
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values
        .map(|v| v.chars().count())
        .chain(std::iter::once(header.chars().count()))
        .max()
        .unwrap_or(0)
}

fn flatten(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut s: String = text.chars().take(width.saturating_sub(1)).collect();
    s.push('…');
    s
}
