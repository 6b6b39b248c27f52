mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{MockApi, MockState};
use post_tracker::repos::dto::posts::PostQuery;
use post_tracker::repos::post_repo::{self, RemotePosts};
use post_tracker::state::FETCH_ERROR_MESSAGE;
use post_tracker::ui::command::Command;
use post_tracker::ui::home::{HomeSettings, HomeView, ViewEvent};

fn settings(api: &MockApi) -> HomeSettings {
    let config = api.config();
    HomeSettings {
        page_size: config.page_size,
        notification_capacity: config.notification_capacity,
        search_debounce: config.search_debounce,
    }
}

async fn pump(view: &mut HomeView<RemotePosts>) -> ViewEvent {
    tokio::time::timeout(Duration::from_secs(5), view.next_event())
        .await
        .expect("timed out waiting for a view event")
        .expect("view event channel closed")
}

#[tokio::test]
async fn fetch_page_sends_paging_and_omits_empty_query() {
    let api = MockApi::start(MockState::with_posts(23)).await;
    let client = api.client();

    let page = post_repo::fetch_page(&client, &PostQuery::new(3, 10, "", false))
        .await
        .unwrap();

    assert_eq!(page.page, 3);
    assert_eq!(page.total_items, 23);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.items[0].id, "21");

    let queries = api.state.recorded_queries();
    assert_eq!(queries[0].get("page").map(String::as_str), Some("3"));
    assert_eq!(queries[0].get("pageSize").map(String::as_str), Some("10"));
    assert_eq!(
        queries[0].get("searchTitles").map(String::as_str),
        Some("false")
    );
    assert!(!queries[0].contains_key("query"));

    let ids = api.state.request_ids.lock().unwrap().clone();
    assert_eq!(ids.len(), 1);
    assert!(uuid::Uuid::parse_str(&ids[0]).is_ok());
}

#[tokio::test]
async fn server_error_is_a_status_error() {
    let api = MockApi::start(MockState::with_posts(5)).await;
    api.state.fail_posts.store(true, Ordering::SeqCst);

    let err = post_repo::fetch_page(&api.client(), &PostQuery::new(1, 10, "", false))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("database unavailable"));
}

#[tokio::test]
async fn search_with_titles_only_resets_to_first_page() {
    let api = MockApi::start(MockState::with_posts(40)).await;
    let mut view = HomeView::new(RemotePosts::new(api.client()), settings(&api), None);

    view.start();
    let event = pump(&mut view).await;
    view.apply(event);
    assert_eq!(view.state().total_pages(), 4);

    view.handle_command(Command::Next);
    let event = pump(&mut view).await;
    view.apply(event);
    assert_eq!(view.state().current_page(), 2);

    view.handle_command(Command::Search("rust".into()));
    view.handle_command(Command::ToggleTitles);

    let event = pump(&mut view).await;
    assert!(matches!(event, ViewEvent::Filter(_)));
    view.apply(event);
    assert_eq!(view.state().current_page(), 1);

    let event = pump(&mut view).await;
    view.apply(event);

    // タイトルに rust を含むのは偶数番の 20 件
    assert_eq!(view.state().total_pages(), 2);
    assert!(
        view.state()
            .posts()
            .iter()
            .all(|p| p.title.contains("rust"))
    );

    let last = api.state.recorded_queries().pop().unwrap();
    assert_eq!(last.get("page").map(String::as_str), Some("1"));
    assert_eq!(last.get("query").map(String::as_str), Some("rust"));
    assert_eq!(last.get("searchTitles").map(String::as_str), Some("true"));
}

#[tokio::test]
async fn failed_fetch_halts_the_list() {
    let api = MockApi::start(MockState::with_posts(30)).await;
    let mut view = HomeView::new(RemotePosts::new(api.client()), settings(&api), None);

    api.state.fail_posts.store(true, Ordering::SeqCst);
    view.start();
    let event = pump(&mut view).await;
    view.apply(event);

    assert_eq!(view.state().error(), Some(FETCH_ERROR_MESSAGE));
    assert_eq!(view.render(None), format!("{FETCH_ERROR_MESSAGE}\n"));

    // no retry, no further navigation
    api.state.fail_posts.store(false, Ordering::SeqCst);
    view.handle_command(Command::Next);
    view.handle_command(Command::Refresh);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(api.state.recorded_queries().len(), 1);
    assert!(view.state().is_halted());
}
