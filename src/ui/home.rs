//! Home view: ties the search debouncer, the fetch controller and the live
//! update listener to one `HomeState`.
//!
//! All mutation goes through `handle_command` (user input) and `apply`
//! (background events), both called from the single shell loop.
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::repos::dto::users::UserData;
use crate::repos::post_repo::PostSource;
use crate::services::debounce::Debouncer;
use crate::services::feed::{FeedController, FetchOutcome};
use crate::services::live_updates::{LiveUpdate, LiveUpdateListener};
use crate::state::{FetchApplied, FetchTicket, HomeState, SearchFilter, SearchState};
use crate::ui::command::Command;
use crate::ui::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Connecting,
    Connected,
    Reconnecting { attempt: u32, retry_in: Duration },
    Offline,
}

#[derive(Debug)]
pub enum ViewEvent {
    Filter(SearchFilter),
    Fetched(FetchOutcome),
    Live(LiveUpdate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Nothing changed on screen (e.g. the debouncer is still waiting).
    Unchanged,
    ShowHelp,
    Logout,
    Quit,
}

#[derive(Debug, Clone, Copy)]
pub struct HomeSettings {
    pub page_size: u32,
    pub notification_capacity: usize,
    pub search_debounce: Duration,
}

pub struct HomeView<S: PostSource> {
    state: HomeState,
    search: SearchState,
    debouncer: Debouncer<SearchFilter>,
    filter_rx: Option<watch::Receiver<SearchFilter>>,
    feed: FeedController<S>,
    outcomes: mpsc::Receiver<FetchOutcome>,
    // listener は drop で接続を閉じるので view と寿命を揃える
    _listener: Option<LiveUpdateListener>,
    updates: Option<mpsc::Receiver<LiveUpdate>>,
    stream_status: StreamStatus,
}

impl<S: PostSource> HomeView<S> {
    pub fn new(
        source: S,
        settings: HomeSettings,
        live: Option<(LiveUpdateListener, mpsc::Receiver<LiveUpdate>)>,
    ) -> Self {
        let debouncer = Debouncer::new(SearchFilter::default(), settings.search_debounce);
        let filter_rx = debouncer.subscribe();
        let (feed, outcomes) = FeedController::new(source, settings.page_size);

        let (listener, updates, stream_status) = match live {
            Some((listener, rx)) => (Some(listener), Some(rx), StreamStatus::Connecting),
            None => (None, None, StreamStatus::Offline),
        };

        Self {
            state: HomeState::new(settings.notification_capacity),
            search: SearchState::default(),
            debouncer,
            filter_rx: Some(filter_rx),
            feed,
            outcomes,
            _listener: listener,
            updates,
            stream_status,
        }
    }

    /// Initial page-1 fetch.
    pub fn start(&mut self) {
        let ticket = self.state.begin_fetch(1);
        self.dispatch(ticket);
    }

    pub fn state(&self) -> &HomeState {
        &self.state
    }

    pub fn stream_status(&self) -> StreamStatus {
        self.stream_status
    }

    pub fn render(&self, user: Option<&UserData>) -> String {
        render::render_home(&self.state, &self.search, self.stream_status, user)
    }

    pub fn handle_command(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::Search(query) => {
                self.search.query = query;
                self.debouncer.set(self.search.clone());
                Flow::Continue
            }
            Command::ToggleTitles => {
                self.search.titles_only = !self.search.titles_only;
                self.debouncer.set(self.search.clone());
                Flow::Continue
            }
            Command::Next => self.dispatch_or_unchanged(|s| s.go_next()),
            Command::Previous => self.dispatch_or_unchanged(|s| s.go_previous()),
            Command::Refresh => {
                let page = self.state.current_page();
                self.dispatch_or_unchanged(|s| s.begin_fetch(page))
            }
            Command::Reload(id) => self.dispatch_or_unchanged(|s| s.reload(id)),
            Command::Dismiss(id) => {
                if self.state.dismiss(id) {
                    Flow::Continue
                } else {
                    Flow::Unchanged
                }
            }
            Command::Help => Flow::ShowHelp,
            Command::Logout => Flow::Logout,
            Command::Quit => Flow::Quit,
        }
    }

    /// Wait for the next background event. Cancel-safe.
    pub async fn next_event(&mut self) -> Option<ViewEvent> {
        let Self {
            filter_rx,
            outcomes,
            updates,
            ..
        } = self;

        tokio::select! {
            filter = recv_filter(filter_rx) => Some(ViewEvent::Filter(filter)),
            outcome = outcomes.recv() => outcome.map(ViewEvent::Fetched),
            update = recv_live(updates) => Some(ViewEvent::Live(update)),
        }
    }

    pub fn apply(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::Filter(filter) => {
                let ticket = self.state.apply_filter(filter);
                self.dispatch(ticket);
            }
            ViewEvent::Fetched(FetchOutcome { ticket, result }) => {
                if let FetchApplied::Clamped(next) = self.state.complete_fetch(&ticket, result) {
                    self.dispatch(Some(next));
                }
            }
            ViewEvent::Live(update) => self.apply_live(update),
        }
    }

    fn apply_live(&mut self, update: LiveUpdate) {
        match update {
            LiveUpdate::Connected => self.stream_status = StreamStatus::Connected,
            LiveUpdate::Notification(msg) => {
                let id = self.state.push_live_update(&msg);
                tracing::info!(id, message = %msg.message(), "live update");
            }
            LiveUpdate::Disconnected { attempt, retry_in } => {
                self.stream_status = StreamStatus::Reconnecting { attempt, retry_in };
            }
            LiveUpdate::GaveUp => self.stream_status = StreamStatus::Offline,
        }
    }

    fn dispatch_or_unchanged<F>(&mut self, transition: F) -> Flow
    where
        F: FnOnce(&mut HomeState) -> Option<FetchTicket>,
    {
        match transition(&mut self.state) {
            Some(ticket) => {
                self.feed.dispatch(ticket);
                Flow::Continue
            }
            None => Flow::Unchanged,
        }
    }

    fn dispatch(&mut self, ticket: Option<FetchTicket>) {
        if let Some(ticket) = ticket {
            self.feed.dispatch(ticket);
        }
    }
}

async fn recv_filter(slot: &mut Option<watch::Receiver<SearchFilter>>) -> SearchFilter {
    if let Some(rx) = slot.as_mut() {
        if rx.changed().await.is_ok() {
            return rx.borrow_and_update().clone();
        }
        tracing::error!("search debouncer stopped; filter changes are no longer applied");
        *slot = None;
    }
    std::future::pending().await
}

async fn recv_live(slot: &mut Option<mpsc::Receiver<LiveUpdate>>) -> LiveUpdate {
    let next = match slot.as_mut() {
        Some(rx) => rx.recv().await,
        None => None,
    };

    match next {
        Some(update) => update,
        None => {
            // listener が終了したらこの branch は二度と発火させない
            *slot = None;
            std::future::pending().await
        }
    }
}
