//! Paginated fetch controller.
//!
//! Runs one `PostSource::fetch_page` per `FetchTicket` on a background task
//! and reports the outcome over a channel. Dispatching a new ticket aborts the
//! request still in flight; `HomeState::complete_fetch` drops any outcome
//! that slips through anyway.
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::repos::dto::posts::PageResult;
use crate::repos::error::RepoResult;
use crate::repos::post_repo::PostSource;
use crate::state::FetchTicket;

const OUTCOME_BUFFER: usize = 8;

#[derive(Debug)]
pub struct FetchOutcome {
    pub ticket: FetchTicket,
    pub result: RepoResult<PageResult>,
}

pub struct FeedController<S> {
    source: S,
    page_size: u32,
    tx: mpsc::Sender<FetchOutcome>,
    in_flight: Option<JoinHandle<()>>,
}

impl<S: PostSource> FeedController<S> {
    pub fn new(source: S, page_size: u32) -> (Self, mpsc::Receiver<FetchOutcome>) {
        let (tx, rx) = mpsc::channel(OUTCOME_BUFFER);
        (
            Self {
                source,
                page_size,
                tx,
                in_flight: None,
            },
            rx,
        )
    }

    pub fn dispatch(&mut self, ticket: FetchTicket) {
        if let Some(prev) = self.in_flight.take() {
            prev.abort();
        }

        let source = self.source.clone();
        let tx = self.tx.clone();
        let query = ticket.query(self.page_size);
        tracing::debug!(seq = ticket.seq, page = ticket.page, "dispatching fetch");

        self.in_flight = Some(tokio::spawn(async move {
            let result = source.fetch_page(&query).await;
            // 受信側が閉じていれば画面はもう無い
            let _ = tx.send(FetchOutcome { ticket, result }).await;
        }));
    }
}

impl<S> Drop for FeedController<S> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
