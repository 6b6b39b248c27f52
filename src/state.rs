/*
 * Responsibility
 * - ホーム画面の状態を 1 つの構造体 (HomeState) で所有する
 * - 状態遷移は明示的な関数経由のみ (ページ範囲, フィルタ変更時のページリセットをここで保証)
 * - フェッチは FetchTicket (単調増加 seq) で識別し、古いレスポンスは捨てる
 * - フェッチ失敗後は halted: 以降の遷移はすべて no-op
 */
use crate::repos::dto::posts::{PageResult, Post, PostQuery};
use crate::repos::error::RepoError;
use crate::services::notifications::{
    Notification, NotificationId, NotificationQueue, StreamMessage,
};

pub const FETCH_ERROR_MESSAGE: &str = "Failed to fetch posts.";

/// Raw search input, before debouncing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub titles_only: bool,
}

/// Debounced search input actually used for fetching.
pub type SearchFilter = SearchState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub page: u32,
    pub filter: SearchFilter,
}

impl FetchTicket {
    pub fn query(&self, page_size: u32) -> PostQuery {
        PostQuery::new(
            self.page,
            page_size,
            &self.filter.query,
            self.filter.titles_only,
        )
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum FetchApplied {
    /// Response belonged to an older request and was dropped.
    Stale,
    Applied,
    /// Current page fell past the last page; fetch again with this ticket.
    Clamped(FetchTicket),
    Failed,
}

#[derive(Debug)]
pub struct HomeState {
    posts: Vec<Post>,
    loading: bool,
    error: Option<&'static str>,
    current_page: u32,
    total_pages: u32,
    filter: SearchFilter,
    next_seq: u64,
    in_flight: Option<u64>,
    notifications: NotificationQueue,
}

impl HomeState {
    pub fn new(notification_capacity: usize) -> Self {
        Self {
            posts: Vec::new(),
            loading: false,
            error: None,
            current_page: 1,
            total_pages: 1,
            filter: SearchFilter::default(),
            next_seq: 0,
            in_flight: None,
            notifications: NotificationQueue::new(notification_capacity),
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    pub fn is_halted(&self) -> bool {
        self.error.is_some()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn filter(&self) -> &SearchFilter {
        &self.filter
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.iter().count()
    }

    pub fn can_go_previous(&self) -> bool {
        !self.is_halted() && self.current_page > 1
    }

    pub fn can_go_next(&self) -> bool {
        !self.is_halted() && self.current_page < self.total_pages
    }

    /// Issue a fetch for `page` with the current filter. Any earlier in-flight
    /// request becomes stale.
    pub fn begin_fetch(&mut self, page: u32) -> Option<FetchTicket> {
        if self.is_halted() {
            return None;
        }

        self.next_seq += 1;
        self.in_flight = Some(self.next_seq);
        self.loading = true;
        self.current_page = page.max(1);

        Some(FetchTicket {
            seq: self.next_seq,
            page: self.current_page,
            filter: self.filter.clone(),
        })
    }

    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<PageResult, RepoError>,
    ) -> FetchApplied {
        if self.is_halted() || self.in_flight != Some(ticket.seq) {
            tracing::debug!(seq = ticket.seq, page = ticket.page, "dropping stale response");
            return FetchApplied::Stale;
        }
        self.in_flight = None;
        self.loading = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(error = %e, page = ticket.page, "fetch posts failed");
                self.error = Some(FETCH_ERROR_MESSAGE);
                return FetchApplied::Failed;
            }
        };

        self.posts = page.items;
        self.total_pages = page.total_pages.max(1);

        if self.current_page > self.total_pages {
            let last = self.total_pages;
            return match self.begin_fetch(last) {
                Some(next) => FetchApplied::Clamped(next),
                None => FetchApplied::Applied,
            };
        }

        FetchApplied::Applied
    }

    pub fn go_next(&mut self) -> Option<FetchTicket> {
        if !self.can_go_next() {
            return None;
        }
        self.begin_fetch(self.current_page + 1)
    }

    pub fn go_previous(&mut self) -> Option<FetchTicket> {
        if !self.can_go_previous() {
            return None;
        }
        self.begin_fetch(self.current_page - 1)
    }

    /// Apply a settled (debounced) filter. A changed filter always restarts at page 1.
    pub fn apply_filter(&mut self, filter: SearchFilter) -> Option<FetchTicket> {
        if self.is_halted() || self.filter == filter {
            return None;
        }
        self.filter = filter;
        self.begin_fetch(1)
    }

    pub fn push_live_update(&mut self, msg: &StreamMessage) -> NotificationId {
        self.notifications.push(msg.message())
    }

    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        self.notifications.dismiss(id)
    }

    /// Remove the notification and refetch page 1, whatever page is current.
    pub fn reload(&mut self, id: NotificationId) -> Option<FetchTicket> {
        if self.is_halted() || !self.notifications.dismiss(id) {
            return None;
        }
        self.begin_fetch(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifications::StreamOperation;

    fn post(id: u32) -> Post {
        Post {
            id: id.to_string(),
            user_id: "1".into(),
            title: format!("title {id}"),
            body: format!("body {id}"),
        }
    }

    fn page(page: u32, total_pages: u32, items: Vec<Post>) -> PageResult {
        PageResult {
            page,
            page_size: 10,
            total_items: items.len() as u64,
            total_pages,
            items,
        }
    }

    fn loaded(total_pages: u32) -> HomeState {
        let mut state = HomeState::new(5);
        let t = state.begin_fetch(1).unwrap();
        state.complete_fetch(&t, Ok(page(1, total_pages, vec![post(1)])));
        state
    }

    #[test]
    fn pagination_is_disabled_at_boundaries() {
        let mut state = loaded(2);
        assert!(!state.can_go_previous());
        assert!(state.go_previous().is_none());
        assert!(state.can_go_next());

        let t = state.go_next().unwrap();
        assert_eq!(t.page, 2);
        state.complete_fetch(&t, Ok(page(2, 2, vec![post(11)])));

        assert_eq!(state.current_page(), 2);
        assert!(!state.can_go_next());
        assert!(state.go_next().is_none());
        assert!(state.can_go_previous());
    }

    #[test]
    fn filter_change_resets_to_first_page() {
        let mut state = loaded(5);
        let t = state.go_next().unwrap();
        state.complete_fetch(&t, Ok(page(2, 5, vec![post(2)])));
        assert_eq!(state.current_page(), 2);

        let t = state
            .apply_filter(SearchFilter {
                query: String::new(),
                titles_only: true,
            })
            .unwrap();
        assert_eq!(t.page, 1);
        assert!(t.filter.titles_only);
        assert_eq!(state.current_page(), 1);

        // 同じフィルタの再適用はフェッチしない
        assert!(state.apply_filter(t.filter.clone()).is_none());
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut state = loaded(5);
        let older = state.go_next().unwrap();
        let newer = state
            .apply_filter(SearchFilter {
                query: "rust".into(),
                titles_only: false,
            })
            .unwrap();

        assert_eq!(
            state.complete_fetch(&newer, Ok(page(1, 1, vec![post(42)]))),
            FetchApplied::Applied
        );
        assert_eq!(
            state.complete_fetch(&older, Ok(page(2, 5, vec![post(2)]))),
            FetchApplied::Stale
        );

        assert_eq!(state.current_page(), 1);
        assert_eq!(state.total_pages(), 1);
        assert_eq!(state.posts()[0].id, "42");
    }

    #[test]
    fn failure_halts_every_transition() {
        let mut state = HomeState::new(5);
        let t = state.begin_fetch(1).unwrap();
        let applied = state.complete_fetch(&t, Err(RepoError::Transport("refused".into())));

        assert_eq!(applied, FetchApplied::Failed);
        assert_eq!(state.error(), Some(FETCH_ERROR_MESSAGE));
        assert!(!state.is_loading());
        assert!(state.go_next().is_none());
        assert!(state.begin_fetch(1).is_none());
        assert!(
            state
                .apply_filter(SearchFilter {
                    query: "x".into(),
                    titles_only: false
                })
                .is_none()
        );
    }

    #[test]
    fn shrinking_result_set_clamps_current_page() {
        let mut state = loaded(3);
        let t = state.go_next().unwrap();
        state.complete_fetch(&t, Ok(page(2, 3, vec![post(2)])));
        let t = state.go_next().unwrap();

        let applied = state.complete_fetch(&t, Ok(page(3, 2, vec![])));
        let next = match applied {
            FetchApplied::Clamped(next) => next,
            other => panic!("expected a clamped refetch, got {other:?}"),
        };
        assert_eq!(next.page, 2);
        assert_eq!(state.current_page(), 2);
    }

    #[test]
    fn zero_total_pages_is_treated_as_one() {
        let mut state = HomeState::new(5);
        let t = state.begin_fetch(1).unwrap();
        assert_eq!(
            state.complete_fetch(&t, Ok(page(1, 0, vec![]))),
            FetchApplied::Applied
        );
        assert_eq!(state.total_pages(), 1);
        assert!(state.posts().is_empty());
        assert!(!state.can_go_next());
    }

    #[test]
    fn reload_dismisses_and_fetches_first_page() {
        let mut state = loaded(4);
        let t = state.go_next().unwrap();
        state.complete_fetch(&t, Ok(page(2, 4, vec![post(2)])));

        let keep = state.push_live_update(&StreamMessage {
            operation: StreamOperation::Added,
            count: 1,
        });
        let reload = state.push_live_update(&StreamMessage {
            operation: StreamOperation::Updated,
            count: 3,
        });

        let t = state.reload(reload).unwrap();
        assert_eq!(t.page, 1);
        assert_eq!(state.current_page(), 1);
        let ids: Vec<_> = state.notifications().map(|n| n.id).collect();
        assert_eq!(ids, vec![keep]);

        assert!(state.reload(reload).is_none());
        assert!(state.dismiss(keep));
        assert_eq!(state.notification_count(), 0);
    }
}
