pub mod debounce;
pub mod feed;
pub mod live_updates;
pub mod notifications;
