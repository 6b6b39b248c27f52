//! Live update listener for `/api/post/stream`.
//!
//! Holds one SSE connection for the lifetime of the view and forwards every
//! valid `{operation, count}` message as a `LiveUpdate::Notification`.
//!
//! Notes:
//! - Malformed payloads are logged and skipped; the connection stays up.
//! - Only `message` events are handled (named events are ignored).
//! - Reconnects use bounded exponential backoff (`RetryPolicy`). The failure
//!   counter resets once a connection has delivered at least one event.
//! - 401/403 on connect means the session is gone: give up immediately.
//! - The last seen event id is sent back as `Last-Event-ID` on reconnect.
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::repos::client::ApiClient;
use crate::repos::post_stream::{self, SseEvent};
use crate::services::notifications::StreamMessage;

const UPDATE_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.stream_max_retries,
            initial_delay: config.stream_retry_initial,
            max_delay: config.stream_retry_max,
        }
    }

    /// Delay before reconnect attempt `attempt` (1-based). A server `retry:`
    /// hint replaces the initial delay.
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let base = hint.unwrap_or(self.initial_delay);
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        base.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveUpdate {
    Connected,
    Notification(StreamMessage),
    Disconnected { attempt: u32, retry_in: Duration },
    GaveUp,
}

pub struct LiveUpdateListener {
    task: JoinHandle<()>,
}

impl LiveUpdateListener {
    pub fn spawn(client: ApiClient, policy: RetryPolicy) -> (Self, mpsc::Receiver<LiveUpdate>) {
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let task = tokio::spawn(run(client, policy, tx));
        (Self { task }, rx)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for LiveUpdateListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(client: ApiClient, policy: RetryPolicy, tx: mpsc::Sender<LiveUpdate>) {
    let mut failures: u32 = 0;
    let mut hint: Option<Duration> = None;
    let mut last_event_id: Option<String> = None;

    loop {
        let connected = post_stream::connect(&client, last_event_id.as_deref()).await;
        match connected {
            Ok(mut stream) => {
                tracing::info!("live update stream connected");
                if tx.send(LiveUpdate::Connected).await.is_err() {
                    return;
                }

                let mut delivered = false;
                while let Some(next) = stream.next_event().await {
                    match next {
                        Ok(event) => {
                            delivered = true;
                            if let Some(msg) = decode(&event)
                                && tx.send(LiveUpdate::Notification(msg)).await.is_err()
                            {
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "live update stream broke");
                            break;
                        }
                    }
                }

                hint = stream.retry_hint().or(hint);
                if let Some(id) = stream.last_event_id() {
                    last_event_id = Some(id.to_string());
                }
                if delivered {
                    failures = 0;
                }
            }
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(error = %e, "live update stream rejected; not retrying");
                let _ = tx.send(LiveUpdate::GaveUp).await;
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "live update stream connect failed");
            }
        }

        failures += 1;
        if failures > policy.max_retries {
            tracing::error!(retries = policy.max_retries, "live update stream gave up");
            let _ = tx.send(LiveUpdate::GaveUp).await;
            return;
        }

        let retry_in = policy.delay_for(failures, hint);
        if tx
            .send(LiveUpdate::Disconnected {
                attempt: failures,
                retry_in,
            })
            .await
            .is_err()
        {
            return;
        }
        tokio::time::sleep(retry_in).await;
    }
}

fn decode(event: &SseEvent) -> Option<StreamMessage> {
    if event.event != "message" {
        tracing::debug!(event = %event.event, "ignoring named stream event");
        return None;
    }

    match StreamMessage::parse(&event.data) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::warn!(error = %e, data = %event.data, "skipping stream message");
            None
        }
    }
}
