//! `GET /api/post/stream` (Server-Sent Events).
//!
//! `SseDecoder` is a push-style parser for the `text/event-stream` framing:
//! bytes go in chunk by chunk (chunk boundaries are arbitrary), complete
//! events come out. `PostStream` wires it to a reqwest body stream.
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::repos::client::ApiClient;
use crate::repos::error::RepoResult;

pub const STREAM_PATH: &str = "api/post/stream";

/// Longest line kept while waiting for its terminator. Anything longer is
/// dropped up to the next line break.
pub const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// `message` unless the server set an `event:` field.
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    scanned: usize,
    discarding: bool,
    started: bool,
    event_type: String,
    data: String,
    has_data: bool,
    last_event_id: Option<String>,
    retry: Option<Duration>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconnection delay most recently announced by a `retry:` field.
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        // 前回までに走査済みの位置から再開する
        let mut i = self.scanned;

        while i < self.buf.len() {
            let end = i;
            match self.buf[i] {
                b'\n' => i += 1,
                b'\r' => {
                    // CR の直後が LF かどうかは次の chunk を見るまで分からない
                    if i + 1 == self.buf.len() {
                        break;
                    }
                    i += if self.buf[i + 1] == b'\n' { 2 } else { 1 };
                }
                _ => {
                    i += 1;
                    continue;
                }
            }

            if self.discarding {
                // 上限超えで捨てた行の残り
                self.discarding = false;
            } else {
                let line = String::from_utf8_lossy(&self.buf[start..end]).into_owned();
                if let Some(ev) = self.process_line(&line) {
                    events.push(ev);
                }
            }
            start = i;
        }

        self.buf.drain(..start);
        self.scanned = i - start;

        if self.buf.len() > MAX_LINE_LEN {
            tracing::warn!(len = self.buf.len(), "dropping oversized event-stream line");
            let pending_cr = self.buf.last() == Some(&b'\r');
            self.buf.clear();
            if pending_cr {
                self.buf.push(b'\r');
            }
            self.scanned = 0;
            self.discarding = true;
        }

        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = if self.started {
            line
        } else {
            self.started = true;
            line.strip_prefix('\u{feff}').unwrap_or(line)
        };

        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event_type = value.to_string(),
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "id" => {
                if !value.contains('\0') {
                    self.last_event_id = Some(value.to_string());
                }
            }
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event_type = std::mem::take(&mut self.event_type);
        if !self.has_data {
            return None;
        }
        self.has_data = false;

        Some(SseEvent {
            event: if event_type.is_empty() {
                "message".to_string()
            } else {
                event_type
            },
            data: std::mem::take(&mut self.data),
            id: self.last_event_id.clone(),
        })
    }
}

type BodyStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// An open event stream.
pub struct PostStream {
    body: BodyStream,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
}

impl PostStream {
    /// Next event, `None` once the server closed the stream.
    pub async fn next_event(&mut self) -> Option<RepoResult<SseEvent>> {
        loop {
            if let Some(ev) = self.pending.pop_front() {
                return Some(Ok(ev));
            }

            match self.body.next().await? {
                Ok(chunk) => self.pending.extend(self.decoder.feed(&chunk)),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    pub fn retry_hint(&self) -> Option<Duration> {
        self.decoder.retry()
    }

    /// Last `id:` seen on this connection, to resume from on reconnect.
    pub fn last_event_id(&self) -> Option<&str> {
        self.decoder.last_event_id()
    }
}

/// Opens the stream. `last_event_id` is sent as `Last-Event-ID` so the
/// server can replay what was missed while disconnected.
pub async fn connect(client: &ApiClient, last_event_id: Option<&str>) -> RepoResult<PostStream> {
    let resp = client
        .open_event_stream(STREAM_PATH, last_event_id)
        .await?;

    Ok(PostStream {
        body: Box::pin(resp.bytes_stream()),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
    })
}
