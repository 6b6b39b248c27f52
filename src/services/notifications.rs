/*
 * Responsibility
 * - push メッセージ ({operation, count}) の検証と文言生成
 * - 通知キュー: 挿入順, 上限付き, 古いものから捨てる
 * - 通知 ID は作成時刻 (epoch ms) から作り、単調増加を保証する
 */
use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::repos::dto::posts::StreamPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOperation {
    Added,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMessage {
    pub operation: StreamOperation,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessageError {
    Malformed(String),
    UnknownOperation(String),
}

impl fmt::Display for StreamMessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamMessageError::Malformed(e) => write!(f, "malformed stream message: {}", e),
            StreamMessageError::UnknownOperation(op) => {
                write!(f, "unknown stream operation: {}", op)
            }
        }
    }
}

impl std::error::Error for StreamMessageError {}

impl StreamMessage {
    pub fn parse(data: &str) -> Result<Self, StreamMessageError> {
        let payload: StreamPayload = serde_json::from_str(data)
            .map_err(|e| StreamMessageError::Malformed(e.to_string()))?;

        let operation = match payload.operation.as_str() {
            "added" => StreamOperation::Added,
            "updated" => StreamOperation::Updated,
            other => return Err(StreamMessageError::UnknownOperation(other.to_string())),
        };

        Ok(Self {
            operation,
            count: payload.count,
        })
    }

    pub fn message(&self) -> String {
        let plural = self.count > 1;
        match self.operation {
            StreamOperation::Added => {
                format!("{} new post{}.", self.count, if plural { "s" } else { "" })
            }
            StreamOperation::Updated => {
                format!("{} post{} updated.", self.count, if plural { "s" } else { "" })
            }
        }
    }
}

pub type NotificationId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    capacity: usize,
    last_id: NotificationId,
}

impl NotificationQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            last_id: 0,
        }
    }

    pub fn push(&mut self, message: impl Into<String>) -> NotificationId {
        self.push_at(message, Utc::now())
    }

    pub fn push_at(
        &mut self,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> NotificationId {
        // 同一ミリ秒に複数届いても ID が衝突しないようにする
        let id = created_at.timestamp_millis().max(self.last_id + 1);
        self.last_id = id;

        if self.items.len() == self.capacity
            && let Some(evicted) = self.items.pop_front()
        {
            tracing::debug!(id = evicted.id, "notification evicted");
        }

        self.items.push_back(Notification {
            id,
            message: message.into(),
            created_at,
        });
        id
    }

    /// Remove one notification. Returns whether it existed.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        match self.items.iter().position(|n| n.id == id) {
            Some(idx) => {
                self.items.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }
}
