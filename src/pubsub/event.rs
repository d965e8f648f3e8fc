use std::sync::Arc;

use bytes::Bytes;

/// Вид подписки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// Точное имя канала (`SUBSCRIBE`)
    Channel,
    /// Glob-шаблон (`PSUBSCRIBE`)
    Pattern,
    /// Шардированный канал (`SSUBSCRIBE`)
    Shard,
}

/// Событие из pub/sub сессии узла.
///
/// Мультиплексор не интерпретирует события, а только доставляет их
/// потребителю.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Подтверждение подписки и число активных подписок сессии.
    Subscribed {
        kind: SubscriptionKind,
        channel: Arc<str>,
        active: usize,
    },
    /// Подтверждение отписки и число оставшихся подписок сессии.
    Unsubscribed {
        kind: SubscriptionKind,
        channel: Arc<str>,
        active: usize,
    },
    Message {
        channel: Arc<str>,
        payload: Bytes,
    },
    PatternMessage {
        pattern: Arc<str>,
        channel: Arc<str>,
        payload: Bytes,
    },
    ShardMessage {
        channel: Arc<str>,
        payload: Bytes,
    },
}

impl Event {
    /// Канал, к которому относится событие.
    pub fn channel(&self) -> &str {
        match self {
            Self::Subscribed { channel, .. }
            | Self::Unsubscribed { channel, .. }
            | Self::Message { channel, .. }
            | Self::PatternMessage { channel, .. }
            | Self::ShardMessage { channel, .. } => channel,
        }
    }

    /// Полезная нагрузка, если это сообщение.
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Self::Message { payload, .. }
            | Self::PatternMessage { payload, .. }
            | Self::ShardMessage { payload, .. } => Some(payload),
            Self::Subscribed { .. } | Self::Unsubscribed { .. } => None,
        }
    }

    pub fn is_message(&self) -> bool {
        self.payload().is_some()
    }
}

/// Ответ сессии на отправленную команду.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Pong,
    Nil,
    Integer(i64),
    Bulk(Bytes),
    Array(Vec<Reply>),
}
