//! Кластерный pub/sub.
//!
//! - `event`: события сессий и ответы на команды.
//! - `broker`: внутрипроцессный брокер, на котором построен локальный узел.
//! - `multiplexer`: [`ClusterPubSub`], единый поток событий со всех узлов.

pub mod broker;
pub mod event;
pub mod multiplexer;

use std::time::Duration;

pub use broker::Broker;
pub use event::{Event, Reply, SubscriptionKind};
pub use multiplexer::ClusterPubSub;

/// Приводит таймаут ожидания к ограничению по времени.
///
/// `None` и `Some(Duration::ZERO)` означают ожидание без ограничения.
pub fn wait_bound(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|t| !t.is_zero())
}
