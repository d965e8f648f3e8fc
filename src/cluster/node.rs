use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use zumic_error::ZumicResult;

use crate::{
    command::Command,
    pubsub::{Event, Reply},
};

/// Стабильный идентификатор узла вида `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn new(
        host: &str,
        port: u16,
    ) -> Self {
        Self(Arc::from(format!("{host}:{port}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

/// Pub/sub сессия с одним узлом кластера.
///
/// Реализация отвечает за протокольный ввод-вывод. `next_event` ждёт одно
/// событие: `None` или `Some(Duration::ZERO)` означают ожидание без
/// ограничения по времени, `Ok(None)` означает, что событие не пришло.
#[async_trait]
pub trait NodeSession: Send + Sync {
    async fn send(
        &self,
        command: &Command,
    ) -> ZumicResult<Reply>;

    async fn next_event(
        &self,
        timeout: Option<Duration>,
    ) -> ZumicResult<Option<Event>>;

    /// Закрывает сессию. Повторный вызов ничего не делает.
    async fn close(&self) -> ZumicResult<()>;
}

/// Узел кластера, умеющий открыть pub/sub сессию.
#[async_trait]
pub trait ClusterNode: Send + Sync {
    fn id(&self) -> NodeId;

    async fn pubsub(&self) -> ZumicResult<Arc<dyn NodeSession>>;
}
