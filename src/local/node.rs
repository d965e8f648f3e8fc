use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use zumic_error::ZumicResult;

use super::LocalSession;
use crate::{
    cluster::{ClusterNode, NodeId, NodeSession},
    pubsub::Broker,
};

/// Ёмкость буфера канала брокера по умолчанию.
pub const DEFAULT_BROKER_CAPACITY: usize = 128;

/// Узел кластера, живущий в текущем процессе.
///
/// Все сессии узла работают через один общий [`Broker`].
pub struct LocalNode {
    id: NodeId,
    broker: Arc<Broker>,
}

impl LocalNode {
    pub fn new(
        host: &str,
        port: u16,
    ) -> Self {
        Self::with_capacity(host, port, DEFAULT_BROKER_CAPACITY)
    }

    pub fn with_capacity(
        host: &str,
        port: u16,
        capacity: usize,
    ) -> Self {
        Self {
            id: NodeId::new(host, port),
            broker: Arc::new(Broker::new(capacity)),
        }
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// Публикация напрямую в брокер узла, минуя сессии.
    pub fn publish(
        &self,
        channel: &str,
        payload: impl Into<Bytes>,
    ) -> usize {
        self.broker.publish(channel, payload.into())
    }
}

#[async_trait]
impl ClusterNode for LocalNode {
    fn id(&self) -> NodeId {
        self.id.clone()
    }

    async fn pubsub(&self) -> ZumicResult<Arc<dyn NodeSession>> {
        debug!(node_id = %self.id, "Opening local pub/sub session");
        Ok(Arc::new(LocalSession::new(self.id.clone(), self.broker.clone())))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{command::Command, pubsub::Event};

    /// Тест проверяет, что сессии одного узла делят брокер.
    #[tokio::test]
    async fn test_sessions_share_broker() {
        let node = LocalNode::new("127.0.0.1", 7000);
        assert_eq!(node.id().as_str(), "127.0.0.1:7000");

        let subscriber = node.pubsub().await.unwrap();
        let publisher = node.pubsub().await.unwrap();

        subscriber
            .send(&Command::new(["SUBSCRIBE", "events"]))
            .await
            .unwrap();
        subscriber.next_event(Some(Duration::from_millis(200))).await.unwrap();

        publisher
            .send(&Command::new(["PUBLISH", "events", "payload"]))
            .await
            .unwrap();
        assert_eq!(node.publish("events", "direct"), 1);

        let first = subscriber.next_event(Some(Duration::from_millis(200))).await.unwrap();
        let second = subscriber.next_event(Some(Duration::from_millis(200))).await.unwrap();
        assert_eq!(first.and_then(|e| e.payload().cloned()), Some(Bytes::from("payload")));
        assert!(matches!(second, Some(Event::Message { .. })));
    }
}
