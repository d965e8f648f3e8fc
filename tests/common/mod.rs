//! Общие помощники интеграционных тестов: локальный кластер и сбор событий.

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use zumic_cluster_pubsub::{
    key_slot, ClusterNode, ClusterPubSub, Event, LocalNode, SlotRouter, SLOT_COUNT,
};

pub struct LocalCluster {
    pub nodes: Vec<Arc<LocalNode>>,
    pub pubsub: Arc<ClusterPubSub>,
}

/// Кластер из `n` локальных узлов с равномерно распределёнными слотами.
pub fn local_cluster(n: u16) -> LocalCluster {
    local_cluster_with_capacity(n, 64)
}

/// То же, но с заданной ёмкостью каналов брокера на каждом узле.
pub fn local_cluster_with_capacity(
    n: u16,
    capacity: usize,
) -> LocalCluster {
    let nodes: Vec<Arc<LocalNode>> = (0..n)
        .map(|i| Arc::new(LocalNode::with_capacity("127.0.0.1", 7000 + i, capacity)))
        .collect();
    let router = SlotRouter::with_nodes(
        nodes
            .iter()
            .map(|n| n.clone() as Arc<dyn ClusterNode>)
            .collect(),
    );
    LocalCluster {
        nodes,
        pubsub: Arc::new(ClusterPubSub::new(Arc::new(router))),
    }
}

impl LocalCluster {
    /// Имя канала, слот которого принадлежит узлу с индексом `node`.
    pub fn channel_on(
        &self,
        node: usize,
        prefix: &str,
    ) -> String {
        let n = self.nodes.len();
        (0..)
            .map(|k| format!("{prefix}-{k}"))
            .find(|c| key_slot(c.as_bytes()) as usize * n / SLOT_COUNT as usize == node)
            .expect("channel for node")
    }
}

/// Собирает `count` событий, каждое ждёт не дольше `per_event`.
pub async fn collect(
    pubsub: &ClusterPubSub,
    count: usize,
    per_event: Duration,
) -> Vec<Event> {
    let mut events = Vec::with_capacity(count);
    while events.len() < count {
        match pubsub.next_event(Some(per_event)).await.unwrap() {
            Some(event) => events.push(event),
            None => break,
        }
    }
    events
}

/// Ждёт, пока в буфере мультиплексора накопится `expected` событий.
pub async fn wait_pending(
    pubsub: &ClusterPubSub,
    expected: usize,
) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while pubsub.pending_events() < expected {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("events were not buffered in time");
}
