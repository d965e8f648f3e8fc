use std::{ops::Range, sync::Arc};

use tracing::trace;
use zumic_error::{bail, ensure, ClusterError, ZumicResult};

use super::{key_slot, ClusterNode, SlotId, SLOT_COUNT};
use crate::command::Command;

/// Выбирает узел, которому принадлежит команда.
///
/// Для одной и той же команды и неизменной топологии результат
/// детерминирован.
pub trait Router: Send + Sync {
    fn assign_node(
        &self,
        command: &Command,
    ) -> ZumicResult<Arc<dyn ClusterNode>>;
}

/// Маршрутизатор по таблице hash-слотов.
///
/// Каждый из 16384 слотов указывает на индекс узла в `nodes` (или ни на
/// какой). Каналы команды маршрутизируются по слоту первого канала.
pub struct SlotRouter {
    nodes: Vec<Arc<dyn ClusterNode>>,
    slots: Vec<Option<usize>>,
}

impl SlotRouter {
    /// Пустой маршрутизатор: ни одного узла, ни одного назначенного слота.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            slots: vec![None; SLOT_COUNT as usize],
        }
    }

    /// Распределяет слоты между узлами равными непрерывными диапазонами.
    pub fn with_nodes(nodes: Vec<Arc<dyn ClusterNode>>) -> Self {
        let mut slots = vec![None; SLOT_COUNT as usize];
        let n = nodes.len();
        if n > 0 {
            for (slot, owner) in slots.iter_mut().enumerate() {
                *owner = Some(slot * n / SLOT_COUNT as usize);
            }
        }
        Self { nodes, slots }
    }

    /// Добавляет узел, возвращает его индекс. Слоты не назначаются.
    pub fn add_node(
        &mut self,
        node: Arc<dyn ClusterNode>,
    ) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Переназначает диапазон слотов на узел с индексом `node_index`.
    pub fn assign_range(
        &mut self,
        range: Range<SlotId>,
        node_index: usize,
    ) -> ZumicResult<()> {
        ensure!(
            node_index < self.nodes.len(),
            ClusterError::InvalidShard {
                shard_id: node_index
            }
        );
        ensure!(
            range.end <= SLOT_COUNT,
            ClusterError::InvalidSlot { slot: range.end }
        );
        for slot in range {
            self.slots[slot as usize] = Some(node_index);
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[Arc<dyn ClusterNode>] {
        &self.nodes
    }

    /// Узел, обслуживающий слот.
    pub fn node_for_slot(
        &self,
        slot: SlotId,
    ) -> ZumicResult<Arc<dyn ClusterNode>> {
        let owner = self.slots.get(slot as usize).copied().flatten();
        match owner.and_then(|idx| self.nodes.get(idx)) {
            Some(node) => Ok(node.clone()),
            None => bail!(ClusterError::InvalidSlot { slot }),
        }
    }

    fn command_slot(
        &self,
        command: &Command,
    ) -> ZumicResult<Option<SlotId>> {
        let channels = command.channels();
        let Some(first) = channels.first() else {
            return Ok(None);
        };
        let slot = key_slot(first);

        if command.kind().is_sharded() && channels.iter().any(|c| key_slot(c) != slot) {
            bail!(ClusterError::CrossSlot {
                channels: channels
                    .iter()
                    .map(|c| String::from_utf8_lossy(c).into_owned())
                    .collect(),
            });
        }

        Ok(Some(slot))
    }
}

impl Default for SlotRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for SlotRouter {
    fn assign_node(
        &self,
        command: &Command,
    ) -> ZumicResult<Arc<dyn ClusterNode>> {
        if self.nodes.is_empty() {
            bail!(ClusterError::ClusterDown {
                reason: "no nodes to route to".to_string(),
            });
        }

        match self.command_slot(command)? {
            Some(slot) => {
                let node = self.node_for_slot(slot)?;
                trace!(command = %command.name(), slot, node_id = %node.id(), "Command routed");
                Ok(node)
            }
            None => Ok(self.nodes[0].clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use zumic_error::StatusCode;

    use super::*;
    use crate::cluster::{NodeId, NodeSession};

    struct StubNode(NodeId);

    #[async_trait]
    impl ClusterNode for StubNode {
        fn id(&self) -> NodeId {
            self.0.clone()
        }

        async fn pubsub(&self) -> ZumicResult<Arc<dyn NodeSession>> {
            bail!(zumic_error::StatusCode::Unsupported, "stub node")
        }
    }

    fn stub(port: u16) -> Arc<dyn ClusterNode> {
        Arc::new(StubNode(NodeId::new("127.0.0.1", port)))
    }

    fn three_nodes() -> SlotRouter {
        SlotRouter::with_nodes(vec![stub(7000), stub(7001), stub(7002)])
    }

    /// Тест проверяет равномерное непрерывное распределение слотов.
    #[test]
    fn test_even_ranges() {
        let router = three_nodes();
        assert_eq!(router.node_for_slot(0).unwrap().id().as_str(), "127.0.0.1:7000");
        assert_eq!(router.node_for_slot(5461).unwrap().id().as_str(), "127.0.0.1:7000");
        assert_eq!(router.node_for_slot(5462).unwrap().id().as_str(), "127.0.0.1:7001");
        assert_eq!(router.node_for_slot(16383).unwrap().id().as_str(), "127.0.0.1:7002");
    }

    #[test]
    fn test_route_by_first_channel() {
        let router = three_nodes();
        // "foo" -> 12182, третий диапазон
        let cmd = Command::new(["SUBSCRIBE", "foo", "bar"]);
        assert_eq!(router.assign_node(&cmd).unwrap().id().as_str(), "127.0.0.1:7002");

        let publish = Command::new(["PUBLISH", "bar", "hello"]);
        // "bar" -> 5061, первый диапазон
        assert_eq!(router.assign_node(&publish).unwrap().id().as_str(), "127.0.0.1:7000");
    }

    #[test]
    fn test_sharded_cross_slot() {
        let router = three_nodes();
        let cmd = Command::new(["SSUBSCRIBE", "foo", "bar"]);
        let err = router.assign_node(&cmd).err().unwrap();
        assert_eq!(err.status_code(), StatusCode::CrossSlot);

        let tagged = Command::new(["SSUBSCRIBE", "{feed}:a", "{feed}:b"]);
        assert!(router.assign_node(&tagged).is_ok());
    }

    #[test]
    fn test_no_channels_goes_to_first_node() {
        let router = three_nodes();
        let ping = Command::new(["PING"]);
        assert_eq!(router.assign_node(&ping).unwrap().id().as_str(), "127.0.0.1:7000");
    }

    #[test]
    fn test_empty_router_is_down() {
        let router = SlotRouter::new();
        let err = router
            .assign_node(&Command::new(["SUBSCRIBE", "x"]))
            .err()
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::ClusterDown);
    }

    /// Тест проверяет ошибку для слота, не назначенного ни одному узлу.
    #[test]
    fn test_unassigned_slot() {
        let mut router = SlotRouter::new();
        let idx = router.add_node(stub(7000));
        router.assign_range(0..100, idx).unwrap();

        let err = router
            .assign_node(&Command::new(["SUBSCRIBE", "foo"]))
            .err()
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::InvalidSlot);
        assert!(router.node_for_slot(99).is_ok());
    }

    #[test]
    fn test_assign_range_validation() {
        let mut router = three_nodes();
        assert_eq!(
            router.assign_range(0..10, 5).unwrap_err().status_code(),
            StatusCode::InvalidShard
        );
        router.assign_range(12000..12200, 0).unwrap();
        let cmd = Command::new(["PUBLISH", "foo", "x"]);
        assert_eq!(router.assign_node(&cmd).unwrap().id().as_str(), "127.0.0.1:7000");
    }
}
