use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Ошибки маршрутизации команды на узел кластера.
#[derive(Debug, Clone)]
pub enum ClusterError {
    /// Кластер недоступен (нет узлов для маршрутизации)
    ClusterDown { reason: String },
    /// Каналы шардированной команды попадают в разные слоты
    CrossSlot { channels: Vec<String> },
    /// Невалидный индекс узла в таблице слотов
    InvalidShard { shard_id: usize },
    /// Слот вне диапазона или не назначен ни одному узлу
    InvalidSlot { slot: u16 },
}

impl std::fmt::Display for ClusterError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::ClusterDown { reason } => write!(f, "Cluster is down: {reason}"),
            Self::CrossSlot { channels } => {
                write!(f, "Channels hash to different slots: {}", channels.join(", "))
            }
            Self::InvalidShard { shard_id } => write!(f, "Invalid shard ID: {shard_id}"),
            Self::InvalidSlot { slot } => write!(f, "Slot {slot} is not served by any node"),
        }
    }
}

impl std::error::Error for ClusterError {}

impl ErrorExt for ClusterError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ClusterDown { .. } => StatusCode::ClusterDown,
            Self::CrossSlot { .. } => StatusCode::CrossSlot,
            Self::InvalidShard { .. } => StatusCode::InvalidShard,
            Self::InvalidSlot { .. } => StatusCode::InvalidSlot,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::ClusterDown { .. } => "Cluster temporarily unavailable".to_string(),
            Self::CrossSlot { .. } => "CROSSSLOT Channels don't hash to the same slot".to_string(),
            Self::InvalidShard { .. } | Self::InvalidSlot { .. } => "Invalid slot".to_string(),
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "cluster".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::InvalidSlot { slot } => tags.push(("slot", slot.to_string())),
            Self::InvalidShard { shard_id } => tags.push(("shard_id", shard_id.to_string())),
            Self::CrossSlot { channels } => tags.push(("channels", channels.len().to_string())),
            Self::ClusterDown { .. } => {}
        }

        tags
    }
}
