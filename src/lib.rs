/// Cluster topology: node ids, node sessions, slot hashing and routing.
pub mod cluster;
/// Raw command arguments, canonical commands and the command builder.
pub mod command;
/// Settings loading (defaults, optional file, `ZUMIC_PUBSUB_*` environment).
pub mod config;
/// In-process cluster node backed by a pub/sub broker.
pub mod local;
/// Flexible logging (formatting, filters, sinks).
pub mod logging;
/// Pub/Sub: events, broker and the cluster event multiplexer.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Cluster building blocks.
pub use cluster::{
    key_slot, ClusterNode, NodeId, NodeSession, Router, SlotId, SlotRouter, SLOT_COUNT,
};
/// Commands.
pub use command::{Command, CommandArg, CommandBuilder, CommandKind, DefaultCommandBuilder};
/// config
pub use config::PubSubSettings;
/// Local node.
pub use local::{LocalNode, LocalSession};
/// Logging setup.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Pub/Sub API.
pub use pubsub::{Broker, ClusterPubSub, Event, Reply, SubscriptionKind};
/// Error types shared with the rest of the workspace.
pub use zumic_error::{StackError, StatusCode, ZumicResult};
