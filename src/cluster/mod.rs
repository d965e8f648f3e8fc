pub mod node;
pub mod router;
pub mod slot;

pub use node::{ClusterNode, NodeId, NodeSession};
pub use router::{Router, SlotRouter};
pub use slot::{hash_tag, key_slot, SlotId, SLOT_COUNT};
