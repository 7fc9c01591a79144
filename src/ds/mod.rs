#[cfg(feature = "concurrency")]
pub mod node_arena;
pub mod rank_list;
pub mod shard;
#[cfg(feature = "concurrency")]
pub mod sharded_index;
pub mod slot_arena;

#[cfg(feature = "concurrency")]
pub use node_arena::{NodeArena, NodeRef};
pub use rank_list::{BOTTOM, BOTTOM_WEIGHT, DETACHED, NodeState, RankList, RankNode, TOP};
pub use shard::ShardSelector;
#[cfg(feature = "concurrency")]
pub use sharded_index::ShardedIndex;
pub use slot_arena::{SlotArena, SlotId};
