//! Entities, the slot pool and the per-stage type registry.

mod entity;
mod manager;
mod pool;
mod registry;

pub use entity::{EntityFlags, ObjectEntity, ObjectTypeId, SlotId};
pub use manager::{ObjectManager, UpdateContext, UpdateReport};
pub use pool::{CommitReport, ObjectPool, PendingMutations, PoolError, SlotStatus};
pub use registry::{ObjectType, ScriptFunctionSet, TypeFlags, TypeRegistry};
