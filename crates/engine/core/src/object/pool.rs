//! Fixed-capacity entity arena with buffered spawn/destroy.
//!
//! Slots move through `Free → Reserved → Active → Free`. A spawn reserves the
//! lowest free slot immediately so the spawning script can write fields on
//! it, but the slot only joins the active list when [`ObjectPool::commit`]
//! runs after the update pass. Destroys are queued the same way, so the
//! active list a pass iterates over never changes under it.

use crate::error::{EngineError, ErrorSeverity};

use super::entity::{ObjectEntity, SlotId};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PoolError {
    /// Every slot is reserved or active.
    #[error("object pool exhausted ({capacity} slots)")]
    Exhausted { capacity: usize },

    /// The slot is free or out of range.
    #[error("slot {slot} is not live")]
    NotLive { slot: SlotId },
}

impl EngineError for PoolError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            PoolError::Exhausted { .. } => ErrorSeverity::Recoverable,
            PoolError::NotLive { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            PoolError::Exhausted { .. } => "POOL_EXHAUSTED",
            PoolError::NotLive { .. } => "POOL_SLOT_NOT_LIVE",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SlotStatus {
    #[default]
    Free,
    /// Spawned during the current pass, visible to scripts, not yet iterated.
    Reserved,
    Active,
}

/// Spawns and destroys requested since the last commit, in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingMutations {
    pub spawns: Vec<SlotId>,
    pub destroys: Vec<SlotId>,
}

impl PendingMutations {
    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.destroys.is_empty()
    }
}

/// Outcome of one commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub spawned: Vec<SlotId>,
    pub destroyed: Vec<SlotId>,
}

#[derive(Clone, Debug)]
pub struct ObjectPool {
    entities: Vec<ObjectEntity>,
    status: Vec<SlotStatus>,
    active: Vec<SlotId>,
    pending: PendingMutations,
}

impl ObjectPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            entities: vec![ObjectEntity::default(); capacity],
            status: vec![SlotStatus::Free; capacity],
            active: Vec::with_capacity(capacity),
            pending: PendingMutations::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entities.len()
    }

    /// Active slots, ordered by (draw layer, slot).
    pub fn active(&self) -> &[SlotId] {
        &self.active
    }

    pub fn pending(&self) -> &PendingMutations {
        &self.pending
    }

    pub fn status(&self, slot: SlotId) -> SlotStatus {
        self.status
            .get(slot.index())
            .copied()
            .unwrap_or(SlotStatus::Free)
    }

    /// Reserved or active.
    pub fn is_live(&self, slot: SlotId) -> bool {
        self.status(slot) != SlotStatus::Free
    }

    pub fn get(&self, slot: SlotId) -> Option<&ObjectEntity> {
        if self.is_live(slot) {
            self.entities.get(slot.index())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut ObjectEntity> {
        if self.is_live(slot) {
            self.entities.get_mut(slot.index())
        } else {
            None
        }
    }

    /// Active entities in update order.
    pub fn iter_active(&self) -> impl Iterator<Item = (SlotId, &ObjectEntity)> + '_ {
        self.active
            .iter()
            .map(move |slot| (*slot, &self.entities[slot.index()]))
    }

    fn lowest_free(&self) -> Option<usize> {
        self.status.iter().position(|status| *status == SlotStatus::Free)
    }

    /// Reserves the lowest free slot for `entity`; it joins the active list at commit.
    pub fn reserve(&mut self, entity: ObjectEntity) -> Result<SlotId, PoolError> {
        let index = self.lowest_free().ok_or(PoolError::Exhausted {
            capacity: self.capacity(),
        })?;
        let slot = SlotId(index as u16);
        self.entities[index] = entity;
        self.status[index] = SlotStatus::Reserved;
        self.pending.spawns.push(slot);
        Ok(slot)
    }

    /// Queues `slot` for destruction at the next commit. Repeated requests are ignored.
    pub fn request_destroy(&mut self, slot: SlotId) -> Result<(), PoolError> {
        if !self.is_live(slot) {
            return Err(PoolError::NotLive { slot });
        }
        if !self.pending.destroys.contains(&slot) {
            self.pending.destroys.push(slot);
        }
        Ok(())
    }

    /// Applies queued spawns (in request order), then queued destroys.
    pub fn commit(&mut self) -> CommitReport {
        let pending = core::mem::take(&mut self.pending);
        let mut report = CommitReport::default();

        for slot in pending.spawns {
            if self.status(slot) == SlotStatus::Reserved {
                self.status[slot.index()] = SlotStatus::Active;
                self.active.push(slot);
                report.spawned.push(slot);
            }
        }
        for slot in pending.destroys {
            if self.is_live(slot) {
                self.release(slot);
                report.destroyed.push(slot);
            }
        }
        self.active.retain(|slot| self.status[slot.index()] == SlotStatus::Active);
        self.resort();

        if !report.spawned.is_empty() || !report.destroyed.is_empty() {
            tracing::trace!(
                spawned = report.spawned.len(),
                destroyed = report.destroyed.len(),
                active = self.active.len(),
                "pool commit"
            );
        }
        report
    }

    /// Spawns directly into the active list, bypassing the pending queue.
    ///
    /// Only valid between passes, e.g. while expanding stage spawn points.
    pub fn spawn_immediate(&mut self, entity: ObjectEntity) -> Result<SlotId, PoolError> {
        let index = self.lowest_free().ok_or(PoolError::Exhausted {
            capacity: self.capacity(),
        })?;
        let slot = SlotId(index as u16);
        self.entities[index] = entity;
        self.status[index] = SlotStatus::Active;
        self.active.push(slot);
        self.resort();
        Ok(slot)
    }

    /// Frees every slot and drops pending requests.
    pub fn flush(&mut self) {
        self.entities.fill(ObjectEntity::default());
        self.status.fill(SlotStatus::Free);
        self.active.clear();
        self.pending = PendingMutations::default();
    }

    /// Re-establishes (draw layer, slot) order after layer changes.
    pub fn resort(&mut self) {
        let entities = &self.entities;
        self.active
            .sort_by_key(|slot| (entities[slot.index()].draw_layer, *slot));
    }

    fn release(&mut self, slot: SlotId) {
        self.entities[slot.index()] = ObjectEntity::default();
        self.status[slot.index()] = SlotStatus::Free;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;
    use crate::object::ObjectTypeId;

    fn blank(type_id: u16) -> ObjectEntity {
        ObjectEntity::new(ObjectTypeId(type_id), Fixed::ZERO, Fixed::ZERO)
    }

    #[test]
    fn reserve_takes_lowest_free_slot() {
        let mut pool = ObjectPool::new(4);
        assert_eq!(pool.reserve(blank(1)), Ok(SlotId(0)));
        assert_eq!(pool.reserve(blank(1)), Ok(SlotId(1)));
        assert!(pool.active().is_empty());
        pool.commit();
        assert_eq!(pool.active(), &[SlotId(0), SlotId(1)]);

        pool.request_destroy(SlotId(0)).unwrap();
        pool.commit();
        assert_eq!(pool.reserve(blank(2)), Ok(SlotId(0)));
    }

    #[test]
    fn destroyed_slot_is_not_reused_before_commit() {
        let mut pool = ObjectPool::new(1);
        pool.spawn_immediate(blank(1)).unwrap();
        pool.request_destroy(SlotId(0)).unwrap();
        assert_eq!(pool.reserve(blank(1)), Err(PoolError::Exhausted { capacity: 1 }));
    }

    #[test]
    fn spawn_and_destroy_in_one_pass_leaves_slot_free() {
        let mut pool = ObjectPool::new(2);
        let slot = pool.reserve(blank(1)).unwrap();
        pool.request_destroy(slot).unwrap();
        let report = pool.commit();
        assert_eq!(report.spawned, vec![slot]);
        assert_eq!(report.destroyed, vec![slot]);
        assert!(pool.active().is_empty());
        assert_eq!(pool.status(slot), SlotStatus::Free);
    }

    #[test]
    fn duplicate_destroys_are_ignored() {
        let mut pool = ObjectPool::new(2);
        let slot = pool.spawn_immediate(blank(1)).unwrap();
        pool.request_destroy(slot).unwrap();
        pool.request_destroy(slot).unwrap();
        assert_eq!(pool.commit().destroyed, vec![slot]);
        assert_eq!(
            pool.request_destroy(slot),
            Err(PoolError::NotLive { slot })
        );
    }

    #[test]
    fn active_list_orders_by_layer_then_slot() {
        let mut pool = ObjectPool::new(4);
        for layer in [2u8, 0, 2, 1] {
            let mut entity = blank(1);
            entity.draw_layer = layer;
            pool.spawn_immediate(entity).unwrap();
        }
        assert_eq!(
            pool.active(),
            &[SlotId(1), SlotId(3), SlotId(0), SlotId(2)]
        );
    }

    #[test]
    fn flush_frees_everything() {
        let mut pool = ObjectPool::new(3);
        pool.spawn_immediate(blank(1)).unwrap();
        pool.reserve(blank(1)).unwrap();
        pool.flush();
        assert!(pool.active().is_empty());
        assert!(pool.pending().is_empty());
        assert_eq!(pool.reserve(blank(1)), Ok(SlotId(0)));
    }
}
