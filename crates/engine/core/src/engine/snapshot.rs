//! Engine snapshots and the replay digest.

use sha2::{Digest, Sha256};

use crate::object::{ObjectEntity, SlotId};
use crate::rng::PcgRng;

use super::state::EngineState;

/// Serializable copy of everything the digest covers.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineSnapshot {
    pub frame: u64,
    pub frames_since_load: u64,
    pub state: EngineState,
    pub stage: Option<usize>,
    pub globals: Vec<i32>,
    pub scene_vars: Vec<i32>,
    pub rng: PcgRng,
    /// Active entities in update order.
    pub entities: Vec<(SlotId, ObjectEntity)>,
}

impl EngineSnapshot {
    /// SHA-256 over the snapshot in a fixed little-endian layout.
    ///
    /// Two engines fed the same program, stages and input produce the same
    /// digest on every tick.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.frame.to_le_bytes());
        hasher.update(self.frames_since_load.to_le_bytes());
        hasher.update(self.state.code().unwrap_or(-1).to_le_bytes());
        hasher.update(self.stage.map_or(u64::MAX, |s| s as u64).to_le_bytes());
        hasher.update(self.rng.state().to_le_bytes());
        for value in self.globals.iter().chain(&self.scene_vars) {
            hasher.update(value.to_le_bytes());
        }
        hasher.update((self.entities.len() as u64).to_le_bytes());
        for (slot, entity) in &self.entities {
            hash_entity(&mut hasher, *slot, entity);
        }
        hasher.finalize().into()
    }
}

fn hash_entity(hasher: &mut Sha256, slot: SlotId, entity: &ObjectEntity) {
    hasher.update(slot.0.to_le_bytes());
    hasher.update(entity.type_id.0.to_le_bytes());
    for value in [
        entity.x.raw(),
        entity.y.raw(),
        entity.xvel.raw(),
        entity.yvel.raw(),
        entity.state,
        entity.substate,
        entity.subtype,
    ] {
        hasher.update(value.to_le_bytes());
    }
    for value in entity.scratch {
        hasher.update(value.to_le_bytes());
    }
    hasher.update(entity.animation.to_le_bytes());
    hasher.update(entity.frame.to_le_bytes());
    hasher.update([
        entity.direction,
        entity.draw_layer,
        entity.group,
        entity.angle,
        entity.boxes.len() as u8,
    ]);
    for hitbox in &entity.boxes {
        for edge in [hitbox.left, hitbox.top, hitbox.right, hitbox.bottom] {
            hasher.update(edge.to_le_bytes());
        }
        hasher.update([hitbox.kind as u8]);
    }
    hasher.update(entity.flags.bits().to_le_bytes());
}
