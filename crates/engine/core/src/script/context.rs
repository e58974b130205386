use crate::engine::EngineState;
use crate::fixed::Fixed;
use crate::object::{ObjectEntity, ObjectPool, SlotId, TypeRegistry};
use crate::scene::Stage;
use crate::services::{InputSnapshot, Services};

use super::error::RuntimeErrorKind;

/// Which entry point of an object type is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ScriptPhase {
    Startup,
    Main,
    Interaction,
    Draw,
}

/// Side effects a script asks the engine to apply after the current pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptRequests {
    /// Last `SetEngineState` of the pass wins.
    pub state: Option<EngineState>,
    /// Last `LoadStage` of the pass wins.
    pub stage: Option<usize>,
    pub dropped_spawns: u32,
}

impl ScriptRequests {
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.stage.is_none() && self.dropped_spawns == 0
    }
}

/// Everything one script invocation may touch.
pub struct ExecContext<'a> {
    pub pool: &'a mut ObjectPool,
    pub registry: &'a TypeRegistry,
    pub stage: Option<&'a mut Stage>,
    pub stage_count: usize,
    pub services: &'a mut Services,
    pub input: &'a InputSnapshot,
    pub requests: &'a mut ScriptRequests,
    /// Entity the invocation runs for; `None` for type startup.
    pub this: Option<SlotId>,
    pub player: Option<SlotId>,
    pub phase: ScriptPhase,
    /// Camera origin, subtracted from world positions when drawing.
    pub camera: (Fixed, Fixed),
}

impl ExecContext<'_> {
    pub(crate) fn this_slot(&self) -> Result<SlotId, RuntimeErrorKind> {
        self.this.ok_or(RuntimeErrorKind::NoEntityContext)
    }

    pub(crate) fn this_entity(&self) -> Result<&ObjectEntity, RuntimeErrorKind> {
        let slot = self.this_slot()?;
        self.pool.get(slot).ok_or(RuntimeErrorKind::NoEntityContext)
    }

    pub(crate) fn this_entity_mut(&mut self) -> Result<&mut ObjectEntity, RuntimeErrorKind> {
        let slot = self.this_slot()?;
        self.pool
            .get_mut(slot)
            .ok_or(RuntimeErrorKind::NoEntityContext)
    }

    pub(crate) fn entity(&self, raw: i32) -> Result<&ObjectEntity, RuntimeErrorKind> {
        SlotId::from_script(raw)
            .and_then(|slot| self.pool.get(slot))
            .ok_or(RuntimeErrorKind::InvalidSlot { slot: raw })
    }

    pub(crate) fn entity_mut(&mut self, raw: i32) -> Result<&mut ObjectEntity, RuntimeErrorKind> {
        SlotId::from_script(raw)
            .and_then(|slot| self.pool.get_mut(slot))
            .ok_or(RuntimeErrorKind::InvalidSlot { slot: raw })
    }

    pub(crate) fn stage(&self) -> Result<&Stage, RuntimeErrorKind> {
        self.stage.as_deref().ok_or(RuntimeErrorKind::NoStage)
    }

    pub(crate) fn stage_mut(&mut self) -> Result<&mut Stage, RuntimeErrorKind> {
        self.stage.as_deref_mut().ok_or(RuntimeErrorKind::NoStage)
    }
}
