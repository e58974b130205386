//! Stage catalog and the current stage instance.

use crate::fixed::Fixed;
use crate::object::{ObjectPool, PoolError, SlotId, TypeRegistry};
use crate::services::{DebugEvent, DebugSink};

use super::error::SceneError;
use super::manifest::StageBlueprint;
use super::stage::Stage;

/// Result of expanding a stage's spawn points.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpawnSummary {
    pub spawned: Vec<SlotId>,
    pub dropped: usize,
}

#[derive(Clone, Debug, Default)]
pub struct SceneManager {
    catalog: Vec<StageBlueprint>,
    current: Option<Stage>,
    pending: Option<usize>,
}

impl SceneManager {
    pub fn new(catalog: Vec<StageBlueprint>) -> Self {
        Self {
            catalog,
            current: None,
            pending: None,
        }
    }

    pub fn stage_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn catalog(&self) -> &[StageBlueprint] {
        &self.catalog
    }

    pub fn blueprint(&self, index: usize) -> Result<&StageBlueprint, SceneError> {
        self.catalog.get(index).ok_or(SceneError::UnknownStage {
            index,
            count: self.catalog.len(),
        })
    }

    pub fn current(&self) -> Option<&Stage> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Stage> {
        self.current.as_mut()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current.as_ref().map(|stage| stage.index)
    }

    /// Schedules a stage change for the end of the current tick.
    pub fn request_transition(&mut self, index: usize) -> Result<(), SceneError> {
        self.blueprint(index)?;
        self.pending = Some(index);
        Ok(())
    }

    pub fn pending_transition(&self) -> Option<usize> {
        self.pending
    }

    pub fn take_transition(&mut self) -> Option<usize> {
        self.pending.take()
    }

    /// Replaces the current stage with a fresh instance of `index`.
    ///
    /// Returns the registry the object manager must install.
    pub fn activate(&mut self, index: usize) -> Result<TypeRegistry, SceneError> {
        let count = self.catalog.len();
        let blueprint = self
            .catalog
            .get(index)
            .ok_or(SceneError::UnknownStage { index, count })?;
        let registry = blueprint.registry.clone();
        self.current = Some(Stage::from_blueprint(index, blueprint));
        self.pending = None;
        tracing::debug!(stage = index, name = %blueprint.name, "stage activated");
        Ok(registry)
    }

    /// Drops the current stage and every entity.
    pub fn unload(&mut self, pool: &mut ObjectPool) {
        pool.flush();
        if let Some(stage) = self.current.take() {
            tracing::debug!(stage = stage.index, "stage unloaded");
        }
        self.pending = None;
    }

    /// Expands the current stage's spawn points directly into the pool.
    ///
    /// A full pool drops the remaining spawns; each drop is reported.
    pub fn expand_spawns(
        &self,
        registry: &TypeRegistry,
        pool: &mut ObjectPool,
        debug: &mut dyn DebugSink,
    ) -> SpawnSummary {
        let mut summary = SpawnSummary::default();
        let Some(stage) = self.current.as_ref() else {
            return summary;
        };

        for spawn in &stage.spawns {
            let Some(mut entity) =
                registry.instantiate(spawn.type_id, Fixed::from_int(spawn.x), Fixed::from_int(spawn.y))
            else {
                continue;
            };
            entity.subtype = spawn.subtype;
            match pool.spawn_immediate(entity) {
                Ok(slot) => summary.spawned.push(slot),
                Err(PoolError::Exhausted { capacity }) => {
                    summary.dropped += 1;
                    debug.report(&DebugEvent::PoolExhausted {
                        capacity,
                        type_id: spawn.type_id,
                    });
                }
                Err(err) => {
                    summary.dropped += 1;
                    tracing::error!(error = %err, "spawn point rejected");
                }
            }
        }
        summary
    }
}
