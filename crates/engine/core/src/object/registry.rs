//! Object type capability table.

use crate::collision::CollisionBoxSet;
use crate::config::EngineConfig;
use crate::fixed::Fixed;
use crate::script::FunctionId;

use super::entity::{EntityFlags, ObjectEntity, ObjectTypeId};

/// Script entry points of an object type. Missing entries are skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ScriptFunctionSet {
    pub startup: Option<FunctionId>,
    pub main: Option<FunctionId>,
    pub player_interaction: Option<FunctionId>,
    pub draw: Option<FunctionId>,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        /// Instances are players for the interaction pass.
        const PLAYER = 1 << 0;
        /// Instances keep updating while the engine is paused.
        const PAUSE_EXEMPT = 1 << 1;
        /// Instances are resolved against the collision layer.
        const TILE_COLLISION = 1 << 2;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectType {
    pub name: String,
    pub functions: ScriptFunctionSet,
    pub hitboxes: CollisionBoxSet,
    pub flags: TypeFlags,
}

/// Types installed by the current stage. Index 0 is always the blank object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRegistry {
    types: Vec<ObjectType>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            types: vec![ObjectType {
                name: "blank".to_owned(),
                ..ObjectType::default()
            }],
        }
    }

    /// Registers a type, `None` when the registry is full.
    pub fn register(&mut self, object_type: ObjectType) -> Option<ObjectTypeId> {
        if self.types.len() >= EngineConfig::MAX_OBJECT_TYPES {
            return None;
        }
        self.types.push(object_type);
        Some(ObjectTypeId((self.types.len() - 1) as u16))
    }

    pub fn get(&self, id: ObjectTypeId) -> Option<&ObjectType> {
        self.types.get(id.0 as usize)
    }

    pub fn contains(&self, id: ObjectTypeId) -> bool {
        (id.0 as usize) < self.types.len()
    }

    pub fn by_name(&self, name: &str) -> Option<ObjectTypeId> {
        self.types
            .iter()
            .position(|object_type| object_type.name == name)
            .map(|index| ObjectTypeId(index as u16))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectTypeId, &ObjectType)> {
        self.types
            .iter()
            .enumerate()
            .map(|(index, object_type)| (ObjectTypeId(index as u16), object_type))
    }

    /// Fresh entity of type `id` with its default boxes and flags.
    pub fn instantiate(&self, id: ObjectTypeId, x: Fixed, y: Fixed) -> Option<ObjectEntity> {
        let object_type = self.get(id)?;
        let mut entity = ObjectEntity::new(id, x, y);
        entity.boxes = object_type.hitboxes.clone();
        entity.flags.set(
            EntityFlags::PLAYER,
            object_type.flags.contains(TypeFlags::PLAYER),
        );
        entity.flags.set(
            EntityFlags::PAUSE_EXEMPT,
            object_type.flags.contains(TypeFlags::PAUSE_EXEMPT),
        );
        entity.flags.set(
            EntityFlags::TILE_COLLISION,
            object_type.flags.contains(TypeFlags::TILE_COLLISION),
        );
        Some(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Hitbox;

    #[test]
    fn blank_type_is_preinstalled() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.by_name("blank"), Some(ObjectTypeId::BLANK));
    }

    #[test]
    fn instantiate_copies_defaults() {
        let mut registry = TypeRegistry::new();
        let mut hitboxes = CollisionBoxSet::new();
        hitboxes.push(Hitbox::solid(-8, -16, 8, 16));
        let id = registry
            .register(ObjectType {
                name: "player".into(),
                hitboxes,
                flags: TypeFlags::PLAYER | TypeFlags::TILE_COLLISION,
                ..ObjectType::default()
            })
            .unwrap();

        let entity = registry.instantiate(id, Fixed::from_int(4), Fixed::ZERO).unwrap();
        assert_eq!(entity.type_id, id);
        assert_eq!(entity.boxes.len(), 1);
        assert!(entity.flags.contains(EntityFlags::PLAYER | EntityFlags::TILE_COLLISION));
        assert!(!entity.is_pause_exempt());
        assert!(registry.instantiate(ObjectTypeId(9), Fixed::ZERO, Fixed::ZERO).is_none());
    }
}
