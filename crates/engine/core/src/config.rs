use crate::script::OpcodeRevision;

/// Engine configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Number of entity slots in the pool. Clamped to [`Self::MAX_POOL_CAPACITY`].
    pub pool_capacity: usize,
    /// Maximum nested `Call` frames per invocation.
    pub call_depth_limit: usize,
    /// Maximum operand stack entries per invocation.
    pub operand_stack_limit: usize,
    /// Maximum nested `ForEach` iterators per invocation.
    pub iterator_depth_limit: usize,
    /// Raw opcode numbering used to decode bytecode.
    pub opcode_revision: OpcodeRevision,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Ticks skipped between rendered frames (0 renders every tick).
    pub frame_skip: u32,
    /// Upper bound for the game speed multiplier.
    pub fast_forward_speed: u32,
    /// Ticks a single `advance` call may run before dropping the backlog.
    pub max_catch_up_ticks: u32,
    /// Ticks spent in the `Wait` state before returning to the main game.
    pub wait_ticks: u32,
    /// Seed for the script `Random` intrinsic, reapplied on every stage load.
    pub rng_seed: u64,
    /// Visible area in pixels; the camera centers the first player in it.
    pub screen_width: u32,
    pub screen_height: u32,
}

impl EngineConfig {
    // ===== compile-time constants used as type parameters =====
    pub const MAX_POOL_CAPACITY: usize = 0x4A0;
    pub const MAX_OBJECT_TYPES: usize = 0x100;
    pub const MAX_FUNCTIONS: usize = 0x200;
    pub const SCRATCH_VARS: usize = 8;
    pub const GLOBAL_VARS: usize = 0x100;
    pub const SCENE_VARS: usize = 0x40;
    pub const MAX_HITBOXES: usize = 4;
    pub const MAX_PLAYERS: usize = 4;
    pub const MAX_LAYERS: usize = 8;
    pub const TILE_SIZE: i32 = 16;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_CALL_DEPTH_LIMIT: usize = 32;
    pub const DEFAULT_OPERAND_STACK_LIMIT: usize = 0x100;
    pub const DEFAULT_ITERATOR_DEPTH_LIMIT: usize = 4;
    pub const DEFAULT_TICK_RATE: u32 = 60;
    pub const DEFAULT_FAST_FORWARD_SPEED: u32 = 8;
    pub const DEFAULT_MAX_CATCH_UP_TICKS: u32 = 8;
    pub const DEFAULT_WAIT_TICKS: u32 = 30;
    pub const DEFAULT_RNG_SEED: u64 = 0x5EED_0F_5A11;
    pub const DEFAULT_SCREEN_WIDTH: u32 = 424;
    pub const DEFAULT_SCREEN_HEIGHT: u32 = 240;

    pub fn new() -> Self {
        Self {
            pool_capacity: Self::MAX_POOL_CAPACITY,
            call_depth_limit: Self::DEFAULT_CALL_DEPTH_LIMIT,
            operand_stack_limit: Self::DEFAULT_OPERAND_STACK_LIMIT,
            iterator_depth_limit: Self::DEFAULT_ITERATOR_DEPTH_LIMIT,
            opcode_revision: OpcodeRevision::Current,
            tick_rate: Self::DEFAULT_TICK_RATE,
            frame_skip: 0,
            fast_forward_speed: Self::DEFAULT_FAST_FORWARD_SPEED,
            max_catch_up_ticks: Self::DEFAULT_MAX_CATCH_UP_TICKS,
            wait_ticks: Self::DEFAULT_WAIT_TICKS,
            rng_seed: Self::DEFAULT_RNG_SEED,
            screen_width: Self::DEFAULT_SCREEN_WIDTH,
            screen_height: Self::DEFAULT_SCREEN_HEIGHT,
        }
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    pub fn with_call_depth_limit(mut self, limit: usize) -> Self {
        self.call_depth_limit = limit;
        self
    }

    pub fn with_operand_stack_limit(mut self, limit: usize) -> Self {
        self.operand_stack_limit = limit;
        self
    }

    pub fn with_opcode_revision(mut self, revision: OpcodeRevision) -> Self {
        self.opcode_revision = revision;
        self
    }

    /// Pool capacity after clamping to the compile-time maximum.
    pub fn effective_pool_capacity(&self) -> usize {
        self.pool_capacity.min(Self::MAX_POOL_CAPACITY)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
