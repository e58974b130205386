//! The bytecode interpreter.
//!
//! [`ScriptEngine::execute`] runs one function to completion for one entity
//! (or none, for type startup). Execution is synchronous: a script never
//! suspends mid-tick, and "waiting" is expressed by the script itself through
//! the entity's state fields. Runaway scripts are bounded by the call depth,
//! operand stack and iterator limits; there is no instruction budget.

use crate::config::EngineConfig;
use crate::object::{ObjectTypeId, SlotId};
use crate::rng::PcgRng;

use super::context::ExecContext;
use super::error::{RuntimeErrorKind, ScriptRuntimeError};
use super::handlers::{DispatchTable, Flow};
use super::program::{FunctionId, Program};

/// How an invocation finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// `End` anywhere in the call chain.
    Ended,
    /// `Return` from the entry function.
    Returned,
}

/// Per-invocation resource bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptLimits {
    pub call_depth: usize,
    pub operand_stack: usize,
    pub iterator_depth: usize,
}

impl ScriptLimits {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            call_depth: config.call_depth_limit,
            operand_stack: config.operand_stack_limit,
            iterator_depth: config.iterator_depth_limit,
        }
    }
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    function: FunctionId,
    return_pc: usize,
    /// Iterator stack height at the call; loops left open by the callee are dropped on return.
    iterators: usize,
}

/// Cursor of a `ForEach` loop over the committed active list.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ForEachCursor {
    /// `None` matches every type.
    pub type_filter: Option<ObjectTypeId>,
    pub position: usize,
    pub current: Option<SlotId>,
}

impl ForEachCursor {
    pub(crate) fn new(type_filter: Option<ObjectTypeId>) -> Self {
        Self {
            type_filter,
            position: 0,
            current: None,
        }
    }

    /// Moves to the next matching active entity; `false` when exhausted.
    pub(crate) fn advance(&mut self, ctx: &ExecContext<'_>) -> bool {
        let active = ctx.pool.active();
        while self.position < active.len() {
            let slot = active[self.position];
            self.position += 1;
            let matches = ctx.pool.get(slot).is_some_and(|entity| {
                self.type_filter.is_none_or(|filter| entity.type_id == filter)
            });
            if matches {
                self.current = Some(slot);
                return true;
            }
        }
        self.current = None;
        false
    }
}

/// Interpreter state visible to opcode handlers.
pub(crate) struct Vm<'v, 'c> {
    pub program: &'v Program,
    pub globals: &'v mut [i32; EngineConfig::GLOBAL_VARS],
    pub rng: &'v mut PcgRng,
    pub stack: &'v mut Vec<i32>,
    pub iterators: &'v mut Vec<ForEachCursor>,
    pub limits: ScriptLimits,
    pub ctx: &'v mut ExecContext<'c>,
}

impl Vm<'_, '_> {
    #[inline]
    pub fn push(&mut self, value: i32) -> Result<(), RuntimeErrorKind> {
        if self.stack.len() >= self.limits.operand_stack {
            return Err(RuntimeErrorKind::StackOverflow {
                limit: self.limits.operand_stack,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Result<i32, RuntimeErrorKind> {
        self.stack.pop().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    #[inline]
    pub fn peek(&self) -> Result<i32, RuntimeErrorKind> {
        self.stack.last().copied().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    /// Pops `b` then `a`, returning `(a, b)` in push order.
    #[inline]
    pub fn pop2(&mut self) -> Result<(i32, i32), RuntimeErrorKind> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }
}

/// Owns the loaded program, the global variables and the dispatch table.
pub struct ScriptEngine {
    program: Program,
    dispatch: DispatchTable,
    globals: [i32; EngineConfig::GLOBAL_VARS],
    limits: ScriptLimits,
    rng: PcgRng,
    stack: Vec<i32>,
    frames: Vec<Frame>,
    iterators: Vec<ForEachCursor>,
}

impl ScriptEngine {
    pub fn new(program: Program, limits: ScriptLimits, seed: u64) -> Self {
        Self {
            program,
            dispatch: DispatchTable::new(),
            globals: [0; EngineConfig::GLOBAL_VARS],
            limits,
            rng: PcgRng::new(seed),
            stack: Vec::with_capacity(limits.operand_stack),
            frames: Vec::with_capacity(limits.call_depth),
            iterators: Vec::with_capacity(limits.iterator_depth),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn limits(&self) -> ScriptLimits {
        self.limits
    }

    pub fn globals(&self) -> &[i32; EngineConfig::GLOBAL_VARS] {
        &self.globals
    }

    pub fn set_global(&mut self, index: usize, value: i32) {
        if let Some(slot) = self.globals.get_mut(index) {
            *slot = value;
        }
    }

    pub fn rng(&self) -> &PcgRng {
        &self.rng
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }

    /// Zeroes globals and reseeds; used when the game restarts.
    pub fn reset(&mut self, seed: u64) {
        self.globals = [0; EngineConfig::GLOBAL_VARS];
        self.rng.reseed(seed);
    }

    /// Runs `function` until `End`, or `Return` from the entry frame.
    ///
    /// A fault aborts only this invocation; partial effects already applied
    /// to the pool or services stay applied.
    pub fn execute(
        &mut self,
        function: FunctionId,
        ctx: &mut ExecContext<'_>,
    ) -> Result<Outcome, ScriptRuntimeError> {
        let program = &self.program;
        let mut current = function;
        let mut pc = program
            .function(function)
            .map(|f| f.entry)
            .ok_or(ScriptRuntimeError {
                kind: RuntimeErrorKind::UnknownFunction { id: function.0 },
                function,
                pc: 0,
            })?;

        self.stack.clear();
        self.frames.clear();
        self.iterators.clear();

        let mut vm = Vm {
            program,
            globals: &mut self.globals,
            rng: &mut self.rng,
            stack: &mut self.stack,
            iterators: &mut self.iterators,
            limits: self.limits,
            ctx,
        };
        let frames = &mut self.frames;
        let dispatch = &self.dispatch;

        loop {
            let fault = move |kind| ScriptRuntimeError {
                kind,
                function: current,
                pc,
            };
            // Every function ends with a terminator, so this only trips on a
            // jump that lands exactly on the end of the code section.
            let Some(&instruction) = program.instruction(pc) else {
                return Ok(Outcome::Ended);
            };

            let flow = dispatch.get(instruction.op)(&mut vm, instruction).map_err(fault)?;
            match flow {
                Flow::Next => pc += 1,
                Flow::Jump(target) => pc = target,
                Flow::Call(callee) => {
                    if frames.len() >= self.limits.call_depth {
                        return Err(fault(RuntimeErrorKind::CallDepthExceeded {
                            limit: self.limits.call_depth,
                        }));
                    }
                    let entry = program
                        .function(callee)
                        .map(|f| f.entry)
                        .ok_or_else(|| fault(RuntimeErrorKind::UnknownFunction { id: callee.0 }))?;
                    frames.push(Frame {
                        function: current,
                        return_pc: pc + 1,
                        iterators: vm.iterators.len(),
                    });
                    current = callee;
                    pc = entry;
                }
                Flow::Return => match frames.pop() {
                    Some(frame) => {
                        vm.iterators.truncate(frame.iterators);
                        current = frame.function;
                        pc = frame.return_pc;
                    }
                    None => return Ok(Outcome::Returned),
                },
                Flow::End => return Ok(Outcome::Ended),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;
    use crate::object::{ObjectPool, ObjectType, TypeRegistry};
    use crate::script::{Assembler, EntityField, Opcode, OpcodeRevision, ScriptPhase, ScriptRequests};
    use crate::services::{InputSnapshot, Services};

    struct Harness {
        pool: ObjectPool,
        registry: TypeRegistry,
        services: Services,
        input: InputSnapshot,
        requests: ScriptRequests,
    }

    impl Harness {
        fn new() -> Self {
            let mut registry = TypeRegistry::new();
            registry.register(ObjectType {
                name: "thing".into(),
                ..ObjectType::default()
            });
            Self {
                pool: ObjectPool::new(8),
                registry,
                services: Services::default(),
                input: InputSnapshot::default(),
                requests: ScriptRequests::default(),
            }
        }

        fn ctx(&mut self, this: Option<SlotId>) -> ExecContext<'_> {
            ExecContext {
                pool: &mut self.pool,
                registry: &self.registry,
                stage: None,
                stage_count: 1,
                services: &mut self.services,
                input: &self.input,
                requests: &mut self.requests,
                this,
                player: None,
                phase: ScriptPhase::Main,
                camera: (Fixed::ZERO, Fixed::ZERO),
            }
        }
    }

    fn engine(build: impl FnOnce(&mut Assembler)) -> ScriptEngine {
        let mut asm = Assembler::new();
        build(&mut asm);
        let bytes = asm.build(OpcodeRevision::Current).unwrap();
        let program = Program::load(&bytes, OpcodeRevision::Current).unwrap();
        ScriptEngine::new(program, ScriptLimits::default(), 1)
    }

    #[test]
    fn arithmetic_stores_into_globals() {
        let mut scripts = engine(|asm| {
            asm.begin_function("main")
                .push_int(7)
                .push_int(3)
                .op(Opcode::Sub)
                .push_int(5)
                .op(Opcode::Mul)
                .index(Opcode::StoreGlobal, 2)
                .op(Opcode::End);
        });
        let mut harness = Harness::new();
        let outcome = scripts.execute(FunctionId(0), &mut harness.ctx(None)).unwrap();
        assert_eq!(outcome, Outcome::Ended);
        assert_eq!(scripts.globals()[2], 20);
    }

    #[test]
    fn division_by_zero_reports_function_and_pc() {
        let mut scripts = engine(|asm| {
            asm.begin_function("main")
                .push_int(1)
                .push_int(0)
                .op(Opcode::Div)
                .op(Opcode::End);
        });
        let mut harness = Harness::new();
        let err = scripts.execute(FunctionId(0), &mut harness.ctx(None)).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::DivisionByZero);
        assert_eq!(err.function, FunctionId(0));
        assert_eq!(err.pc, 2);
    }

    #[test]
    fn call_returns_to_caller() {
        let mut scripts = engine(|asm| {
            asm.begin_function("main")
                .call("helper")
                .index(Opcode::StoreGlobal, 0)
                .op(Opcode::Return)
                .begin_function("helper")
                .push_int(42)
                .op(Opcode::Return);
        });
        let mut harness = Harness::new();
        let outcome = scripts.execute(FunctionId(0), &mut harness.ctx(None)).unwrap();
        assert_eq!(outcome, Outcome::Returned);
        assert_eq!(scripts.globals()[0], 42);
    }

    #[test]
    fn unbounded_recursion_hits_call_depth_limit() {
        let mut scripts = engine(|asm| {
            asm.begin_function("recurse").call("recurse").op(Opcode::Return);
        });
        let mut harness = Harness::new();
        let err = scripts.execute(FunctionId(0), &mut harness.ctx(None)).unwrap_err();
        assert_eq!(
            err.kind,
            RuntimeErrorKind::CallDepthExceeded {
                limit: EngineConfig::DEFAULT_CALL_DEPTH_LIMIT
            }
        );
    }

    #[test]
    fn stack_overflow_is_bounded() {
        let mut scripts = engine(|asm| {
            let top = asm.label();
            asm.begin_function("flood")
                .bind(top)
                .push_int(1)
                .jump(Opcode::Jump, top);
        });
        let mut harness = Harness::new();
        let err = scripts.execute(FunctionId(0), &mut harness.ctx(None)).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::StackOverflow { .. }));
    }

    #[test]
    fn field_access_without_entity_faults() {
        let mut scripts = engine(|asm| {
            asm.begin_function("main")
                .field(Opcode::GetField, EntityField::X)
                .op(Opcode::End);
        });
        let mut harness = Harness::new();
        let err = scripts.execute(FunctionId(0), &mut harness.ctx(None)).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::NoEntityContext);
    }

    #[test]
    fn for_each_visits_matching_active_entities() {
        let mut scripts = engine(|asm| {
            let body = asm.label();
            let exit = asm.label();
            asm.begin_function("count")
                .push_int(1)
                .jump(Opcode::ForEach, exit)
                .bind(body)
                .index(Opcode::LoadGlobal, 0)
                .push_int(1)
                .op(Opcode::Add)
                .index(Opcode::StoreGlobal, 0)
                .jump(Opcode::Next, body)
                .bind(exit)
                .op(Opcode::End);
        });
        let mut harness = Harness::new();
        for type_id in [1u16, 0, 1, 1] {
            let entity = harness
                .registry
                .instantiate(ObjectTypeId(type_id), Fixed::ZERO, Fixed::ZERO)
                .unwrap();
            harness.pool.spawn_immediate(entity).unwrap();
        }
        scripts.execute(FunctionId(0), &mut harness.ctx(None)).unwrap();
        assert_eq!(scripts.globals()[0], 3);
    }

    #[test]
    fn for_each_rejects_filter_beyond_type_range() {
        let mut scripts = engine(|asm| {
            let body = asm.label();
            let exit = asm.label();
            asm.begin_function("count")
                .push_int(i32::from(u16::MAX) + 2)
                .jump(Opcode::ForEach, exit)
                .bind(body)
                .jump(Opcode::Next, body)
                .bind(exit)
                .op(Opcode::End);
        });
        let mut harness = Harness::new();
        let entity = harness
            .registry
            .instantiate(ObjectTypeId(1), Fixed::ZERO, Fixed::ZERO)
            .unwrap();
        harness.pool.spawn_immediate(entity).unwrap();
        let err = scripts.execute(FunctionId(0), &mut harness.ctx(None)).unwrap_err();
        assert_eq!(
            err.kind,
            RuntimeErrorKind::UnknownType {
                type_id: i32::from(u16::MAX) + 2
            }
        );
        assert_eq!(err.pc, 1);
    }

    #[test]
    fn hitbox_edges_must_fit_sixteen_bits() {
        let mut scripts = engine(|asm| {
            asm.begin_function("main")
                .push_int(-8)
                .push_int(-8)
                .push_int(40_000)
                .push_int(8)
                .push_int(0)
                .index(Opcode::SetHitbox, 0)
                .op(Opcode::End);
        });
        let mut harness = Harness::new();
        let entity = harness
            .registry
            .instantiate(ObjectTypeId(1), Fixed::ZERO, Fixed::ZERO)
            .unwrap();
        let slot = harness.pool.spawn_immediate(entity).unwrap();
        let boxes_before = harness.pool.get(slot).unwrap().boxes.clone();
        let err = scripts.execute(FunctionId(0), &mut harness.ctx(Some(slot))).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::HitboxOutOfRange { value: 40_000 });
        assert_eq!(harness.pool.get(slot).unwrap().boxes, boxes_before);
    }

    #[test]
    fn spawn_reserves_slot_visible_to_script() {
        let mut scripts = engine(|asm| {
            asm.begin_function("main")
                .push_int(1)
                .push_int(Fixed::from_int(10).raw())
                .push_int(Fixed::from_int(20).raw())
                .op(Opcode::Spawn)
                .op(Opcode::Dup)
                .index(Opcode::StoreGlobal, 0)
                .push_int(9)
                .field(Opcode::SetFieldOf, EntityField::State)
                .op(Opcode::End);
        });
        let mut harness = Harness::new();
        scripts.execute(FunctionId(0), &mut harness.ctx(None)).unwrap();
        let slot = SlotId(scripts.globals()[0] as u16);
        assert!(harness.pool.active().is_empty());
        assert_eq!(harness.pool.get(slot).unwrap().state, 9);
        harness.pool.commit();
        assert_eq!(harness.pool.active(), &[slot]);
    }
}
