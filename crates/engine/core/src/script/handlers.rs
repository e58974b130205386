//! Opcode handlers and the dispatch table.
//!
//! Every opcode maps to exactly one handler through [`Opcode::handler`]; the
//! match is exhaustive, so adding an opcode without a handler fails to build.
//! Operands were range-checked at load, so handlers only validate values that
//! come off the operand stack.

use strum::IntoEnumIterator;

use crate::collision::{overlaps, BoxKind, Hitbox, OverlapMode};
use crate::engine::EngineState;
use crate::fixed::{atan2, cos512, fix_div, fix_mul, sin512, Fixed};
use crate::object::{ObjectTypeId, SlotId};
use crate::services::{Buttons, DebugEvent, SpriteDraw};

use super::error::RuntimeErrorKind;
use super::opcode::{EntityField, Opcode};
use super::program::{FunctionId, Instruction};
use super::vm::{ForEachCursor, Vm};

/// What the interpreter loop does after a handler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    Next,
    Jump(usize),
    Call(FunctionId),
    Return,
    End,
}

pub(crate) type Handler = fn(&mut Vm<'_, '_>, Instruction) -> Result<Flow, RuntimeErrorKind>;

type HandlerResult = Result<Flow, RuntimeErrorKind>;

/// Handlers indexed by the opcode's declaration order.
pub(crate) struct DispatchTable {
    handlers: Box<[Handler]>,
}

impl DispatchTable {
    pub(crate) fn new() -> Self {
        Self {
            handlers: Opcode::iter().map(Opcode::handler).collect(),
        }
    }

    #[inline]
    pub(crate) fn get(&self, op: Opcode) -> Handler {
        self.handlers[op as usize]
    }
}

impl Opcode {
    pub(crate) fn handler(self) -> Handler {
        use Opcode::*;
        match self {
            Nop => op_nop,
            End => op_end,
            Return => op_return,
            Jump => op_jump,
            JumpIfZero => op_jump_if_zero,
            JumpIfNotZero => op_jump_if_not_zero,
            Call => op_call,
            PushInt => op_push_int,
            PushConst => op_push_const,
            Pop => op_pop,
            Dup => op_dup,
            Swap => op_swap,
            LoadGlobal => op_load_global,
            StoreGlobal => op_store_global,
            LoadLocal => op_load_local,
            StoreLocal => op_store_local,
            LoadScene => op_load_scene,
            StoreScene => op_store_scene,
            GetField => op_get_field,
            SetField => op_set_field,
            GetFieldOf => op_get_field_of,
            SetFieldOf => op_set_field_of,
            SelfSlot => op_self_slot,
            PlayerSlot => op_player_slot,
            SetHitbox => op_set_hitbox,
            Add => op_add,
            Sub => op_sub,
            Mul => op_mul,
            Div => op_div,
            Mod => op_mod,
            Neg => op_neg,
            BitAnd => op_bit_and,
            BitOr => op_bit_or,
            BitXor => op_bit_xor,
            Shl => op_shl,
            Shr => op_shr,
            Not => op_not,
            Abs => op_abs,
            FixMul => op_fix_mul,
            FixDiv => op_fix_div,
            Sin => op_sin,
            Cos => op_cos,
            ATan2 => op_atan2,
            Eq => op_eq,
            Ne => op_ne,
            Lt => op_lt,
            Le => op_le,
            Gt => op_gt,
            Ge => op_ge,
            TableGet => op_table_get,
            TableLen => op_table_len,
            TileAt => op_tile_at,
            Spawn => op_spawn,
            Destroy => op_destroy,
            DestroyOther => op_destroy_other,
            ForEach => op_for_each,
            Next => op_next,
            IterSlot => op_iter_slot,
            Overlap => op_overlap,
            PlaySound => op_play_sound,
            StopSound => op_stop_sound,
            PlayMusic => op_play_music,
            StopMusic => op_stop_music,
            SetAnimation => op_set_animation,
            AnimFrame => op_anim_frame,
            DrawSprite => op_draw_sprite,
            DrawRect => op_draw_rect,
            PaletteColor => op_palette_color,
            InputHeld => op_input_held,
            InputPressed => op_input_pressed,
            Pointer => op_pointer,
            Random => op_random,
            SetEngineState => op_set_engine_state,
            LoadStage => op_load_stage,
            ReadUserdata => op_read_userdata,
            WriteUserdata => op_write_userdata,
            Log => op_log,
        }
    }
}

// ============================================================================
// Control
// ============================================================================

fn op_nop(_: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    Ok(Flow::Next)
}

fn op_end(_: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    Ok(Flow::End)
}

fn op_return(_: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    Ok(Flow::Return)
}

fn op_jump(_: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    Ok(Flow::Jump(ins.target()))
}

fn op_jump_if_zero(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    Ok(if vm.pop()? == 0 {
        Flow::Jump(ins.target())
    } else {
        Flow::Next
    })
}

fn op_jump_if_not_zero(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    Ok(if vm.pop()? != 0 {
        Flow::Jump(ins.target())
    } else {
        Flow::Next
    })
}

fn op_call(_: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    Ok(Flow::Call(ins.function()))
}

// ============================================================================
// Stack and variables
// ============================================================================

fn op_push_int(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    vm.push(ins.int())?;
    Ok(Flow::Next)
}

fn op_push_const(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let value = vm.program.constants()[ins.index() as usize];
    vm.push(value)?;
    Ok(Flow::Next)
}

fn op_pop(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    vm.pop()?;
    Ok(Flow::Next)
}

fn op_dup(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let top = vm.peek()?;
    vm.push(top)?;
    Ok(Flow::Next)
}

fn op_swap(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let (a, b) = vm.pop2()?;
    vm.push(b)?;
    vm.push(a)?;
    Ok(Flow::Next)
}

fn op_load_global(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let value = vm.globals[ins.index() as usize];
    vm.push(value)?;
    Ok(Flow::Next)
}

fn op_store_global(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    vm.globals[ins.index() as usize] = vm.pop()?;
    Ok(Flow::Next)
}

fn op_load_local(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let value = vm.ctx.this_entity()?.scratch[ins.index() as usize];
    vm.push(value)?;
    Ok(Flow::Next)
}

fn op_store_local(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let value = vm.pop()?;
    vm.ctx.this_entity_mut()?.scratch[ins.index() as usize] = value;
    Ok(Flow::Next)
}

fn op_load_scene(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let value = vm.ctx.stage()?.vars[ins.index() as usize];
    vm.push(value)?;
    Ok(Flow::Next)
}

fn op_store_scene(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let value = vm.pop()?;
    vm.ctx.stage_mut()?.vars[ins.index() as usize] = value;
    Ok(Flow::Next)
}

// ============================================================================
// Entity fields
// ============================================================================

fn check_type_write(vm: &Vm<'_, '_>, field: EntityField, value: i32) -> Result<(), RuntimeErrorKind> {
    if field != EntityField::Type {
        return Ok(());
    }
    match u16::try_from(value) {
        Ok(id) if vm.ctx.registry.contains(ObjectTypeId(id)) => Ok(()),
        _ => Err(RuntimeErrorKind::UnknownType { type_id: value }),
    }
}

fn op_get_field(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let value = vm.ctx.this_entity()?.field(ins.field());
    vm.push(value)?;
    Ok(Flow::Next)
}

fn op_set_field(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let value = vm.pop()?;
    check_type_write(vm, ins.field(), value)?;
    vm.ctx.this_entity_mut()?.set_field(ins.field(), value);
    Ok(Flow::Next)
}

fn op_get_field_of(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let slot = vm.pop()?;
    let value = vm.ctx.entity(slot)?.field(ins.field());
    vm.push(value)?;
    Ok(Flow::Next)
}

/// Pops the value, then the slot.
fn op_set_field_of(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let value = vm.pop()?;
    let slot = vm.pop()?;
    check_type_write(vm, ins.field(), value)?;
    vm.ctx.entity_mut(slot)?.set_field(ins.field(), value);
    Ok(Flow::Next)
}

fn op_self_slot(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let slot = vm.ctx.this.map_or(-1, SlotId::to_script);
    vm.push(slot)?;
    Ok(Flow::Next)
}

fn op_player_slot(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let slot = vm.ctx.player.map_or(-1, SlotId::to_script);
    vm.push(slot)?;
    Ok(Flow::Next)
}

/// Pops kind, bottom, right, top, left. The index may replace a box or append one.
fn op_set_hitbox(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let kind = vm.pop()?;
    let bottom = vm.pop()?;
    let right = vm.pop()?;
    let top = vm.pop()?;
    let left = vm.pop()?;
    let kind = u8::try_from(kind)
        .ok()
        .and_then(BoxKind::from_repr)
        .ok_or(RuntimeErrorKind::InvalidHitboxKind { kind })?;
    let edge = |value: i32| {
        i16::try_from(value).map_err(|_| RuntimeErrorKind::HitboxOutOfRange { value })
    };
    let hitbox = Hitbox::new(edge(left)?, edge(top)?, edge(right)?, edge(bottom)?, kind);

    let index = ins.index();
    let boxes = &mut vm.ctx.this_entity_mut()?.boxes;
    match (index as usize).cmp(&boxes.len()) {
        core::cmp::Ordering::Less => boxes[index as usize] = hitbox,
        core::cmp::Ordering::Equal if !boxes.is_full() => boxes.push(hitbox),
        _ => {
            return Err(RuntimeErrorKind::InvalidHitbox {
                index,
                len: boxes.len(),
            });
        }
    }
    Ok(Flow::Next)
}

// ============================================================================
// Integer and fixed-point math
// ============================================================================

macro_rules! binary {
    ($name:ident, |$a:ident, $b:ident| $body:expr) => {
        fn $name(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
            let ($a, $b) = vm.pop2()?;
            vm.push($body)?;
            Ok(Flow::Next)
        }
    };
}

macro_rules! unary {
    ($name:ident, |$a:ident| $body:expr) => {
        fn $name(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
            let $a = vm.pop()?;
            vm.push($body)?;
            Ok(Flow::Next)
        }
    };
}

binary!(op_add, |a, b| a.wrapping_add(b));
binary!(op_sub, |a, b| a.wrapping_sub(b));
binary!(op_mul, |a, b| a.wrapping_mul(b));
binary!(op_bit_and, |a, b| a & b);
binary!(op_bit_or, |a, b| a | b);
binary!(op_bit_xor, |a, b| a ^ b);
binary!(op_shl, |a, b| a.wrapping_shl(b as u32));
binary!(op_shr, |a, b| a.wrapping_shr(b as u32));
binary!(op_fix_mul, |a, b| fix_mul(a, b));
binary!(op_eq, |a, b| (a == b) as i32);
binary!(op_ne, |a, b| (a != b) as i32);
binary!(op_lt, |a, b| (a < b) as i32);
binary!(op_le, |a, b| (a <= b) as i32);
binary!(op_gt, |a, b| (a > b) as i32);
binary!(op_ge, |a, b| (a >= b) as i32);
binary!(op_atan2, |x, y| atan2(x, y) as i32);

unary!(op_neg, |a| a.wrapping_neg());
unary!(op_not, |a| (a == 0) as i32);
unary!(op_abs, |a| a.wrapping_abs());
unary!(op_sin, |a| sin512(a));
unary!(op_cos, |a| cos512(a));

fn op_div(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let (a, b) = vm.pop2()?;
    if b == 0 {
        return Err(RuntimeErrorKind::DivisionByZero);
    }
    vm.push(a.wrapping_div(b))?;
    Ok(Flow::Next)
}

fn op_mod(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let (a, b) = vm.pop2()?;
    if b == 0 {
        return Err(RuntimeErrorKind::DivisionByZero);
    }
    vm.push(a.wrapping_rem(b))?;
    Ok(Flow::Next)
}

fn op_fix_div(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let (a, b) = vm.pop2()?;
    let quotient = fix_div(a, b).ok_or(RuntimeErrorKind::DivisionByZero)?;
    vm.push(quotient)?;
    Ok(Flow::Next)
}

// ============================================================================
// Tables and tiles
// ============================================================================

fn op_table_get(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let table = ins.index();
    let index = vm.pop()?;
    let entries = vm.program.tables()[table as usize].as_slice();
    let value = usize::try_from(index)
        .ok()
        .and_then(|i| entries.get(i))
        .copied()
        .ok_or(RuntimeErrorKind::TableIndexOutOfRange {
            table,
            index,
            len: entries.len(),
        })?;
    vm.push(value)?;
    Ok(Flow::Next)
}

fn op_table_len(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let len = vm.program.tables()[ins.index() as usize].len();
    vm.push(len as i32)?;
    Ok(Flow::Next)
}

/// Pops y, x, layer (world pixels). Pushes -1 outside the layer.
fn op_tile_at(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let y = vm.pop()?;
    let x = vm.pop()?;
    let layer = vm.pop()?;
    let stage = vm.ctx.stage()?;
    let tiles = usize::try_from(layer)
        .ok()
        .and_then(|l| stage.layer(l))
        .ok_or(RuntimeErrorKind::InvalidLayer { layer })?;
    let tile = tiles.tile_at(x, y).map_or(-1, i32::from);
    vm.push(tile)?;
    Ok(Flow::Next)
}

// ============================================================================
// Pool
// ============================================================================

/// Pops y, x (raw 16.16), type. Pushes the reserved slot, or -1 when the pool is full.
fn op_spawn(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let y = vm.pop()?;
    let x = vm.pop()?;
    let type_id = vm.pop()?;
    let entity = u16::try_from(type_id)
        .ok()
        .and_then(|id| {
            vm.ctx
                .registry
                .instantiate(ObjectTypeId(id), Fixed::from_raw(x), Fixed::from_raw(y))
        })
        .ok_or(RuntimeErrorKind::UnknownType { type_id })?;
    let spawned_type = entity.type_id;

    let slot = match vm.ctx.pool.reserve(entity) {
        Ok(slot) => slot.to_script(),
        Err(_) => {
            vm.ctx.requests.dropped_spawns += 1;
            let capacity = vm.ctx.pool.capacity();
            vm.ctx.services.debug.report(&DebugEvent::PoolExhausted {
                capacity,
                type_id: spawned_type,
            });
            -1
        }
    };
    vm.push(slot)?;
    Ok(Flow::Next)
}

fn op_destroy(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let slot = vm.ctx.this_slot()?;
    vm.ctx
        .pool
        .request_destroy(slot)
        .map_err(|_| RuntimeErrorKind::NoEntityContext)?;
    Ok(Flow::Next)
}

fn op_destroy_other(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let raw = vm.pop()?;
    SlotId::from_script(raw)
        .and_then(|slot| vm.ctx.pool.request_destroy(slot).ok())
        .ok_or(RuntimeErrorKind::InvalidSlot { slot: raw })?;
    Ok(Flow::Next)
}

/// Pops a type filter (negative for every type). Jumps to the exit target when
/// nothing matches; otherwise falls into the loop body.
fn op_for_each(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let raw = vm.pop()?;
    let filter = if raw < 0 {
        None
    } else {
        let id = u16::try_from(raw).map_err(|_| RuntimeErrorKind::UnknownType { type_id: raw })?;
        Some(ObjectTypeId(id))
    };
    if vm.iterators.len() >= vm.limits.iterator_depth {
        return Err(RuntimeErrorKind::IteratorDepthExceeded {
            limit: vm.limits.iterator_depth,
        });
    }
    let mut cursor = ForEachCursor::new(filter);
    if cursor.advance(vm.ctx) {
        vm.iterators.push(cursor);
        Ok(Flow::Next)
    } else {
        Ok(Flow::Jump(ins.target()))
    }
}

/// Advances the innermost loop; jumps back to the body or falls through when done.
fn op_next(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let mut cursor = vm.iterators.pop().ok_or(RuntimeErrorKind::NoIterator)?;
    if cursor.advance(vm.ctx) {
        vm.iterators.push(cursor);
        Ok(Flow::Jump(ins.target()))
    } else {
        Ok(Flow::Next)
    }
}

fn op_iter_slot(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let slot = vm
        .iterators
        .last()
        .and_then(|cursor| cursor.current)
        .ok_or(RuntimeErrorKind::NoIterator)?;
    vm.push(slot.to_script())?;
    Ok(Flow::Next)
}

// ============================================================================
// Collision
// ============================================================================

/// Pops the other slot; pushes 1 when this entity's boxes overlap it under the mode.
fn op_overlap(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let other = vm.pop()?;
    let mode = OverlapMode::from_repr(ins.index()).unwrap_or(OverlapMode::Any);
    let this = vm.ctx.this_entity()?;
    let hit = overlaps(this, vm.ctx.entity(other)?, mode);
    vm.push(hit as i32)?;
    Ok(Flow::Next)
}

// ============================================================================
// Intrinsics
// ============================================================================

fn op_play_sound(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let sound = vm.pop()?;
    vm.ctx.services.audio.play_sound(sound);
    Ok(Flow::Next)
}

fn op_stop_sound(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let sound = vm.pop()?;
    vm.ctx.services.audio.stop_sound(sound);
    Ok(Flow::Next)
}

fn op_play_music(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let track = vm.pop()?;
    vm.ctx.services.audio.play_music(track);
    Ok(Flow::Next)
}

fn op_stop_music(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    vm.ctx.services.audio.stop_music();
    Ok(Flow::Next)
}

fn op_set_animation(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let animation = vm.pop()? as u16;
    let slot = vm.ctx.this_slot()?;
    let entity = vm.ctx.this_entity_mut()?;
    if entity.animation != animation {
        entity.animation = animation;
        entity.frame = 0;
    }
    vm.ctx.services.animation.set_animation(slot, animation);
    Ok(Flow::Next)
}

/// Asks the animation service for this tick's frame, stores and pushes it.
fn op_anim_frame(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let slot = vm.ctx.this_slot()?;
    let animation = vm.ctx.this_entity()?.animation;
    let frame = vm.ctx.services.animation.current_frame(slot, animation);
    vm.ctx.this_entity_mut()?.frame = frame;
    vm.push(frame as i32)?;
    Ok(Flow::Next)
}

/// Pops a frame; draws this entity's animation at its screen position.
fn op_draw_sprite(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let frame = vm.pop()? as u16;
    let slot = vm.ctx.this_slot()?;
    let entity = vm.ctx.this_entity()?;
    let (camera_x, camera_y) = vm.ctx.camera;
    let sprite = SpriteDraw {
        slot,
        animation: entity.animation,
        frame,
        x: (entity.x - camera_x).to_int(),
        y: (entity.y - camera_y).to_int(),
        direction: entity.direction,
        layer: entity.draw_layer,
    };
    vm.ctx.services.drawing.draw_sprite(&sprite);
    Ok(Flow::Next)
}

/// Pops color, height, width, y, x (screen pixels).
fn op_draw_rect(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let color = vm.pop()?;
    let height = vm.pop()?;
    let width = vm.pop()?;
    let y = vm.pop()?;
    let x = vm.pop()?;
    vm.ctx
        .services
        .drawing
        .draw_rect(x, y, width, height, color as u32);
    Ok(Flow::Next)
}

fn op_palette_color(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let index = vm.pop()?;
    let color = vm.ctx.services.palette.color(index as u8);
    vm.push(color as i32)?;
    Ok(Flow::Next)
}

fn button(raw: i32) -> Result<Buttons, RuntimeErrorKind> {
    Buttons::from_index(raw).ok_or(RuntimeErrorKind::InvalidButton { button: raw })
}

fn op_input_held(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let pressed = button(vm.pop()?)?;
    let held = vm.ctx.input.held.contains(pressed);
    vm.push(held as i32)?;
    Ok(Flow::Next)
}

fn op_input_pressed(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let wanted = button(vm.pop()?)?;
    let pressed = vm.ctx.input.pressed.contains(wanted);
    vm.push(pressed as i32)?;
    Ok(Flow::Next)
}

/// Axis 0 is x, 1 is y, 2 is the down flag. Without a pointer: -1, -1, 0.
fn op_pointer(vm: &mut Vm<'_, '_>, ins: Instruction) -> HandlerResult {
    let pointer = vm.ctx.input.pointer;
    let value = match (ins.index(), pointer) {
        (0, Some(p)) => p.x,
        (1, Some(p)) => p.y,
        (2, Some(p)) => p.down as i32,
        (2, None) => 0,
        _ => -1,
    };
    vm.push(value)?;
    Ok(Flow::Next)
}

fn op_random(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let bound = vm.pop()?;
    let value = vm.rng.below(bound);
    vm.push(value)?;
    Ok(Flow::Next)
}

fn op_set_engine_state(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let code = vm.pop()?;
    let state =
        EngineState::from_code(code).ok_or(RuntimeErrorKind::InvalidEngineState { code })?;
    vm.ctx.requests.state = Some(state);
    Ok(Flow::Next)
}

fn op_load_stage(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let index = vm.pop()?;
    let stage = usize::try_from(index)
        .ok()
        .filter(|i| *i < vm.ctx.stage_count)
        .ok_or(RuntimeErrorKind::InvalidStage { index })?;
    vm.ctx.requests.stage = Some(stage);
    Ok(Flow::Next)
}

fn op_read_userdata(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let key = vm.pop()?;
    let value = vm.ctx.services.userdata.read(key);
    vm.push(value)?;
    Ok(Flow::Next)
}

/// Pops the value, then the key.
fn op_write_userdata(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let value = vm.pop()?;
    let key = vm.pop()?;
    vm.ctx.services.userdata.write(key, value);
    Ok(Flow::Next)
}

fn op_log(vm: &mut Vm<'_, '_>, _: Instruction) -> HandlerResult {
    let value = vm.pop()?;
    let slot = vm.ctx.this;
    vm.ctx
        .services
        .debug
        .report(&DebugEvent::ScriptLog { slot, value });
    Ok(Flow::Next)
}
