//! Executor family: one handler per (opcode-type, data-type) pair.
//!
//! Handlers assume the stack preconditions established by the compiler;
//! out-of-contract invocation is undefined within the core. Net effects on
//! the stack pointer and local-variable size are statically known per
//! opcode type.

use anyhow::Result;

use super::ExecContext;
use crate::value::Cell;

pub(crate) fn exec_nop(_ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    Ok(())
}

pub(crate) fn exec_move_stack_positive(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    let count = parameter as i16 as usize;
    for offset in 0..count {
        ctx.flow.write_above(offset, 0);
    }
    ctx.flow.value_stack_ptr += count;
    Ok(())
}

pub(crate) fn exec_move_stack_negative(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    let delta = parameter as i16 as i64;
    ctx.flow.value_stack_ptr = (ctx.flow.value_stack_ptr as i64 + delta) as usize;
    Ok(())
}

// Fast path for the most common stack cleanup.
pub(crate) fn exec_move_stack_m1(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    ctx.flow.value_stack_ptr -= 1;
    Ok(())
}

pub(crate) fn exec_move_var_stack_positive(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    ctx.flow.grow_locals(parameter as i16 as usize);
    Ok(())
}

pub(crate) fn exec_move_var_stack_negative(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    ctx.flow.shrink_locals(-(parameter as i16) as usize);
    Ok(())
}

pub(crate) fn exec_push_constant(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    ctx.flow.push(parameter);
    Ok(())
}

// TODO: Unused by the compiler, kept wired for binary compatibility
pub(crate) fn exec_duplicate(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    let top = ctx.flow.top();
    ctx.flow.push(top);
    Ok(())
}

// TODO: Unused by the compiler, kept wired for binary compatibility
pub(crate) fn exec_exchange(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    let a = ctx.flow.peek(0);
    let b = ctx.flow.peek(1);
    ctx.flow.set_peek(0, b);
    ctx.flow.set_peek(1, a);
    Ok(())
}

pub(crate) fn exec_get_variable_value_local(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    let value = ctx.flow.read_local(parameter as u32);
    ctx.flow.push(value as u64);
    Ok(())
}

pub(crate) fn exec_get_variable_value_user(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    let value = ctx
        .flow
        .program()
        .global_variable_by_id(parameter as u32)?
        .value();
    ctx.flow.push(value as u64);
    Ok(())
}

/// Global-class getter; `parameter` is the resolved pool slot.
pub(crate) fn exec_get_variable_value_global<T: Cell>(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    let value = T::from_cell(ctx.runtime.read_global_slot(parameter as usize));
    ctx.flow.push(value.to_cell());
    Ok(())
}

/// External-class getter; `parameter` is the resolved host address.
pub(crate) fn exec_get_variable_value_external<T: Cell>(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    let value = T::read_from(ctx.runtime.memory(), parameter)?;
    ctx.flow.push(value.to_cell());
    Ok(())
}

// Setters read the top of the stack without consuming it; the compiler emits
// the stack cleanup separately.

pub(crate) fn exec_set_variable_value_local(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    let value = ctx.flow.top() as i64;
    ctx.flow.write_local(parameter as u32, value);
    Ok(())
}

pub(crate) fn exec_set_variable_value_user(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    let value = ctx.flow.top() as i64;
    ctx.flow
        .program()
        .global_variable_by_id(parameter as u32)?
        .set_value(value);
    Ok(())
}

pub(crate) fn exec_set_variable_value_global<T: Cell>(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    let value = T::from_cell(ctx.flow.top());
    ctx.runtime.write_global_slot(parameter as usize, value.to_cell());
    Ok(())
}

pub(crate) fn exec_set_variable_value_external<T: Cell>(ctx: &mut ExecContext<'_>, parameter: u64) -> Result<()> {
    let value = T::from_cell(ctx.flow.top());
    T::write_to(ctx.runtime.memory_mut(), parameter, value)
}

/// Consuming read: replaces the address on top with the loaded value.
pub(crate) fn exec_read_memory<T: Cell>(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    let addr = ctx.flow.top();
    let value = T::read_from(ctx.runtime.memory(), addr)?;
    ctx.flow.set_top(value.to_cell());
    Ok(())
}

/// Non-consuming read: keeps the address and pushes the loaded value.
pub(crate) fn exec_read_memory_noconsume<T: Cell>(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    let addr = ctx.flow.top();
    let value = T::read_from(ctx.runtime.memory(), addr)?;
    ctx.flow.push(value.to_cell());
    Ok(())
}

/// Consumes the address (top) and the value beneath it.
pub(crate) fn exec_write_memory<T: Cell>(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    let addr = ctx.flow.pop();
    let value = T::from_cell(ctx.flow.pop());
    T::write_to(ctx.runtime.memory_mut(), addr, value)
}

/// Operand order exchanged: value on top, address beneath. Consumes the
/// address and leaves the (narrowed) value on top.
pub(crate) fn exec_write_memory_exchanged<T: Cell>(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    let value = T::from_cell(ctx.flow.pop());
    let addr = ctx.flow.top();
    T::write_to(ctx.runtime.memory_mut(), addr, value)?;
    ctx.flow.set_top(value.to_cell());
    Ok(())
}

pub(crate) fn exec_cast_value<T: Cell>(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    let value = T::from_cell(ctx.flow.top());
    ctx.flow.set_top(value.to_cell());
    Ok(())
}

pub(crate) fn exec_make_bool(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    let value = ctx.flow.top();
    ctx.flow.set_top((value != 0) as u64);
    Ok(())
}

// Binary operators pop the right operand and combine it with the new top in
// place; net stack delta is always -1.
macro_rules! binary_exec {
    ($name:ident, |$lhs:ident, $rhs:ident| $result:expr) => {
        pub(crate) fn $name<T: Cell>(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
            let $rhs = T::from_cell(ctx.flow.pop());
            let $lhs = T::from_cell(ctx.flow.top());
            ctx.flow.set_top(($result).to_cell());
            Ok(())
        }
    };
}

macro_rules! compare_exec {
    ($name:ident, |$lhs:ident, $rhs:ident| $result:expr) => {
        pub(crate) fn $name<T: Cell>(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
            let $rhs = T::from_cell(ctx.flow.pop());
            let $lhs = T::from_cell(ctx.flow.top());
            ctx.flow.set_top(($result) as u64);
            Ok(())
        }
    };
}

binary_exec!(exec_arithm_add, |lhs, rhs| lhs.wrapping_add(rhs));
binary_exec!(exec_arithm_sub, |lhs, rhs| lhs.wrapping_sub(rhs));
binary_exec!(exec_arithm_mul, |lhs, rhs| lhs.wrapping_mul(rhs));
// Division and modulo by zero yield zero instead of faulting
binary_exec!(exec_arithm_div, |lhs, rhs| if rhs.is_zero() {
    rhs
} else {
    lhs.wrapping_div(rhs)
});
binary_exec!(exec_arithm_mod, |lhs, rhs| if rhs.is_zero() {
    rhs
} else {
    lhs.wrapping_rem(rhs)
});
binary_exec!(exec_arithm_and, |lhs, rhs| lhs & rhs);
binary_exec!(exec_arithm_or, |lhs, rhs| lhs | rhs);
binary_exec!(exec_arithm_xor, |lhs, rhs| lhs ^ rhs);
// The shift count is masked by the result type's bit width
binary_exec!(exec_arithm_shl, |lhs, rhs| lhs
    .wrapping_shl(rhs.to_cell() as u32 & (T::BITS - 1)));
binary_exec!(exec_arithm_shr, |lhs, rhs| lhs
    .wrapping_shr(rhs.to_cell() as u32 & (T::BITS - 1)));

compare_exec!(exec_compare_eq, |lhs, rhs| lhs == rhs);
compare_exec!(exec_compare_neq, |lhs, rhs| lhs != rhs);
compare_exec!(exec_compare_lt, |lhs, rhs| lhs < rhs);
compare_exec!(exec_compare_le, |lhs, rhs| lhs <= rhs);
compare_exec!(exec_compare_gt, |lhs, rhs| lhs > rhs);
compare_exec!(exec_compare_ge, |lhs, rhs| lhs >= rhs);

pub(crate) fn exec_arithm_neg<T: Cell>(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    let value = T::from_cell(ctx.flow.top());
    ctx.flow.set_top(value.wrapping_neg().to_cell());
    Ok(())
}

pub(crate) fn exec_arithm_not<T: Cell>(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    let value = T::from_cell(ctx.flow.top());
    ctx.flow.set_top(value.is_zero() as u64);
    Ok(())
}

pub(crate) fn exec_arithm_bitnot<T: Cell>(ctx: &mut ExecContext<'_>, _parameter: u64) -> Result<()> {
    let value = T::from_cell(ctx.flow.top());
    ctx.flow.set_top((!value).to_cell());
    Ok(())
}
