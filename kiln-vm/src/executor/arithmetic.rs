//! Arithmetic and comparison: ADD, SUB, MUL, DIV, CMP.
//!
//! Stack effect is `a b -- r` with `b` on top. ADD/SUB/MUL wrap on 32-bit
//! two's-complement overflow. CMP is the machine's only comparison
//! primitive: strict less-than yielding 1 or 0.

use crate::error::VmError;
use crate::memory::Word;
use crate::vm::{StepResult, Vm};

fn binary(
    vm: &mut Vm,
    op: impl FnOnce(Word, Word) -> Result<Word, VmError>,
) -> Result<StepResult, VmError> {
    let b = vm.stack.pop()?;
    let a = vm.stack.pop()?;
    vm.stack.push(op(a, b)?)?;
    Ok(StepResult::Continue)
}

pub(crate) fn add(vm: &mut Vm) -> Result<StepResult, VmError> {
    binary(vm, |a, b| Ok(a.wrapping_add(b)))
}

pub(crate) fn sub(vm: &mut Vm) -> Result<StepResult, VmError> {
    binary(vm, |a, b| Ok(a.wrapping_sub(b)))
}

pub(crate) fn mul(vm: &mut Vm) -> Result<StepResult, VmError> {
    binary(vm, |a, b| Ok(a.wrapping_mul(b)))
}

pub(crate) fn div(vm: &mut Vm) -> Result<StepResult, VmError> {
    binary(vm, |a, b| {
        if b == 0 {
            Err(VmError::DivisionByZero { pc: 0 })
        } else {
            // Truncation toward zero; i32::MIN / -1 wraps like the other ops.
            Ok(a.wrapping_div(b))
        }
    })
}

pub(crate) fn cmp(vm: &mut Vm) -> Result<StepResult, VmError> {
    binary(vm, |a, b| Ok(Word::from(a < b)))
}
