//! Data movement: PUSH, POP, DUP, HALT.

use crate::error::VmError;
use crate::memory::Word;
use crate::vm::{StepResult, Vm};

pub(crate) fn push(vm: &mut Vm, value: Word) -> Result<StepResult, VmError> {
    vm.stack.push(value)?;
    Ok(StepResult::Continue)
}

pub(crate) fn pop(vm: &mut Vm) -> Result<StepResult, VmError> {
    vm.stack.pop()?;
    Ok(StepResult::Continue)
}

pub(crate) fn dup(vm: &mut Vm) -> Result<StepResult, VmError> {
    let top = vm.stack.top().ok_or(VmError::StackUnderflow { pc: 0 })?;
    vm.stack.push(top)?;
    Ok(StepResult::Continue)
}

pub(crate) fn halt(_vm: &mut Vm) -> Result<StepResult, VmError> {
    Ok(StepResult::Halted)
}
