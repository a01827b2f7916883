//! Control flow: JMP, JZ, JNZ, CALL, RET.
//!
//! Branch targets are absolute byte offsets into the image. Targets are not
//! validated here; an out-of-image pc faults at the next fetch. CALL pushes
//! the address after its immediate, so RET resumes at the next instruction.

use crate::error::VmError;
use crate::vm::{StepResult, Vm};

pub(crate) fn jmp(vm: &mut Vm, target: i32) -> Result<StepResult, VmError> {
    vm.pc = target as u32;
    Ok(StepResult::Continue)
}

pub(crate) fn jz(vm: &mut Vm, target: i32) -> Result<StepResult, VmError> {
    let value = vm.stack.pop()?;
    if value == 0 {
        vm.pc = target as u32;
    }
    Ok(StepResult::Continue)
}

pub(crate) fn jnz(vm: &mut Vm, target: i32) -> Result<StepResult, VmError> {
    let value = vm.stack.pop()?;
    if value != 0 {
        vm.pc = target as u32;
    }
    Ok(StepResult::Continue)
}

pub(crate) fn call(vm: &mut Vm, target: i32) -> Result<StepResult, VmError> {
    vm.return_stack.push(vm.pc)?;
    vm.pc = target as u32;
    Ok(StepResult::Continue)
}

pub(crate) fn ret(vm: &mut Vm) -> Result<StepResult, VmError> {
    vm.pc = vm.return_stack.pop()?;
    Ok(StepResult::Continue)
}
