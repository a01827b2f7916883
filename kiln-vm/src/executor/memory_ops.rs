//! Addressed access: STORE, LOAD.
//!
//! One index space covers both regions: indices below `MEM_SIZE` hit flat
//! memory, everything from `MEM_SIZE` up addresses the heap arena at
//! `index - MEM_SIZE`. Heap stores may touch any arena word, headers
//! included; the collector defends against the damage, not this layer.

use crate::error::VmError;
use crate::memory::Word;
use crate::vm::{StepResult, Vm};
use kiln_inst::limits::MEM_SIZE;

pub(crate) fn store(vm: &mut Vm, index: i32) -> Result<StepResult, VmError> {
    let value = vm.stack.pop()?;
    write_indexed(vm, index, value)?;
    Ok(StepResult::Continue)
}

pub(crate) fn load(vm: &mut Vm, index: i32) -> Result<StepResult, VmError> {
    let value = read_indexed(vm, index)?;
    vm.stack.push(value)?;
    Ok(StepResult::Continue)
}

fn write_indexed(vm: &mut Vm, index: i32, value: Word) -> Result<(), VmError> {
    if index < 0 {
        return Err(VmError::MemoryOutOfBounds { index, pc: 0 });
    }
    if (index as usize) < MEM_SIZE {
        // In range by the check above.
        vm.memory.set(index as usize, value);
        return Ok(());
    }
    let offset = index as usize - MEM_SIZE;
    if vm.heap.set(offset, value) {
        Ok(())
    } else {
        Err(VmError::HeapOutOfBounds { index, pc: 0 })
    }
}

fn read_indexed(vm: &Vm, index: i32) -> Result<Word, VmError> {
    if index < 0 {
        return Err(VmError::MemoryOutOfBounds { index, pc: 0 });
    }
    if (index as usize) < MEM_SIZE {
        return Ok(vm.memory.get(index as usize).unwrap_or(0));
    }
    let offset = index as usize - MEM_SIZE;
    vm.heap
        .get(offset)
        .ok_or(VmError::HeapOutOfBounds { index, pc: 0 })
}
