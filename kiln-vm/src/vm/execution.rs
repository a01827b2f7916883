//! Instruction fetch and dispatch.

use super::state::Vm;
use super::types::StepResult;
use crate::error::VmError;
use crate::executor::{arithmetic, control, data, heap_ops, io, memory_ops};
use kiln_inst::{IMMEDIATE_LEN, Opcode};

impl Vm {
    /// Fetch the opcode byte at `pc` and advance past it.
    fn fetch_opcode(&mut self) -> Result<u8, VmError> {
        let byte = self
            .code
            .get(self.pc as usize)
            .copied()
            .ok_or(VmError::PcOutOfBounds { pc: self.pc, image_len: self.code.len() })?;
        self.pc += 1;
        Ok(byte)
    }

    /// Fetch a little-endian 4-byte immediate and advance past it.
    fn fetch_immediate(&mut self) -> Result<i32, VmError> {
        let at = self.pc as usize;
        let bytes = self
            .code
            .get(at..at + IMMEDIATE_LEN)
            .ok_or(VmError::TruncatedImmediate { pc: self.pc })?;
        // get() guarantees exactly IMMEDIATE_LEN bytes here.
        let value = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        self.pc += IMMEDIATE_LEN as u32;
        Ok(value)
    }

    /// Execute the instruction at `pc`.
    ///
    /// This is the hot path used by the run loop; safe-point servicing
    /// (async triggers, debugger gate) happens in the caller, never here.
    pub(super) fn step_inner(&mut self) -> Result<StepResult, VmError> {
        let start_pc = self.pc;
        self.dispatch().map_err(|e| e.at(start_pc))
    }

    fn dispatch(&mut self) -> Result<StepResult, VmError> {
        let byte = self.fetch_opcode()?;
        let opcode = Opcode::from_byte(byte)
            .ok_or(VmError::UnknownOpcode { opcode: byte, pc: 0 })?;

        match opcode {
            Opcode::Push => {
                let value = self.fetch_immediate()?;
                data::push(self, value)
            }
            Opcode::Pop => data::pop(self),
            Opcode::Dup => data::dup(self),
            Opcode::Halt => data::halt(self),

            Opcode::Add => arithmetic::add(self),
            Opcode::Sub => arithmetic::sub(self),
            Opcode::Mul => arithmetic::mul(self),
            Opcode::Div => arithmetic::div(self),
            Opcode::Cmp => arithmetic::cmp(self),

            Opcode::Jmp => {
                let target = self.fetch_immediate()?;
                control::jmp(self, target)
            }
            Opcode::Jz => {
                let target = self.fetch_immediate()?;
                control::jz(self, target)
            }
            Opcode::Jnz => {
                let target = self.fetch_immediate()?;
                control::jnz(self, target)
            }
            Opcode::Call => {
                let target = self.fetch_immediate()?;
                control::call(self, target)
            }
            Opcode::Ret => control::ret(self),

            Opcode::Store => {
                let index = self.fetch_immediate()?;
                memory_ops::store(self, index)
            }
            Opcode::Load => {
                let index = self.fetch_immediate()?;
                memory_ops::load(self, index)
            }

            Opcode::Print => io::print(self),
            Opcode::Input => io::input(self),
            Opcode::Alloc => heap_ops::alloc(self),
        }
    }

    /// Execute a single instruction.
    ///
    /// Public API for single-step execution; `run()` drives whole programs.
    pub fn step(&mut self) -> Result<StepResult, VmError> {
        self.step_inner()
    }
}
