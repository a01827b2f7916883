//! Single-pass translation of kiln bytecode to machine code.
//!
//! One forward scan over the image. A per-byte-offset mapping records where
//! every translated instruction begins in the emitted buffer; branches may
//! therefore only target addresses already behind the scan. HALT emits the
//! epilogue and ends translation — code after the first HALT is never
//! reached by the entry point and is not translated.

use crate::asm::{Assembler, JCC_REL32_LEN, JMP_REL32_LEN};
use crate::error::JitError;
use crate::exec_mem::ExecutableMemory;
use kiln_inst::limits::JIT_CODE_CAPACITY;
use kiln_inst::{IMMEDIATE_LEN, Opcode};

/// A bytecode image translated to native code.
pub struct CompiledProgram {
    memory: ExecutableMemory,
}

impl CompiledProgram {
    /// Execute the program and return the word left on top of the operand
    /// stack at HALT.
    pub fn run(&self) -> i64 {
        let entry = self.memory.entry();
        // SAFETY: compile() only constructs a CompiledProgram after emitting
        // a complete function: frame prologue, balanced branch targets, and
        // an epilogue that restores the callee-saved register and returns.
        unsafe { entry() }
    }
}

/// Translate a whole bytecode image.
///
/// Supported opcodes are the numeric/loop kernel; anything else, a forward
/// branch, or emitted code past the buffer capacity fails compilation.
pub fn compile(code: &[u8]) -> Result<CompiledProgram, JitError> {
    let mut asm = Assembler::new(JIT_CODE_CAPACITY);
    asm.prologue()?;

    // Machine offset of each bytecode offset that starts an instruction.
    let mut mapping: Vec<Option<u32>> = vec![None; code.len()];
    let mut pc = 0usize;
    let mut saw_halt = false;

    while pc < code.len() {
        let inst_pc = pc;
        mapping[inst_pc] = Some(asm.offset() as u32);
        let byte = code[pc];
        pc += 1;
        let opcode = Opcode::from_byte(byte)
            .ok_or(JitError::UnsupportedOpcode { opcode: byte, pc: inst_pc })?;

        match opcode {
            Opcode::Push => {
                let value = read_immediate(code, &mut pc, inst_pc)?;
                asm.push_imm32(value)?;
            }
            Opcode::Pop => asm.pop_rax()?,
            Opcode::Dup => {
                asm.pop_rax()?;
                asm.push_rax()?;
                asm.push_rax()?;
            }
            Opcode::Add => {
                asm.pop_rbx()?;
                asm.pop_rax()?;
                asm.add_rax_rbx()?;
                asm.push_rax()?;
            }
            Opcode::Sub => {
                asm.pop_rbx()?;
                asm.pop_rax()?;
                asm.sub_rax_rbx()?;
                asm.push_rax()?;
            }
            Opcode::Mul => {
                asm.pop_rbx()?;
                asm.pop_rax()?;
                asm.imul_rax_rbx()?;
                asm.push_rax()?;
            }
            Opcode::Cmp => {
                asm.pop_rbx()?;
                asm.pop_rax()?;
                asm.cmp_rax_rbx_setl()?;
                asm.push_rax()?;
            }
            Opcode::Jmp => {
                let target = read_immediate(code, &mut pc, inst_pc)?;
                let dst = backward_target(&mapping, inst_pc, target)?;
                asm.jmp_rel32(rel32(dst, asm.offset(), JMP_REL32_LEN))?;
            }
            Opcode::Jz => {
                let target = read_immediate(code, &mut pc, inst_pc)?;
                asm.pop_rax()?;
                asm.test_rax()?;
                let dst = backward_target(&mapping, inst_pc, target)?;
                asm.je_rel32(rel32(dst, asm.offset(), JCC_REL32_LEN))?;
            }
            Opcode::Jnz => {
                let target = read_immediate(code, &mut pc, inst_pc)?;
                asm.pop_rax()?;
                asm.test_rax()?;
                let dst = backward_target(&mapping, inst_pc, target)?;
                asm.jne_rel32(rel32(dst, asm.offset(), JCC_REL32_LEN))?;
            }
            Opcode::Halt => {
                emit_epilogue(&mut asm)?;
                saw_halt = true;
                break;
            }
            Opcode::Div
            | Opcode::Store
            | Opcode::Load
            | Opcode::Call
            | Opcode::Ret
            | Opcode::Print
            | Opcode::Input
            | Opcode::Alloc => {
                return Err(JitError::UnsupportedOpcode { opcode: byte, pc: inst_pc });
            }
        }
    }

    if !saw_halt {
        emit_epilogue(&mut asm)?;
    }

    log::debug!("compiled {} bytecode bytes to {} machine bytes", code.len(), asm.offset());
    let memory = ExecutableMemory::with_code(asm.bytes())?;
    Ok(CompiledProgram { memory })
}

/// `pop rax` as the return value, restore rbx, tear down the frame.
fn emit_epilogue(asm: &mut Assembler) -> Result<(), JitError> {
    asm.pop_rax()?;
    asm.restore_rbx()?;
    asm.leave_ret()
}

fn read_immediate(code: &[u8], pc: &mut usize, inst_pc: usize) -> Result<i32, JitError> {
    let bytes = code
        .get(*pc..*pc + IMMEDIATE_LEN)
        .ok_or(JitError::TruncatedImmediate { pc: inst_pc })?;
    *pc += IMMEDIATE_LEN;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Resolve a branch target to its already-emitted machine offset.
fn backward_target(mapping: &[Option<u32>], inst_pc: usize, target: i32) -> Result<u32, JitError> {
    if target < 0 || target as usize >= inst_pc {
        return Err(JitError::ForwardBranch { pc: inst_pc, target });
    }
    mapping[target as usize].ok_or(JitError::UnknownBranchTarget { pc: inst_pc, target })
}

/// rel32 displacement from the end of the branch instruction about to be
/// emitted at `current` to the recorded `target` offset.
fn rel32(target: u32, current: usize, inst_len: usize) -> i32 {
    target as i32 - (current + inst_len) as i32
}
