//! Minimal x86-64 emitter for the stack-machine translation template.
//!
//! Only the handful of encodings the translator needs, emitted into a
//! bounded buffer. The operand stack lives on the host stack, so nearly
//! everything is a push/pop around rax/rbx.

use crate::error::JitError;

/// Encoded length of `jmp rel32`.
pub(crate) const JMP_REL32_LEN: usize = 5;
/// Encoded length of `je`/`jne rel32`.
pub(crate) const JCC_REL32_LEN: usize = 6;

pub(crate) struct Assembler {
    code: Vec<u8>,
    capacity: usize,
}

impl Assembler {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { code: Vec::with_capacity(capacity), capacity }
    }

    /// Current emission offset, used for branch mapping.
    pub(crate) fn offset(&self) -> usize {
        self.code.len()
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.code
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<(), JitError> {
        if self.code.len() + bytes.len() > self.capacity {
            return Err(JitError::CodeBufferExhausted { capacity: self.capacity });
        }
        self.code.extend_from_slice(bytes);
        Ok(())
    }

    /// `push rbp; mov rbp, rsp; push rbx`
    pub(crate) fn prologue(&mut self) -> Result<(), JitError> {
        self.emit(&[0x55])?;
        self.emit(&[0x48, 0x89, 0xE5])?;
        self.emit(&[0x53])
    }

    /// `push imm32` (sign-extended to 64 bits by the CPU)
    pub(crate) fn push_imm32(&mut self, value: i32) -> Result<(), JitError> {
        self.emit(&[0x68])?;
        self.emit(&value.to_le_bytes())
    }

    /// `pop rax`
    pub(crate) fn pop_rax(&mut self) -> Result<(), JitError> {
        self.emit(&[0x58])
    }

    /// `pop rbx`
    pub(crate) fn pop_rbx(&mut self) -> Result<(), JitError> {
        self.emit(&[0x5B])
    }

    /// `push rax`
    pub(crate) fn push_rax(&mut self) -> Result<(), JitError> {
        self.emit(&[0x50])
    }

    /// `add rax, rbx`
    pub(crate) fn add_rax_rbx(&mut self) -> Result<(), JitError> {
        self.emit(&[0x48, 0x01, 0xD8])
    }

    /// `sub rax, rbx`
    pub(crate) fn sub_rax_rbx(&mut self) -> Result<(), JitError> {
        self.emit(&[0x48, 0x29, 0xD8])
    }

    /// `imul rax, rbx`
    pub(crate) fn imul_rax_rbx(&mut self) -> Result<(), JitError> {
        self.emit(&[0x48, 0x0F, 0xAF, 0xC3])
    }

    /// `cmp rax, rbx; setl al; movzx rax, al` — strict less-than as 0/1
    pub(crate) fn cmp_rax_rbx_setl(&mut self) -> Result<(), JitError> {
        self.emit(&[0x48, 0x39, 0xD8])?;
        self.emit(&[0x0F, 0x9C, 0xC0])?;
        self.emit(&[0x48, 0x0F, 0xB6, 0xC0])
    }

    /// `test rax, rax`
    pub(crate) fn test_rax(&mut self) -> Result<(), JitError> {
        self.emit(&[0x48, 0x85, 0xC0])
    }

    /// `jmp rel32`
    pub(crate) fn jmp_rel32(&mut self, rel: i32) -> Result<(), JitError> {
        self.emit(&[0xE9])?;
        self.emit(&rel.to_le_bytes())
    }

    /// `je rel32`
    pub(crate) fn je_rel32(&mut self, rel: i32) -> Result<(), JitError> {
        self.emit(&[0x0F, 0x84])?;
        self.emit(&rel.to_le_bytes())
    }

    /// `jne rel32`
    pub(crate) fn jne_rel32(&mut self, rel: i32) -> Result<(), JitError> {
        self.emit(&[0x0F, 0x85])?;
        self.emit(&rel.to_le_bytes())
    }

    /// `mov rbx, [rbp-8]` — restore the callee-saved register from its
    /// frame slot. Position-independent of stack depth, unlike a pop: the
    /// operand stack may hold any number of leftover words at HALT.
    pub(crate) fn restore_rbx(&mut self) -> Result<(), JitError> {
        self.emit(&[0x48, 0x8B, 0x5D, 0xF8])
    }

    /// `leave; ret`
    pub(crate) fn leave_ret(&mut self) -> Result<(), JitError> {
        self.emit(&[0xC9, 0xC3])
    }
}
