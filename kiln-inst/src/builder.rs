//! Flat bytecode image assembly.
//!
//! [`ImageBuilder`] emits instructions into a byte buffer and resolves label
//! references in a final patch pass, so programs can branch forward without
//! hand-computing addresses. It is the test and tooling counterpart of the
//! external assembler that normally produces images.

use crate::opcode::Opcode;

/// A code-address placeholder handed out by [`ImageBuilder::new_label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Error raised by [`ImageBuilder::finish`] when a referenced label was
/// never bound to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnboundLabel(pub usize);

impl core::fmt::Display for UnboundLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "label {} referenced but never bound", self.0)
    }
}

impl std::error::Error for UnboundLabel {}

/// Two-pass bytecode emitter with label patching.
#[derive(Debug, Default)]
pub struct ImageBuilder {
    code: Vec<u8>,
    labels: Vec<Option<u32>>,
    // (patch position, label index) pairs resolved in finish()
    fixups: Vec<(usize, usize)>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current emission address.
    pub fn here(&self) -> u32 {
        self.code.len() as u32
    }

    /// Allocate a fresh, unbound label.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the current emission address.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        self.labels[label.0] = Some(self.here());
        self
    }

    /// Emit a bare (immediate-free) instruction.
    pub fn op(&mut self, op: Opcode) -> &mut Self {
        self.code.push(op.byte());
        self
    }

    fn op_imm(&mut self, op: Opcode, imm: i32) -> &mut Self {
        self.code.push(op.byte());
        self.code.extend_from_slice(&imm.to_le_bytes());
        self
    }

    fn op_label(&mut self, op: Opcode, target: Label) -> &mut Self {
        self.code.push(op.byte());
        self.fixups.push((self.code.len(), target.0));
        self.code.extend_from_slice(&[0; 4]);
        self
    }

    pub fn push(&mut self, value: i32) -> &mut Self {
        self.op_imm(Opcode::Push, value)
    }

    pub fn store(&mut self, index: i32) -> &mut Self {
        self.op_imm(Opcode::Store, index)
    }

    pub fn load(&mut self, index: i32) -> &mut Self {
        self.op_imm(Opcode::Load, index)
    }

    pub fn jmp(&mut self, target: Label) -> &mut Self {
        self.op_label(Opcode::Jmp, target)
    }

    pub fn jz(&mut self, target: Label) -> &mut Self {
        self.op_label(Opcode::Jz, target)
    }

    pub fn jnz(&mut self, target: Label) -> &mut Self {
        self.op_label(Opcode::Jnz, target)
    }

    pub fn call(&mut self, target: Label) -> &mut Self {
        self.op_label(Opcode::Call, target)
    }

    pub fn halt(&mut self) -> &mut Self {
        self.op(Opcode::Halt)
    }

    /// Patch all label references and return the finished image.
    pub fn finish(self) -> Result<Vec<u8>, UnboundLabel> {
        let mut code = self.code;
        for (position, label) in self.fixups {
            let address = self.labels[label].ok_or(UnboundLabel(label))?;
            code[position..position + 4].copy_from_slice(&(address as i32).to_le_bytes());
        }
        Ok(code)
    }
}
