//! Error types for JIT compilation.

use core::fmt;

/// Reasons a bytecode image cannot be translated or placed in memory.
/// All of them abort compilation; there is no partial output.
#[derive(Debug)]
pub enum JitError {
    /// Opcode outside the supported numeric/loop kernel.
    UnsupportedOpcode { opcode: u8, pc: usize },
    /// Branch to an address at or after the branch itself.
    ForwardBranch { pc: usize, target: i32 },
    /// Backward branch whose target does not start an instruction.
    UnknownBranchTarget { pc: usize, target: i32 },
    /// Image ends inside a 4-byte immediate.
    TruncatedImmediate { pc: usize },
    /// Emitted code would exceed the fixed buffer.
    CodeBufferExhausted { capacity: usize },
    /// The executable mapping could not be created or protected.
    Map(std::io::Error),
}

impl fmt::Display for JitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JitError::UnsupportedOpcode { opcode, pc } => {
                write!(f, "unsupported opcode 0x{opcode:02X} at pc {pc}")
            }
            JitError::ForwardBranch { pc, target } => {
                write!(f, "forward branch to {target} at pc {pc} is not supported")
            }
            JitError::UnknownBranchTarget { pc, target } => {
                write!(f, "branch target {target} at pc {pc} is not an instruction start")
            }
            JitError::TruncatedImmediate { pc } => {
                write!(f, "truncated immediate at pc {pc}")
            }
            JitError::CodeBufferExhausted { capacity } => {
                write!(f, "emitted code exceeds the {capacity} byte buffer")
            }
            JitError::Map(err) => write!(f, "executable mapping failed: {err}"),
        }
    }
}

impl std::error::Error for JitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JitError::Map(err) => Some(err),
            _ => None,
        }
    }
}
