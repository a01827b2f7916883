//! Single-pass x86-64 JIT for kiln bytecode.
//!
//! The translator lowers the numeric/loop kernel of the instruction set
//! (PUSH, POP, DUP, ADD, SUB, MUL, CMP, backward JMP/JZ/JNZ, HALT) to
//! position-dependent machine code that uses the host stack as the operand
//! stack. Everything else — calls, memory, I/O, allocation, and any forward
//! branch — fails compilation with a typed error so the caller can fall
//! back to the interpreter.
//!
//! The compiled entry point takes no arguments and returns the top-of-stack
//! word; words are widened to 64-bit host pushes, so 32-bit wrap-around is
//! not preserved.

mod asm;
mod compiler;
mod error;
mod exec_mem;

pub use compiler::{CompiledProgram, compile};
pub use error::JitError;
