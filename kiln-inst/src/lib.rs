//! Kiln bytecode instruction set definitions.
//!
//! This crate provides:
//! - Opcode definitions and byte-level encoding rules
//! - Capacity limits shared by the interpreter and the JIT
//! - An image builder for assembling bytecode programs in tests and tools

pub mod builder;
pub mod limits;
pub mod opcode;

// Re-exports for convenience
pub use builder::ImageBuilder;
pub use opcode::{IMMEDIATE_LEN, Opcode};
