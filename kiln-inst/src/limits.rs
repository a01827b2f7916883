//! Capacity limits of the kiln virtual machine.
//!
//! These values are part of the bytecode contract: handle encoding biases
//! heap offsets by [`MEM_SIZE`], so changing them changes the meaning of
//! existing images.

/// Operand stack capacity in words.
pub const STACK_SIZE: usize = 256;

/// Return stack capacity in code addresses.
pub const RETURN_STACK_SIZE: usize = 256;

/// Flat (global) memory size in words.
pub const MEM_SIZE: usize = 1024;

/// Heap arena size in words.
pub const HEAP_SIZE: usize = 65536;

/// Words occupied by an object header: size, next-live link, mark bit.
pub const HEADER_WORDS: usize = 3;

/// Number of code addresses covered by the debugger's breakpoint table.
pub const BREAKPOINT_TABLE_SIZE: usize = 4096;

/// Capacity in bytes of the JIT's emitted-code buffer.
pub const JIT_CODE_CAPACITY: usize = 4096;
