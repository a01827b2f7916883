//! JIT compilation and execution tests.
//!
//! Compilation tests run everywhere; execution tests are gated to x86-64
//! unix hosts since they run the emitted code.

use kiln_inst::{ImageBuilder, Opcode};
use kiln_jit::{JitError, compile};

#[test]
fn forward_branches_fail_compilation() {
    let mut b = ImageBuilder::new();
    let ahead = b.new_label();
    b.push(1).jnz(ahead);
    b.bind(ahead);
    b.halt();
    match compile(&b.finish().unwrap()) {
        Err(JitError::ForwardBranch { pc: 5, target: 10 }) => {}
        other => panic!("expected forward-branch failure, got {:?}", other.err()),
    }
}

#[test]
fn branch_into_an_immediate_fails_compilation() {
    // JMP 2 targets the middle of the PUSH immediate behind it.
    let mut b = ImageBuilder::new();
    b.push(0);
    b.op(Opcode::Jmp);
    let image = {
        let mut image = b.finish().unwrap();
        image.extend_from_slice(&2i32.to_le_bytes());
        image.push(Opcode::Halt.byte());
        image
    };
    assert!(matches!(
        compile(&image),
        Err(JitError::UnknownBranchTarget { pc: 5, target: 2 })
    ));
}

#[test]
fn unsupported_opcodes_fail_compilation() {
    for opcode in [
        Opcode::Div,
        Opcode::Store,
        Opcode::Load,
        Opcode::Call,
        Opcode::Ret,
        Opcode::Print,
        Opcode::Input,
        Opcode::Alloc,
    ] {
        let mut b = ImageBuilder::new();
        b.push(1).push(1);
        if opcode.has_immediate() {
            // STORE/LOAD/CALL carry an index or address immediate.
            match opcode {
                Opcode::Store => b.store(0),
                Opcode::Load => b.load(0),
                _ => {
                    let here = b.new_label();
                    b.bind(here).call(here)
                }
            };
        } else {
            b.op(opcode);
        }
        b.halt();
        assert!(
            matches!(
                compile(&b.finish().unwrap()),
                Err(JitError::UnsupportedOpcode { .. })
            ),
            "{} must not compile",
            opcode.mnemonic()
        );
    }
}

#[test]
fn truncated_immediate_fails_compilation() {
    let image = vec![Opcode::Push.byte(), 0x01, 0x02];
    assert!(matches!(
        compile(&image),
        Err(JitError::TruncatedImmediate { pc: 0 })
    ));
}

#[test]
fn unknown_byte_fails_compilation() {
    assert!(matches!(
        compile(&[0x99]),
        Err(JitError::UnsupportedOpcode { opcode: 0x99, pc: 0 })
    ));
}

#[test]
fn oversized_programs_exhaust_the_code_buffer() {
    let mut b = ImageBuilder::new();
    // Each PUSH lowers to 5 machine bytes; 900 of them blow the 4096 cap.
    for i in 0..900 {
        b.push(i);
    }
    b.halt();
    assert!(matches!(
        compile(&b.finish().unwrap()),
        Err(JitError::CodeBufferExhausted { capacity: 4096 })
    ));
}

#[cfg(all(target_arch = "x86_64", unix))]
mod execution {
    use super::*;
    use kiln_vm::{RunOutcome, Vm};

    fn countdown_image() -> Vec<u8> {
        // PUSH 10; L: PUSH 1; SUB; DUP; JNZ L; HALT
        let mut b = ImageBuilder::new();
        let top = b.new_label();
        b.push(10);
        b.bind(top);
        b.push(1).op(Opcode::Sub).op(Opcode::Dup).jnz(top);
        b.halt();
        b.finish().unwrap()
    }

    /// Interpreter and JIT must agree on the top-of-stack at HALT for the
    /// supported opcode subset.
    fn assert_equivalent(image: Vec<u8>) -> i64 {
        let jit_result = compile(&image).expect("image should compile").run();
        let mut vm = Vm::new(image);
        assert_eq!(vm.run(), Ok(RunOutcome::Halted));
        let interpreted = vm.top_of_stack().expect("program leaves a result");
        assert_eq!(jit_result, i64::from(interpreted));
        jit_result
    }

    #[test]
    fn push_halt_returns_the_value() {
        let mut b = ImageBuilder::new();
        b.push(42).halt();
        assert_eq!(assert_equivalent(b.finish().unwrap()), 42);
    }

    #[test]
    fn countdown_loop_reaches_zero() {
        assert_eq!(assert_equivalent(countdown_image()), 0);
    }

    #[test]
    fn arithmetic_expression() {
        // 2 + 3 * 4 - 5 = 9, evaluated as ((3*4) + 2) - 5 on the stack.
        let mut b = ImageBuilder::new();
        b.push(3).push(4).op(Opcode::Mul);
        b.push(2).op(Opcode::Add);
        b.push(5).op(Opcode::Sub);
        b.halt();
        assert_eq!(assert_equivalent(b.finish().unwrap()), 9);
    }

    #[test]
    fn negative_immediates_sign_extend() {
        let mut b = ImageBuilder::new();
        b.push(-100).push(58).op(Opcode::Add).halt();
        assert_eq!(assert_equivalent(b.finish().unwrap()), -42);
    }

    #[test]
    fn cmp_yields_zero_and_one() {
        let mut b = ImageBuilder::new();
        b.push(4).push(5).op(Opcode::Cmp).halt();
        assert_eq!(assert_equivalent(b.finish().unwrap()), 1);

        let mut b = ImageBuilder::new();
        b.push(5).push(5).op(Opcode::Cmp).halt();
        assert_eq!(assert_equivalent(b.finish().unwrap()), 0);
    }

    #[test]
    fn dup_and_pop_shuffle_the_stack() {
        let mut b = ImageBuilder::new();
        b.push(6).op(Opcode::Dup).op(Opcode::Add).push(9).op(Opcode::Pop).halt();
        assert_eq!(assert_equivalent(b.finish().unwrap()), 12);
    }

    #[test]
    fn nested_backward_branches() {
        // Two chained countdown loops over the same counter word.
        let mut b = ImageBuilder::new();
        let first = b.new_label();
        b.push(5);
        b.bind(first);
        b.push(1).op(Opcode::Sub).op(Opcode::Dup).jnz(first);
        // Counter hit zero; seed a second loop from 3.
        let second = b.new_label();
        b.push(3).op(Opcode::Add);
        b.bind(second);
        b.push(1).op(Opcode::Sub).op(Opcode::Dup).jnz(second);
        b.halt();
        assert_eq!(assert_equivalent(b.finish().unwrap()), 0);
    }

    #[test]
    fn code_after_halt_is_ignored() {
        let mut b = ImageBuilder::new();
        b.push(7).halt();
        // Garbage past the first HALT must not affect translation.
        let mut image = b.finish().unwrap();
        image.extend_from_slice(&[0x99, 0x98, 0x97]);
        assert_eq!(compile(&image).expect("halt ends translation").run(), 7);
    }
}
