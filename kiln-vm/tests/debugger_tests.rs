//! Debugger sessions scripted over in-memory streams.

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use kiln_inst::{ImageBuilder, Opcode};
use kiln_vm::{Debugger, LineTable, RunOutcome, Vm};

/// Writer handle that keeps the transcript readable after the debugger
/// consumes the other end.
#[derive(Clone, Default)]
struct Transcript(Arc<Mutex<Vec<u8>>>);

impl Transcript {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn scripted(commands: &str) -> (Debugger, Transcript) {
    let transcript = Transcript::default();
    let debugger = Debugger::with_io(
        Box::new(Cursor::new(commands.to_owned().into_bytes())),
        Box::new(transcript.clone()),
    );
    (debugger, transcript)
}

fn countdown_image() -> Vec<u8> {
    let mut b = ImageBuilder::new();
    let top = b.new_label();
    b.push(10);
    b.bind(top);
    b.push(1).op(Opcode::Sub).op(Opcode::Dup).jnz(top);
    b.halt();
    b.finish().unwrap()
}

#[test]
fn stepped_execution_matches_unattended_execution() {
    let mut unattended = Vm::new(countdown_image());
    assert_eq!(unattended.run(), Ok(RunOutcome::Halted));

    // Step twice, then continue to completion; the trailing prompt at the
    // finished stop reads EOF and resumes out.
    let (debugger, transcript) = scripted("s\ns\nc\n");
    let mut attended = Vm::new(countdown_image()).with_debugger(debugger);
    assert_eq!(attended.run(), Ok(RunOutcome::Halted));

    assert_eq!(attended.top_of_stack(), unattended.top_of_stack());
    let text = transcript.text();
    assert!(text.contains("PC: 0, Opcode: 0x01"));
    assert!(text.contains("vm-dbg> "));
    assert!(text.contains("Execution finished."));
}

#[test]
fn breakpoint_pauses_at_its_address() {
    let image = countdown_image();
    // The loop body starts at 5 (after the initial PUSH).
    let (mut debugger, transcript) = scripted("registers\nquit\n");
    debugger.set_step_mode(false);
    assert!(debugger.set_breakpoint(5));

    let mut vm = Vm::new(image).with_debugger(debugger);
    assert_eq!(vm.run(), Ok(RunOutcome::Quit));
    assert_eq!(vm.pc(), 5);

    let text = transcript.text();
    assert!(text.contains("PC: 5, Opcode: 0x01"));
    assert!(text.contains("PC: 5, SP: 0, RSP: -1"));
    assert!(text.contains("Top of Stack: 10"));
}

#[test]
fn break_command_takes_effect_on_resume() {
    // Arm a breakpoint on the HALT at 17 from the first pause, then continue.
    let (debugger, transcript) = scripted("break 17\nc\nquit\n");
    let mut vm = Vm::new(countdown_image()).with_debugger(debugger);
    assert_eq!(vm.run(), Ok(RunOutcome::Quit));
    assert_eq!(vm.pc(), 17);
    assert!(transcript.text().contains("Breakpoint set at 17"));
}

#[test]
fn memstat_and_leaks_commands_report() {
    let mut b = ImageBuilder::new();
    b.push(8).op(Opcode::Alloc).op(Opcode::Pop).halt();
    let image = b.finish().unwrap();

    // Pause at the HALT: the allocated object is unreachable by then.
    let (mut debugger, transcript) = scripted("memstat\nleaks\nquit\n");
    debugger.set_step_mode(false);
    assert!(debugger.set_breakpoint(7));

    let mut vm = Vm::new(image).with_debugger(debugger);
    assert_eq!(vm.run(), Ok(RunOutcome::Quit));

    let text = transcript.text();
    assert!(text.contains("Heap Ptr: 11"));
    assert!(text.contains("[Leaks Report]"));
    assert!(text.contains("Leak: Object at Heap[0] (Size: 8 words)"));
    assert!(text.contains("Summary: 1 leaked objects, 8 total words."));
}

#[test]
fn source_line_reported_when_table_maps_the_pc() {
    let (debugger, transcript) = scripted("quit\n");
    let debugger = debugger.with_line_table(LineTable::parse("0 3\n5 4\n"));

    let mut vm = Vm::new(countdown_image()).with_debugger(debugger);
    assert_eq!(vm.run(), Ok(RunOutcome::Quit));
    assert!(transcript.text().contains("[Source Line 3]"));
}

#[test]
fn fault_is_a_terminal_stop_with_inspection() {
    let mut b = ImageBuilder::new();
    b.push(1).push(0).op(Opcode::Div).halt();
    let image = b.finish().unwrap();

    let (debugger, transcript) = scripted("c\nregisters\nquit\n");
    let mut vm = Vm::new(image).with_debugger(debugger);
    assert!(vm.run().is_err());

    let text = transcript.text();
    assert!(text.contains("Runtime Error: Division by Zero"));
    assert!(text.contains("RSP: -1"));
}
