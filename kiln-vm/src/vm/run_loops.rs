//! High-level run loop and safe-point servicing.

use std::io::Write;

use super::state::Vm;
use super::types::{RunOutcome, StepResult};
use crate::debugger::DebugAction;
use crate::error::VmError;
use crate::gc;
use crate::signals::{self, Triggers};
use kiln_inst::limits::HEAP_SIZE;

impl Vm {
    /// Run the machine until HALT, a debugger quit, or a fault.
    ///
    /// Each iteration of the loop is a safe point: pending async triggers
    /// are serviced first, then the debugger gate may pause, then exactly
    /// one instruction executes. Nothing suspends mid-instruction; a GC
    /// cycle inside ALLOC runs to completion before the loop resumes.
    pub fn run(&mut self) -> Result<RunOutcome, VmError> {
        loop {
            let pending = signals::take_pending();
            if !pending.is_empty() {
                self.service_triggers(pending);
            }

            if let Some(DebugAction::Quit) = self.debug_gate() {
                return Ok(RunOutcome::Quit);
            }

            match self.step_inner() {
                Ok(StepResult::Continue) => {}
                Ok(StepResult::Halted) => {
                    self.finish_debug_session(None);
                    return Ok(RunOutcome::Halted);
                }
                Err(err) => {
                    self.finish_debug_session(Some(&err));
                    return Err(err);
                }
            }
        }
    }

    /// Run one collection cycle outside allocation pressure, exactly as the
    /// force-gc trigger does.
    pub fn collect_garbage(&mut self) {
        gc::collect(self);
    }

    /// Pause in the debugger if stepping is on or a breakpoint matches.
    fn debug_gate(&mut self) -> Option<DebugAction> {
        let pause = self
            .debugger
            .as_ref()
            .is_some_and(|debugger| debugger.should_pause(self.pc));
        if !pause {
            return None;
        }
        // The REPL inspects the machine, so the debugger moves out of it
        // for the duration of the pause.
        let mut debugger = self.debugger.take()?;
        let opcode = self.code.get(self.pc as usize).copied();
        debugger.announce_pause(self.pc, opcode);
        let action = debugger.repl(self);
        self.debugger = Some(debugger);
        Some(action)
    }

    /// Terminal stop under the debugger: report how the run ended and keep
    /// accepting inspection commands until a resume or quit.
    fn finish_debug_session(&mut self, fault: Option<&VmError>) {
        let Some(mut debugger) = self.debugger.take() else {
            return;
        };
        match fault {
            Some(err) => debugger.announce_fault(err),
            None => debugger.announce_finished(),
        }
        let _ = debugger.repl(self);
        self.debugger = Some(debugger);
    }

    /// Service async introspection triggers at a safe point. Handlers only
    /// set flag bits; all VM mutation happens here, between instructions.
    fn service_triggers(&mut self, pending: Triggers) {
        let mut err = std::io::stderr().lock();
        if pending.memstat() {
            self.write_memstat(&mut err);
        }
        if pending.leaks() {
            gc::leak_report(self, &mut err);
        }
        if pending.force_gc() {
            let _ = writeln!(err, "[VM] Forcing Garbage Collection...");
            gc::collect(self);
            let _ = writeln!(
                err,
                "[VM] GC Complete. Heap: {} / {} words",
                self.heap.free_ptr(),
                HEAP_SIZE
            );
        }
    }
}
