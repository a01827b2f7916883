//! Signal-driven introspection triggers.
//!
//! Three process signals request out-of-band reports from a running machine:
//! SIGUSR1 for memory statistics, SIGUSR2 for a leak check, SIGURG for a
//! forced collection cycle. The handlers do nothing but set bits in a static
//! flag word; the dispatch loop drains the word between instructions, so all
//! VM mutation happens at safe points and the handlers stay async-signal-safe.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};

const MEMSTAT_BIT: u32 = 1 << 0;
const LEAKS_BIT: u32 = 1 << 1;
const FORCE_GC_BIT: u32 = 1 << 2;

static PENDING: AtomicU32 = AtomicU32::new(0);

/// Triggers drained from the flag word at a safe point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triggers(u32);

impl Triggers {
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn memstat(self) -> bool {
        self.0 & MEMSTAT_BIT != 0
    }

    pub fn leaks(self) -> bool {
        self.0 & LEAKS_BIT != 0
    }

    pub fn force_gc(self) -> bool {
        self.0 & FORCE_GC_BIT != 0
    }
}

extern "C" fn on_memstat(_signal: libc::c_int) {
    PENDING.fetch_or(MEMSTAT_BIT, Ordering::Relaxed);
}

extern "C" fn on_leaks(_signal: libc::c_int) {
    PENDING.fetch_or(LEAKS_BIT, Ordering::Relaxed);
}

extern "C" fn on_force_gc(_signal: libc::c_int) {
    PENDING.fetch_or(FORCE_GC_BIT, Ordering::Relaxed);
}

/// Install the three trigger handlers for this process.
pub fn install() -> io::Result<()> {
    // SAFETY: each handler only performs an atomic fetch_or on a static,
    // which is async-signal-safe.
    unsafe {
        register(libc::SIGUSR1, on_memstat as libc::sighandler_t)?;
        register(libc::SIGUSR2, on_leaks as libc::sighandler_t)?;
        register(libc::SIGURG, on_force_gc as libc::sighandler_t)?;
    }
    Ok(())
}

/// Register `handler` for `signal` with SA_RESTART so interrupted reads
/// (INPUT, the debugger prompt) resume instead of failing.
///
/// # Safety
/// `handler` must be an async-signal-safe `extern "C" fn(libc::c_int)`.
unsafe fn register(signal: libc::c_int, handler: libc::sighandler_t) -> io::Result<()> {
    // SAFETY: sigaction is zero-initializable and fully overwritten below.
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = handler;
    action.sa_flags = libc::SA_RESTART;
    // SAFETY: action is a valid sigaction and the old-action pointer may be
    // null.
    let rc = unsafe {
        libc::sigemptyset(&raw mut action.sa_mask);
        libc::sigaction(signal, &raw const action, std::ptr::null_mut())
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Swap out and clear all pending trigger bits.
pub fn take_pending() -> Triggers {
    Triggers(PENDING.swap(0, Ordering::Relaxed))
}

#[cfg(test)]
pub(crate) fn raise_for_test(memstat: bool, leaks: bool, force_gc: bool) {
    let mut bits = 0;
    if memstat {
        bits |= MEMSTAT_BIT;
    }
    if leaks {
        bits |= LEAKS_BIT;
    }
    if force_gc {
        bits |= FORCE_GC_BIT;
    }
    PENDING.fetch_or(bits, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test owns the process-global flag word; splitting these up would
    // race under the parallel test runner.
    #[test]
    fn flag_word_sets_and_drains() {
        let _ = take_pending();
        assert!(take_pending().is_empty());

        raise_for_test(true, false, true);
        let pending = take_pending();
        assert!(pending.memstat());
        assert!(!pending.leaks());
        assert!(pending.force_gc());
        assert!(take_pending().is_empty());

        on_memstat(libc::SIGUSR1);
        let pending = take_pending();
        assert!(pending.memstat());
        assert!(!pending.leaks());
        assert!(!pending.force_gc());
    }
}
