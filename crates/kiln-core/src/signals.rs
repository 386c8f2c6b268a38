//! Signal dispositions.
//!
//! Before a script is loaded every signal goes back to its default
//! disposition, so the script is not shielded by handlers kiln or its
//! parent installed. Signals in [`RESERVED_SIGNALS`] are left alone: they
//! report hardware faults or cannot be changed at all.

use std::io;

/// Signals whose disposition is never touched.
#[cfg(unix)]
pub const RESERVED_SIGNALS: &[i32] = &[
    libc::SIGSEGV,
    libc::SIGBUS,
    libc::SIGILL,
    libc::SIGFPE,
    libc::SIGVTALRM,
    libc::SIGKILL,
    libc::SIGSTOP,
];

#[cfg(not(unix))]
pub const RESERVED_SIGNALS: &[i32] = &[];

/// Access to the process signal table.
pub trait SignalTable {
    /// Every signal number the platform defines.
    fn signals(&self) -> Vec<i32>;

    /// Set `signal` back to its default disposition.
    fn reset(&self, signal: i32) -> io::Result<()>;
}

/// Reset every non-reserved signal to its default disposition.
///
/// Signals the OS refuses to change are logged and skipped. Returns the
/// signals that were reset.
pub fn reset_dispositions(table: &dyn SignalTable) -> Vec<i32> {
    let mut reset = Vec::new();

    for signal in table.signals() {
        if RESERVED_SIGNALS.contains(&signal) {
            continue;
        }

        match table.reset(signal) {
            Ok(()) => reset.push(signal),
            Err(e) => tracing::debug!("Leaving signal {} as is: {}", signal, e),
        }
    }

    reset
}

/// The real signal table of this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSignals;

impl SignalTable for SystemSignals {
    #[cfg(target_os = "linux")]
    fn signals(&self) -> Vec<i32> {
        (1..=libc::SIGRTMAX()).collect()
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    fn signals(&self) -> Vec<i32> {
        (1..32).collect()
    }

    #[cfg(not(unix))]
    fn signals(&self) -> Vec<i32> {
        Vec::new()
    }

    #[cfg(unix)]
    fn reset(&self, signal: i32) -> io::Result<()> {
        // SAFETY: installing SIG_DFL has no memory-safety requirements;
        // invalid signal numbers are rejected with SIG_ERR.
        let previous = unsafe { libc::signal(signal, libc::SIG_DFL) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn reset(&self, _signal: i32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "signal dispositions are not supported on this platform",
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testing::FakeSignals;

    #[test]
    fn test_reserved_signals_untouched() {
        let table = FakeSignals::new(1..32);
        let reset = reset_dispositions(&table);

        for signal in RESERVED_SIGNALS {
            assert!(!reset.contains(signal));
            assert!(!table.was_reset(*signal));
        }
        assert!(table.was_reset(libc::SIGINT));
        assert!(table.was_reset(libc::SIGTERM));
        assert!(table.was_reset(libc::SIGPIPE));
    }

    #[test]
    fn test_refused_signals_are_skipped() {
        let table = FakeSignals::new(1..32).refusing(libc::SIGUSR2);
        let reset = reset_dispositions(&table);

        assert!(!reset.contains(&libc::SIGUSR2));
        assert!(reset.contains(&libc::SIGUSR1));
    }
}
