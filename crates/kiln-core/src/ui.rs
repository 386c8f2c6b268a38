//! User-facing output sink.
//!
//! The sink is nullable: while a command is being replaced or loaded it is
//! swapped out for nothing, so kiln's own messages cannot interleave with
//! the target's output. [`UiHandle::suppress`] returns a guard that puts
//! the previous sink back when dropped, on every exit path.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

const RESET: &str = "\x1b[0m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

/// Destination for user-facing messages.
pub trait Ui {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Terminal UI writing to stderr.
#[derive(Debug, Clone, Copy)]
pub struct Shell {
    color: bool,
}

impl Shell {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn write(&self, color: &str, message: &str) {
        let mut stderr = io::stderr().lock();
        let _ = if self.color {
            writeln!(stderr, "{color}{message}{RESET}")
        } else {
            writeln!(stderr, "{message}")
        };
    }
}

impl Ui for Shell {
    fn error(&self, message: &str) {
        self.write(RED, message);
    }

    fn warn(&self, message: &str) {
        self.write(YELLOW, message);
    }
}

/// Shared, nullable reference to the current UI sink.
///
/// Clones refer to the same slot, so a sink suppressed through one clone is
/// suppressed for all of them.
#[derive(Clone, Default)]
pub struct UiHandle {
    slot: Rc<RefCell<Option<Rc<dyn Ui>>>>,
}

impl fmt::Debug for UiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiHandle")
            .field("suppressed", &self.is_suppressed())
            .finish()
    }
}

impl UiHandle {
    pub fn new(ui: impl Ui + 'static) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(Rc::new(ui)))),
        }
    }

    /// A handle with no sink; every message is dropped.
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_suppressed(&self) -> bool {
        self.slot.borrow().is_none()
    }

    pub fn error(&self, message: &str) {
        if let Some(ui) = self.current() {
            ui.error(message);
        }
    }

    pub fn warn(&self, message: &str) {
        if let Some(ui) = self.current() {
            ui.warn(message);
        }
    }

    /// Null the sink until the returned guard is dropped.
    pub fn suppress(&self) -> SuppressedUi {
        let saved = self.slot.borrow_mut().take();
        SuppressedUi {
            handle: self.clone(),
            saved,
        }
    }

    fn current(&self) -> Option<Rc<dyn Ui>> {
        self.slot.borrow().clone()
    }
}

/// Guard returned by [`UiHandle::suppress`].
#[must_use = "the UI is restored as soon as the guard is dropped"]
pub struct SuppressedUi {
    handle: UiHandle,
    saved: Option<Rc<dyn Ui>>,
}

impl SuppressedUi {
    /// Put the saved sink back now.
    pub fn restore(self) {}
}

impl Drop for SuppressedUi {
    fn drop(&mut self) {
        *self.handle.slot.borrow_mut() = self.saved.take();
    }
}
