//! Transient user notifications.
//!
//! The controller never prints. It hands a [`Notice`] to whatever
//! [`Notifier`] it was built with: stderr for the binary, a recorder in tests.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub tone: Tone,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { tone: Tone::Success, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { tone: Tone::Info, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { tone: Tone::Error, message: message.into() }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Writes notices to stderr. Errors are always shown; the rest are dropped
/// in quiet mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier {
    quiet: bool,
}

impl TerminalNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        log::debug!("notice ({:?}): {}", notice.tone, notice.message);
        let mut err = io::stderr().lock();
        let _ = match notice.tone {
            Tone::Error => writeln!(err, "error: {}", notice.message),
            _ if self.quiet => Ok(()),
            Tone::Success => writeln!(err, "✓ {}", notice.message),
            Tone::Info => writeln!(err, "{}", notice.message),
        };
    }
}

/// Keeps every notice in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Rc<RefCell<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices.borrow().iter().map(|n| n.message.clone()).collect()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.notices.borrow_mut().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }
}
