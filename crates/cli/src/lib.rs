//! riskview terminal client.
//!
//! The binary is a thin clap front end over [`controller::Controller`]; the
//! library half exists so integration tests can drive the controller
//! directly against a mock service.

pub mod controller;
pub mod notify;
pub mod render;
mod util;

pub use controller::{Controller, Refusal};
pub use notify::{Notice, Notifier, RecordingNotifier, TerminalNotifier, Tone};
