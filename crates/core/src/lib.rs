//! Core types shared by the client, export and CLI crates.
//!
//! No I/O happens here: reports, the section splitter, the session lifecycle
//! and the in-memory session state.

pub mod lifecycle;
pub mod report;
pub mod splitter;
pub mod state;

pub use lifecycle::{Phase, TransitionError};
pub use report::{Report, ReportSections, Session};
pub use splitter::{split_sections, SectionBundle, SectionKind};
pub use state::{AuthSession, SessionState, UserInfo};
