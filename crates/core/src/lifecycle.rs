//! Session lifecycle.
//!
//! ```text
//! Unauthenticated ──login──▶ Idle ──analyze──▶ Analyzing ──ok──▶ ResultsReady
//!        ▲                    ▲                   │                   │
//!        │                    └──────error────────┘                   │
//!        └─────────── logout / 401 (from any authenticated phase) ────┘
//! ```
//!
//! `ResultsReady` falls back to `Analyzing` directly when a new analysis
//! starts.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Unauthenticated,
    Idle,
    Analyzing,
    ResultsReady,
}

impl Phase {
    pub fn is_authenticated(self) -> bool {
        !matches!(self, Phase::Unauthenticated)
    }

    /// Export actions are only offered once a report is on screen.
    pub fn has_results(self) -> bool {
        matches!(self, Phase::ResultsReady)
    }

    pub fn login(self) -> Result<Phase, TransitionError> {
        match self {
            Phase::Unauthenticated => Ok(Phase::Idle),
            other => Err(TransitionError { from: other, event: "login" }),
        }
    }

    /// Authentication lost: explicit logout or an expired token.
    pub fn sign_out(self) -> Phase {
        Phase::Unauthenticated
    }

    pub fn start_analysis(self) -> Result<Phase, TransitionError> {
        match self {
            Phase::Idle | Phase::ResultsReady => Ok(Phase::Analyzing),
            other => Err(TransitionError { from: other, event: "analyze" }),
        }
    }

    pub fn analysis_succeeded(self) -> Result<Phase, TransitionError> {
        match self {
            Phase::Analyzing => Ok(Phase::ResultsReady),
            other => Err(TransitionError { from: other, event: "analysis success" }),
        }
    }

    pub fn analysis_failed(self) -> Result<Phase, TransitionError> {
        match self {
            Phase::Analyzing => Ok(Phase::Idle),
            other => Err(TransitionError { from: other, event: "analysis failure" }),
        }
    }

    /// Results dismissed without starting a new analysis.
    pub fn acknowledge(self) -> Result<Phase, TransitionError> {
        match self {
            Phase::ResultsReady | Phase::Idle => Ok(Phase::Idle),
            other => Err(TransitionError { from: other, event: "acknowledge" }),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Unauthenticated => "unauthenticated",
            Phase::Idle => "idle",
            Phase::Analyzing => "analyzing",
            Phase::ResultsReady => "results-ready",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: Phase,
    pub event: &'static str,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {} while {}", self.event, self.from)
    }
}

impl std::error::Error for TransitionError {}
