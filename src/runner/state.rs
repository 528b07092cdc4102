//! Runner lifecycle states

#![allow(clippy::must_use_candidate)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`JobRunner`](super::JobRunner)
///
/// ```text
/// INIT --bind--> READY --start--> STARTED --+--> FINISHED
///                                           +--> ERROR
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunnerState {
    /// No job list bound yet
    #[default]
    Init,
    /// A non-empty job list is bound
    Ready,
    /// `start` has been invoked
    Started,
    /// Every job settled and none was cancelled
    Finished,
    /// At least one job was cancelled after a failure
    Error,
}

impl RunnerState {
    /// Returns true for FINISHED and ERROR
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "INIT"),
            Self::Ready => write!(f, "READY"),
            Self::Started => write!(f, "STARTED"),
            Self::Finished => write!(f, "FINISHED"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_init() {
        assert_eq!(RunnerState::default(), RunnerState::Init);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RunnerState::Init.is_terminal());
        assert!(!RunnerState::Ready.is_terminal());
        assert!(!RunnerState::Started.is_terminal());
        assert!(RunnerState::Finished.is_terminal());
        assert!(RunnerState::Error.is_terminal());
    }

    #[test]
    fn test_state_serialize() {
        let json = serde_json::to_string(&RunnerState::Finished).unwrap();
        assert_eq!(json, r#""FINISHED""#);
        let state: RunnerState = serde_json::from_str(r#""ERROR""#).unwrap();
        assert_eq!(state, RunnerState::Error);
    }
}
