//! Reboot error types

use core::fmt;

use crate::platform::ProcGen;

/// Firmware status code returned by a collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub i64);

impl StatusCode {
    pub const HARDWARE: StatusCode = StatusCode(-6);
    pub const BUSY: StatusCode = StatusCode(-2);
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.0)
    }
}

/// Failure classes, used as log tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Aborted cleanly before any unit was touched.
    Precondition,
    /// Failed at or after the last recoverable step.
    CommitPhase,
    /// Failed during cleanup after the global rendezvous.
    PostCommit,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::Precondition => write!(f, "PRECONDITION_FAILURE"),
            FailureClass::CommitPhase => write!(f, "COMMIT_PHASE_FAILURE"),
            FailureClass::PostCommit => write!(f, "POST_COMMIT_FAILURE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    ProcessorGeneration(ProcGen),
    /// A platform quirk rules out direct thread control.
    Quirk,
    /// Generation needs an NVRAM opt-in that is not set.
    ExperimentalNotEnabled,
    /// Calling unit is unknown, guarded, or sits on a split core.
    Initiator,
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unsupported::ProcessorGeneration(gen) => {
                write!(f, "not available on {} processors", gen)
            }
            Unsupported::Quirk => write!(f, "disabled by platform quirk"),
            Unsupported::ExperimentalNotEnabled => {
                write!(f, "experimental on this processor and not enabled")
            }
            Unsupported::Initiator => write!(f, "cannot be initiated from this CPU"),
        }
    }
}

/// Reasons an attempt returned to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootError {
    Unsupported(Unsupported),
    QuiesceTimeout,
    Disabled(&'static str),
    /// Secondaries could not be parked; dispatch was resumed.
    PrepareFailed,
}

impl RebootError {
    pub fn class(&self) -> FailureClass {
        match self {
            RebootError::PrepareFailed => FailureClass::CommitPhase,
            _ => FailureClass::Precondition,
        }
    }
}

impl fmt::Display for RebootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebootError::Unsupported(why) => write!(f, "fast reboot {}", why),
            RebootError::QuiesceTimeout => write!(f, "platform call quiesce timed out"),
            RebootError::Disabled(reason) => write!(f, "fast reboot disabled because {}", reason),
            RebootError::PrepareFailed => {
                write!(f, "failed to prepare secondaries for system reset")
            }
        }
    }
}

/// Failures past the commit point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitFailure {
    BroadcastFailed(StatusCode),
    /// Some unit never reached `Present` within the bound.
    PresentTimeout,
}

impl fmt::Display for CommitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitFailure::BroadcastFailed(status) => {
                write!(f, "failed to system reset secondaries ({})", status)
            }
            CommitFailure::PresentTimeout => {
                write!(f, "timed out waiting for secondaries to call in")
            }
        }
    }
}
