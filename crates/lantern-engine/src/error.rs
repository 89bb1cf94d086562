use std::fmt;

use lantern_core::ConfigError;
use lantern_store::StoreError;

#[derive(Debug)]
pub enum EngineError {
    /// The gateway exhausted its retries (or hit a permanent store
    /// failure). The calling cycle or poll is skipped and logged; the
    /// engine never crashes on this.
    StoreUnavailable { attempts: u32, source: StoreError },
    /// A selector postcondition failed — a programming error. The
    /// coordinator refuses to emit the corrupt cluster.
    InvariantViolation(String),
    InvalidConfig(ConfigError),
    RejectedSubmission(String),
    AlreadyInitialized,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::StoreUnavailable { attempts, source } => {
                write!(f, "store unavailable after {attempts} attempts: {source}")
            }
            EngineError::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            EngineError::InvalidConfig(e) => write!(f, "{e}"),
            EngineError::RejectedSubmission(reason) => {
                write!(f, "submission rejected: {reason}")
            }
            EngineError::AlreadyInitialized => write!(f, "engine already initialized"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::StoreUnavailable { source, .. } => Some(source),
            EngineError::InvalidConfig(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::InvalidConfig(e)
    }
}
