//! User-facing message sink.
//!
//! The walkers, resolver and executor report progress through an injected
//! [`Logger`]. Internal diagnostics go through the `log` facade instead.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MessageLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageLevel::Debug => write!(f, "debug"),
            MessageLevel::Info => write!(f, "info"),
            MessageLevel::Warning => write!(f, "warning"),
            MessageLevel::Error => write!(f, "error"),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Logger: Send + Sync {
    fn log(&self, level: MessageLevel, message: &str);
}

/// Discards every message. Used while rolling back.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: MessageLevel, _message: &str) {}
}

/// Forwards messages to the `log` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl Logger for LogFacade {
    fn log(&self, level: MessageLevel, message: &str) {
        match level {
            MessageLevel::Debug => log::debug!("{}", message),
            MessageLevel::Info => log::info!("{}", message),
            MessageLevel::Warning => log::warn!("{}", message),
            MessageLevel::Error => log::error!("{}", message),
        }
    }
}
