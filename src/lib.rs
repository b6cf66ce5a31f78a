//! Package dependency planning.
//!
//! Walkers compute the install, uninstall and update operations a request
//! implies, the resolver reconciles them across projects and the shared
//! packages folder, and the executor applies the plan with rollback.

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod manager;
pub mod operation;
pub mod package;
pub mod repository;
pub mod resolver;
pub mod version;
pub mod walker;

pub use error::{ExecuteError, ResolveError};

