//! BTFS wallet command library
//!
//! Password-gated wallet commands and the daemon restart sequencer behind
//! the `btfs` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod repo;
pub mod restart;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use restart::{RestartOutcome, RestartSequencer};
