//! Logging initialisation for Anvil
//!
//! Library crates only emit `tracing` events; binaries (worker programs,
//! build front-ends) call one of the initialisers here once at startup.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
