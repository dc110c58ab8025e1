//! `kri-worker` library crate.
//!
//! Configuration, logging and the session driver used by the binary. The
//! entrypoint lives in `main.rs`.

pub mod config;
pub mod logging;
pub mod session;
pub mod simulated;
