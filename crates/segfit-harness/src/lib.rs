//! Trace-replay harness for the segfit allocator.
//!
//! This crate provides:
//! - Script parsing: a line-oriented allocate/resize/free trace format
//! - Replay: run a script against a fresh heap while checking that live
//!   payloads never overlap, lent bytes are never touched, and the
//!   structural validator stays clean
//! - Script generation: deterministic pseudo-random traces for soak runs
//! - Report generation: machine-readable JSON replay reports

#![forbid(unsafe_code)]

pub mod report;
pub mod runner;
pub mod script;

pub use report::ReplayReport;
pub use runner::{ReplayError, replay};
pub use script::{Script, ScriptError, ScriptOp};
