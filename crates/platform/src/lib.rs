#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Platform abstraction layer for the build service.
//!
//! This crate provides:
//! - Process execution with a wall-clock limit, bounded output capture and
//!   process-group termination
//! - Filesystem helpers shared by the pipeline stages (recursive copy,
//!   best-effort removal, age checks)
//!
//! Operations report through the event system; nothing here prints.

pub mod core;
pub mod fs;
pub mod implementations;
pub mod process;

pub use core::PlatformContext;
pub use implementations::process::NativeProcessOperations;
pub use process::{diagnostic_text, CommandOutput, PlatformCommand, ProcessOperations, TailBuffer};
