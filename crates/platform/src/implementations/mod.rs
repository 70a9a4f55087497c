//! Concrete platform operation implementations

pub mod process;
