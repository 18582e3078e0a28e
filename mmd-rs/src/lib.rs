//! mmd-rs library
//!
//! Command implementations and output helpers behind the `mmd-rs` binary.

pub mod cli;
pub mod commands;
pub mod utils;
