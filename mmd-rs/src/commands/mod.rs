//! Command implementations for each file format

pub mod pmx;
pub mod simulate;
pub mod vmd;
