//! Per-project timers for the terminal. Only one timer runs at a time, every second of progress
//! is backed up to disk so that timers survive restarts, and the totals can be exported as a
//! summary table.
//!

pub mod cli;
pub mod fs;
pub mod storage;
pub mod tracker;
pub mod utils;
