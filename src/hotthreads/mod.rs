//! Module for the hot threads report.
//!
//! This brings the other modules together:
//! 1. The thread dump is parsed into [ThreadRecord](crate::threaddump::ThreadRecord)s.
//! 2. The OS threads of the process are listed, and their CPU statistics are read in parallel.
//! 3. The CPU usage is added to the threads of the dump by thread id.
//! 4. The threads are ranked by CPU usage, highest first.
//!    The ranking is stable: threads with the same usage keep the order of the dump.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
