//! Module for reading the OS statistics of the threads of a process.
//!
//! On Linux, every thread of a process has a directory `/proc/<pid>/task/<tid>`.
//! The `stat` file in it contains, after the command name in parentheses:
//! - field 14 `utime`: user CPU time in clock ticks.
//! - field 15 `stime`: system CPU time in clock ticks.
//! - field 22 `starttime`: the time the thread started after system boot, in clock ticks.
//!
//! The clock ticks per second are obtained with `sysconf(_SC_CLK_TCK)`,
//! the boot time is the `btime` line in `/proc/stat`.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
