//! Module for the CPU usage of the threads.
//!
//! The CPU usage of a thread is calculated from the OS statistics of the thread:
//! the cumulative user and system CPU time, and the time the thread was created.
//! ```text
//! age = now - created_at
//! cpu_percent = 100 * cpu_seconds / age
//! ```
//! This is the average utilization of a CPU since the thread was created, not the current utilization.
//! A thread with an age of zero or less (clock skew, or a thread that just started) has 0%.
//!
//! The usage is added to the parsed threads of the dump by matching the OS thread id.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
