//! hot_threads: show the threads of a running JVM ordered by CPU usage.
//!
//! The thread dump of the JVM tells which threads exist, their names and their state.
//! The operating system tells how much CPU every thread used.
//! The `nid` in the thread dump is the OS thread id in hexadecimal, which is used to combine the two.
//!
#[macro_use]
extern crate serde_derive;

pub mod identity;
pub mod threaddump;
pub mod cpu;
pub mod procfs;
pub mod attach;
pub mod hotthreads;
pub mod utility;

/// The number of threads used to read the OS thread statistics.
pub const DEFAULT_PARALLEL: &str = "1";
/// The time reading the statistics of a single OS thread may take.
pub const DEFAULT_QUERY_TIMEOUT_MS: &str = "1000";
/// The time the JVM may take to start its attach listener, and to respond to the thread dump request.
pub const DEFAULT_ATTACH_TIMEOUT_MS: &str = "5000";
