//! Module for parsing the text of a JVM thread dump.
//!
//! A thread dump is requested from the JVM via the attach mechanism (see [crate::attach]).
//! It is plain text, one block per thread, and blocks are separated by an empty line:
//! ```text
//! "main" #1 prio=5 os_prio=0 cpu=52.60ms elapsed=11.32s tid=0x00007f4c1c02a000 nid=0x1a2b waiting on condition  [0x00007f4c22bfe000]
//!    java.lang.Thread.State: TIMED_WAITING (sleeping)
//!         at java.lang.Thread.sleep(java.base@17.0.2/Native Method)
//!         at Main.main(Main.java:5)
//!
//! "Reference Handler" #2 daemon prio=10 os_prio=0 cpu=0.20ms elapsed=11.30s tid=0x00007f4c1c0d6000 nid=0x1a32 waiting on condition  [0x00007f4c0b1fe000]
//!    java.lang.Thread.State: RUNNABLE
//! ```
//! The parser takes from each block:
//! - the `nid` from the first line. A block without a `nid` is not a thread and is skipped.
//! - the thread name, which is the quoted text at the start of the first line.
//! - the thread state, which follows `java.lang.Thread.State: ` on the second line.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
