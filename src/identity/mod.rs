//! Module for the identifiers of a thread.
//!
//! A JVM thread dump identifies a thread by its `nid`, the native id printed in hexadecimal
//! (`nid=0x1a2b`). The operating system identifies the same thread by its numeric thread id.
//! This module converts between the two:
//! - [Nid] is the hexadecimal text as found in the dump, without the `0x` prefix.
//! - [Tid] is the numeric OS thread id, a signed 32-bit integer.
//! - [Pid] is the numeric id of the process that owns the threads.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
