//! Module for requesting a thread dump from a running JVM.
//!
//! This uses the HotSpot dynamic attach mechanism, which `jstack` uses too:
//! - The JVM listens on the unix domain socket `/tmp/.java_pid<pid>` once its attach listener runs.
//! - If the socket does not exist, the attach listener is started by creating the file
//!   `.attach_pid<pid>` in the working directory of the JVM (or in `/tmp`) and sending `SIGQUIT`.
//! - A request is `1\0<command>\0<arg1>\0<arg2>\0<arg3>\0`.
//! - The response is the return code on the first line (0 is success), followed by the output.
//!
//! Any error here is fatal: without a thread dump there is nothing to report.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
