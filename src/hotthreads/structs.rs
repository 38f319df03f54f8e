//! The structs
//!
use std::time::Duration;
use chrono::{DateTime, Local};
use regex::Regex;
use crate::identity::Pid;
use crate::threaddump::ThreadRecord;

/// The threads of one process ranked by CPU usage.
#[derive(Debug)]
pub struct HotThreads {
    pub pid: Pid,
    pub timestamp: DateTime<Local>,
    /// The threads in ranked order.
    pub threads: Vec<ThreadRecord>,
    /// The number of blocks in the dump that are not threads.
    pub rejected_blocks: usize,
    /// The number of OS threads for which statistics were read.
    pub os_threads_sampled: usize,
}

/// The settings for reading the OS thread statistics.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub parallel: usize,
    pub query_timeout: Duration,
}

/// The settings for printing the report.
#[derive(Debug, Clone)]
pub struct PrintOptions {
    /// Only show this many threads.
    pub top: Option<usize>,
    pub name_filter: Regex,
    /// Show the text of the dump for every thread.
    pub print_stack: bool,
}
