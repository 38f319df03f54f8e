//! The structs
//!
use std::path::PathBuf;
use anyhow::Result;
use crate::cpu::CpuSample;
use crate::identity::{Pid, Tid};

/// A provider of OS thread statistics.
///
/// [ProcfsThreadStats] reads them from `/proc`, tests use a fake.
pub trait ThreadStatsSource: Send + Sync {
    /// The ids of all OS threads of the process.
    fn thread_ids(&self, pid: Pid) -> Result<Vec<Tid>>;
    /// The CPU statistics of one OS thread of the process.
    fn thread_sample(&self, pid: Pid, tid: Tid) -> Result<CpuSample>;
}

/// Thread statistics from the proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcfsThreadStats {
    /// The root of the proc filesystem, normally `/proc`.
    pub proc_root: PathBuf,
    pub clock_ticks_per_second: u64,
    /// Seconds since the epoch at which the system booted.
    pub boot_time: i64,
}

/// The fields of `/proc/<pid>/task/<tid>/stat` that are used.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStat {
    pub utime: u64,
    pub stime: u64,
    pub starttime: u64,
}
