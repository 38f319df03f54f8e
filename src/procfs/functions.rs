//! The impls and functions.
//!
use std::{fs, path::{Path, PathBuf}};
use chrono::{DateTime, TimeZone, Utc};
use log::*;
use anyhow::{anyhow, bail, Context, Result};
use crate::cpu::CpuSample;
use crate::identity::{Pid, Tid};
use crate::procfs::{ProcfsThreadStats, TaskStat, ThreadStatsSource};

impl ProcfsThreadStats {
    /// Use `/proc` with the clock ticks of this system.
    pub fn new() -> Result<Self>
    {
        Self::with_root("/proc", clock_ticks_per_second()?)
    }
    pub fn with_root(
        proc_root: impl Into<PathBuf>,
        clock_ticks_per_second: u64,
    ) -> Result<Self>
    {
        let proc_root = proc_root.into();
        let stat_path = proc_root.join("stat");
        let stat = fs::read_to_string(&stat_path)
            .with_context(|| format!("Error reading {}", stat_path.display()))?;
        let boot_time = parse_boot_time(&stat)?;
        debug!("boot time: {}, clock ticks per second: {}", boot_time, clock_ticks_per_second);
        Ok(ProcfsThreadStats { proc_root, clock_ticks_per_second, boot_time })
    }
    fn task_dir(&self, pid: Pid) -> PathBuf {
        self.proc_root.join(pid.0.to_string()).join("task")
    }
    /// Convert the task statistics to a sample.
    pub fn to_sample(
        &self,
        tid: Tid,
        stat: &TaskStat,
    ) -> Result<CpuSample>
    {
        let ticks = self.clock_ticks_per_second as f64;
        let cpu_seconds = (stat.utime + stat.stime) as f64 / ticks;
        let created_at_ms = self.boot_time * 1000 + (stat.starttime as f64 * 1000.0 / ticks) as i64;
        let created_at: DateTime<Utc> = Utc.timestamp_millis_opt(created_at_ms)
            .single()
            .ok_or_else(|| anyhow!("invalid start time of thread {}: {}", tid, created_at_ms))?;
        Ok(CpuSample { tid, cpu_seconds, created_at })
    }
}

impl ThreadStatsSource for ProcfsThreadStats {
    fn thread_ids(
        &self,
        pid: Pid,
    ) -> Result<Vec<Tid>>
    {
        let task_dir = self.task_dir(pid);
        let entries = fs::read_dir(&task_dir)
            .with_context(|| format!("Error reading {}", task_dir.display()))?;
        let mut tids: Vec<Tid> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                entry.file_name().to_string_lossy().parse::<i32>().ok().map(Tid)
            })
            .collect();
        tids.sort();
        debug!("process {} has {} threads", pid, tids.len());
        Ok(tids)
    }
    fn thread_sample(
        &self,
        pid: Pid,
        tid: Tid,
    ) -> Result<CpuSample>
    {
        let stat_path = self.task_dir(pid).join(tid.0.to_string()).join("stat");
        let stat = read_task_stat(&stat_path)?;
        self.to_sample(tid, &stat)
    }
}

/// `sysconf(_SC_CLK_TCK)`, the unit of the times in the stat files.
pub fn clock_ticks_per_second() -> Result<u64>
{
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks <= 0 {
        bail!("sysconf(_SC_CLK_TCK) returned {}", ticks);
    }
    Ok(ticks as u64)
}

/// Find `btime` in the contents of `/proc/stat`.
pub fn parse_boot_time(stat: &str) -> Result<i64>
{
    stat.lines()
        .find_map(|line| line.strip_prefix("btime "))
        .ok_or_else(|| anyhow!("no btime line found in stat"))?
        .trim()
        .parse::<i64>()
        .context("Error parsing btime")
}

fn read_task_stat(path: &Path) -> Result<TaskStat>
{
    let content = fs::read_to_string(path)
        .with_context(|| format!("Error reading {}", path.display()))?;
    parse_task_stat(&content)
}

/// Parse the contents of `/proc/<pid>/task/<tid>/stat`.
///
/// The command name can contain spaces and parentheses, so the fields are counted from the last `)`.
pub fn parse_task_stat(content: &str) -> Result<TaskStat>
{
    let (_, rest) = content.rsplit_once(')')
        .ok_or_else(|| anyhow!("no command name found in stat: {}", content))?;
    // rest starts at field 3 (state)
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let field = |number: usize| -> Result<u64> {
        fields.get(number - 3)
            .ok_or_else(|| anyhow!("stat has no field {}", number))?
            .parse::<u64>()
            .with_context(|| format!("Error parsing field {} of stat", number))
    };
    Ok(TaskStat {
        utime: field(14)?,
        stime: field(15)?,
        starttime: field(22)?,
    })
}
