//! The impls and functions.
//!
use std::{sync::Arc, time::Instant};
use chrono::{DateTime, Local, Utc};
use colored::*;
use log::*;
use anyhow::{Context, Result};
use regex::Regex;
use crate::cpu::{self, CpuSample};
use crate::hotthreads::{HotThreads, PrintOptions, ReportConfig};
use crate::identity::Pid;
use crate::procfs::ThreadStatsSource;
use crate::threaddump::{AllThreadRecords, ThreadRecord};

const HOT_PERCENT: f64 = 50.0;
const WARM_PERCENT: f64 = 10.0;

/// Sort the threads by CPU usage, highest first.
///
/// `sort_by` is stable, so threads with equal usage stay in dump order.
pub fn rank(threads: &mut [ThreadRecord])
{
    threads.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
}

impl HotThreads {
    /// Parse the dump, add the CPU usage of the samples and rank the threads.
    pub fn build(
        pid: Pid,
        dump: &str,
        samples: &[CpuSample],
        now: DateTime<Utc>,
    ) -> HotThreads
    {
        let mut allthreadrecords = AllThreadRecords::parse_dump(dump);
        cpu::correlate(&mut allthreadrecords.threads, samples, now);
        rank(&mut allthreadrecords.threads);

        HotThreads {
            pid,
            timestamp: now.with_timezone(&Local),
            threads: allthreadrecords.threads,
            rejected_blocks: allthreadrecords.rejected_blocks,
            os_threads_sampled: samples.len(),
        }
    }
    /// Read the OS thread statistics of the process, and build the report with the dump.
    ///
    /// Failing to list the threads of the process is an error,
    /// failing to read the statistics of a single thread is not.
    pub fn report<S>(
        pid: Pid,
        dump: &str,
        source: Arc<S>,
        config: &ReportConfig,
    ) -> Result<HotThreads>
    where
        S: ThreadStatsSource + 'static,
    {
        info!("begin report");
        let timer = Instant::now();

        let tids = source.thread_ids(pid)
            .with_context(|| format!("Unable to find the threads of process {}", pid))?;
        let samples = cpu::collect_samples(source, pid, &tids, config.parallel, config.query_timeout)?;
        let hotthreads = HotThreads::build(pid, dump, &samples, Utc::now());

        info!("end report: {:?}", timer.elapsed());

        Ok(hotthreads)
    }
    /// The threads to show: matching the name filter, limited to `top`, in ranked order.
    pub fn selected(
        &self,
        options: &PrintOptions,
    ) -> Vec<&ThreadRecord>
    {
        self.threads.iter()
            .filter(|r| options.name_filter.is_match(&r.name))
            .take(options.top.unwrap_or(usize::MAX))
            .collect()
    }
    pub fn header(&self) -> String
    {
        format!("Process: {}, Snapshot time: {}, threads in dump: {}, blocks skipped: {}, OS threads sampled: {}",
                self.pid,
                self.timestamp,
                self.threads.len(),
                self.rejected_blocks,
                self.os_threads_sampled)
    }
    pub fn print(
        &self,
        options: &PrintOptions,
    )
    {
        println!("--------------------------------------------------------------------------------------------------------------------------------------");
        println!("{}", self.header());
        println!("--------------------------------------------------------------------------------------------------------------------------------------");
        println!("{:>10} {:>10} {:15} {:>10} {:50}",
                 "tid",
                 "nid",
                 "state",
                 "cpu%",
                 "name");
        println!("--------------------------------------------------------------------------------------------------------------------------------------");
        for row in self.selected(options) {
            let cpu_percent = format!("{:10.2}", row.cpu_percent);
            let cpu_percent = if row.cpu_percent >= HOT_PERCENT {
                cpu_percent.red()
            } else if row.cpu_percent >= WARM_PERCENT {
                cpu_percent.yellow()
            } else {
                cpu_percent.normal()
            };
            println!("{:>10} {:>10} {:15} {} {:50}",
                     row.tid_or_zero(),
                     row.nid.as_str(),
                     row.state.as_ref().map(|s| s.as_str()).unwrap_or("-"),
                     cpu_percent,
                     row.name);
            if options.print_stack {
                for line in row.raw_block.lines() {
                    println!("{:>22}{}", "", line);
                }
                println!();
            }
        }
    }
    pub fn print_json(
        &self,
        options: &PrintOptions,
    ) -> Result<()>
    {
        println!("{}", serde_json::to_string_pretty(&self.selected(options))?);
        Ok(())
    }
}

impl PrintOptions {
    pub fn new() -> Self {
        PrintOptions { top: None, name_filter: Regex::new(".*").expect("valid regex"), print_stack: false }
    }
}

impl Default for PrintOptions {
    fn default() -> Self { Self::new() }
}
