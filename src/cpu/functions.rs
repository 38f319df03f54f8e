//! The impls and functions.
//!
use std::{collections::HashMap, sync::{Arc, atomic::{AtomicU8, AtomicUsize, Ordering}, mpsc::{channel, RecvTimeoutError}}, thread, time::{Duration, Instant}};
use chrono::{DateTime, Utc};
use log::*;
use anyhow::{anyhow, bail, Result};
use crate::cpu::{CpuSample, TimedQueries};
use crate::identity::{Pid, Tid};
use crate::procfs::ThreadStatsSource;
use crate::threaddump::ThreadRecord;

/// The number of timed out thread statistics reads that may still be running before further reads are refused.
pub const MAX_ABANDONED_QUERIES: usize = 16;
const QUERY_RUNNING: u8 = 0;
const QUERY_DONE: u8 = 1;
const QUERY_ABANDONED: u8 = 2;

impl CpuSample {
    /// Seconds between the creation of the thread and `now`, with millisecond resolution.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds() as f64 / 1000.0
    }
}

/// The CPU usage of the thread since its creation, as a percentage of one CPU.
pub fn cpu_percent(sample: &CpuSample, now: DateTime<Utc>) -> f64
{
    let age = sample.age_seconds(now);
    if age <= 0.0 {
        0.0
    } else {
        100.0 * sample.cpu_seconds / age
    }
}

/// Map the thread id of every sample to its CPU usage. If a thread id is found twice, the last sample is used.
pub fn usage_by_tid(
    samples: &[CpuSample],
    now: DateTime<Utc>,
) -> HashMap<Tid, f64>
{
    samples.iter()
        .map(|sample| (sample.tid, cpu_percent(sample, now)))
        .collect()
}

/// Set `cpu_percent` of every record for which a sample with the same thread id exists.
///
/// Records without a sample, and records with an unresolved thread id, are left at 0.
/// Samples without a record are ignored.
pub fn correlate(
    records: &mut [ThreadRecord],
    samples: &[CpuSample],
    now: DateTime<Utc>,
)
{
    let usage = usage_by_tid(samples, now);
    let mut matched = 0;
    for record in records.iter_mut() {
        if let Some(percent) = record.tid.and_then(|tid| usage.get(&tid)) {
            record.cpu_percent = *percent;
            matched += 1;
        }
    }
    debug!("correlated {} of {} threads with {} OS thread samples", matched, records.len(), usage.len());
}

impl TimedQueries {
    pub fn new(
        timeout: Duration,
        max_abandoned: usize,
    ) -> Self
    {
        TimedQueries { timeout, max_abandoned, abandoned: Arc::new(AtomicUsize::new(0)) }
    }
    /// The number of queries that timed out and are still running.
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }
    /// Run the query on its own thread, and give up waiting for it after `timeout`.
    pub fn run<T, F>(
        &self,
        query: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        if self.abandoned() >= self.max_abandoned {
            bail!("{} timed out queries are still running", self.abandoned());
        }
        let state = Arc::new(AtomicU8::new(QUERY_RUNNING));
        let (tx, rx) = channel();
        {
            let state = Arc::clone(&state);
            let abandoned = Arc::clone(&self.abandoned);
            thread::Builder::new()
                .name("thread-query".to_string())
                .spawn(move || {
                    let result = query();
                    if state.compare_exchange(QUERY_RUNNING, QUERY_DONE, Ordering::SeqCst, Ordering::SeqCst).is_err() {
                        // the waiter gave up and counted this thread as abandoned
                        abandoned.fetch_sub(1, Ordering::SeqCst);
                    } else {
                        let _ = tx.send(result);
                    }
                })?;
        }
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                // counted before the state changes, so the query thread never decrements first
                self.abandoned.fetch_add(1, Ordering::SeqCst);
                if state.compare_exchange(QUERY_RUNNING, QUERY_ABANDONED, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
                    Err(anyhow!("query timed out after {:?}", self.timeout))
                } else {
                    // finished just now
                    self.abandoned.fetch_sub(1, Ordering::SeqCst);
                    rx.recv().map_err(|_| anyhow!("query ended without a result"))?
                }
            },
            Err(RecvTimeoutError::Disconnected) => Err(anyhow!("query ended without a result")),
        }
    }
}

/// Read the CPU statistics of the given threads using `parallel` workers.
///
/// A thread that cannot be read, or that is not read within `timeout`, is logged and left out.
/// Every read runs on a thread of its own next to the worker waiting for it, see [TimedQueries].
/// The order of the returned samples is the order in which the workers finished.
pub fn collect_samples<S>(
    source: Arc<S>,
    pid: Pid,
    tids: &[Tid],
    parallel: usize,
    timeout: Duration,
) -> Result<Vec<CpuSample>>
where
    S: ThreadStatsSource + 'static,
{
    info!("begin parallel thread statistics read");
    let timer = Instant::now();

    let pool = rayon::ThreadPoolBuilder::new().num_threads(parallel).build()?;
    let queries = TimedQueries::new(timeout, MAX_ABANDONED_QUERIES);
    let (tx, rx) = channel();

    pool.scope(move |s| {
        for tid in tids {
            let tid = *tid;
            let tx = tx.clone();
            let source = Arc::clone(&source);
            let queries = queries.clone();
            s.spawn(move |_| {
                match queries.run(move || source.thread_sample(pid, tid)) {
                    Ok(sample) => {
                        debug!("{:?}", &sample);
                        if let Err(e) = tx.send(sample) {
                            warn!("error sending sample of thread {} via tx: {}", tid, e);
                        }
                    },
                    Err(e) => warn!("unable to read cpu statistics of thread {}, skipping: {:#}", tid, e),
                }
            });
        }
    });

    let samples: Vec<CpuSample> = rx.iter().collect();

    info!("end parallel thread statistics read: {} of {} threads, {:?}", samples.len(), tids.len(), timer.elapsed());

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use crate::identity::Nid;

    fn sample(tid: i32, cpu_seconds: f64, age_ms: i64, now: DateTime<Utc>) -> CpuSample {
        CpuSample {
            tid: Tid(tid),
            cpu_seconds,
            created_at: now - ChronoDuration::milliseconds(age_ms),
        }
    }

    fn record(nid: &str) -> ThreadRecord {
        let nid = Nid::new(nid);
        ThreadRecord {
            tid: nid.decode().ok(),
            nid,
            ..Default::default()
        }
    }

    #[test]
    fn unit_cpu_percent() {
        let now = Utc::now();
        assert_eq!(cpu_percent(&sample(100, 5.0, 10_000, now), now), 50.0);
        assert_eq!(cpu_percent(&sample(100, 0.5, 2_000, now), now), 25.0);
    }

    #[test]
    fn unit_cpu_percent_zero_or_negative_age() {
        let now = Utc::now();
        assert_eq!(cpu_percent(&sample(100, 5.0, 0, now), now), 0.0);
        // created in the future: clock skew
        assert_eq!(cpu_percent(&sample(100, 5.0, -3_000, now), now), 0.0);
    }

    #[test]
    fn unit_correlate_by_tid() {
        let now = Utc::now();
        // 0x64 = 100, 0x65 = 101
        let mut records = vec![record("64"), record("65"), record("zz")];
        let samples = vec![
            sample(100, 5.0, 10_000, now),
            // no record for this thread
            sample(200, 9.0, 10_000, now),
        ];
        correlate(&mut records, &samples, now);
        assert_eq!(records[0].cpu_percent, 50.0);
        // no sample for this thread
        assert_eq!(records[1].cpu_percent, 0.0);
        // unresolved nid
        assert_eq!(records[2].cpu_percent, 0.0);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn unit_unresolved_thread_does_not_match_tid_zero() {
        let now = Utc::now();
        let mut records = vec![record("xyz")];
        correlate(&mut records, &[sample(0, 5.0, 10_000, now)], now);
        assert_eq!(records[0].cpu_percent, 0.0);
    }

    #[test]
    fn unit_duplicate_samples_last_one_wins() {
        let now = Utc::now();
        let usage = usage_by_tid(&[sample(7, 1.0, 10_000, now), sample(7, 2.0, 10_000, now)], now);
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[&Tid(7)], 20.0);
    }

    #[test]
    fn unit_timed_queries() {
        let queries = TimedQueries::new(Duration::from_secs(5), 4);
        assert_eq!(queries.run(|| Ok(42)).unwrap(), 42);

        let result: Result<i32> = queries.run(|| Err(anyhow!("no such thread")));
        assert_eq!(result.unwrap_err().to_string(), "no such thread");
        assert_eq!(queries.abandoned(), 0);
    }

    #[test]
    fn unit_timed_queries_limit_abandoned_threads() {
        let queries = TimedQueries::new(Duration::from_millis(50), 1);

        let result: Result<i32> = queries.run(|| {
            thread::sleep(Duration::from_millis(500));
            Ok(42)
        });
        assert!(result.unwrap_err().to_string().contains("timed out"));
        assert_eq!(queries.abandoned(), 1);

        // the slow query still runs, so no new query is started
        let result: Result<i32> = queries.run(|| Ok(1));
        assert!(result.unwrap_err().to_string().contains("still running"));

        // once the slow query returned, queries run again
        thread::sleep(Duration::from_millis(1000));
        assert_eq!(queries.abandoned(), 0);
        assert_eq!(queries.run(|| Ok(2)).unwrap(), 2);
    }

    struct FakeStats {
        now: DateTime<Utc>,
    }

    impl ThreadStatsSource for FakeStats {
        fn thread_ids(&self, _pid: Pid) -> Result<Vec<Tid>> {
            Ok(vec![Tid(1), Tid(2), Tid(3), Tid(4)])
        }
        fn thread_sample(&self, _pid: Pid, tid: Tid) -> Result<CpuSample> {
            match tid.0 {
                2 => Err(anyhow!("thread {} exited", tid)),
                3 => {
                    thread::sleep(Duration::from_secs(2));
                    Ok(sample(tid.0, 1.0, 10_000, self.now))
                },
                _ => Ok(sample(tid.0, 1.0, 10_000, self.now)),
            }
        }
    }

    #[test]
    fn unit_collect_samples_skips_failed_and_slow_threads() {
        let now = Utc::now();
        let source = Arc::new(FakeStats { now });
        let tids = source.thread_ids(Pid(1)).unwrap();
        let samples = collect_samples(source, Pid(1), &tids, 2, Duration::from_millis(200)).unwrap();
        let mut found: Vec<Tid> = samples.iter().map(|s| s.tid).collect();
        found.sort();
        assert_eq!(found, vec![Tid(1), Tid(4)]);
    }
}
