//! The structs
//!
use std::{sync::{Arc, atomic::AtomicUsize}, time::Duration};
use chrono::{DateTime, Utc};
use crate::identity::Tid;

/// The CPU statistics of one OS thread at the time it was read.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CpuSample {
    pub tid: Tid,
    /// Cumulative user + system CPU time in seconds.
    pub cpu_seconds: f64,
    pub created_at: DateTime<Utc>,
}

/// Runs queries on a thread of their own, so that waiting for them can time out.
///
/// A query that times out cannot be cancelled, its thread keeps running until the query returns.
/// At most `max_abandoned` of those threads may exist, after that new queries are refused.
#[derive(Debug, Clone)]
pub struct TimedQueries {
    pub timeout: Duration,
    pub max_abandoned: usize,
    pub(crate) abandoned: Arc<AtomicUsize>,
}
