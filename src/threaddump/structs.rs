//! The structs
//!
use serde::Serializer;
use crate::identity::{Nid, Tid};

/// The state of a thread as reported after `java.lang.Thread.State: `.
///
/// The JVM reports the states of `java.lang.Thread.State`, but the dump text is not a closed grammar,
/// so anything else is kept as [ThreadState::Unknown].
/// It serializes to the text as found in the dump, for example `"TIMED_WAITING"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadState {
    New,
    Runnable,
    Blocked,
    Waiting,
    TimedWaiting,
    Terminated,
    Unknown(String),
}

/// A single thread from the thread dump.
///
/// The parser fills out all fields except `cpu_percent`, which is set when the thread is
/// correlated with the OS thread statistics (see [crate::cpu]).
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct ThreadRecord {
    /// The native thread id as found in the dump, without `0x`.
    pub nid: Nid,
    /// The OS thread id decoded from `nid`.
    /// `None` when the nid is not valid hexadecimal; it is shown as 0.
    #[serde(serialize_with = "serialize_tid")]
    pub tid: Option<Tid>,
    pub name: String,
    /// The text after `java.lang.Thread.State: `, for example `WAITING (parking)`.
    pub status: String,
    pub state: Option<ThreadState>,
    #[serde(skip_serializing)]
    pub raw_block: String,
    pub cpu_percent: f64,
}

/// The threads of a dump, in the order in which they are found in the dump.
#[derive(Debug, Default)]
pub struct AllThreadRecords {
    pub threads: Vec<ThreadRecord>,
    /// The number of blocks that did not contain a `nid`.
    pub rejected_blocks: usize,
}

/// Iterator over the blocks of a thread dump, see [crate::threaddump::blocks].
pub struct DumpBlocks<'a> {
    pub(crate) lines: std::str::Split<'a, char>,
}

fn serialize_tid<S: Serializer>(tid: &Option<Tid>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i32(tid.map(|t| t.0).unwrap_or_default())
}
