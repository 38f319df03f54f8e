//! The impls and functions.
//!
use std::time::Instant;
use log::*;
use serde::{Serialize, Serializer};
use crate::identity::Nid;
use crate::threaddump::{AllThreadRecords, DumpBlocks, ThreadRecord, ThreadState};

const NID_PREFIX: &str = "nid=0x";
const STATE_MARKER: &str = "java.lang.Thread.State: ";

/// Split the dump text into blocks of non-empty lines.
///
/// A block ends at an empty line. The text is split on `\n`, so the text after the last newline
/// counts as a line: a dump ending with `\n` terminates its last block.
/// A block that is still pending when the text ends is not returned.
pub fn blocks(dump: &str) -> DumpBlocks<'_> {
    DumpBlocks { lines: dump.split('\n') }
}

impl<'a> Iterator for DumpBlocks<'a> {
    type Item = Vec<&'a str>;

    fn next(&mut self) -> Option<Self::Item>
    {
        let mut block = Vec::new();
        for line in self.lines.by_ref() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                if !block.is_empty() {
                    return Some(block);
                }
            } else {
                block.push(line);
            }
        }
        if !block.is_empty() {
            info!("unterminated block at the end of the dump not parsed: {}", block[0]);
        }
        None
    }
}

/// Find the first whitespace separated token starting with `nid=0x` and return what follows it.
///
/// The remainder is not validated as hexadecimal here, that is done when it is decoded.
pub fn extract_nid(line: &str) -> Option<Nid>
{
    line.split_whitespace()
        .filter_map(|token| token.strip_prefix(NID_PREFIX))
        .find(|nid| !nid.is_empty())
        .map(Nid::new)
}

/// The thread name is the text between the quote the line starts with and the next quote.
pub fn extract_name(line: &str) -> Option<String>
{
    let rest = line.strip_prefix('"')?;
    let (name, _) = rest.split_once('"')?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// The text after `java.lang.Thread.State: `, trimmed. An empty result counts as no status.
pub fn extract_status(line: &str) -> Option<String>
{
    let (_, state) = line.split_once(STATE_MARKER)?;
    let state = state.trim();
    if state.is_empty() {
        None
    } else {
        Some(state.to_string())
    }
}

impl ThreadState {
    /// Classify a status text such as `TIMED_WAITING (sleeping)` by its first word.
    pub fn from_status(status: &str) -> Option<ThreadState>
    {
        let word = status.split_whitespace().next()?;
        Some(match word {
            "NEW" => ThreadState::New,
            "RUNNABLE" => ThreadState::Runnable,
            "BLOCKED" => ThreadState::Blocked,
            "WAITING" => ThreadState::Waiting,
            "TIMED_WAITING" => ThreadState::TimedWaiting,
            "TERMINATED" => ThreadState::Terminated,
            other => ThreadState::Unknown(other.to_string()),
        })
    }
    pub fn as_str(&self) -> &str
    {
        match self {
            ThreadState::New => "NEW",
            ThreadState::Runnable => "RUNNABLE",
            ThreadState::Blocked => "BLOCKED",
            ThreadState::Waiting => "WAITING",
            ThreadState::TimedWaiting => "TIMED_WAITING",
            ThreadState::Terminated => "TERMINATED",
            ThreadState::Unknown(state) => state,
        }
    }
}

impl Serialize for ThreadState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl ThreadRecord {
    /// Create a record from the lines of one block.
    ///
    /// Returns `None` if the first line has no nid. A missing name or status is logged,
    /// and leaves the field empty.
    pub fn from_block(lines: &[&str]) -> Option<ThreadRecord>
    {
        let first = lines.first()?;
        let nid = match extract_nid(first) {
            Some(nid) => nid,
            None => {
                info!("line does not have a nid, skipping: {}", first);
                return None;
            }
        };
        let tid = match nid.decode() {
            Ok(tid) => Some(tid),
            Err(e) => {
                warn!("nid {} cannot be converted to a thread id: {}", nid, e);
                None
            }
        };
        let name = extract_name(first).unwrap_or_else(|| {
            warn!("line does not have a name: {}", first);
            String::new()
        });
        let status = match lines.get(1) {
            Some(second) => extract_status(second).unwrap_or_else(|| {
                warn!("line does not have a thread state: {}", second);
                String::new()
            }),
            None => {
                warn!("thread {} has no thread state line", nid);
                String::new()
            }
        };

        Some(ThreadRecord {
            state: ThreadState::from_status(&status),
            nid,
            tid,
            name,
            status,
            raw_block: lines.join("\n"),
            ..Default::default()
        })
    }
    /// The thread id for display, with 0 for an unresolved nid.
    pub fn tid_or_zero(&self) -> i32 {
        self.tid.map(|tid| tid.0).unwrap_or_default()
    }
}

impl AllThreadRecords {
    pub fn new() -> Self { Default::default() }
    pub fn parse_dump(
        dump: &str
    ) -> AllThreadRecords
    {
        info!("begin parse thread dump");
        let timer = Instant::now();

        let mut allthreadrecords = AllThreadRecords::new();
        for block in blocks(dump) {
            match ThreadRecord::from_block(&block) {
                Some(record) => allthreadrecords.threads.push(record),
                None => allthreadrecords.rejected_blocks += 1,
            }
        }

        info!("end parse thread dump: {} threads, {} blocks skipped, {:?}", allthreadrecords.threads.len(), allthreadrecords.rejected_blocks, timer.elapsed());

        allthreadrecords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Tid;

    #[test]
    fn unit_parse_empty_dump() {
        let result = AllThreadRecords::parse_dump("");
        assert!(result.threads.is_empty());
        assert_eq!(result.rejected_blocks, 0);
    }

    #[test]
    fn unit_parse_jvm_thread_dump() {
        // This is what the threaddump attach command returns, shortened.
        let dump = r#"2023-03-16 12:33:37
Full thread dump OpenJDK 64-Bit Server VM (17.0.2+8-86 mixed mode, sharing):

Threads class SMR info:
_java_thread_list=0x00007f4bd8001f80, length=11, elements={
0x00007f4c1c02a000, 0x00007f4c1c0d6000
}

"main" #1 prio=5 os_prio=0 cpu=52.60ms elapsed=11.32s tid=0x00007f4c1c02a000 nid=0x1a2b waiting on condition  [0x00007f4c22bfe000]
   java.lang.Thread.State: TIMED_WAITING (sleeping)
	at java.lang.Thread.sleep(java.base@17.0.2/Native Method)
	at Main.main(Main.java:5)

"Reference Handler" #2 daemon prio=10 os_prio=0 cpu=0.20ms elapsed=11.30s tid=0x00007f4c1c0d6000 nid=0x1a32 waiting on condition  [0x00007f4c0b1fe000]
   java.lang.Thread.State: RUNNABLE
	at java.lang.ref.Reference.waitForReferencePendingList(java.base@17.0.2/Native Method)

"VM Thread" os_prio=0 cpu=2.11ms elapsed=11.31s tid=0x00007f4c1c0c9800 nid=0x1a31 runnable

JNI global refs: 6, weak refs: 0

"#;
        let result = AllThreadRecords::parse_dump(dump);
        // the header blocks and the JNI line have no nid
        assert_eq!(result.threads.len(), 3);
        assert_eq!(result.rejected_blocks, 3);

        assert_eq!(result.threads[0].nid, Nid::new("1a2b"));
        assert_eq!(result.threads[0].tid, Some(Tid(6699)));
        assert_eq!(result.threads[0].name, "main");
        assert_eq!(result.threads[0].status, "TIMED_WAITING (sleeping)");
        assert_eq!(result.threads[0].state, Some(ThreadState::TimedWaiting));
        assert_eq!(result.threads[0].cpu_percent, 0.0);
        assert!(result.threads[0].raw_block.ends_with("at Main.main(Main.java:5)"));

        assert_eq!(result.threads[1].name, "Reference Handler");
        assert_eq!(result.threads[1].state, Some(ThreadState::Runnable));

        // the VM threads have no thread state line
        assert_eq!(result.threads[2].name, "VM Thread");
        assert_eq!(result.threads[2].status, "");
        assert_eq!(result.threads[2].state, None);
    }

    #[test]
    fn unit_parse_blocks_keep_order() {
        let dump = "\"a\" nid=0x1\n   java.lang.Thread.State: RUNNABLE\n\n\"b\" nid=0x2\n   java.lang.Thread.State: BLOCKED (on object monitor)\n\n\"c\" nid=0x3\n   java.lang.Thread.State: NEW\n\n";
        let result = AllThreadRecords::parse_dump(dump);
        let names: Vec<&str> = result.threads.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn unit_parse_last_block_without_trailing_empty_line_is_dropped() {
        // Known boundary case: a block is only emitted when an empty line follows it.
        let dump = "\"a\" nid=0x1\n   java.lang.Thread.State: RUNNABLE\n\n\"b\" nid=0x2\n   java.lang.Thread.State: RUNNABLE";
        let result = AllThreadRecords::parse_dump(dump);
        assert_eq!(result.threads.len(), 1);
        assert_eq!(result.threads[0].name, "a");
    }

    #[test]
    fn unit_parse_final_newline_terminates_last_block() {
        let dump = "\"a\" nid=0x1\n   java.lang.Thread.State: RUNNABLE\n\n\"b\" nid=0x2\n   java.lang.Thread.State: RUNNABLE\n";
        let result = AllThreadRecords::parse_dump(dump);
        assert_eq!(result.threads.len(), 2);
    }

    #[test]
    fn unit_parse_crlf_and_repeated_empty_lines() {
        let dump = "\"a\" nid=0x1\r\n   java.lang.Thread.State: WAITING (parking)\r\n\r\n\r\n\r\n\"b\" nid=0x2\r\n\r\n";
        let result = AllThreadRecords::parse_dump(dump);
        assert_eq!(result.threads.len(), 2);
        assert_eq!(result.rejected_blocks, 0);
        assert_eq!(result.threads[0].status, "WAITING (parking)");
    }

    #[test]
    fn unit_malformed_blocks_do_not_stop_parsing() {
        let dump = "no nid here\n\n\"bad nid\" nid=0xzz\n   java.lang.Thread.State: RUNNABLE\n\nno quote nid=0x10\n   something else\n\n\"good\" nid=0x11\n   java.lang.Thread.State: RUNNABLE\n\n";
        let result = AllThreadRecords::parse_dump(dump);
        assert_eq!(result.rejected_blocks, 1);
        assert_eq!(result.threads.len(), 3);
        // an invalid nid keeps the record, unresolved
        assert_eq!(result.threads[0].nid, Nid::new("zz"));
        assert_eq!(result.threads[0].tid, None);
        assert_eq!(result.threads[0].tid_or_zero(), 0);
        // no name and no status keep the record
        assert_eq!(result.threads[1].name, "");
        assert_eq!(result.threads[1].status, "");
        assert_eq!(result.threads[1].tid, Some(Tid(16)));
        assert_eq!(result.threads[2].name, "good");
    }

    #[test]
    fn unit_extract_nid() {
        assert_eq!(extract_nid("\"main\" #1 prio=5 tid=0x00007f4c1c02a000 nid=0x1a2b waiting"), Some(Nid::new("1a2b")));
        // tid=0x.. is not a nid
        assert_eq!(extract_nid("\"main\" tid=0x00007f4c1c02a000 waiting"), None);
        // the first matching token wins, an empty suffix does not match
        assert_eq!(extract_nid("\"x\" nid=0x nid=0x5 nid=0x6"), Some(Nid::new("5")));
        assert_eq!(extract_nid(""), None);
    }

    #[test]
    fn unit_extract_name() {
        assert_eq!(extract_name("\"C2 CompilerThread0\" #6 daemon nid=0x1a36"), Some("C2 CompilerThread0".to_string()));
        assert_eq!(extract_name("main\" nid=0x1"), None);
        assert_eq!(extract_name("\"main nid=0x1"), None);
        assert_eq!(extract_name("\"\" nid=0x1"), None);
    }

    #[test]
    fn unit_extract_status() {
        assert_eq!(extract_status("   java.lang.Thread.State: RUNNABLE  "), Some("RUNNABLE".to_string()));
        assert_eq!(extract_status("   java.lang.Thread.State:    "), None);
        assert_eq!(extract_status("   java.lang.Thread.State:"), None);
        assert_eq!(extract_status("\tat java.lang.Thread.run(Thread.java:833)"), None);
    }

    #[test]
    fn unit_thread_state_from_status() {
        assert_eq!(ThreadState::from_status("WAITING (on object monitor)"), Some(ThreadState::Waiting));
        assert_eq!(ThreadState::from_status("TERMINATED"), Some(ThreadState::Terminated));
        assert_eq!(ThreadState::from_status("PARKED"), Some(ThreadState::Unknown("PARKED".to_string())));
        assert_eq!(ThreadState::from_status(""), None);
        assert_eq!(ThreadState::Unknown("PARKED".to_string()).as_str(), "PARKED");
    }

    #[test]
    fn unit_thread_state_serializes_as_text() {
        assert_eq!(serde_json::to_string(&ThreadState::TimedWaiting).unwrap(), "\"TIMED_WAITING\"");
        assert_eq!(serde_json::to_string(&ThreadState::Unknown("PARKED".to_string())).unwrap(), "\"PARKED\"");
        let record = ThreadRecord::from_block(&["\"x\" nid=0x1", "   java.lang.Thread.State: PARKED (custom)"]).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["state"], "PARKED");
        assert_eq!(json["status"], "PARKED (custom)");
    }

    #[test]
    fn unit_single_line_block() {
        let record = ThreadRecord::from_block(&["\"GC Thread#0\" os_prio=0 nid=0x1a2d runnable"]).unwrap();
        assert_eq!(record.name, "GC Thread#0");
        assert_eq!(record.status, "");
        assert_eq!(ThreadRecord::from_block(&[]), None);
    }
}
