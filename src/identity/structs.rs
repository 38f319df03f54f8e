//! The structs
//!
use std::fmt;
use thiserror::Error;

/// The numeric OS thread id (the `tid` in `/proc/<pid>/task/<tid>`).
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Tid(pub i32);

/// The numeric id of the target process.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Pid(pub i32);

/// The native thread id as printed in a thread dump, in hexadecimal and without the `0x` prefix.
///
/// The text is stored as found. It is not guaranteed to be valid hexadecimal,
/// use [Nid::decode] to obtain the [Tid].
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Nid(pub String);

/// The reasons a [Nid] cannot be decoded into a [Tid].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty nid")]
    Empty,
    #[error("invalid hex digit in nid: {0}")]
    InvalidDigit(String),
    #[error("nid does not fit a 32 bit thread id: {0}")]
    Overflow(String),
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Nid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
