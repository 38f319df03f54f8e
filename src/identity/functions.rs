//! The impls and functions.
//!
use std::num::IntErrorKind;
use crate::identity::{DecodeError, Nid, Tid};

impl Nid {
    pub fn new(nid: &str) -> Self { Nid(nid.to_string()) }
    pub fn as_str(&self) -> &str { &self.0 }
    /// Parse the nid as a base-16 signed 32-bit integer.
    ///
    /// Only hex digits are accepted: a sign, a `0x` prefix or whitespace is an [DecodeError::InvalidDigit].
    pub fn decode(&self) -> Result<Tid, DecodeError>
    {
        if self.0.is_empty() {
            return Err(DecodeError::Empty);
        }
        // i32::from_str_radix accepts a leading '+' or '-', a nid never carries one.
        if !self.0.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DecodeError::InvalidDigit(self.0.clone()));
        }
        i32::from_str_radix(&self.0, 16)
            .map(Tid)
            .map_err(|e| match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => DecodeError::Overflow(self.0.clone()),
                _ => DecodeError::InvalidDigit(self.0.clone()),
            })
    }
}

impl Tid {
    /// Lowercase hexadecimal text of the thread id, without prefix or leading zeros.
    pub fn encode(&self) -> Nid
    {
        if self.0 < 0 {
            // i64 so that i32::MIN has a magnitude
            Nid(format!("-{:x}", -(self.0 as i64)))
        } else {
            Nid(format!("{:x}", self.0))
        }
    }
}

/// Convert a thread id to the nid text.
pub fn encode(tid: Tid) -> Nid {
    tid.encode()
}

/// Convert nid text to a thread id.
pub fn decode(nid: &str) -> Result<Tid, DecodeError> {
    Nid::new(nid).decode()
}
