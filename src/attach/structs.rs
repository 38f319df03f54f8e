//! The structs
//!
use std::{io, path::PathBuf, time::Duration};
use thiserror::Error;
use crate::identity::Pid;

/// The settings for attaching to a JVM.
#[derive(Debug, Clone)]
pub struct HotspotAttach {
    /// How long to wait for the attach listener to create its socket.
    pub attach_timeout: Duration,
    /// How long to wait for the complete response to a command.
    pub read_timeout: Duration,
    /// The temporary directory of the JVM, normally `/tmp`.
    pub tmp_dir: PathBuf,
    /// The root of the proc filesystem, normally `/proc`.
    pub proc_root: PathBuf,
}

#[derive(Error, Debug)]
pub enum AttachError {
    #[error("unable to attach to process {pid}: {reason}")]
    Attach { pid: Pid, reason: String },

    #[error("attach listener of process {0} did not start within {1:?}")]
    Timeout(Pid, Duration),

    #[error("unable to connect to {}: {source}", .path.display())]
    Connect { path: PathBuf, source: io::Error },

    #[error("cannot write to unix socket: {0}")]
    Send(io::Error),

    #[error("unable to read from socket: {0}")]
    Read(io::Error),

    #[error("no response from socket within {0:?}")]
    ReadTimeout(Duration),

    #[error("command failed with return code {code}: {message}")]
    ReturnCode { code: i32, message: String },
}
