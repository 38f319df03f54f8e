//! The impls and functions.
//!
use std::{fs, path::{Path, PathBuf}, time::{Duration, Instant}};
use log::*;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid as NixPid;
use tokio::{io::{AsyncReadExt, AsyncWriteExt}, net::UnixStream, time};
use crate::attach::{AttachError, HotspotAttach};
use crate::identity::Pid;

const PROTOCOL_VERSION: &str = "1";
const ARGUMENT_COUNT: usize = 3;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

impl HotspotAttach {
    pub fn new(
        attach_timeout: Duration,
        read_timeout: Duration,
    ) -> Self
    {
        HotspotAttach { attach_timeout, read_timeout, tmp_dir: PathBuf::from("/tmp"), proc_root: PathBuf::from("/proc") }
    }
    fn proc_dir(&self, pid: Pid) -> PathBuf {
        self.proc_root.join(pid.0.to_string())
    }
    /// The places where the attach socket of the process can be found.
    /// The first one is the temporary directory as seen by the process, which differs inside a container.
    pub fn socket_candidates(&self, pid: Pid) -> Vec<PathBuf>
    {
        let name = format!(".java_pid{}", pid);
        vec![
            self.proc_dir(pid).join("root").join("tmp").join(&name),
            self.tmp_dir.join(&name),
        ]
    }
    fn find_socket(&self, pid: Pid) -> Option<PathBuf>
    {
        self.socket_candidates(pid).into_iter().find(|path| path.exists())
    }
    /// A JVM installs a SIGQUIT handler. Any other process is terminated by SIGQUIT, so it must not be signalled.
    fn check_catches_sigquit(&self, pid: Pid) -> Result<(), AttachError>
    {
        let status_path = self.proc_dir(pid).join("status");
        let status = fs::read_to_string(&status_path)
            .map_err(|e| AttachError::Attach { pid, reason: format!("reading {}: {}", status_path.display(), e) })?;
        match catches_sigquit(&status) {
            Some(true) => Ok(()),
            Some(false) => Err(AttachError::Attach { pid, reason: "process does not catch SIGQUIT".to_string() }),
            None => Err(AttachError::Attach { pid, reason: format!("no SigCgt line found in {}", status_path.display()) }),
        }
    }
    /// Ask the JVM to start its attach listener, and wait for the socket to appear.
    pub async fn start_attach_listener(
        &self,
        pid: Pid,
    ) -> Result<PathBuf, AttachError>
    {
        info!("begin start attach listener of process {}", pid);
        let timer = Instant::now();

        check_pid(pid)?;
        self.check_catches_sigquit(pid)?;
        let attach_file = self.create_attach_file(pid)?;
        let signalled = kill(NixPid::from_raw(pid.0), Signal::SIGQUIT)
            .map_err(|e| AttachError::Attach { pid, reason: format!("sending SIGQUIT: {}", e) });

        let result = match signalled {
            Ok(()) => {
                let deadline = Instant::now() + self.attach_timeout;
                loop {
                    if let Some(socket) = self.find_socket(pid) {
                        break Ok(socket);
                    }
                    if Instant::now() >= deadline {
                        break Err(AttachError::Timeout(pid, self.attach_timeout));
                    }
                    time::sleep(POLL_INTERVAL).await;
                }
            },
            Err(e) => Err(e),
        };

        if let Err(e) = fs::remove_file(&attach_file) {
            debug!("unable to remove {}: {}", attach_file.display(), e);
        }
        info!("end start attach listener: {:?}", timer.elapsed());

        result
    }
    fn create_attach_file(&self, pid: Pid) -> Result<PathBuf, AttachError>
    {
        let name = format!(".attach_pid{}", pid);
        let candidates = [
            self.proc_dir(pid).join("cwd").join(&name),
            self.tmp_dir.join(&name),
        ];
        for candidate in candidates {
            match fs::File::create(&candidate) {
                Ok(_) => {
                    debug!("created attach file {}", candidate.display());
                    return Ok(candidate);
                },
                Err(e) => debug!("unable to create attach file {}: {}", candidate.display(), e),
            }
        }
        Err(AttachError::Attach { pid, reason: "unable to create the attach file".to_string() })
    }
    /// Request a thread dump from the JVM with process id `pid`.
    pub async fn thread_dump(
        &self,
        pid: Pid,
    ) -> Result<String, AttachError>
    {
        check_pid(pid)?;
        let socket = match self.find_socket(pid) {
            Some(socket) => socket,
            None => self.start_attach_listener(pid).await?,
        };
        debug!("using attach socket {}", socket.display());
        execute(&socket, "threaddump", &[], self.read_timeout).await
    }
}

/// For kill(2) 0 is the own process group and a negative pid is a process group or every process.
fn check_pid(pid: Pid) -> Result<(), AttachError>
{
    if pid.0 <= 0 {
        return Err(AttachError::Attach { pid, reason: "process id must be greater than 0".to_string() });
    }
    Ok(())
}

/// Whether the `SigCgt` mask in the contents of `/proc/<pid>/status` has SIGQUIT set.
/// `None` if there is no valid `SigCgt` line.
pub fn catches_sigquit(status: &str) -> Option<bool>
{
    let mask = status.lines()
        .find_map(|line| line.strip_prefix("SigCgt:"))?
        .trim();
    let mask = u64::from_str_radix(mask, 16).ok()?;
    // signal n is bit n - 1
    Some(mask & (1 << (libc::SIGQUIT - 1)) != 0)
}

/// The bytes of a request: the protocol version, the command and always three arguments.
pub fn request_bytes(
    command: &str,
    args: &[&str],
) -> Vec<u8>
{
    let mut request = Vec::new();
    for part in [PROTOCOL_VERSION, command] {
        request.extend_from_slice(part.as_bytes());
        request.push(0);
    }
    for index in 0..ARGUMENT_COUNT {
        if let Some(arg) = args.get(index) {
            request.extend_from_slice(arg.as_bytes());
        }
        request.push(0);
    }
    request
}

/// Split the response in the return code and the output, and turn a non-zero return code into an error.
pub fn parse_response(response: &str) -> Result<String, AttachError>
{
    let (code, output) = response.split_once('\n').unwrap_or((response, ""));
    match code.trim().parse::<i32>() {
        Ok(0) => Ok(output.to_string()),
        Ok(code) => Err(AttachError::ReturnCode { code, message: output.trim().to_string() }),
        Err(_) => Err(AttachError::ReturnCode { code: -1, message: format!("invalid response: {}", code) }),
    }
}

/// Send a command to the attach socket and return its output.
pub async fn execute(
    socket: &Path,
    command: &str,
    args: &[&str],
    read_timeout: Duration,
) -> Result<String, AttachError>
{
    info!("begin execute {}", command);
    let timer = Instant::now();

    let mut stream = UnixStream::connect(socket)
        .await
        .map_err(|source| AttachError::Connect { path: socket.to_path_buf(), source })?;
    stream.write_all(&request_bytes(command, args))
        .await
        .map_err(AttachError::Send)?;

    // the JVM closes the connection when the output is complete
    let mut response = Vec::new();
    time::timeout(read_timeout, stream.read_to_end(&mut response))
        .await
        .map_err(|_| AttachError::ReadTimeout(read_timeout))?
        .map_err(AttachError::Read)?;

    info!("end execute {}: {} bytes, {:?}", command, response.len(), timer.elapsed());

    parse_response(&String::from_utf8_lossy(&response))
}
