//! Background child processes with accumulated output

use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, ExitStatus};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// Exit code, when the process exited normally
    pub code: Option<i32>,
    /// Terminating signal, when killed
    pub signal: Option<i32>,
}

impl ExitInfo {
    /// Normal exit with `code`.
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// True for exit code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub(crate) fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl std::fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(sig)) => write!(f, "signal {}", sig),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

/// Output accumulated so far from a child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A running child process.
pub trait SpawnedProcess: Send {
    /// OS process identifier.
    fn pid(&self) -> u32;

    /// Non-blocking exit check.
    fn try_wait(&mut self) -> io::Result<Option<ExitInfo>>;

    /// Output accumulated so far.
    fn captured(&self) -> CapturedOutput;

    /// Forcefully terminate and reap.
    fn kill(&mut self) -> io::Result<()>;
}

/// Shared line buffer filled by a reader thread.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<String>>);

impl SharedBuffer {
    pub(crate) fn snapshot(&self) -> String {
        self.0.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Drain `reader` line by line into the buffer on a new thread.
    pub(crate) fn pump<R: Read + Send + 'static>(&self, reader: Option<R>) -> JoinHandle<()> {
        let buffer = Arc::clone(&self.0);
        std::thread::spawn(move || {
            let Some(reader) = reader else {
                return;
            };
            for line in BufReader::new(reader).lines().map_while(Result::ok) {
                if let Ok(mut out) = buffer.lock() {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
        })
    }
}

/// `SpawnedProcess` backed by `std::process::Child`.
///
/// Output is either piped into in-memory buffers or written by the child
/// straight to a log file, which outlives this process.
pub struct SystemProcess {
    child: Child,
    stdout: SharedBuffer,
    stderr: SharedBuffer,
    readers: Vec<JoinHandle<()>>,
    log: Option<PathBuf>,
    exit: Option<ExitInfo>,
}

impl SystemProcess {
    pub(crate) fn new(mut child: Child) -> Self {
        let stdout = SharedBuffer::default();
        let stderr = SharedBuffer::default();
        let readers = vec![
            stdout.pump(child.stdout.take()),
            stderr.pump(child.stderr.take()),
        ];
        Self {
            child,
            stdout,
            stderr,
            readers,
            log: None,
            exit: None,
        }
    }

    /// Child whose stdout and stderr were redirected to `log`.
    pub(crate) fn logging_to(child: Child, log: PathBuf) -> Self {
        Self {
            child,
            stdout: SharedBuffer::default(),
            stderr: SharedBuffer::default(),
            readers: Vec::new(),
            log: Some(log),
            exit: None,
        }
    }

    fn join_readers(&mut self) {
        for handle in self.readers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl SpawnedProcess for SystemProcess {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitInfo>> {
        if let Some(exit) = self.exit {
            return Ok(Some(exit));
        }
        match self.child.try_wait()? {
            Some(status) => {
                // Pipes close on exit; collect the tail of the output.
                self.join_readers();
                let exit = ExitInfo::from_status(status);
                self.exit = Some(exit);
                Ok(Some(exit))
            }
            None => Ok(None),
        }
    }

    /// With a log file, both streams come back interleaved as `stdout`.
    fn captured(&self) -> CapturedOutput {
        match self.log {
            Some(ref path) => CapturedOutput {
                stdout: fs::read(path)
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .unwrap_or_default(),
                stderr: String::new(),
            },
            None => CapturedOutput {
                stdout: self.stdout.snapshot(),
                stderr: self.stderr.snapshot(),
            },
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        if self.exit.is_some() {
            return Ok(());
        }
        let _ = self.child.kill();
        let status = self.child.wait()?;
        self.readers.clear();
        self.exit = Some(ExitInfo::from_status(status));
        Ok(())
    }
}
