//! Process-table helpers

use std::io;

/// Check whether a process with `pid` exists.
///
/// Uses `kill(pid, 0)`: a process owned by another user answers EPERM, which
/// still means it is alive.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match signal::kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    false
}

/// Send SIGKILL to `pid`.
#[cfg(unix)]
pub fn kill_process(pid: u32) -> io::Result<()> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    signal::kill(Pid::from_raw(raw), Signal::SIGKILL).map_err(io::Error::from)
}

#[cfg(not(unix))]
pub fn kill_process(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "killing by pid is only supported on unix",
    ))
}
