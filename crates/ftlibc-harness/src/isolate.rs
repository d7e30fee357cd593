//! Per-case execution boundary.
//!
//! [`run_isolated`] runs one case in a forked child process so that an
//! invalid memory access ends that case only. The child measures the call
//! with the leak probe and sends a fixed-size record back over a pipe; the
//! parent turns the child's termination into a [`CaseOutcome`].
//! [`run_inline`] offers the same contract in-process, catching panics but
//! not faults.

use std::fs::File;
use std::io::Read;
use std::os::fd::FromRawFd;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};

use crate::leaks::{LeakProbe, LeakReport};

/// Exit status a child uses when the case panicked.
const PANIC_EXIT_CODE: i32 = 101;

/// value(4) + tracked(1) + allocations(8) + deallocations(8) + outstanding(8)
const RECORD_LEN: usize = 29;

/// How one case ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaseOutcome {
    /// The call returned normally.
    Returned { value: i32 },
    /// The child was terminated by a signal (`SIGSEGV`, `SIGBUS`, ...).
    Faulted { signal: i32 },
    /// The child exited without reporting a result.
    Exited { code: i32 },
    /// The case panicked.
    Panicked,
}

impl CaseOutcome {
    #[must_use]
    pub const fn returned_value(self) -> Option<i32> {
        match self {
            Self::Returned { value } => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn fault_signal(self) -> Option<i32> {
        match self {
            Self::Faulted { signal } => Some(signal),
            _ => None,
        }
    }
}

/// Result of one bounded execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolatedRun {
    pub outcome: CaseOutcome,
    pub leaks: LeakReport,
}

fn encode_record(value: i32, leaks: &LeakReport) -> [u8; RECORD_LEN] {
    let mut out = [0u8; RECORD_LEN];
    out[0..4].copy_from_slice(&value.to_le_bytes());
    out[4] = u8::from(leaks.tracked);
    out[5..13].copy_from_slice(&leaks.allocations.to_le_bytes());
    out[13..21].copy_from_slice(&leaks.deallocations.to_le_bytes());
    out[21..29].copy_from_slice(&leaks.outstanding_bytes.to_le_bytes());
    out
}

fn decode_record(raw: &[u8]) -> Option<(i32, LeakReport)> {
    if raw.len() != RECORD_LEN {
        return None;
    }
    let u64_at = |at: usize| {
        let mut word = [0u8; 8];
        word.copy_from_slice(&raw[at..at + 8]);
        u64::from_le_bytes(word)
    };
    let mut value = [0u8; 4];
    value.copy_from_slice(&raw[0..4]);
    Some((
        i32::from_le_bytes(value),
        LeakReport {
            tracked: raw[4] != 0,
            allocations: u64_at(5),
            deallocations: u64_at(13),
            outstanding_bytes: u64_at(21),
        },
    ))
}

/// Write the whole buffer to `fd`, retrying on short writes and `EINTR`.
///
/// Only async-signal-safe calls are used; this runs in the forked child.
fn write_all_raw(fd: libc::c_int, mut buf: &[u8]) -> bool {
    while !buf.is_empty() {
        // SAFETY: `buf` is a live slice and `fd` is the child's pipe write end.
        let n = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            if std::io::Error::last_os_error().raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return false;
        }
        buf = &buf[n as usize..];
    }
    true
}

fn wait_child(pid: libc::pid_t) -> std::io::Result<libc::c_int> {
    let mut status: libc::c_int = 0;
    loop {
        // SAFETY: `pid` is our own child and `status` is a valid out pointer.
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc == pid {
            return Ok(status);
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EINTR) {
            return Err(err);
        }
    }
}

/// Run `f` in a forked child and report how it ended.
///
/// Returns an error only when the boundary itself cannot be set up (pipe,
/// fork, or wait failure). Anything the case does, including crashing,
/// becomes a [`CaseOutcome`].
pub fn run_isolated<F>(f: F) -> std::io::Result<IsolatedRun>
where
    F: FnOnce() -> i32,
{
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: `fds` is a valid two-element out array.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    let (read_fd, write_fd) = (fds[0], fds[1]);

    // SAFETY: the child only runs `f`, writes to the pipe, and `_exit`s.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        let err = std::io::Error::last_os_error();
        // SAFETY: both descriptors were just created by `pipe`.
        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
        }
        return Err(err);
    }

    if pid == 0 {
        // SAFETY: child side; the read end is not used here.
        unsafe { libc::close(read_fd) };
        let code = match catch_unwind(AssertUnwindSafe(|| LeakProbe::measure(f))) {
            Ok((value, leaks)) => {
                if write_all_raw(write_fd, &encode_record(value, &leaks)) {
                    0
                } else {
                    1
                }
            }
            Err(_) => PANIC_EXIT_CODE,
        };
        // SAFETY: `_exit` skips the parent's atexit handlers and buffered
        // stdio, which the child must not flush.
        unsafe { libc::_exit(code) }
    }

    // SAFETY: parent side; the write end belongs to the child now.
    unsafe { libc::close(write_fd) };
    // SAFETY: `read_fd` is a freshly created descriptor owned by nobody else.
    let mut reader = unsafe { File::from_raw_fd(read_fd) };
    let mut raw = Vec::with_capacity(RECORD_LEN);
    let read_result = reader.read_to_end(&mut raw);
    drop(reader);

    let status = wait_child(pid)?;
    read_result?;

    let outcome_and_leaks = if libc::WIFSIGNALED(status) {
        (
            CaseOutcome::Faulted {
                signal: libc::WTERMSIG(status),
            },
            LeakReport::untracked(),
        )
    } else {
        let code = if libc::WIFEXITED(status) {
            libc::WEXITSTATUS(status)
        } else {
            -1
        };
        match decode_record(&raw) {
            Some((value, leaks)) if code == 0 => (CaseOutcome::Returned { value }, leaks),
            _ if code == PANIC_EXIT_CODE => (CaseOutcome::Panicked, LeakReport::untracked()),
            _ => (CaseOutcome::Exited { code }, LeakReport::untracked()),
        }
    };

    Ok(IsolatedRun {
        outcome: outcome_and_leaks.0,
        leaks: outcome_and_leaks.1,
    })
}

/// Run `f` on the current thread with the same reporting contract.
///
/// Panics become [`CaseOutcome::Panicked`]; a genuine fault still takes the
/// whole process down.
pub fn run_inline<F>(f: F) -> IsolatedRun
where
    F: FnOnce() -> i32,
{
    match catch_unwind(AssertUnwindSafe(|| LeakProbe::measure(f))) {
        Ok((value, leaks)) => IsolatedRun {
            outcome: CaseOutcome::Returned { value },
            leaks,
        },
        Err(_) => IsolatedRun {
            outcome: CaseOutcome::Panicked,
            leaks: LeakReport::untracked(),
        },
    }
}

/// Conventional name of a fatal signal, e.g. `SIGSEGV`.
#[must_use]
pub fn signal_name(signal: i32) -> String {
    match signal {
        libc::SIGSEGV => "SIGSEGV".to_string(),
        libc::SIGBUS => "SIGBUS".to_string(),
        libc::SIGABRT => "SIGABRT".to_string(),
        libc::SIGFPE => "SIGFPE".to_string(),
        libc::SIGILL => "SIGILL".to_string(),
        libc::SIGKILL => "SIGKILL".to_string(),
        other => format!("SIG{other}"),
    }
}
