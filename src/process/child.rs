use std::{
    convert::Infallible,
    ffi::{CStr, CString, NulError},
    os::unix::ffi::OsStrExt,
    ptr,
};

use nix::{
    fcntl::{fcntl, open, FcntlArg, FdFlag, OFlag},
    libc::{self, c_char},
    sys::{
        signal::{signal, SigHandler, Signal},
        stat::Mode,
    },
    unistd::{self, dup2},
};
use thiserror::Error;

use crate::{cmd::pipeline::Stage, prelude::*};

use super::PipeSet;

/// A stage converted to C strings ahead of `fork`, down to the
/// null-terminated pointer array `execvp` takes, so the child never has to
/// allocate.
#[derive(Debug)]
pub struct PreparedStage {
    argv: Vec<CString>,
    /// Points into `argv`; the strings' buffers stay put when `argv` moves.
    argv_ptrs: Vec<*const c_char>,
    input: Option<CString>,
    output: Option<CString>,
}

impl PreparedStage {
    pub fn new(stage: &Stage) -> Result<Self, NulError> {
        let path = |path: &std::path::Path| CString::new(path.as_os_str().as_bytes());

        let argv = stage
            .args
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let argv_ptrs = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain([ptr::null()])
            .collect();

        Ok(Self {
            argv,
            argv_ptrs,
            input: stage.input.as_deref().map(path).transpose()?,
            output: stage.output.as_deref().map(path).transpose()?,
        })
    }
}

#[derive(Debug, Error)]
pub enum ChildError<'a> {
    #[error("missing command")]
    EmptyCommand,
    #[error("{}: {errno}", .path.to_string_lossy())]
    OpenInput { path: &'a CStr, errno: Errno },
    #[error("{}: {errno}", .path.to_string_lossy())]
    OpenOutput { path: &'a CStr, errno: Errno },
    #[error("dup2: {0}")]
    Dup(Errno),
    #[error("{}: {errno}", .program.to_string_lossy())]
    Exec { program: &'a CStr, errno: Errno },
}

impl ChildError<'_> {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::OpenInput { .. } | Self::OpenOutput { .. } | Self::Dup(_) => 1,
            Self::EmptyCommand => 127,
            Self::Exec {
                errno: Errno::ENOENT,
                ..
            } => 127,
            Self::Exec { .. } => 126,
        }
    }

    /// Writes `osh: <subject>: <reason>` straight to fd 2, the same text as
    /// `Display` but without formatting machinery.
    fn report(&self) {
        let (subject, reason): (&[u8], &str) = match self {
            Self::EmptyCommand => (&b""[..], "missing command"),
            Self::OpenInput { path, errno } | Self::OpenOutput { path, errno } => {
                (path.to_bytes(), errno.desc())
            }
            Self::Dup(errno) => (&b"dup2"[..], errno.desc()),
            Self::Exec { program, errno } => (program.to_bytes(), errno.desc()),
        };

        let separator: &[u8] = if subject.is_empty() { b"" } else { b": " };
        let parts: [&[u8]; 4] = [b"osh: ", subject, separator, reason.as_bytes()];

        for part in parts.into_iter().chain([&b"\n"[..]]) {
            let _ = unistd::write(libc::STDERR_FILENO, part);
        }
    }
}

/// Makes `fd` the child's descriptor `target`, surviving exec. A source
/// already sitting on `target` only loses its close-on-exec flag.
fn wire<'a>(fd: RawFd, target: RawFd) -> Result<(), ChildError<'a>> {
    if fd == target {
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty())).map_err(ChildError::Dup)?;
    } else {
        dup2(fd, target).map_err(ChildError::Dup)?;
    }

    Ok(())
}

/// Wires the child's standard streams and replaces the process image.
/// Only returns on failure.
pub fn run<'a>(
    stage: &'a PreparedStage,
    index: usize,
    pipes: &PipeSet,
) -> Result<Infallible, ChildError<'a>> {
    let input = stage
        .input
        .as_deref()
        .map(|path| {
            open(path, OFlag::O_RDONLY | OFlag::O_CLOEXEC, Mode::empty())
                .map_err(|errno| ChildError::OpenInput { path, errno })
        })
        .transpose()?;

    let output = stage
        .output
        .as_deref()
        .map(|path| {
            open(
                path,
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC | OFlag::O_CLOEXEC,
                Mode::from_bits_truncate(0o644),
            )
            .map_err(|errno| ChildError::OpenOutput { path, errno })
        })
        .transpose()?;

    let stdin_source = input.or_else(|| pipes.stdin_of(index));
    let mut stdout_source = output.or_else(|| pipes.stdout_of(index));

    // a source on fd 0 would be overwritten by wiring stdin first
    if let (Some(libc::STDIN_FILENO), Some(_)) = (stdout_source, stdin_source) {
        let lifted = FcntlArg::F_DUPFD_CLOEXEC(libc::STDERR_FILENO + 1);
        stdout_source = Some(fcntl(libc::STDIN_FILENO, lifted).map_err(ChildError::Dup)?);
    }

    if let Some(fd) = stdin_source {
        wire(fd, libc::STDIN_FILENO)?;
    }
    if let Some(fd) = stdout_source {
        wire(fd, libc::STDOUT_FILENO)?;
    }

    pipes.close_raw(&[
        stdin_source.map(|_| libc::STDIN_FILENO),
        stdout_source.map(|_| libc::STDOUT_FILENO),
    ]);
    for fd in input.into_iter().chain(output) {
        if fd > libc::STDERR_FILENO {
            let _ = unistd::close(fd);
        }
    }

    // the orchestrator ignores SIGPIPE; programs expect the default
    // SAFETY: installs no handler, only restores the default disposition
    let _ = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) };

    let program = stage
        .argv
        .first()
        .map(CString::as_c_str)
        .ok_or(ChildError::EmptyCommand)?;

    // SAFETY: `argv_ptrs` is null-terminated and points into `stage.argv`,
    // which outlives the call
    unsafe { libc::execvp(program.as_ptr(), stage.argv_ptrs.as_ptr()) };

    Err(ChildError::Exec {
        program,
        errno: Errno::last(),
    })
}

/// Body of a forked child: never returns to the caller's control flow.
pub fn exec_stage(stage: &PreparedStage, index: usize, pipes: &PipeSet) -> ! {
    let err = match run(stage, index, pipes) {
        Ok(never) => match never {},
        Err(err) => err,
    };

    err.report();

    // SAFETY: skips atexit handlers and stdio flushing that belong to the parent
    unsafe { libc::_exit(err.exit_code()) }
}
