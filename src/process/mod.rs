use nix::unistd;

use crate::prelude::*;

pub mod child;
pub mod status;

/// One pipe between neighbouring stages. An end is `None` once the
/// orchestrator has closed its copy.
#[derive(Debug)]
pub struct Pipe {
    pub read: Option<OwnedFd>,
    pub write: Option<OwnedFd>,
}

/// The `n - 1` pipes of an `n`-stage pipeline; pipe `i` carries stage `i`'s
/// output into stage `i + 1`.
///
/// Every end is close-on-exec and owned, so dropping the set closes whatever
/// the orchestrator still holds.
#[derive(Debug, Default)]
pub struct PipeSet {
    pipes: Vec<Pipe>,
}

impl PipeSet {
    pub fn new(count: usize) -> nix::Result<Self> {
        let mut pipes = Vec::with_capacity(count);

        for _ in 0..count {
            let (read, write) = cloexec_pipe()?;
            pipes.push(Pipe {
                read: Some(read),
                write: Some(write),
            });
        }

        Ok(Self { pipes })
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Read end feeding stage `stage`, if it sits after a pipe.
    pub fn stdin_of(&self, stage: usize) -> Option<RawFd> {
        let pipe = self.pipes.get(stage.checked_sub(1)?)?;
        pipe.read.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Write end fed by stage `stage`, if it sits before a pipe.
    pub fn stdout_of(&self, stage: usize) -> Option<RawFd> {
        let pipe = self.pipes.get(stage)?;
        pipe.write.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Every descriptor the orchestrator still has open.
    pub fn raw_fds(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.pipes
            .iter()
            .flat_map(|pipe| [pipe.read.as_ref(), pipe.write.as_ref()])
            .flatten()
            .map(AsRawFd::as_raw_fd)
    }

    /// Called once stage `stage` has been forked: the read end it inherited is
    /// now held by both of its neighbours, and nothing later needs the write
    /// end it writes into.
    pub fn release_spawned(&mut self, stage: usize) {
        if let Some(index) = stage.checked_sub(1) {
            if let Some(pipe) = self.pipes.get_mut(index) {
                pipe.read.take();
            }
        }

        if let Some(pipe) = self.pipes.get_mut(stage) {
            pipe.write.take();
        }
    }

    /// Closes the raw descriptors without freeing anything, except those
    /// listed in `keep`. Used in a forked child, which never returns to drop
    /// the set.
    pub fn close_raw(&self, keep: &[Option<RawFd>]) {
        for fd in self.raw_fds().filter(|fd| !keep.contains(&Some(*fd))) {
            let _ = unistd::close(fd);
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::OFlag;

    let (read, write) = unistd::pipe2(OFlag::O_CLOEXEC)?;
    // SAFETY: both descriptors were just created and are owned by nobody else
    Ok(unsafe { (OwnedFd::from_raw_fd(read), OwnedFd::from_raw_fd(write)) })
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};

    let (read, write) = unistd::pipe()?;
    // SAFETY: both descriptors were just created and are owned by nobody else
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(read), OwnedFd::from_raw_fd(write)) };

    for fd in [&read, &write] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }

    Ok((read, write))
}

/// Serializes unit tests that create descriptors, so a test counting open
/// descriptors is not disturbed by a neighbour.
#[cfg(test)]
pub(crate) fn fd_test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
