use std::ffi::NulError;

use nix::{
    sys::wait::waitpid,
    unistd::{fork, ForkResult},
};
use thiserror::Error;

use super::pipeline::Pipeline;
use crate::{
    prelude::*,
    process::{
        child::{self, PreparedStage},
        status::{PipelineReport, StageOutcome, StageStatus},
        PipeSet,
    },
};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("argument of stage {index} contains a NUL byte")]
    Nul {
        index: usize,
        #[source]
        source: NulError,
    },
    #[error("pipe: {0}")]
    Pipe(#[source] Errno),
    /// Stages before `index` were started and have been waited for.
    #[error("fork: {errno}")]
    Spawn {
        index: usize,
        errno: Errno,
        report: PipelineReport,
    },
}

impl Pipeline {
    /// Runs every stage as its own process, wired left to right, and waits
    /// for all of them.
    ///
    /// Failures inside a child (missing file, unknown program) only show up in
    /// that stage's status. Returns once no process of this pipeline is left
    /// running and no descriptor it created is open in this process.
    pub fn execute(&self) -> Result<PipelineReport, ExecError> {
        // SAFETY: the orchestrator is single threaded and the child only
        // makes raw syscalls before exec or _exit
        self.spawn_with(|_| unsafe { fork() })
    }

    /// `execute` with the fork call supplied by the caller, which receives the
    /// index of the stage about to start.
    fn spawn_with<F>(&self, mut fork: F) -> Result<PipelineReport, ExecError>
    where
        F: FnMut(usize) -> nix::Result<ForkResult>,
    {
        if self.is_empty() {
            return Ok(PipelineReport::default());
        }

        let prepared = self
            .stages
            .iter()
            .enumerate()
            .map(|(index, stage)| {
                PreparedStage::new(stage).map_err(|source| ExecError::Nul { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut pipes = PipeSet::new(prepared.len() - 1).map_err(ExecError::Pipe)?;
        let mut spawned = Vec::with_capacity(prepared.len());
        let mut spawn_error = None;

        for (index, stage) in prepared.iter().enumerate() {
            trace!(index, stage = %self.stages[index], "spawning stage");

            match fork(index) {
                Ok(ForkResult::Child) => child::exec_stage(stage, index, &pipes),
                Ok(ForkResult::Parent { child }) => {
                    debug!(index, %child, "stage spawned");
                    spawned.push((index, child));
                    pipes.release_spawned(index);
                }
                Err(errno) => {
                    error!(index, %errno, "fork failed, not starting remaining stages");
                    spawn_error = Some((index, errno));
                    break;
                }
            }
        }

        drop(pipes);

        let report = wait_all(spawned);

        match spawn_error {
            Some((index, errno)) => Err(ExecError::Spawn {
                index,
                errno,
                report,
            }),
            None => Ok(report),
        }
    }
}

fn wait_all(spawned: Vec<(usize, Pid)>) -> PipelineReport {
    let outcomes = spawned
        .into_iter()
        .map(|(index, pid)| StageOutcome {
            index,
            pid,
            status: wait_for(pid),
        })
        .collect();

    PipelineReport { outcomes }
}

fn wait_for(pid: Pid) -> StageStatus {
    loop {
        match waitpid(pid, None) {
            Ok(status) => match StageStatus::from_wait(status) {
                Some(status) => {
                    trace!(%pid, ?status, "stage finished");
                    break status;
                }
                None => continue,
            },
            Err(Errno::EINTR) => continue,
            Err(errno) => {
                warn!(%pid, %errno, "failed to wait for stage");
                break StageStatus::Lost(errno);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #[cfg(target_os = "linux")]
    use std::fs;

    use super::*;
    use crate::process::fd_test_lock;

    #[cfg(target_os = "linux")]
    fn open_fds() -> usize {
        fs::read_dir("/proc/self/fd").unwrap().count()
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn fork_failure_stops_spawning_and_waits_for_started_stages() {
        let _lock = fd_test_lock();
        let pipeline: Pipeline = "sleep 0 | cat | cat".parse().unwrap();

        let before = open_fds();

        let result = pipeline.spawn_with(|index| match index {
            1 => Err(Errno::EAGAIN),
            // SAFETY: the child only execs or _exits
            _ => unsafe { fork() },
        });

        let (index, errno, report) = match result {
            Err(ExecError::Spawn {
                index,
                errno,
                report,
            }) => (index, errno, report),
            other => panic!("expected a spawn error, got {other:?}"),
        };

        assert_eq!(index, 1);
        assert_eq!(errno, Errno::EAGAIN);
        assert_eq!(report.spawned(), 1);
        assert_eq!(report.status(0), Some(StageStatus::Exited(0)));
        assert_eq!(report.status(1), None);
        assert_eq!(open_fds(), before);
    }

    #[test]
    fn fork_failure_at_first_stage_spawns_nothing() {
        let _lock = fd_test_lock();
        let pipeline: Pipeline = "true | true".parse().unwrap();

        let result = pipeline.spawn_with(|_| Err(Errno::ENOMEM));

        assert!(matches!(
            result,
            Err(ExecError::Spawn { index: 0, errno: Errno::ENOMEM, ref report })
                if report.spawned() == 0
        ));
    }
}
