use nix::sys::{signal::Signal, wait::WaitStatus};

use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Exited(i32),
    Signaled(Signal),
    /// The child could not be waited on; its status is unknown.
    Lost(Errno),
}

impl StageStatus {
    pub fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Self::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Self::Signaled(signal)),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            _ => None,
        }
    }

    pub fn success(&self) -> bool {
        self.code() == Some(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOutcome {
    pub index: usize,
    pub pid: Pid,
    pub status: StageStatus,
}

/// Per-stage results of one pipeline run, in stage order.
///
/// Nothing here is folded into an overall success value; callers that care
/// look at the individual stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub outcomes: Vec<StageOutcome>,
}

impl PipelineReport {
    pub fn status(&self, index: usize) -> Option<StageStatus> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.index == index)
            .map(|outcome| outcome.status)
    }

    pub fn spawned(&self) -> usize {
        self.outcomes.len()
    }
}
