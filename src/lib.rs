#[macro_use]
extern crate tracing;

pub mod cmd;
pub mod config;
pub mod history;
pub mod input;
pub mod parse;
pub mod prelude;
pub mod process;
pub mod state;

pub use cmd::{
    execute::ExecError,
    pipeline::{Pipeline, RedirectKind, Stage},
};
pub use config::Config;
pub use history::HistoryStore;
pub use parse::{parse_pipeline, ParseError};
pub use process::status::{PipelineReport, StageStatus};
pub use state::{Shell, SubmitError, Submission};
