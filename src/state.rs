use thiserror::Error;

use crate::{
    cmd::{execute::ExecError, pipeline::Pipeline},
    config::Config,
    history::{bounded, HistoryStore},
    parse::ParseError,
    process::status::PipelineReport,
};

/// Marker that starts a history reference, as in `!! 2`.
pub const HISTORY_MARKER: &str = "!!";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Error: malformed history reference `{0}`, expected `!! <index>`")]
    MalformedHistoryReference(String),
    #[error("Error: No command at index {0} in history.")]
    HistoryIndexOutOfRange(i64),
    #[error("No such command in history.")]
    NoSuchCommand,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

#[derive(Debug)]
pub enum Submission {
    /// Blank input; nothing was recorded or run.
    Skipped,
    Completed(PipelineReport),
}

pub struct Shell {
    pub prompt: String,
    pub history: HistoryStore,
}

impl Shell {
    pub fn new(config: &Config) -> Self {
        Self {
            prompt: config.prompt.clone(),
            history: HistoryStore::with_capacity(config.history_size),
        }
    }

    /// Runs one line typed at the prompt: expands a history reference,
    /// records the line, then parses and executes it.
    ///
    /// A rejected history reference leaves the history untouched. A line that
    /// fails to parse has already been recorded. Input past
    /// [`MAX_INPUT_SIZE`](crate::history::MAX_INPUT_SIZE) bytes is dropped
    /// before anything else, so what runs is what gets recorded.
    pub fn submit(&mut self, raw: &str) -> Result<Submission, SubmitError> {
        let raw = bounded(raw);

        if raw.trim().is_empty() {
            return Ok(Submission::Skipped);
        }

        let line = match self.expand(raw)? {
            Some(line) => {
                println!("{line}");
                line
            }
            None => raw.to_owned(),
        };

        self.history.record(&line);

        let pipeline: Pipeline = line.parse()?;
        debug!(%pipeline, stages = pipeline.len(), "executing");

        let report = pipeline.execute()?;
        trace!(?report, "pipeline finished");

        Ok(Submission::Completed(report))
    }

    /// Resolves `!! <index>` to the stored line; `None` when `raw` is not a
    /// history reference. Exactly one space must separate the marker from
    /// the index.
    pub fn expand(&self, raw: &str) -> Result<Option<String>, SubmitError> {
        let Some(rest) = raw.strip_prefix(HISTORY_MARKER) else {
            return Ok(None);
        };

        let index = rest
            .strip_prefix(' ')
            .filter(|digits| !digits.starts_with([' ', '+']))
            .and_then(|digits| digits.parse::<i64>().ok())
            .ok_or_else(|| SubmitError::MalformedHistoryReference(raw.to_owned()))?;

        if index < 0 || index >= self.history.len() as i64 {
            return Err(SubmitError::HistoryIndexOutOfRange(index));
        }

        self.history
            .lookup(index)
            .map(|line| Some(line.to_owned()))
            .ok_or(SubmitError::NoSuchCommand)
    }

    /// Releases the history; called once on the way out.
    pub fn shutdown(&mut self) {
        trace!(entries = self.history.len(), "releasing history");
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_with(lines: &[&str]) -> Shell {
        let mut shell = Shell::new(&Config::default());
        for line in lines {
            shell.history.record(line);
        }
        shell
    }

    #[test]
    fn plain_lines_are_not_expanded() {
        let shell = shell_with(&["ls"]);

        assert_eq!(shell.expand("echo !! 0").unwrap(), None);
        assert_eq!(shell.expand("ls -l").unwrap(), None);
    }

    #[test]
    fn expands_by_recency() {
        let shell = shell_with(&["ls", "pwd"]);

        assert_eq!(shell.expand("!! 0").unwrap().as_deref(), Some("pwd"));
        assert_eq!(shell.expand("!! 1").unwrap().as_deref(), Some("ls"));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let shell = shell_with(&["ls"]);

        assert!(matches!(
            shell.expand("!! 1"),
            Err(SubmitError::HistoryIndexOutOfRange(1))
        ));
        assert!(matches!(
            shell.expand("!! -1"),
            Err(SubmitError::HistoryIndexOutOfRange(-1))
        ));
    }

    #[test]
    fn marker_needs_exactly_one_space_and_an_integer() {
        let shell = shell_with(&["ls"]);

        for raw in ["!!", "!!0", "!!  0", "!! ", "!! x", "!! 0 ls", "!! +0", "!!\t0"] {
            assert!(
                matches!(
                    shell.expand(raw),
                    Err(SubmitError::MalformedHistoryReference(_))
                ),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            SubmitError::HistoryIndexOutOfRange(5).to_string(),
            "Error: No command at index 5 in history."
        );
    }

    #[test]
    fn rejected_reference_leaves_history_untouched() {
        let mut shell = shell_with(&["ls"]);

        assert!(shell.submit("!! 5").is_err());
        assert!(shell.submit("!!x").is_err());

        assert_eq!(shell.history.iter().collect::<Vec<_>>(), ["ls"]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut shell = shell_with(&[]);

        assert!(matches!(shell.submit(""), Ok(Submission::Skipped)));
        assert!(matches!(shell.submit("   "), Ok(Submission::Skipped)));
        assert!(shell.history.is_empty());
    }

    #[test]
    fn unparsable_lines_are_recorded() {
        let mut shell = shell_with(&[]);

        assert!(matches!(
            shell.submit("ls |"),
            Err(SubmitError::Parse(ParseError::EmptyStage { index: 1 }))
        ));
        assert_eq!(shell.history.lookup(0), Some("ls |"));
    }

    #[test]
    fn shutdown_clears_history() {
        let mut shell = shell_with(&["ls", "pwd"]);
        shell.shutdown();

        assert!(shell.history.is_empty());
    }
}
