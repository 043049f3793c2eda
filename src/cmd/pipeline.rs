use std::{fmt, path::PathBuf, str::FromStr};

use itertools::Itertools;
use strum::Display;

use crate::parse::{parse_pipeline, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RedirectKind {
    #[strum(serialize = "<")]
    Input,
    #[strum(serialize = ">")]
    Output,
}

/// One command of a pipeline. `args[0]` is the program name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    pub args: Vec<String>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Stage {
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn redirect(&mut self, kind: RedirectKind, target: impl Into<PathBuf>) {
        // a repeated redirect replaces the earlier one
        match kind {
            RedirectKind::Input => self.input = Some(target.into()),
            RedirectKind::Output => self.output = Some(target.into()),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.args.is_empty() && self.input.is_none() && self.output.is_none()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redirects = [
            self.input.as_ref().map(|p| (RedirectKind::Input, p)),
            self.output.as_ref().map(|p| (RedirectKind::Output, p)),
        ];

        let words = self.args.iter().map(String::from).chain(
            redirects
                .into_iter()
                .flatten()
                .map(|(kind, path)| format!("{} {}", kind, path.display())),
        );

        write!(f, "{}", words.format(" "))
    }
}

/// Stages in data-flow order: stage `i` writes into stage `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stages.iter().format(" | "))
    }
}

impl FromStr for Pipeline {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_pipeline(s)
    }
}
