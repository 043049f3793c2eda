use logos::Logos;
use thiserror::Error;

use crate::cmd::pipeline::{Pipeline, RedirectKind, Stage};

use self::token::{LexerError, Token};

pub mod token;

/// Most arguments a single stage may carry, program name included.
pub const MAX_ARGS: usize = 63;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("failed to tokenize command at byte {offset}: {source}")]
    Lexer {
        #[source]
        source: LexerError,
        offset: usize,
    },
    #[error("syntax error: empty command in pipeline stage {index}")]
    EmptyStage { index: usize },
    #[error("syntax error: expected a file name after `{redirect}` in stage {index}")]
    MissingRedirectTarget { redirect: RedirectKind, index: usize },
    #[error("too many arguments in stage {index} (limit is {})", MAX_ARGS)]
    TooManyArguments { index: usize },
}

/// Splits `line` into pipeline stages and pulls the redirects out of each one.
///
/// A stage with neither words nor redirects (`a || b`, a leading or trailing
/// `|`, or a blank line) is rejected here. A stage holding only redirects is
/// accepted and fails when it is executed.
pub fn parse_pipeline(line: &str) -> Result<Pipeline, ParseError> {
    let mut lexer = Token::lexer(line);
    let mut stages = Vec::new();
    let mut current = Stage::default();

    while let Some(token) = lexer.next() {
        let token = token.map_err(|source| ParseError::Lexer {
            source,
            offset: lexer.span().start,
        })?;

        let index = stages.len();

        match token {
            Token::Word(word) => {
                if current.args.len() == MAX_ARGS {
                    return Err(ParseError::TooManyArguments { index });
                }
                current.args.push(word.to_owned());
            }
            Token::Read | Token::Write => {
                let redirect = match token {
                    Token::Read => RedirectKind::Input,
                    _ => RedirectKind::Output,
                };

                match lexer.next() {
                    Some(Ok(Token::Word(target))) => current.redirect(redirect, target),
                    _ => return Err(ParseError::MissingRedirectTarget { redirect, index }),
                }
            }
            Token::Pipe => {
                stages.push(complete(std::mem::take(&mut current), index)?);
            }
        }
    }

    let index = stages.len();
    stages.push(complete(current, index)?);

    Ok(Pipeline { stages })
}

fn complete(stage: Stage, index: usize) -> Result<Stage, ParseError> {
    if stage.is_blank() {
        Err(ParseError::EmptyStage { index })
    } else {
        Ok(stage)
    }
}
