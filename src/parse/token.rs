use logos::Logos;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Default, Error)]
pub enum LexerError {
    #[default]
    #[error("unknown token")]
    UnknownToken,
}

/// Everything that is not whitespace or an operator is a word; there is no
/// quoting, so an operator character can never appear inside an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Logos)]
#[logos(skip r"[ \t\r\n\f]+", error = LexerError)]
pub enum Token<'a> {
    #[token("|")]
    Pipe,
    #[token("<")]
    Read,
    #[token(">")]
    Write,

    #[regex(r"[^ \t\r\n\f|<>]+")]
    Word(&'a str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(s: &str) -> Vec<Token<'_>> {
        Token::lexer(s).map(|t| t.unwrap()).collect()
    }

    #[test]
    fn operators_split_words_without_spaces() {
        assert_eq!(
            lex("sort<in.txt>out.txt|wc"),
            vec![
                Token::Word("sort"),
                Token::Read,
                Token::Word("in.txt"),
                Token::Write,
                Token::Word("out.txt"),
                Token::Pipe,
                Token::Word("wc"),
            ]
        );
    }

    #[test]
    fn quotes_are_plain_word_characters() {
        assert_eq!(
            lex(r#"echo "a b""#),
            vec![Token::Word("echo"), Token::Word("\"a"), Token::Word("b\"")]
        );
    }
}
