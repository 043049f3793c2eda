use std::io::{self, BufRead, Write};

/// The only line that ends the session.
pub const EXIT_COMMAND: &str = "exit";

#[derive(Debug, PartialEq, Eq)]
pub enum InputMessage {
    Line(String),
    /// A line that is not valid UTF-8; it is reported and skipped.
    Invalid,
    Exit,
    Eof,
}

pub fn prompt<W: Write>(out: &mut W, prompt: &str) -> io::Result<()> {
    write!(out, "{prompt}")?;
    out.flush()
}

/// Reads one line and strips its terminator. `exit` has to match exactly;
/// surrounding whitespace makes it an ordinary command.
pub fn read_line<R: BufRead>(input: &mut R) -> io::Result<InputMessage> {
    let mut buf = Vec::new();

    if input.read_until(b'\n', &mut buf)? == 0 {
        return Ok(InputMessage::Eof);
    }

    if buf.ends_with(b"\n") {
        buf.pop();
        if buf.ends_with(b"\r") {
            buf.pop();
        }
    }

    let Ok(line) = String::from_utf8(buf) else {
        return Ok(InputMessage::Invalid);
    };

    if line == EXIT_COMMAND {
        Ok(InputMessage::Exit)
    } else {
        Ok(InputMessage::Line(line))
    }
}
