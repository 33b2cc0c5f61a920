use std::{
    error,
    fmt::{self, Display, Formatter},
    io::{self, Write},
};

use indexmap::IndexSet;
use serde_derive::Deserialize;

pub mod lexer;
pub mod opcode;
pub mod operand;
pub mod parser;
pub mod xml;

pub use lexer::{split, Lexeme, Line};
pub use opcode::{BuildError, Instruction, Mne, MNEMONICS};
pub use operand::{ArgType, Frame, InvalidOperand, Operand, OperandKind};
pub use parser::Parser;

/// Mandatory first significant line of every source file (matched case-insensitively).
pub const HEADER: &str = ".IPPcode18";

/// Language tag attached to every parsed program.
pub const LANGUAGE: &str = "IPPcode18";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub language: &'static str,
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new() -> Self {
        Self {
            language: LANGUAGE,
            instructions: Vec::new(),
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Counter {
    /// Number of instructions (lines of code).
    Loc,
    /// Number of lines carrying a comment.
    Comments,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub instructions: usize,
    pub comments: usize,
}

impl Stats {
    pub fn get(&self, counter: Counter) -> usize {
        match counter {
            Counter::Loc => self.instructions,
            Counter::Comments => self.comments,
        }
    }

    /// Writes the requested counters one per line, in request order.
    pub fn write_report<W: Write>(&self, mut out: W, counters: &IndexSet<Counter>) -> io::Result<()> {
        for (i, counter) in counters.iter().enumerate() {
            if i > 0 {
                out.write_all(b"\n")?;
            }
            write!(out, "{}", self.get(*counter))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The line source failed to deliver a line.
    Io,
    NoInput,
    MissingOrInvalidHeader,
    UnknownOpcode,
    ArityMismatch,
    InvalidOperand,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    file: String,
    pos: Pos,
    order: Option<usize>,
    msg: String,
    source: Option<io::Error>,
}

impl Error {
    pub fn new(kind: ErrorKind, file: &str, pos: Pos, msg: impl Into<String>) -> Self {
        Self {
            kind,
            file: file.to_owned(),
            pos,
            order: None,
            msg: msg.into(),
            source: None,
        }
    }

    pub fn io(file: &str, pos: Pos, err: io::Error) -> Self {
        Self {
            msg: format!("cant read line: {err}"),
            source: Some(err),
            ..Self::new(ErrorKind::Io, file, pos, String::new())
        }
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    /// Same error without the io source, for reporting a failure more than once.
    pub fn again(&self) -> Self {
        Self {
            kind: self.kind,
            file: self.file.clone(),
            pos: self.pos,
            order: self.order,
            msg: self.msg.clone(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    /// Order number the failing instruction would have received.
    pub fn order(&self) -> Option<usize> {
        self.order
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.pos.line, self.pos.column) {
            (0, _) => write!(f, "{}: {}", self.file, self.msg)?,
            (line, 0) => write!(f, "{}:{line}: {}", self.file, self.msg)?,
            (line, column) => write!(f, "{}:{line}:{column}: {}", self.file, self.msg)?,
        }
        if let Some(order) = self.order {
            write!(f, " (instruction #{order})")?;
        }
        Ok(())
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err as &(dyn error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_follows_request_order() {
        let stats = Stats {
            instructions: 7,
            comments: 3,
        };
        let mut out = Vec::new();
        let counters = IndexSet::from([Counter::Comments, Counter::Loc]);
        stats.write_report(&mut out, &counters).unwrap();
        assert_eq!(out, b"3\n7");

        let mut out = Vec::new();
        let counters = IndexSet::from([Counter::Loc]);
        stats.write_report(&mut out, &counters).unwrap();
        assert_eq!(out, b"7");
    }

    #[test]
    fn empty_report() {
        let mut out = Vec::new();
        Stats::default()
            .write_report(&mut out, &IndexSet::new())
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn error_display() {
        let err = Error::new(
            ErrorKind::InvalidOperand,
            "prog.ippc",
            Pos { line: 4, column: 8 },
            "bad int constant",
        )
        .with_order(2);
        assert_eq!(
            err.to_string(),
            "prog.ippc:4:8: bad int constant (instruction #2)"
        );
        let err = Error::new(ErrorKind::NoInput, "<stdin>", Pos::default(), "no input");
        assert_eq!(err.to_string(), "<stdin>: no input");
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error as _;
        let err = Error::io(
            "a",
            Pos { line: 1, column: 0 },
            io::Error::new(io::ErrorKind::InvalidData, "not utf-8"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "a:1: cant read line: not utf-8");
    }
}
