use std::io::BufRead;

use crate::{
    lexer::{self, Line},
    Error, ErrorKind, Instruction, Pos, Program, Stats, HEADER,
};

/// Drives the line loop: checks the header once, then builds one instruction per
/// significant line and numbers them from 1.
pub struct Parser<'a> {
    file: &'a str,
    line: usize,
    header: bool,
    program: Program,
    stats: Stats,
    failure: Option<Error>,
}

impl<'a> Parser<'a> {
    pub fn new(file: &'a str) -> Self {
        Self {
            file,
            line: 0,
            header: false,
            program: Program::new(),
            stats: Stats::default(),
            failure: None,
        }
    }

    pub fn parse<R: BufRead>(mut self, reader: R) -> Result<(Program, Stats), Error> {
        for text in reader.lines() {
            let text = text.map_err(|e| {
                Error::io(
                    self.file,
                    Pos {
                        line: self.line + 1,
                        column: 0,
                    },
                    e,
                )
            })?;
            self.feed(&text)?;
        }
        self.finish()
    }

    pub fn parse_str(self, source: &str) -> Result<(Program, Stats), Error> {
        self.parse(source.as_bytes())
    }

    /// Consumes one line. Returns the instruction it produced, if any.
    ///
    /// The first failure is final: every later `feed` and `finish` reports it again.
    pub fn feed(&mut self, text: &str) -> Result<Option<&Instruction>, Error> {
        if let Some(err) = &self.failure {
            return Err(err.again());
        }
        match self.line_real(text) {
            Ok(true) => Ok(self.program.instructions.last()),
            Ok(false) => Ok(None),
            Err(err) => {
                self.failure = Some(err.again());
                Err(err)
            }
        }
    }

    fn line_real(&mut self, text: &str) -> Result<bool, Error> {
        self.line += 1;
        let line = lexer::split(text);
        if line.comment {
            self.stats.comments += 1;
        }
        if !self.header {
            self.check_header(&line)?;
            return Ok(false);
        }
        let Some((opcode, args)) = line.lexemes.split_first() else {
            return Ok(false);
        };
        let order = self.program.instructions.len() + 1;
        let instruction = Instruction::build(order, opcode, args)
            .map_err(|e| self.err(e.kind(), e.column(), e.to_string()).with_order(order))?;
        tracing::trace!(
            "{}:{}: #{order} {} ({} operands)",
            self.file,
            self.line,
            instruction.opcode,
            instruction.operands.len()
        );
        self.stats.instructions += 1;
        self.program.instructions.push(instruction);
        Ok(true)
    }

    pub fn finish(self) -> Result<(Program, Stats), Error> {
        if let Some(err) = self.failure {
            return Err(err);
        }
        if self.line == 0 {
            return Err(self.err(ErrorKind::NoInput, 0, "no input"));
        }
        if !self.header {
            return Err(self.err(
                ErrorKind::MissingOrInvalidHeader,
                0,
                format!("missing header `{HEADER}`"),
            ));
        }
        tracing::debug!(
            "{}: {} instructions, {} comments",
            self.file,
            self.stats.instructions,
            self.stats.comments
        );
        Ok((self.program, self.stats))
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    fn check_header(&mut self, line: &Line<'_>) -> Result<(), Error> {
        // blank and comment-only lines may precede the header
        if line.is_empty() {
            return Ok(());
        }
        if !line.is_header() {
            let column = line.lexemes[0].column;
            return Err(self.err(
                ErrorKind::MissingOrInvalidHeader,
                column,
                format!("invalid header, expected `{HEADER}`"),
            ));
        }
        tracing::trace!("{}:{}: header", self.file, self.line);
        self.header = true;
        Ok(())
    }

    fn err(&self, kind: ErrorKind, column: usize, msg: impl Into<String>) -> Error {
        let line = if kind == ErrorKind::NoInput { 0 } else { self.line };
        Error::new(kind, self.file, Pos { line, column }, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgType, Mne};

    #[test]
    fn feed_numbers_instructions_without_gaps() {
        let mut parser = Parser::new("t");
        assert!(parser.feed("# leading comment").unwrap().is_none());
        assert!(parser.feed(".IPPcode18 # header").unwrap().is_none());
        assert_eq!(parser.feed("CREATEFRAME").unwrap().unwrap().order, 1);
        assert!(parser.feed("").unwrap().is_none());
        assert!(parser.feed("   # nothing").unwrap().is_none());
        let inst = parser.feed("pushframe # go").unwrap().unwrap();
        assert_eq!((inst.order, inst.opcode), (2, Mne::PUSHFRAME));
        assert_eq!(
            parser.stats(),
            Stats {
                instructions: 2,
                comments: 4
            }
        );
        let (program, stats) = parser.finish().unwrap();
        assert_eq!(program.instructions.len(), 2);
        assert_eq!(stats.instructions, 2);
    }

    #[test]
    fn error_positions() {
        let err = Parser::new("prog")
            .parse_str(".IPPcode18\nDEFVAR GF@a\n\n  MOVE GF@a int@x\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperand);
        assert_eq!(err.pos(), Pos { line: 4, column: 13 });
        assert_eq!(err.order(), Some(2));
        assert_eq!(
            err.to_string(),
            "prog:4:13: operand 2 \"int@x\": invalid characters in int constant (instruction #2)"
        );
    }

    #[test]
    fn header_errors() {
        let err = Parser::new("p").parse_str("DEFVAR GF@a\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingOrInvalidHeader);
        assert_eq!(err.pos(), Pos { line: 1, column: 1 });

        let err = Parser::new("p").parse_str("\n# only\n\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingOrInvalidHeader);

        let err = Parser::new("p").parse_str("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoInput);
        assert_eq!(err.to_string(), "p: no input");
    }

    #[test]
    fn io_failures_are_reported() {
        let err = Parser::new("bin")
            .parse(&b".IPPcode18\nWRITE string@\xff\n"[..])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.pos().line, 2);
    }

    #[test]
    fn stops_at_first_failure() {
        let mut parser = Parser::new("t");
        parser.feed(".ippcode18").unwrap();
        parser.feed("WRITE int@1").unwrap();
        let err = parser.feed("WRITE").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArityMismatch);
        assert_eq!(err.order(), Some(2));
        assert_eq!(parser.stats().instructions, 1);
    }

    #[test]
    fn failure_is_sticky() {
        let mut parser = Parser::new("t");
        parser.feed(".IPPcode18").unwrap();
        parser.feed("WRITE int@1").unwrap();
        let first = parser.feed("ADD GF@a").unwrap_err();
        assert_eq!(first.kind(), ErrorKind::ArityMismatch);

        let again = parser.feed("WRITE int@2").unwrap_err();
        assert_eq!(again.kind(), ErrorKind::ArityMismatch);
        assert_eq!(again.pos(), first.pos());
        assert_eq!(again.to_string(), first.to_string());
        assert_eq!(parser.stats().instructions, 1);

        let err = parser.finish().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArityMismatch);
        assert_eq!(err.order(), Some(2));
    }

    #[test]
    fn header_failure_cannot_be_retried() {
        let mut parser = Parser::new("t");
        assert_eq!(
            parser.feed("DEFVAR GF@x").unwrap_err().kind(),
            ErrorKind::MissingOrInvalidHeader
        );
        assert_eq!(
            parser.feed(".IPPcode18").unwrap_err().kind(),
            ErrorKind::MissingOrInvalidHeader
        );
        let err = parser.finish().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingOrInvalidHeader);
        assert_eq!(err.pos().line, 1);
    }

    #[test]
    fn symbol_variables_serialize_as_var() {
        let (program, _) = Parser::new("t")
            .parse_str(".IPPcode18\nWRITE GF@out\n")
            .unwrap();
        let op = &program.instructions[0].operands[0];
        assert_eq!((op.ty, op.value.as_str()), (ArgType::Var, "GF@out"));
    }
}
