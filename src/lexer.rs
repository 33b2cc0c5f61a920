use crate::HEADER;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub string: &'a str,
    pub column: usize,
}

/// A source line with its comment removed, split into lexemes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line<'a> {
    pub lexemes: Vec<Lexeme<'a>>,
    pub comment: bool,
}

impl<'a> Line<'a> {
    pub fn is_empty(&self) -> bool {
        self.lexemes.is_empty()
    }

    pub fn is_header(&self) -> bool {
        matches!(self.lexemes.as_slice(), [lexeme] if lexeme.string.eq_ignore_ascii_case(HEADER))
    }
}

pub fn split(text: &str) -> Line<'_> {
    let (code, comment) = match text.find('#') {
        Some(index) => (&text[..index], true),
        None => (text, false),
    };
    let mut lexemes = Vec::new();
    let mut column = 1;
    // separators are single ascii bytes so the byte offset stays in sync
    for string in code.split(is_blank) {
        if !string.is_empty() {
            lexemes.push(Lexeme { string, column });
        }
        column += string.len() + 1;
    }
    Line { lexemes, comment }
}

fn is_blank(c: char) -> bool {
    c.is_ascii_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings<'a>(line: &Line<'a>) -> Vec<&'a str> {
        line.lexemes.iter().map(|lexeme| lexeme.string).collect()
    }

    #[test]
    fn blank_and_comment_lines_are_empty() {
        assert!(split("").is_empty());
        assert!(split(" \t \r\n").is_empty());
        let line = split("   # just a note");
        assert!(line.is_empty());
        assert!(line.comment);
        let line = split("#");
        assert!(line.is_empty());
        assert!(line.comment);
    }

    #[test]
    fn runs_of_blanks_separate_lexemes() {
        let line = split("  MOVE\t\tGF@x   int@1\r\n");
        assert_eq!(strings(&line), ["MOVE", "GF@x", "int@1"]);
        assert!(!line.comment);
        assert_eq!(line.lexemes[0].column, 3);
        assert_eq!(line.lexemes[1].column, 9);
        assert_eq!(line.lexemes[2].column, 16);
    }

    #[test]
    fn trailing_comment_is_stripped() {
        let line = split("WRITE string@hi#comment");
        assert_eq!(strings(&line), ["WRITE", "string@hi"]);
        assert!(line.comment);
        let line = split("JUMP end # leave");
        assert_eq!(strings(&line), ["JUMP", "end"]);
    }

    #[test]
    fn no_lexeme_cap() {
        let line = split("ADD GF@a GF@b GF@c GF@d GF@e GF@f");
        assert_eq!(line.lexemes.len(), 7);
        assert_eq!(line.lexemes[6].string, "GF@f");
    }

    #[test]
    fn header() {
        assert!(split(".IPPcode18").is_header());
        assert!(split("  .ippCODE18  # hello").is_header());
        assert!(!split(".IPPcode17").is_header());
        assert!(!split(".IPPcode18 extra").is_header());
        assert!(!split("").is_header());
    }
}
