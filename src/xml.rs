use std::{
    fmt::{self, Display, Formatter},
    io::{self, Write},
};

use crate::Program;

pub const DEFAULT_INDENT: usize = 2;

pub fn write_program<W: Write>(mut out: W, program: &Program, indent: usize) -> io::Result<()> {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    let language = Escape::attr(program.language);
    if program.instructions.is_empty() {
        return writeln!(out, r#"<program language="{language}"/>"#);
    }
    writeln!(out, r#"<program language="{language}">"#)?;
    let pad = " ".repeat(indent);
    for inst in &program.instructions {
        write!(
            out,
            r#"{pad}<instruction order="{}" opcode="{}""#,
            inst.order,
            Escape::attr(inst.opcode.0)
        )?;
        if inst.operands.is_empty() {
            writeln!(out, "/>")?;
            continue;
        }
        writeln!(out, ">")?;
        for op in &inst.operands {
            writeln!(
                out,
                r#"{pad}{pad}<arg{n} type="{ty}">{value}</arg{n}>"#,
                n = op.position,
                ty = op.ty,
                value = Escape::text(&op.value),
            )?;
        }
        writeln!(out, "{pad}</instruction>")?;
    }
    writeln!(out, "</program>")
}

struct Escape<'a> {
    string: &'a str,
    attr: bool,
}

impl<'a> Escape<'a> {
    fn text(string: &'a str) -> Self {
        Self {
            string,
            attr: false,
        }
    }

    fn attr(string: &'a str) -> Self {
        Self { string, attr: true }
    }
}

impl<'a> Display for Escape<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut last = 0;
        for (i, c) in self.string.char_indices() {
            let entity = match c {
                '&' => "&amp;",
                '<' => "&lt;",
                '>' => "&gt;",
                '"' if self.attr => "&quot;",
                _ => continue,
            };
            f.write_str(&self.string[last..i])?;
            f.write_str(entity)?;
            last = i + 1;
        }
        f.write_str(&self.string[last..])
    }
}
