use std::{
    error,
    fmt::{self, Display, Formatter},
};

/// Operand slot of an instruction signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Variable,
    Symbol,
    Label,
    TypeName,
}

impl OperandKind {
    pub fn validate(self, lexeme: &str, position: usize) -> Result<Operand, InvalidOperand> {
        match self {
            Self::Variable => variable(lexeme, position),
            Self::Symbol => symbol(lexeme, position),
            Self::Label => label(lexeme, position),
            Self::TypeName => type_name(lexeme, position),
        }
    }
}

impl Display for OperandKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Variable => "var",
            Self::Symbol => "symb",
            Self::Label => "label",
            Self::TypeName => "type",
        })
    }
}

/// Type tag an operand is serialized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    Var,
    Int,
    Bool,
    String,
    Label,
    Type,
}

impl ArgType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Label => "label",
            Self::Type => "type",
        }
    }
}

impl Display for ArgType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frame {
    Global,
    Local,
    Temporary,
}

impl Frame {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "GF" => Some(Self::Global),
            "LF" => Some(Self::Local),
            "TF" => Some(Self::Temporary),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "GF",
            Self::Local => "LF",
            Self::Temporary => "TF",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub kind: OperandKind,
    pub ty: ArgType,
    /// Serialized text: the payload for constants, the whole lexeme otherwise.
    pub value: String,
    pub lexeme: String,
    /// 1-based index within the instruction.
    pub position: usize,
}

impl Operand {
    fn new(kind: OperandKind, ty: ArgType, value: &str, lexeme: &str, position: usize) -> Self {
        Self {
            kind,
            ty,
            value: value.to_owned(),
            lexeme: lexeme.to_owned(),
            position,
        }
    }

    pub fn frame(&self) -> Option<Frame> {
        if self.ty != ArgType::Var {
            return None;
        }
        let (prefix, _) = self.value.split_once('@')?;
        Frame::from_prefix(prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidOperand {
    Variable,
    Label,
    TypeName,
    MissingSeparator,
    ExtraSeparator,
    Int,
    Bool,
    String,
    UnknownConstant(String),
}

impl Display for InvalidOperand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable => write!(f, "invalid variable"),
            Self::Label => write!(f, "invalid label"),
            Self::TypeName => write!(f, "invalid type, expected one of `int`, `string` or `bool`"),
            Self::MissingSeparator => write!(f, "constant needs a `@` after its type"),
            Self::ExtraSeparator => write!(f, "constant has more than one `@`"),
            Self::Int => write!(f, "invalid characters in int constant"),
            Self::Bool => write!(f, "bool constant must be `true` or `false`"),
            Self::String => write!(f, "invalid characters in string constant"),
            Self::UnknownConstant(tag) => write!(f, "unknown constant type `{tag}`"),
        }
    }
}

impl error::Error for InvalidOperand {}

pub fn variable(lexeme: &str, position: usize) -> Result<Operand, InvalidOperand> {
    let (prefix, name) = lexeme.split_once('@').ok_or(InvalidOperand::Variable)?;
    if Frame::from_prefix(prefix).is_none() || !is_ident(name) {
        return Err(InvalidOperand::Variable);
    }
    Ok(Operand::new(
        OperandKind::Variable,
        ArgType::Var,
        lexeme,
        lexeme,
        position,
    ))
}

pub fn label(lexeme: &str, position: usize) -> Result<Operand, InvalidOperand> {
    if !is_ident(lexeme) {
        return Err(InvalidOperand::Label);
    }
    Ok(Operand::new(
        OperandKind::Label,
        ArgType::Label,
        lexeme,
        lexeme,
        position,
    ))
}

pub fn type_name(lexeme: &str, position: usize) -> Result<Operand, InvalidOperand> {
    if !matches!(lexeme, "int" | "string" | "bool") {
        return Err(InvalidOperand::TypeName);
    }
    Ok(Operand::new(
        OperandKind::TypeName,
        ArgType::Type,
        lexeme,
        lexeme,
        position,
    ))
}

pub fn symbol(lexeme: &str, position: usize) -> Result<Operand, InvalidOperand> {
    let (tag, payload) = lexeme
        .split_once('@')
        .ok_or(InvalidOperand::MissingSeparator)?;
    if payload.contains('@') {
        return Err(InvalidOperand::ExtraSeparator);
    }
    let ty = match tag {
        "int" if is_int(payload) => ArgType::Int,
        "int" => return Err(InvalidOperand::Int),
        "bool" if matches!(payload, "true" | "false") => ArgType::Bool,
        "bool" => return Err(InvalidOperand::Bool),
        "string" if is_string(payload) => ArgType::String,
        "string" => return Err(InvalidOperand::String),
        // a variable written in symbol position keeps its frame prefix
        _ if Frame::from_prefix(tag).is_some() => return variable(lexeme, position),
        _ => return Err(InvalidOperand::UnknownConstant(tag.to_owned())),
    };
    Ok(Operand::new(
        OperandKind::Symbol,
        ty,
        payload,
        lexeme,
        position,
    ))
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || "_-$&%*".contains(c)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_digit() || is_ident_start(c)
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if is_ident_start(c)) && chars.all(is_ident_char)
}

fn is_int(s: &str) -> bool {
    let digits = s.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Blanks, control characters, `#` and `\` are rejected unless the `\` opens a `\DDD` escape.
fn is_string(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                match bytes.get(i + 1..i + 4) {
                    Some(digits) if digits.iter().all(u8::is_ascii_digit) => i += 4,
                    _ => return false,
                }
            }
            b' ' | b'#' => return false,
            b if b.is_ascii_control() => return false,
            _ => i += 1,
        }
    }
    true
}
