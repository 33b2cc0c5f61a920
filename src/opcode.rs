use std::{
    error,
    fmt::{self, Display, Formatter},
};

use crate::{
    lexer::Lexeme,
    operand::{
        InvalidOperand, Operand,
        OperandKind::{self, Label as L, Symbol as S, TypeName as T, Variable as V},
    },
    ErrorKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mne(pub &'static str);

impl Mne {
    pub const MOVE: Self = Self("MOVE");
    pub const CREATEFRAME: Self = Self("CREATEFRAME");
    pub const PUSHFRAME: Self = Self("PUSHFRAME");
    pub const POPFRAME: Self = Self("POPFRAME");
    pub const DEFVAR: Self = Self("DEFVAR");
    pub const CALL: Self = Self("CALL");
    pub const RETURN: Self = Self("RETURN");
    pub const PUSHS: Self = Self("PUSHS");
    pub const POPS: Self = Self("POPS");
    pub const ADD: Self = Self("ADD");
    pub const SUB: Self = Self("SUB");
    pub const MUL: Self = Self("MUL");
    pub const IDIV: Self = Self("IDIV");
    pub const LT: Self = Self("LT");
    pub const GT: Self = Self("GT");
    pub const EQ: Self = Self("EQ");
    pub const AND: Self = Self("AND");
    pub const OR: Self = Self("OR");
    pub const NOT: Self = Self("NOT");
    pub const INT2CHAR: Self = Self("INT2CHAR");
    pub const STRI2INT: Self = Self("STRI2INT");
    pub const READ: Self = Self("READ");
    pub const WRITE: Self = Self("WRITE");
    pub const CONCAT: Self = Self("CONCAT");
    pub const STRLEN: Self = Self("STRLEN");
    pub const GETCHAR: Self = Self("GETCHAR");
    pub const SETCHAR: Self = Self("SETCHAR");
    pub const TYPE: Self = Self("TYPE");
    pub const LABEL: Self = Self("LABEL");
    pub const JUMP: Self = Self("JUMP");
    pub const JUMPIFEQ: Self = Self("JUMPIFEQ");
    pub const JUMPIFNEQ: Self = Self("JUMPIFNEQ");
    pub const DPRINT: Self = Self("DPRINT");
    pub const BREAK: Self = Self("BREAK");

    pub fn find(opcode: &str) -> Option<(Self, &'static [OperandKind])> {
        MNEMONICS
            .iter()
            .find(|(mne, _)| mne.0.eq_ignore_ascii_case(opcode))
            .copied()
    }
}

impl Display for Mne {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[rustfmt::skip]
pub const MNEMONICS: &[(Mne, &[OperandKind])] = &[
    // frames and calls
    (Mne::MOVE,        &[V, S]),
    (Mne::CREATEFRAME, &[]),
    (Mne::PUSHFRAME,   &[]),
    (Mne::POPFRAME,    &[]),
    (Mne::DEFVAR,      &[V]),
    (Mne::CALL,        &[L]),
    (Mne::RETURN,      &[]),
    // data stack
    (Mne::PUSHS,       &[S]),
    (Mne::POPS,        &[V]),
    // arithmetic, relational, boolean and conversion
    (Mne::ADD,         &[V, S, S]),
    (Mne::SUB,         &[V, S, S]),
    (Mne::MUL,         &[V, S, S]),
    (Mne::IDIV,        &[V, S, S]),
    (Mne::LT,          &[V, S, S]),
    (Mne::GT,          &[V, S, S]),
    (Mne::EQ,          &[V, S, S]),
    (Mne::AND,         &[V, S, S]),
    (Mne::OR,          &[V, S, S]),
    (Mne::NOT,         &[V, S]),
    (Mne::INT2CHAR,    &[V, S]),
    (Mne::STRI2INT,    &[V, S, S]),
    // io
    (Mne::READ,        &[V, T]),
    (Mne::WRITE,       &[S]),
    // strings
    (Mne::CONCAT,      &[V, S, S]),
    (Mne::STRLEN,      &[V, S]),
    (Mne::GETCHAR,     &[V, S, S]),
    (Mne::SETCHAR,     &[V, S, S]),
    // types
    (Mne::TYPE,        &[V, S]),
    // control flow
    (Mne::LABEL,       &[L]),
    (Mne::JUMP,        &[L]),
    (Mne::JUMPIFEQ,    &[L, S, S]),
    (Mne::JUMPIFNEQ,   &[L, S, S]),
    // debugging
    (Mne::DPRINT,      &[S]),
    (Mne::BREAK,       &[]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub order: usize,
    pub opcode: Mne,
    pub operands: Vec<Operand>,
}

impl Instruction {
    pub fn build(
        order: usize,
        opcode: &Lexeme<'_>,
        args: &[Lexeme<'_>],
    ) -> Result<Self, BuildError> {
        let (mne, kinds) = Mne::find(opcode.string).ok_or_else(|| BuildError::UnknownOpcode {
            opcode: opcode.string.to_owned(),
            column: opcode.column,
        })?;
        if kinds.len() != args.len() {
            return Err(BuildError::Arity {
                opcode: mne,
                expected: kinds,
                found: args.len(),
                column: opcode.column,
            });
        }
        let mut operands = Vec::with_capacity(kinds.len());
        for (i, (kind, arg)) in kinds.iter().zip(args).enumerate() {
            let operand = kind
                .validate(arg.string, i + 1)
                .map_err(|reason| BuildError::Operand {
                    position: i + 1,
                    column: arg.column,
                    lexeme: arg.string.to_owned(),
                    reason,
                })?;
            operands.push(operand);
        }
        Ok(Self {
            order,
            opcode: mne,
            operands,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    UnknownOpcode {
        opcode: String,
        column: usize,
    },
    Arity {
        opcode: Mne,
        expected: &'static [OperandKind],
        found: usize,
        column: usize,
    },
    Operand {
        position: usize,
        column: usize,
        lexeme: String,
        reason: InvalidOperand,
    },
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownOpcode { .. } => ErrorKind::UnknownOpcode,
            Self::Arity { .. } => ErrorKind::ArityMismatch,
            Self::Operand { .. } => ErrorKind::InvalidOperand,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            Self::UnknownOpcode { column, .. }
            | Self::Arity { column, .. }
            | Self::Operand { column, .. } => *column,
        }
    }
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode { opcode, .. } => write!(f, "unknown instruction \"{opcode}\""),
            Self::Arity {
                opcode,
                expected,
                found,
                ..
            } => {
                write!(f, "{opcode} expects {} operand(s)", expected.len())?;
                for kind in expected.iter() {
                    write!(f, " <{kind}>")?;
                }
                write!(f, ", found {found}")
            }
            Self::Operand {
                position,
                lexeme,
                reason,
                ..
            } => write!(f, "operand {position} \"{lexeme}\": {reason}"),
        }
    }
}

impl error::Error for BuildError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Operand { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
