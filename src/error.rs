use std::path::PathBuf;

use crate::codevalue::CodeValue;
use crate::parser::Rule;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Width(#[from] WidthError),
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no code values found in {}", .0.display())]
    NoCodeValues(PathBuf),
    #[error("invalid input:\n{0}")]
    InvalidInput(Box<pest::error::Error<Rule>>),
    #[error("unexpected rule: {0:?}")]
    UnexpectedRule(Rule),
    #[error("unexpected end of line")]
    UnexpectedEol,
    #[error("invalid code value")]
    InvalidCodeValue(#[source] std::num::ParseIntError),
    #[error("range starting at {0:#x} is never closed")]
    UnclosedRange(CodeValue),
    #[error("range {first:#x}..={last:#x} is empty")]
    EmptyRange { first: CodeValue, last: CodeValue },
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to format generated code")]
    Format(#[from] std::fmt::Error),
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("code width must be between 1 and {} bits, got {0}", CodeValue::BITS)]
pub struct WidthError(pub u32);
