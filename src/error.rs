//! Error types for the compile and execute boundaries.
//!
//! All three kinds are fatal to the operation in progress and propagate
//! to the caller unmodified: [CompileError] from
//! [compile](crate::machine::Machine::compile), [RuntimeError] from
//! [step](crate::machine::Machine::step) and
//! [run](crate::machine::Machine::run). The embedding UI is expected to
//! catch, display and let the user correct and retry.

use std::error;
use std::fmt;
use std::ops::Range;

use crate::instruction::OpCode;

/// Byte range within a single source line.
pub type Span = Range<usize>;

/// Structural compile-time violation. Aborts the compilation
/// immediately; lines after the offending one are not validated.
#[derive(Clone, Debug, PartialEq)]
pub enum CompileError {
    /// Two lines declare the same label.
    DuplicateLabel { name: String, line: usize },

    /// A label shadows `pc` or an opcode mnemonic.
    ReservedName { name: String, line: usize },

    /// A line failed to parse. Carries the line index and the parser's
    /// error.
    Syntax { line: usize, error: SyntaxError },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompileError::DuplicateLabel { name, line } => {
                write!(f, "line {}: duplicate label \"{}\"", line, name)
            }
            CompileError::ReservedName { name, line } => {
                write!(f, "line {}: \"{}\" is a reserved name", line, name)
            }
            CompileError::Syntax { line, error } => {
                write!(f, "line {}: {}", line, error)
            }
        }
    }
}

impl error::Error for CompileError {}

/// The parser rejected a token stream.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,

    /// Byte range of the offending token within its line.
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyntaxErrorKind {
    /// A token appeared where the grammar allows none of its kind.
    UnexpectedToken {
        category: &'static str,
        text: String,
    },

    /// A specific token was required but something else was found.
    ExpectedToken {
        expected: &'static str,
        found: String,
    },
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            SyntaxErrorKind::UnexpectedToken { category, text } => {
                write!(f, "unexpected {} token of value \"{}\"", category, text)
            }
            SyntaxErrorKind::ExpectedToken { expected, found } => {
                write!(f, "expected {}, got \"{}\"", expected, found)
            }
        }
    }
}

impl error::Error for SyntaxError {}

/// An instruction failed while executing.
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeError {
    /// An opcode received an argument count its dispatch group does not
    /// support.
    BadArity {
        opcode: OpCode,
        accepts: &'static str,
        received: usize,
    },

    /// An operand had the wrong type for the operation.
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An identifier was not found in the environment.
    UndefinedSymbol {
        name: String,

        /// Closest known name by edit distance, if any is close enough.
        suggestion: Option<String>,
    },

    /// An address expression did not evaluate to a non-negative integer.
    InvalidAddress { value: f64 },

    /// A write targeted an address at or beyond the memory bound.
    MemoryLimit { address: usize },

    /// A stack operation needed more values than the stack holds.
    StackUnderflow { opcode: OpCode },

    /// `run` exhausted its step budget without halting.
    StepLimit { limit: usize },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuntimeError::BadArity {
                opcode,
                accepts,
                received,
            } => write!(
                f,
                "{} takes {} arguments, received {}",
                opcode, accepts, received
            ),
            RuntimeError::TypeMismatch { expected, found } => {
                write!(f, "expected a {} operand, got {}", expected, found)
            }
            RuntimeError::UndefinedSymbol { name, suggestion } => {
                write!(f, "undefined symbol \"{}\"", name)?;

                if let Some(suggestion) = suggestion {
                    write!(f, " (did you mean \"{}\"?)", suggestion)?;
                }

                Ok(())
            }
            RuntimeError::InvalidAddress { value } => {
                write!(f, "invalid address {}", value)
            }
            RuntimeError::MemoryLimit { address } => {
                write!(f, "address {} is beyond the memory bound", address)
            }
            RuntimeError::StackUnderflow { opcode } => {
                write!(f, "{} on an empty stack", opcode)
            }
            RuntimeError::StepLimit { limit } => {
                write!(f, "program did not halt within {} steps", limit)
            }
        }
    }
}

impl error::Error for RuntimeError {}
