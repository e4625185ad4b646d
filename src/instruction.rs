//! Types for representing instructions and their parts.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;

use crate::value::Value;

/// Opcodes of the armlet instruction set.
///
/// Most opcodes are arity polymorphic: the number of evaluated argument
/// values selects between the stack form, the in-place form and the
/// three-address form. See [Machine](crate::machine::Machine) for the
/// dispatch rules.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Advances the program counter by one.
    Inc,

    /// Writes a value into a memory cell, growing memory if needed.
    Move,

    /// Sets the program counter to an absolute address.
    Jump,

    /// Pushes the return address onto the call stack and jumps.
    Call,

    /// Pops the call stack and jumps there; halts when the stack is empty.
    Return,

    /// Appends each argument value to the data stack.
    Push,

    /// Pops one value per destination address, last destination first.
    Pop,

    /// Discards the top of the data stack.
    Drop,

    /// Pushes a copy of the top of the data stack.
    Dup,

    /// Pushes a copy of the second-from-top element.
    Over,

    /// Exchanges the top two elements of the data stack.
    Swap,

    /// Arithmetic negation.
    Neg,

    /// Bitwise complement.
    Inv,

    /// Logical negation; yields 0 or 1 from truthiness.
    Not,

    /// Converts a value to its numeric form, decimal-aware.
    Cast,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Or,
    And,
    Xor,

    /// Bitwise shift left.
    Left,

    /// Bitwise shift right.
    Right,

    /// Concatenates the textual representations of both operands.
    Cat,

    /// Sets the flag to the tri-state sign of `a - b`.
    Comp,

    /// Sets the flag to the tri-state sign of `a + b`.
    Compn,

    /// Bitwise and. Grouped with the comparisons but dispatched through
    /// the value-producing binary path, so it stores a value instead of
    /// setting the flag.
    Test,

    /// Xor of `a > b` and `a < b`, as 0 or 1. Same dispatch caveat as
    /// [Test](OpCode::Test).
    Equiv,

    /// MOVE that also sets the flag by comparing the written value
    /// against the zero identity of its type.
    Moves,

    Negs,
    Invs,
    Nots,
    Casts,
    Adds,
    Subs,
    Muls,
    Divs,
    Mods,
    Ors,
    Ands,
    Xors,
    Lefts,
    Rights,
    Cats,
}

/// All opcode mnemonics paired with their opcodes.
///
/// Every mnemonic in this table is a reserved word: labels may not
/// shadow them, case-insensitively.
pub const MNEMONICS: &[(&str, OpCode)] = &[
    ("INC", OpCode::Inc),
    ("MOVE", OpCode::Move),
    ("JUMP", OpCode::Jump),
    ("CALL", OpCode::Call),
    ("RETURN", OpCode::Return),
    ("PUSH", OpCode::Push),
    ("POP", OpCode::Pop),
    ("DROP", OpCode::Drop),
    ("DUP", OpCode::Dup),
    ("OVER", OpCode::Over),
    ("SWAP", OpCode::Swap),
    ("NEG", OpCode::Neg),
    ("INV", OpCode::Inv),
    ("NOT", OpCode::Not),
    ("CAST", OpCode::Cast),
    ("ADD", OpCode::Add),
    ("SUB", OpCode::Sub),
    ("MUL", OpCode::Mul),
    ("DIV", OpCode::Div),
    ("MOD", OpCode::Mod),
    ("OR", OpCode::Or),
    ("AND", OpCode::And),
    ("XOR", OpCode::Xor),
    ("LEFT", OpCode::Left),
    ("RIGHT", OpCode::Right),
    ("CAT", OpCode::Cat),
    ("COMP", OpCode::Comp),
    ("COMPN", OpCode::Compn),
    ("TEST", OpCode::Test),
    ("EQUIV", OpCode::Equiv),
    ("MOVES", OpCode::Moves),
    ("NEGS", OpCode::Negs),
    ("INVS", OpCode::Invs),
    ("NOTS", OpCode::Nots),
    ("CASTS", OpCode::Casts),
    ("ADDS", OpCode::Adds),
    ("SUBS", OpCode::Subs),
    ("MULS", OpCode::Muls),
    ("DIVS", OpCode::Divs),
    ("MODS", OpCode::Mods),
    ("ORS", OpCode::Ors),
    ("ANDS", OpCode::Ands),
    ("XORS", OpCode::Xors),
    ("LEFTS", OpCode::Lefts),
    ("RIGHTS", OpCode::Rights),
    ("CATS", OpCode::Cats),
];

lazy_static! {
    static ref MNEMONIC_TABLE: HashMap<&'static str, OpCode> =
        MNEMONICS.iter().copied().collect();
}

impl OpCode {
    /// The uppercase mnemonic of this opcode.
    pub fn mnemonic(&self) -> &'static str {
        MNEMONICS
            .iter()
            .find(|(_, opcode)| opcode == self)
            .map(|(mnemonic, _)| *mnemonic)
            .unwrap_or("???")
    }

    /// True if `name` is an opcode mnemonic, ignoring case.
    pub fn is_mnemonic(name: &str) -> bool {
        MNEMONIC_TABLE.contains_key(name.to_uppercase().as_str())
    }
}

impl FromStr for OpCode {
    type Err = ();

    fn from_str(s: &str) -> Result<OpCode, ()> {
        MNEMONIC_TABLE
            .get(s.to_uppercase().as_str())
            .copied()
            .ok_or(())
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Condition code suffix gating the execution of an instruction.
///
/// Each code is a predicate over the comparison flag, in the manner of
/// ARM condition suffixes. The suffix is lexed as part of the keyword
/// token and stored on the [Instruction], not passed as an argument.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    /// Always execute. The default when no suffix is written.
    Al,

    /// Never execute.
    Nv,

    /// Execute if the flag compared equal.
    Eq,

    /// Execute if the flag compared unequal.
    Ne,

    /// Execute if the flag compared greater.
    Gt,

    /// Execute if the flag compared less.
    Lt,

    /// Execute if the flag compared greater or equal.
    Ge,

    /// Execute if the flag compared less or equal.
    Le,
}

impl Condition {
    /// Evaluates the predicate against the flag register.
    ///
    /// Before any comparison has executed the flag reads as equal.
    pub fn holds(&self, flag: Option<Ordering>) -> bool {
        let flag = flag.unwrap_or(Ordering::Equal);

        match self {
            Condition::Al => true,
            Condition::Nv => false,
            Condition::Eq => flag == Ordering::Equal,
            Condition::Ne => flag != Ordering::Equal,
            Condition::Gt => flag == Ordering::Greater,
            Condition::Lt => flag == Ordering::Less,
            Condition::Ge => flag != Ordering::Less,
            Condition::Le => flag != Ordering::Greater,
        }
    }

    /// The two-letter suffix of this condition code.
    pub fn suffix(&self) -> &'static str {
        match self {
            Condition::Al => "AL",
            Condition::Nv => "NV",
            Condition::Eq => "EQ",
            Condition::Ne => "NE",
            Condition::Gt => "GT",
            Condition::Lt => "LT",
            Condition::Ge => "GE",
            Condition::Le => "LE",
        }
    }
}

impl FromStr for Condition {
    type Err = ();

    fn from_str(s: &str) -> Result<Condition, ()> {
        match s.to_uppercase().as_ref() {
            "AL" => Ok(Condition::Al),
            "NV" => Ok(Condition::Nv),
            "EQ" => Ok(Condition::Eq),
            "NE" => Ok(Condition::Ne),
            "GT" => Ok(Condition::Gt),
            "LT" => Ok(Condition::Lt),
            "GE" => Ok(Condition::Ge),
            "LE" => Ok(Condition::Le),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// An argument expression of an instruction.
///
/// Identifiers are late bound: they are resolved through the machine's
/// environment at evaluation time, so labels may be referenced before
/// their defining line and `pc` tracks the program counter.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A numeric or string constant.
    Literal(Value),

    /// A name resolved through the environment at evaluation time.
    Identifier(String),

    /// Evaluates the inner expression to an address and reads that
    /// memory cell. Nests arbitrarily.
    Deref(Box<Expr>),

    /// Addition of two address expressions, evaluated eagerly at
    /// instruction-evaluation time.
    Sum(Box<Expr>, Box<Expr>),
}

/// A single compiled instruction cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub condition: Condition,
    pub args: Vec<Expr>,

    /// The comment- and label-stripped source line this instruction was
    /// parsed from, kept verbatim for rendering.
    pub source: String,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_round_trip() {
        for (mnemonic, opcode) in MNEMONICS {
            assert_eq!(mnemonic.parse::<OpCode>(), Ok(*opcode));
            assert_eq!(opcode.mnemonic(), *mnemonic);
        }
    }

    #[test]
    fn mnemonics_ignore_case() {
        assert_eq!("moves".parse::<OpCode>(), Ok(OpCode::Moves));
        assert!(OpCode::is_mnemonic("Return"));
        assert!(!OpCode::is_mnemonic("fact"));
    }

    #[test]
    fn condition_predicates() {
        let equal = Some(Ordering::Equal);
        let greater = Some(Ordering::Greater);

        assert!(Condition::Al.holds(None));
        assert!(!Condition::Nv.holds(equal));
        assert!(Condition::Eq.holds(equal));
        assert!(!Condition::Ne.holds(equal));
        assert!(Condition::Gt.holds(greater));
        assert!(Condition::Ge.holds(equal));
        assert!(!Condition::Lt.holds(greater));
        assert!(Condition::Le.holds(Some(Ordering::Less)));
    }

    #[test]
    fn unset_flag_reads_as_equal() {
        assert!(Condition::Eq.holds(None));
        assert!(!Condition::Ne.holds(None));
        assert!(Condition::Ge.holds(None));
    }
}
