//! Tokens and a tokenizer for source lines.
//!
//! The lexer operates on a single line at a time; the line splitting
//! and the comment and label preprocessing happen before tokenization
//! in [parser](crate::parser).

use logos::{Lexer, Logos};

use std::fmt;

use crate::instruction::{Condition, OpCode};

pub use crate::error::Span;

/// Enumeration of all tokens of the assembly syntax.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Erroneous token that could not be interpreted as any of the
    /// other variants.
    #[error]
    #[regex(r"[ \t\r\f]+", logos::skip)]
    Error,

    /// A string literal in single or double quotes. The value excludes
    /// the quotes.
    #[regex(r#"'[^']*'|"[^"]*""#, string_callback)]
    Str(&'a str),

    /// An opcode mnemonic with an optional two-letter condition code
    /// suffix. Lexed case-insensitively as a single token, so `addeq`
    /// is a keyword while `addx` falls through to [Identifier].
    #[regex(
        "(?i)(return|rights|casts|compn|equiv|lefts|moves|right|adds|ands|call|cast|cats|comp|divs|drop|invs|jump|left|mods|move|muls|negs|nots|over|push|subs|swap|test|xors|add|and|cat|div|dup|inc|inv|mod|mul|neg|not|ors|pop|sub|xor|or)(al|nv|eq|ne|gt|lt|ge|le)?",
        keyword_callback
    )]
    Keyword((OpCode, Condition)),

    /// A name which begins with a letter and can contain the characters
    /// `A-Za-z0-9_`.
    #[regex("[A-Za-z][A-Za-z0-9_]*", Lexer::slice)]
    Identifier(&'a str),

    /// A signed decimal number literal.
    #[regex(r"-?[0-9]+(\.[0-9]+)?|-?\.[0-9]+", number_callback)]
    Number(f64),

    /// Token (`,`) separating arguments.
    #[token(",")]
    Comma,

    /// Token (`+`) between the addends of an address sum.
    #[token("+")]
    Plus,

    /// Token (`[`) opening a dereference.
    #[token("[")]
    LBracket,

    /// Token (`]`) closing a dereference.
    #[token("]")]
    RBracket,
}

fn string_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> &'a str {
    let slice = lex.slice();
    &slice[1..slice.len() - 1]
}

fn keyword_callback<'a>(
    lex: &mut Lexer<'a, Token<'a>>,
) -> std::result::Result<(OpCode, Condition), ()> {
    let word = lex.slice().to_uppercase();

    // A mnemonic that happens to end in two suffix letters, like COMPN
    // or CATS, is preferred over a shorter mnemonic plus a suffix.
    if let Ok(opcode) = word.parse::<OpCode>() {
        return Ok((opcode, Condition::Al));
    }

    if word.len() > 2 {
        let (head, tail) = word.split_at(word.len() - 2);

        if let (Ok(opcode), Ok(condition)) =
            (head.parse::<OpCode>(), tail.parse::<Condition>())
        {
            return Ok((opcode, condition));
        }
    }

    Err(())
}

fn number_callback<'a>(
    lex: &mut Lexer<'a, Token<'a>>,
) -> std::result::Result<f64, std::num::ParseFloatError> {
    lex.slice().parse()
}

impl<'t> Token<'t> {
    /// The token category named in syntax error messages.
    pub fn category(&self) -> &'static str {
        match self {
            Token::Error => "unrecognized",
            Token::Str(_) => "string",
            Token::Keyword(_) => "keyword",
            Token::Identifier(_) => "identifier",
            Token::Number(_) => "number",
            Token::Comma => "comma",
            Token::Plus => "plus",
            Token::LBracket => "bracket",
            Token::RBracket => "bracket",
        }
    }
}

impl<'t> fmt::Display for Token<'t> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Error => write!(f, "<error>"),
            Token::Str(text) => write!(f, "\"{}\"", text),
            Token::Keyword((opcode, Condition::Al)) => write!(f, "{}", opcode),
            Token::Keyword((opcode, condition)) => {
                write!(f, "{}{}", opcode, condition)
            }
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Number(num) => write!(f, "{}", num),
            Token::Comma => write!(f, ","),
            Token::Plus => write!(f, "+"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
        }
    }
}

/// Tokenizes a single preprocessed line.
///
/// Unlexable input is not an error at this stage: it surfaces as an
/// [Error](Token::Error) token which the parser then rejects with the
/// span intact.
pub fn tokenize(line: &str) -> Vec<(Token, Span)> {
    let mut lexer = Token::lexer(line);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next() {
        tokens.push((token, lexer.span()));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<Token> {
        tokenize(line).into_iter().map(|(token, _)| token).collect()
    }

    #[test]
    fn keywords_and_suffixes() {
        assert_eq!(
            kinds("add"),
            vec![Token::Keyword((OpCode::Add, Condition::Al))],
        );
        assert_eq!(
            kinds("ADDEQ"),
            vec![Token::Keyword((OpCode::Add, Condition::Eq))],
        );
        assert_eq!(
            kinds("returnne"),
            vec![Token::Keyword((OpCode::Return, Condition::Ne))],
        );
    }

    #[test]
    fn suffix_lookalike_mnemonics() {
        assert_eq!(
            kinds("compn"),
            vec![Token::Keyword((OpCode::Compn, Condition::Al))],
        );
        assert_eq!(
            kinds("compne"),
            vec![Token::Keyword((OpCode::Comp, Condition::Ne))],
        );
        assert_eq!(
            kinds("cats"),
            vec![Token::Keyword((OpCode::Cats, Condition::Al))],
        );
        assert_eq!(
            kinds("orne"),
            vec![Token::Keyword((OpCode::Or, Condition::Ne))],
        );
    }

    #[test]
    fn keyword_prefix_of_identifier() {
        assert_eq!(kinds("addx"), vec![Token::Identifier("addx")]);
        assert_eq!(kinds("popcorn"), vec![Token::Identifier("popcorn")]);
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("42"), vec![Token::Number(42.0)]);
        assert_eq!(kinds("-3.5"), vec![Token::Number(-3.5)]);
        assert_eq!(kinds(".25"), vec![Token::Number(0.25)]);
    }

    #[test]
    fn strings_exclude_quotes() {
        assert_eq!(kinds("'a'"), vec![Token::Str("a")]);
        assert_eq!(kinds("\"hello world\""), vec![Token::Str("hello world")]);
        assert_eq!(kinds("\"don't\""), vec![Token::Str("don't")]);
    }

    #[test]
    fn full_line() {
        assert_eq!(
            kinds("moveseq total + 1, [base]"),
            vec![
                Token::Keyword((OpCode::Moves, Condition::Eq)),
                Token::Identifier("total"),
                Token::Plus,
                Token::Number(1.0),
                Token::Comma,
                Token::LBracket,
                Token::Identifier("base"),
                Token::RBracket,
            ],
        );
    }

    #[test]
    fn spans_cover_the_tokens() {
        let tokens = tokenize("push 10");

        assert_eq!(tokens[0].1, 0..4);
        assert_eq!(tokens[1].1, 5..7);
    }

    #[test]
    fn unlexable_input() {
        assert_eq!(kinds("push #"), vec![
            Token::Keyword((OpCode::Push, Condition::Al)),
            Token::Error,
        ]);
    }
}
