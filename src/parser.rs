//! Line preprocessing and parsing.
//!
//! Compilation treats each source line independently. A line is first
//! split into a code part, an optional `label:` prefix and an optional
//! `@ comment` suffix, and the code part is then parsed into a single
//! memory cell: [Empty](Value::Empty), a bare literal, or an
//! instruction.
//!
//! The surrounding parts are kept verbatim so that
//! [render](crate::machine::Machine::render) can reproduce the source.

use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::instruction::{Expr, Instruction};
use crate::lexer::{self, Span, Token};
use crate::value::Value;

/// Splits a line at the first comment marker `@` outside quotes.
///
/// Whitespace in front of the marker belongs to the comment part, so
/// the two halves concatenate back into the original line.
pub fn split_comment(line: &str) -> (&str, &str) {
    let mut quote = None;

    for (index, ch) in line.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => (),
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == '@' => {
                let code_end = line[..index].trim_end().len();
                return (&line[..code_end], &line[code_end..]);
            }
            None => (),
        }
    }

    (line, "")
}

/// Splits a line at the first `:` outside quotes into a label prefix
/// and the remaining code.
///
/// Whitespace after the colon belongs to the label part, again so the
/// halves concatenate back into the original line.
pub fn split_label(line: &str) -> (&str, &str) {
    let mut quote = None;

    for (index, ch) in line.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => (),
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == ':' => {
                let rest = &line[index + 1..];
                let code_start = index + 1 + (rest.len() - rest.trim_start().len());
                return (&line[..code_start], &line[code_start..]);
            }
            None => (),
        }
    }

    ("", line)
}

/// The label name declared by a label prefix produced by
/// [split_label], or None when the prefix declares nothing.
pub fn label_name(prefix: &str) -> Option<&str> {
    if prefix.is_empty() {
        return None;
    }

    let name = prefix.trim_end().trim_end_matches(':').trim();

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Parses a comment- and label-stripped line into a memory cell.
pub fn parse_line(code: &str) -> Result<Value, SyntaxError> {
    LineParser::new(code).parse()
}

/// Recursive descent parser over the token stream of a single line.
///
/// A line is either empty, a bare string or number literal, or a
/// keyword followed by a comma-separated argument list. Arguments are
/// string literals or address sums; an address is a number, an
/// identifier or a bracketed dereference of another sum.
struct LineParser<'a> {
    line: &'a str,
    tokens: Vec<(Token<'a>, Span)>,
    position: usize,
}

impl<'a> LineParser<'a> {
    fn new(line: &'a str) -> LineParser<'a> {
        LineParser {
            line,
            tokens: lexer::tokenize(line),
            position: 0,
        }
    }

    fn peek(&self) -> Option<&(Token<'a>, Span)> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<(Token<'a>, Span)> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    /// The source text a token was lexed from.
    fn text(&self, span: &Span) -> String {
        self.line[span.clone()].to_string()
    }

    fn unexpected(&self, token: &Token, span: Span) -> SyntaxError {
        SyntaxError {
            kind: SyntaxErrorKind::UnexpectedToken {
                category: token.category(),
                text: self.text(&span),
            },
            span,
        }
    }

    fn expected(&self, expected: &'static str) -> SyntaxError {
        match self.peek() {
            Some((_, span)) => SyntaxError {
                kind: SyntaxErrorKind::ExpectedToken {
                    expected,
                    found: self.text(span),
                },
                span: span.clone(),
            },
            None => SyntaxError {
                kind: SyntaxErrorKind::ExpectedToken {
                    expected,
                    found: "end of line".to_string(),
                },
                span: self.line.len()..self.line.len(),
            },
        }
    }

    fn parse(mut self) -> Result<Value, SyntaxError> {
        let cell = match self.advance() {
            None => return Ok(Value::Empty),
            Some((Token::Str(text), _)) => Value::Text(text.to_string()),
            Some((Token::Number(number), _)) => Value::Number(number),
            Some((Token::Keyword((opcode, condition)), _)) => {
                let args = self.argument_list()?;

                Value::Code(Instruction {
                    opcode,
                    condition,
                    args,
                    source: self.line.to_string(),
                })
            }
            Some((token, span)) => return Err(self.unexpected(&token, span)),
        };

        match self.advance() {
            None => Ok(cell),
            Some((token, span)) => Err(self.unexpected(&token, span)),
        }
    }

    fn argument_list(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = Vec::new();

        if self.peek().is_none() {
            return Ok(args);
        }

        args.push(self.argument()?);

        while let Some((Token::Comma, _)) = self.peek() {
            self.advance();
            args.push(self.argument()?);
        }

        Ok(args)
    }

    fn argument(&mut self) -> Result<Expr, SyntaxError> {
        if let Some((Token::Str(text), _)) = self.peek() {
            let text = text.to_string();
            self.advance();
            return Ok(Expr::Literal(Value::Text(text)));
        }

        self.sum()
    }

    fn sum(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.address()?;

        while let Some((Token::Plus, _)) = self.peek() {
            self.advance();
            let rhs = self.address()?;
            expr = Expr::Sum(Box::new(expr), Box::new(rhs));
        }

        Ok(expr)
    }

    fn address(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek().cloned() {
            Some((Token::Number(number), _)) => {
                self.advance();
                Ok(Expr::Literal(Value::Number(number)))
            }
            Some((Token::Identifier(name), _)) => {
                let name = name.to_string();
                self.advance();
                Ok(Expr::Identifier(name))
            }
            Some((Token::LBracket, _)) => {
                self.advance();
                let inner = self.sum()?;

                match self.advance() {
                    Some((Token::RBracket, _)) => Ok(Expr::Deref(Box::new(inner))),
                    Some((token, span)) => Err(self.unexpected(&token, span)),
                    None => Err(self.expected("]")),
                }
            }
            _ => Err(self.expected("an address")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Condition, OpCode};

    #[test]
    fn comment_splitting() {
        assert_eq!(split_comment("push 1  @ initial"), ("push 1", "  @ initial"));
        assert_eq!(split_comment("push 1"), ("push 1", ""));
        assert_eq!(split_comment("@ whole line"), ("", "@ whole line"));
    }

    #[test]
    fn comment_marker_inside_quotes() {
        assert_eq!(split_comment("push \"a@b\" @ mail"), ("push \"a@b\"", " @ mail"));
        assert_eq!(split_comment("push '@'"), ("push '@'", ""));
    }

    #[test]
    fn label_splitting() {
        assert_eq!(split_label("loop: jump loop"), ("loop: ", "jump loop"));
        assert_eq!(split_label("jump loop"), ("", "jump loop"));
        assert_eq!(split_label("only:"), ("only:", ""));
    }

    #[test]
    fn label_colon_inside_quotes() {
        assert_eq!(split_label("push \"a:b\""), ("", "push \"a:b\""));
    }

    #[test]
    fn label_names() {
        assert_eq!(label_name("loop: "), Some("loop"));
        assert_eq!(label_name(" spaced out : "), Some("spaced out"));
        assert_eq!(label_name(": "), None);
        assert_eq!(label_name(""), None);
    }

    #[test]
    fn bare_literals() {
        assert_eq!(parse_line(""), Ok(Value::Empty));
        assert_eq!(parse_line("   "), Ok(Value::Empty));
        assert_eq!(parse_line("42"), Ok(Value::Number(42.0)));
        assert_eq!(parse_line("\"hello\""), Ok(Value::Text("hello".to_string())));
    }

    #[test]
    fn instruction_with_arguments() {
        let cell = parse_line("moveseq 1, [base + 2]").unwrap();

        match cell {
            Value::Code(instruction) => {
                assert_eq!(instruction.opcode, OpCode::Moves);
                assert_eq!(instruction.condition, Condition::Eq);
                assert_eq!(
                    instruction.args,
                    vec![
                        Expr::Literal(Value::Number(1.0)),
                        Expr::Deref(Box::new(Expr::Sum(
                            Box::new(Expr::Identifier("base".to_string())),
                            Box::new(Expr::Literal(Value::Number(2.0))),
                        ))),
                    ],
                );
                assert_eq!(instruction.source, "moveseq 1, [base + 2]");
            }
            other => panic!("expected an instruction, got {:?}", other),
        }
    }

    #[test]
    fn sums_associate_left() {
        let cell = parse_line("jump a + 1 + b").unwrap();

        match cell {
            Value::Code(instruction) => assert_eq!(
                instruction.args,
                vec![Expr::Sum(
                    Box::new(Expr::Sum(
                        Box::new(Expr::Identifier("a".to_string())),
                        Box::new(Expr::Literal(Value::Number(1.0))),
                    )),
                    Box::new(Expr::Identifier("b".to_string())),
                )],
            ),
            other => panic!("expected an instruction, got {:?}", other),
        }
    }

    #[test]
    fn rejects_trailing_tokens() {
        assert!(parse_line("42 13").is_err());
        assert!(parse_line("\"a\" push").is_err());
    }

    #[test]
    fn rejects_dangling_syntax() {
        assert!(parse_line("push ,").is_err());
        assert!(parse_line("push 1,").is_err());
        assert!(parse_line("push [1").is_err());
        assert!(parse_line("push 1 +").is_err());
        assert!(parse_line("move 1 2").is_err());
    }

    #[test]
    fn rejects_unlexable_characters() {
        let error = parse_line("push #tag").unwrap_err();

        assert_eq!(error.span, 5..6);
    }

    #[test]
    fn bare_identifier_is_not_a_cell() {
        assert!(parse_line("loop").is_err());
    }
}
