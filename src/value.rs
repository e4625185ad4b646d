//! The unified cell value type.
//!
//! Memory cells, stack slots and evaluated operands all hold the same
//! [Value] type. There is no separate code segment: an instruction is
//! just a value that happens to be [Code](Value::Code), and programs
//! are free to overwrite their own instruction cells with data or with
//! other instructions.

use std::cmp::Ordering;
use std::fmt;

use crate::error::RuntimeError;
use crate::instruction::Instruction;

/// A single cell of machine state.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// An unwritten cell. Reads of addresses beyond the populated
    /// memory yield this.
    Empty,

    /// All numbers are 64-bit floats, like the arithmetic they feed.
    Number(f64),

    Text(String),

    /// A compiled instruction occupying a memory cell.
    Code(Instruction),
}

impl Value {
    /// The category name used in type mismatch messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Code(_) => "code",
        }
    }

    /// Truthiness for logical negation: zero, the empty string and
    /// empty cells are false, everything else is true.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Empty => false,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::Code(_) => true,
        }
    }

    pub fn as_number(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(RuntimeError::TypeMismatch {
                expected: "number",
                found: other.type_name(),
            }),
        }
    }

    /// Interprets the value as a memory address.
    ///
    /// Only non-negative integral numbers qualify; anything else is an
    /// invalid address or a type mismatch.
    pub fn as_address(&self) -> Result<usize, RuntimeError> {
        let number = self.as_number()?;

        if number < 0.0 || number.fract() != 0.0 || !number.is_finite() {
            return Err(RuntimeError::InvalidAddress { value: number });
        }

        Ok(number as usize)
    }

    /// The bare textual form, without quotes. This is what CAT
    /// concatenates and what number cells render as.
    pub fn plain(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Number(n) => format!("{}", n),
            Value::Text(s) => s.clone(),
            Value::Code(instruction) => instruction.to_string(),
        }
    }

    /// The source form of the value: single-character strings take
    /// single quotes, longer ones double quotes, and instructions
    /// reproduce the line they were parsed from.
    pub fn render(&self) -> String {
        match self {
            Value::Text(s) if s.chars().count() == 1 => format!("'{}'", s),
            Value::Text(s) => format!("\"{}\"", s),
            other => other.plain(),
        }
    }

    /// Compares the value against the zero identity of its type: 0 for
    /// numbers, the empty string for text.
    pub fn zero_cmp(&self) -> Result<Ordering, RuntimeError> {
        match self {
            Value::Number(n) => Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal)),
            Value::Text(s) => Ok(if s.is_empty() {
                Ordering::Equal
            } else {
                Ordering::Greater
            }),
            other => Err(RuntimeError::TypeMismatch {
                expected: "number or text",
                found: other.type_name(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Orders two values of like type. NaN compares equal to everything,
/// text compares lexicographically, mixing types is an error.
pub fn compare(a: &Value, b: &Value) -> Result<Ordering, RuntimeError> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            Ok(a.partial_cmp(b).unwrap_or(Ordering::Equal))
        }
        (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
        (a, b) => Err(RuntimeError::TypeMismatch {
            expected: a.type_name(),
            found: b.type_name(),
        }),
    }
}

/// Converts a value to a number.
///
/// Numbers pass through. Text containing a `digits.digits` sequence is
/// read as a float, otherwise its leading integer prefix is taken.
/// Text without any leading number, and non-scalar values, are errors.
pub fn cast(value: &Value) -> Result<Value, RuntimeError> {
    let text = match value {
        Value::Number(n) => return Ok(Value::Number(*n)),
        Value::Text(s) => s.trim(),
        other => {
            return Err(RuntimeError::TypeMismatch {
                expected: "number or text",
                found: other.type_name(),
            })
        }
    };

    let parsed = if looks_decimal(text) {
        numeric_prefix(text, true)
    } else {
        numeric_prefix(text, false)
    };

    match parsed {
        Some(number) => Ok(Value::Number(number)),
        None => Err(RuntimeError::TypeMismatch {
            expected: "numeric text",
            found: "text",
        }),
    }
}

/// True if the text contains a digit, a dot and a digit in sequence
/// anywhere.
fn looks_decimal(text: &str) -> bool {
    text.as_bytes()
        .windows(3)
        .any(|w| w[0].is_ascii_digit() && w[1] == b'.' && w[2].is_ascii_digit())
}

/// Parses the longest numeric prefix of `text`, optionally accepting a
/// fractional part. Returns None when no digits lead the text.
fn numeric_prefix(text: &str, decimal: bool) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }

    let digits_start = end;

    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }

    if end == digits_start {
        return None;
    }

    if decimal && end < bytes.len() && bytes[end] == b'.' {
        let mut fraction = end + 1;

        while fraction < bytes.len() && bytes[fraction].is_ascii_digit() {
            fraction += 1;
        }

        if fraction > end + 1 {
            end = fraction;
        }
    }

    text[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Empty.truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::Number(f64::NAN).truthy());
        assert!(Value::Number(-1.5).truthy());
        assert!(!Value::Text(String::new()).truthy());
        assert!(Value::Text("x".into()).truthy());
    }

    #[test]
    fn render_quotes_by_length() {
        assert_eq!(Value::Text("a".into()).render(), "'a'");
        assert_eq!(Value::Text("ab".into()).render(), "\"ab\"");
        assert_eq!(Value::Text(String::new()).render(), "\"\"");
        assert_eq!(Value::Number(6.0).render(), "6");
        assert_eq!(Value::Number(6.5).render(), "6.5");
        assert_eq!(Value::Empty.render(), "");
    }

    #[test]
    fn addresses_are_nonnegative_integers() {
        assert_eq!(Value::Number(7.0).as_address(), Ok(7));
        assert!(Value::Number(-1.0).as_address().is_err());
        assert!(Value::Number(2.5).as_address().is_err());
        assert!(Value::Text("3".into()).as_address().is_err());
    }

    #[test]
    fn comparisons() {
        let a = Value::Number(1.0);
        let b = Value::Number(2.0);

        assert_eq!(compare(&a, &b), Ok(Ordering::Less));
        assert_eq!(compare(&b, &a), Ok(Ordering::Greater));
        assert_eq!(
            compare(&Value::Text("abc".into()), &Value::Text("abd".into())),
            Ok(Ordering::Less),
        );
        assert!(compare(&a, &Value::Text("1".into())).is_err());
    }

    #[test]
    fn zero_identities() {
        assert_eq!(Value::Number(0.0).zero_cmp(), Ok(Ordering::Equal));
        assert_eq!(Value::Number(-3.0).zero_cmp(), Ok(Ordering::Less));
        assert_eq!(Value::Text(String::new()).zero_cmp(), Ok(Ordering::Equal));
        assert_eq!(Value::Text("hi".into()).zero_cmp(), Ok(Ordering::Greater));
    }

    #[test]
    fn casting() {
        assert_eq!(cast(&Value::Number(4.25)), Ok(Value::Number(4.25)));
        assert_eq!(cast(&Value::Text("42".into())), Ok(Value::Number(42.0)));
        assert_eq!(cast(&Value::Text("3.5cm".into())), Ok(Value::Number(3.5)));
        assert_eq!(cast(&Value::Text("-7 up".into())), Ok(Value::Number(-7.0)));
        assert_eq!(cast(&Value::Text("12.d".into())), Ok(Value::Number(12.0)));
        assert!(cast(&Value::Text("twelve".into())).is_err());
        assert!(cast(&Value::Empty).is_err());
    }
}
