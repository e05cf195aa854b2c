//! This module defines [`Value`], the tagged union every runtime datum is
//! represented by, together with the printer, the `eq?` comparison and a set
//! of ergonomic constructors ([`val`], [`sym`], [`nil`]) used heavily in tests.
//!
//! Lists, strings and procedures all sit on top of [`List`]. A string is a
//! list of [`Value::Char`] and a procedure is a two element `[params, body]`
//! list, where `params` is either a list of symbols (fixed arity) or a bare
//! symbol that collects every argument (variadic).

use crate::Error;
use crate::list::{CapacityError, List};

/// Symbols longer than this are rejected by the reader
pub const MAXIMUM_SYMBOL_LENGTH: usize = 255;

/// Core value type of the interpreter
///
/// To build values in code, use the helper functions:
/// - `val(42)` for numbers, `val("text")` for strings, `sym("name")` for symbols
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![sym("op"), val(42)])` for mixed lists
/// - `nil()` for the empty list
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Lists; the empty list is nil
    List(List),
    /// Identifiers
    Symbol(String),
    /// A single byte character
    Char(u8),
    /// Numbers (always floating point)
    Number(f64),
    /// Character lists
    String(List),
    Boolean(bool),
    /// User procedure stored as `[params, body]`
    Procedure(List),
}

impl Value {
    /// Build a procedure value from its parameters and body
    pub fn procedure(params: Value, body: Value) -> Value {
        Value::Procedure(List::from(vec![params, body]))
    }

    /// Only `#f` is false
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    /// Identity comparison used by `eq?`.
    ///
    /// Characters, numbers, booleans and symbols compare by value. Lists,
    /// strings and procedures compare by identity, except that any two empty
    /// lists are considered the same object.
    pub fn is_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                (a.is_empty() && b.is_empty()) || a.same_identity(b)
            }
            (Value::String(a), Value::String(b)) | (Value::Procedure(a), Value::Procedure(b)) => {
                a.same_identity(b)
            }
            _ => false,
        }
    }

    /// Deep, independent copy. Containers receive fresh identities.
    pub fn try_copy(&self) -> Result<Value, CapacityError> {
        Ok(match self {
            Value::List(list) => Value::List(list.try_copy()?),
            Value::String(list) => Value::String(list.try_copy()?),
            Value::Procedure(list) => Value::Procedure(list.try_copy()?),
            other => other.clone(),
        })
    }

    /// The text of a string value
    pub fn text(&self) -> Option<String> {
        match self {
            Value::String(chars) => chars
                .to_bytes()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
            _ => None,
        }
    }
}

/// Split a procedure record into its parameters and body
pub fn procedure_parts(record: &List) -> Option<(&Value, &Value)> {
    match record.as_slice() {
        [params, body] => Some((params, body)),
        _ => None,
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(List::from(s.bytes().map(Value::Char).collect::<Vec<_>>()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::from(s.as_str())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(f64::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(List::from(
            v.into_iter().map(Into::into).collect::<Vec<Value>>(),
        ))
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(List::from(
            arr.into_iter().map(Into::into).collect::<Vec<Value>>(),
        ))
    }
}

impl TryFrom<&Value> for f64 {
    type Error = Error;

    fn try_from(value: &Value) -> Result<f64, Error> {
        match value {
            Value::Number(n) => Ok(*n),
            _ => Err(Error::ExpectedNumber),
        }
    }
}

/// Helper function for creating symbols
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Values from anything convertible
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// The empty list
pub fn nil() -> Value {
    Value::List(List::new())
}

fn write_sequence(f: &mut std::fmt::Formatter<'_>, items: &List) -> std::fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, ")")
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::List(items) => write_sequence(f, items),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Char(c) => write!(f, "#\\{}", char::from(*c)),
            Value::Number(n) => write!(f, "{n:.6}"),
            Value::String(chars) => {
                // Characters are written back raw, escapes are not re-applied
                let bytes: Vec<u8> = chars
                    .iter()
                    .map(|c| match c {
                        Value::Char(b) => *b,
                        _ => b'?',
                    })
                    .collect();
                write!(f, "\"{}\"", String::from_utf8_lossy(&bytes))
            }
            Value::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Procedure(record) => match procedure_parts(record) {
                Some((params, body)) => write!(f, "(lambda {params} {body})"),
                None => write!(f, "(lambda)"),
            },
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        let cases: Vec<(Value, &str)> = vec![
            (val(42), "42.000000"),
            (val(-1.5), "-1.500000"),
            (val(true), "#t"),
            (val(false), "#f"),
            (sym("foo"), "foo"),
            (Value::Char(b'a'), "#\\a"),
            (Value::Char(b' '), "#\\ "),
            (val("hello world"), "\"hello world\""),
            (val("say \"hi\""), "\"say \"hi\"\""),
            (nil(), "()"),
            (val([1, 2, 3]), "(1.000000 2.000000 3.000000)"),
            (
                val(vec![sym("a"), val(vec![sym("b"), val("c")])]),
                "(a (b \"c\"))",
            ),
            (
                Value::procedure(val(vec![sym("x")]), val(vec![sym("+"), sym("x"), val(1)])),
                "(lambda (x) (+ x 1.000000))",
            ),
            (
                Value::procedure(sym("args"), sym("args")),
                "(lambda args args)",
            ),
        ];

        for (value, expected) in cases {
            assert_eq!(value.to_string(), expected);
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!val(false).is_truthy());
        assert!(val(true).is_truthy());
        assert!(val(0).is_truthy());
        assert!(nil().is_truthy());
        assert!(val("").is_truthy());
    }

    #[test]
    fn test_is_eq_by_value() {
        assert!(val(1).is_eq(&val(1)));
        assert!(!val(1).is_eq(&val(2)));
        assert!(sym("a").is_eq(&sym("a")));
        assert!(Value::Char(b'x').is_eq(&Value::Char(b'x')));
        assert!(val(true).is_eq(&val(true)));
        assert!(!val(1).is_eq(&val(true)));
        assert!(!sym("a").is_eq(&val("a")));
    }

    #[test]
    fn test_is_eq_by_identity() {
        let a = val("a");
        let b = val("a");
        assert_eq!(a, b);
        assert!(!a.is_eq(&b));
        assert!(a.is_eq(&a.clone()));
        assert!(!a.is_eq(&a.try_copy().unwrap()));

        let list = val([1, 2]);
        assert!(list.is_eq(&list.clone()));
        assert!(!list.is_eq(&val([1, 2])));

        assert!(nil().is_eq(&nil()));
        assert!(!nil().is_eq(&val([1])));
    }

    #[test]
    fn test_text_and_numbers() {
        assert_eq!(val("abc").text().unwrap(), "abc");
        assert_eq!(sym("abc").text(), None);
        assert_eq!(f64::try_from(&val(3)), Ok(3.0));
        assert_eq!(f64::try_from(&val("3")), Err(Error::ExpectedNumber));
    }

    #[test]
    fn test_procedure_parts() {
        let Value::Procedure(record) = Value::procedure(sym("xs"), sym("xs")) else {
            panic!("expected procedure");
        };
        let (params, body) = procedure_parts(&record).unwrap();
        assert_eq!(params, &sym("xs"));
        assert_eq!(body, &sym("xs"));
    }
}
