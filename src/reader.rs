//! Text to [`Value`] trees.
//!
//! The grammar is small enough to read off the parsers below:
//!
//! ```text
//! value   := trivia (list | quoted | string | hash | number | symbol)
//! list    := '(' (trivia value)* trivia ')'
//! quoted  := '\'' value                          ; sugar for (quote value)
//! string  := '"' (byte | '\n' '\t' '\\' '\"' escapes)* '"'
//! hash    := '#t' | '#f' | '#\' (byte | space | tab | newline)
//! number  := digit+                              ; must end at a delimiter
//! symbol  := up to 255 non-delimiter bytes
//! ```
//!
//! Delimiters are space, tab, newline and both parentheses. With
//! [`ReaderConfig::handle_comments`] set, `;` starts a comment running to the
//! end of the line.
//!
//! Every failure carries a typed [`Error`] and the byte offset it occurred
//! at, which [`Reader::position`] turns into a row and column.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_till, take_while, take_while1},
    character::complete::char,
    error::{ErrorKind, ParseError},
};

use crate::Error;
use crate::MAX_PARSE_DEPTH;
use crate::ast::{MAXIMUM_SYMBOL_LENGTH, Value, sym};
use crate::list::List;

/// Reader options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReaderConfig {
    /// Treat `;` to end of line as whitespace
    pub handle_comments: bool,
}

/// A location in the input. Rows and columns start at 1, the index at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub column: usize,
    pub index: usize,
}

/// nom error carrying the interpreter's own error code
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReadError<'a> {
    input: &'a [u8],
    code: Error,
}

impl<'a> ParseError<&'a [u8]> for ReadError<'a> {
    fn from_error_kind(input: &'a [u8], _kind: ErrorKind) -> Self {
        ReadError {
            input,
            code: Error::UnhandledDataType,
        }
    }

    fn append(_input: &'a [u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

type ReadResult<'a, T> = IResult<&'a [u8], T, ReadError<'a>>;

/// Abort the whole read; alternatives are not tried after a failure
fn failure<T>(input: &[u8], code: Error) -> ReadResult<'_, T> {
    Err(nom::Err::Failure(ReadError { input, code }))
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n')
}

fn is_terminal(b: u8) -> bool {
    is_space(b) || b == b'(' || b == b')'
}

fn spaces(input: &[u8]) -> ReadResult<'_, &[u8]> {
    take_while(is_space).parse(input)
}

fn comment(input: &[u8]) -> ReadResult<'_, &[u8]> {
    take_while(|b: u8| b != b'\n').parse(input)
}

fn atom_text(input: &[u8]) -> ReadResult<'_, &[u8]> {
    take_till(is_terminal).parse(input)
}

fn digits(input: &[u8]) -> ReadResult<'_, &[u8]> {
    take_while1(|b: u8| b.is_ascii_digit()).parse(input)
}

/// Match the byte that opens (or closes) a construct
fn lead(byte: char, input: &[u8]) -> ReadResult<'_, char> {
    char(byte).parse(input)
}

/// Skip whitespace and, when enabled, comments
fn trivia<'a>(mut input: &'a [u8], config: &ReaderConfig) -> ReadResult<'a, ()> {
    loop {
        let (rest, _) = spaces(input)?;
        if config.handle_comments && rest.first() == Some(&b';') {
            let (rest, _) = comment(rest)?;
            input = rest;
        } else {
            return Ok((rest, ()));
        }
    }
}

fn value<'a>(input: &'a [u8], config: &ReaderConfig, depth: usize) -> ReadResult<'a, Value> {
    let (input, ()) = trivia(input, config)?;
    if depth >= MAX_PARSE_DEPTH {
        return failure(input, Error::TooDeeplyNested);
    }
    match input.first() {
        None => failure(input, Error::UnexpectedEndOfInput),
        Some(b')') => failure(input, Error::ExtraParens),
        Some(_) => alt((
            |i| list(i, config, depth),
            |i| quoted(i, config, depth),
            string,
            hash,
            number,
            symbol,
        ))
        .parse(input),
    }
}

fn list<'a>(input: &'a [u8], config: &ReaderConfig, depth: usize) -> ReadResult<'a, Value> {
    let (mut input, _) = lead('(', input)?;
    let mut items = List::new();

    loop {
        let (rest, ()) = trivia(input, config)?;
        match rest.first() {
            None => return failure(rest, Error::UnclosedParens),
            Some(b')') => {
                let (rest, _) = lead(')', rest)?;
                return Ok((rest, Value::List(items)));
            }
            Some(_) => {
                let (rest, item) = value(rest, config, depth + 1)?;
                if items.append(item).is_err() {
                    return failure(rest, Error::OutOfMemory);
                }
                input = rest;
            }
        }
    }
}

/// `'x` reads as `(quote x)`
fn quoted<'a>(input: &'a [u8], config: &ReaderConfig, depth: usize) -> ReadResult<'a, Value> {
    let (input, _) = lead('\'', input)?;
    let (input, expr) = value(input, config, depth + 1)?;
    Ok((input, Value::List(List::from(vec![sym("quote"), expr]))))
}

fn string(input: &[u8]) -> ReadResult<'_, Value> {
    let (mut rest, _) = lead('"', input)?;
    let mut chars = List::new();

    loop {
        let Some((&c, tail)) = rest.split_first() else {
            return failure(rest, Error::UnterminatedString);
        };
        let decoded = match c {
            b'"' => return Ok((tail, Value::String(chars))),
            b'\n' => return failure(rest, Error::NoNewlineInString),
            b'\\' => {
                let Some((&escaped, after)) = tail.split_first() else {
                    return failure(tail, Error::UnterminatedString);
                };
                let decoded = match escaped {
                    b'n' => b'\n',
                    b't' => b'\t',
                    b'\\' => b'\\',
                    b'"' => b'"',
                    b'\n' => return failure(tail, Error::NoNewlineInString),
                    _ => return failure(tail, Error::UnknownEscapeSequence),
                };
                rest = after;
                decoded
            }
            other => {
                rest = tail;
                other
            }
        };
        if chars.append(Value::Char(decoded)).is_err() {
            return failure(rest, Error::OutOfMemory);
        }
    }
}

fn hash(input: &[u8]) -> ReadResult<'_, Value> {
    let (rest, _) = lead('#', input)?;
    let Some((&c, tail)) = rest.split_first() else {
        return failure(rest, Error::UnexpectedEndOfHash);
    };
    match c {
        b't' | b'f' => {
            if tail.first().is_some_and(|&b| !is_terminal(b)) {
                return failure(tail, Error::InvalidChar);
            }
            Ok((tail, Value::Boolean(c == b't')))
        }
        b'\\' => character(tail),
        _ => failure(rest, Error::InvalidChar),
    }
}

/// The part of a character literal after `#\`
fn character(input: &[u8]) -> ReadResult<'_, Value> {
    let (rest, word) = atom_text(input)?;
    let c = match word {
        // A delimiter is itself a valid character: `#\(` or `#\ `
        [] => match input.split_first() {
            Some((&c, rest)) => return Ok((rest, Value::Char(c))),
            None => return failure(input, Error::UnexpectedEndOfChar),
        },
        [c] => *c,
        b"space" => b' ',
        b"tab" => b'\t',
        b"newline" => b'\n',
        _ => return failure(input, Error::InvalidChar),
    };
    Ok((rest, Value::Char(c)))
}

fn number(input: &[u8]) -> ReadResult<'_, Value> {
    let (rest, digits) = digits(input)?;
    if let Some(&b) = rest.first()
        && !is_terminal(b)
    {
        return failure(rest, Error::InvalidNumChar);
    }
    let n = digits
        .iter()
        .fold(0.0, |acc, d| acc * 10.0 + f64::from(d - b'0'));
    Ok((rest, Value::Number(n)))
}

fn symbol(input: &[u8]) -> ReadResult<'_, Value> {
    let (rest, name) = atom_text(input)?;
    if name.is_empty() {
        return failure(input, Error::UnhandledDataType);
    }
    if name.len() > MAXIMUM_SYMBOL_LENGTH {
        return failure(&input[MAXIMUM_SYMBOL_LENGTH..], Error::SymbolTooLong);
    }
    match std::str::from_utf8(name) {
        Ok(text) => Ok((rest, Value::Symbol(text.to_owned()))),
        Err(err) => failure(&input[err.valid_up_to()..], Error::InvalidChar),
    }
}

/// Reads successive top-level values from a buffer, tracking where it is.
///
/// After a failed [`Reader::read`] the cursor sits at the error location.
pub struct Reader<'a> {
    input: &'a [u8],
    index: usize,
    config: ReaderConfig,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, ReaderConfig::default())
    }

    pub fn with_config(input: &'a [u8], config: ReaderConfig) -> Self {
        Reader {
            input,
            index: 0,
            config,
        }
    }

    fn remaining(&self) -> &'a [u8] {
        self.input.get(self.index..).unwrap_or_default()
    }

    /// Read the next value
    pub fn read(&mut self) -> Result<Value, Error> {
        match value(self.remaining(), &self.config, 0) {
            Ok((rest, value)) => {
                self.index = self.input.len() - rest.len();
                Ok(value)
            }
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
                self.index = self.input.len() - e.input.len();
                Err(e.code)
            }
            Err(nom::Err::Incomplete(_)) => {
                self.index = self.input.len();
                Err(Error::UnexpectedEndOfInput)
            }
        }
    }

    /// Whether only whitespace (and comments, if enabled) is left
    pub fn is_exhausted(&self) -> bool {
        match trivia(self.remaining(), &self.config) {
            Ok((rest, ())) => rest.is_empty(),
            Err(_) => false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Row and column of the cursor. The column restarts after each newline.
    pub fn position(&self) -> Position {
        let consumed = self.input.get(..self.index).unwrap_or(self.input);
        let row = 1 + consumed.iter().filter(|&&b| b == b'\n').count();
        let line_start = consumed
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        Position {
            row,
            column: 1 + self.index - line_start,
            index: self.index,
        }
    }
}

impl Iterator for Reader<'_> {
    type Item = Result<Value, Error>;

    /// Yields values until the input is exhausted, then stops after the first error
    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            return None;
        }
        let item = self.read();
        if item.is_err() {
            self.index = self.input.len();
        }
        Some(item)
    }
}

/// Parse the first value in `input`. Anything after it is left unread.
pub fn parse(input: &str) -> Result<Value, Error> {
    Reader::new(input.as_bytes()).read()
}

/// Parse every value in `input`
pub fn parse_all(input: &str) -> Result<Vec<Value>, Error> {
    Reader::new(input.as_bytes()).collect()
}
