//! tinyscm - a small Scheme-family interpreter
//!
//! The crate is split along the path a program takes from text to result:
//!
//! ```scheme
//! (define fact (lambda (n) (if (< n 2) 1 (* n (fact (- n 1))))))
//! (fact 5)            ; 120.000000
//! (eq? '() '())       ; #t
//! (car '(1 2 3))      ; 1.000000
//! ```
//!
//! ## Value model
//!
//! Every runtime datum is a [`ast::Value`]. Lists, strings and procedures are
//! all backed by the same growable array, [`list::List`], which carries an
//! explicit capacity policy (start at 8, double when full, halve on pop once
//! three quarters sit empty). Strings are lists of byte characters and a
//! procedure is a two element `[params, body]` list.
//!
//! ## Semantics worth knowing
//!
//! - `#f` is the only false value; everything else is truthy.
//! - Numbers are `f64` and print with six fixed decimals.
//! - Procedures do not capture their defining namespace. Free variables in a
//!   body resolve against the *caller's* namespace chain at call time.
//! - `eq?` compares lists, strings and procedures by identity. Two strings read
//!   from separate literals are never `eq?`, but two empty lists always are.
//!
//! ## Modules
//!
//! - `list`: the growable array engine
//! - `ast`: the value type, printer and identity comparison
//! - `reader`: text to value trees with row/column tracking
//! - `evaluator`: namespaces and the tree-walking evaluator
//! - `builtinops`: registry of special forms and primitives
//! - `source`: file loading
//! - `driver`: paren-balanced input units and the top-level session loop

/// Maximum nesting depth accepted by the reader before it gives up
pub const MAX_PARSE_DEPTH: usize = 256;

/// Default ceiling on nested procedure calls.
/// There is no tail-call elimination, so a call that never returns fails with
/// [`Error::RecursionLimit`] once it is this deep.
pub const MAX_EVAL_DEPTH: usize = 10_000;

/// The broad class an [`Error`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFamily {
    /// Malformed surface syntax
    Parse,
    /// Failure while evaluating a well-formed expression
    Eval,
    /// An operand did not have the type a form requires
    Type,
}

/// Error codes for the interpreter.
///
/// The `Display` text of each variant is the message shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    // Parse errors
    #[error("newlines are not allowed in string literals")]
    NoNewlineInString,
    #[error("unknown escape sequence")]
    UnknownEscapeSequence,
    #[error("unterminated string before end of file")]
    UnterminatedString,
    #[error("invalid character")]
    InvalidChar,
    #[error("unexpected end of character constant")]
    UnexpectedEndOfChar,
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("unexpected end of hash-prefixed value")]
    UnexpectedEndOfHash,
    #[error("unhandled data type")]
    UnhandledDataType,
    #[error("invalid character in number")]
    InvalidNumChar,
    #[error("maximum length of symbol exceeded")]
    SymbolTooLong,
    #[error("unclosed parentheses")]
    UnclosedParens,
    #[error("extraneous parentheses")]
    ExtraParens,
    #[error("expression too deeply nested")]
    TooDeeplyNested,

    // Eval errors
    #[error("first element of list must be a procedure")]
    FirstNotProc,
    #[error("incorrect number of arguments passed to procedure")]
    IncorrectArgCount,
    #[error("symbol is not bound to a value")]
    SymbolNotBound,
    #[error("expression returned undefined")]
    Undefined,
    #[error("could not open file")]
    CantOpenFile,
    #[error("evaluation depth limit exceeded")]
    RecursionLimit,
    #[error("out of memory")]
    OutOfMemory,

    // Type errors
    #[error("expected symbol")]
    ExpectedSymbol,
    #[error("expected boolean")]
    ExpectedBoolean,
    #[error("expected a numeric value")]
    ExpectedNumber,
    #[error("expected a character")]
    ExpectedChar,
    #[error("expected a string")]
    ExpectedString,
    #[error("expected a list")]
    ExpectedList,
    #[error("expected a pair")]
    ExpectedPair,
    #[error("expected a procedure")]
    ExpectedProc,
}

impl Error {
    /// Which of the three error families this code belongs to
    pub fn family(&self) -> ErrorFamily {
        use Error::*;
        match self {
            NoNewlineInString | UnknownEscapeSequence | UnterminatedString | InvalidChar
            | UnexpectedEndOfChar | UnexpectedEndOfInput | UnexpectedEndOfHash
            | UnhandledDataType | InvalidNumChar | SymbolTooLong | UnclosedParens
            | ExtraParens | TooDeeplyNested => ErrorFamily::Parse,

            FirstNotProc | IncorrectArgCount | SymbolNotBound | Undefined | CantOpenFile
            | RecursionLimit | OutOfMemory => ErrorFamily::Eval,

            ExpectedSymbol | ExpectedBoolean | ExpectedNumber | ExpectedChar | ExpectedString
            | ExpectedList | ExpectedPair | ExpectedProc => ErrorFamily::Type,
        }
    }

    pub fn is_parse_error(&self) -> bool {
        self.family() == ErrorFamily::Parse
    }
}

pub mod ast;
pub mod builtinops;
pub mod driver;
pub mod evaluator;
pub mod list;
pub mod reader;
pub mod source;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families() {
        assert_eq!(Error::UnclosedParens.family(), ErrorFamily::Parse);
        assert_eq!(Error::TooDeeplyNested.family(), ErrorFamily::Parse);
        assert_eq!(Error::SymbolNotBound.family(), ErrorFamily::Eval);
        assert_eq!(Error::OutOfMemory.family(), ErrorFamily::Eval);
        assert_eq!(Error::ExpectedPair.family(), ErrorFamily::Type);
        assert!(Error::ExtraParens.is_parse_error());
        assert!(!Error::ExpectedProc.is_parse_error());
    }

    #[test]
    fn test_error_messages() {
        assert!(
            Error::IncorrectArgCount
                .to_string()
                .contains("incorrect number of arguments")
        );
        assert_eq!(Error::ExpectedList.to_string(), "expected a list");
        assert_eq!(
            Error::TooDeeplyNested.to_string(),
            "expression too deeply nested"
        );
    }
}
