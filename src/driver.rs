//! Top-level driving: grouping input lines into units and running them
//! against a persistent namespace.
//!
//! A unit ends at the first line end where every `(` seen so far has been
//! closed. Counting is purely lexical, so parentheses inside string or
//! character literals count too.

use crate::Error;
use crate::evaluator::{EvalConfig, Evaluator, Namespace};
use crate::reader::{Position, Reader};
use crate::source;
use std::fmt;
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// Accumulates input lines until they form a paren-balanced unit
#[derive(Debug, Default)]
pub struct UnitBuffer {
    text: String,
    depth: i64,
}

impl UnitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one line (without its newline). Returns the whole unit once the
    /// parentheses balance, leaving the buffer empty.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        for b in line.bytes() {
            match b {
                b'(' => self.depth += 1,
                b')' => self.depth -= 1,
                _ => {}
            }
        }
        self.text.push_str(line);
        self.text.push('\n');

        // Surplus closers end the unit; the reader reports them
        if self.depth > 0 {
            return None;
        }
        self.depth = 0;
        Some(std::mem::take(&mut self.text))
    }

    /// Whether a unit has been started but not finished
    pub fn is_pending(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.depth = 0;
    }
}

/// An interpreter session with one root namespace that outlives every unit
#[derive(Debug, Default)]
pub struct Session {
    namespace: Namespace<'static>,
    config: EvalConfig,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EvalConfig) -> Self {
        Session {
            namespace: Namespace::new(),
            config,
        }
    }

    pub fn namespace(&self) -> &Namespace<'static> {
        &self.namespace
    }

    /// Read and evaluate every form in `input`, printing each value on its
    /// own line. The first error is printed and stops the rest of the input.
    pub fn run(&mut self, input: &str, out: &mut dyn Write) -> Result<(), Error> {
        self.run_bytes(input.as_bytes(), out)
    }

    /// Run a file the same way as typed input
    pub fn load(&mut self, path: &Path, out: &mut dyn Write) -> Result<(), Error> {
        let contents = source::read_file(path)
            .and_then(|chars| chars.to_bytes().ok_or(Error::ExpectedString));
        match contents {
            Ok(bytes) => self.run_bytes(&bytes, out),
            Err(err) => {
                emit(out, format_args!("Error while executing: {err}"));
                Err(err)
            }
        }
    }

    fn run_bytes(&mut self, input: &[u8], out: &mut dyn Write) -> Result<(), Error> {
        let mut reader = Reader::with_config(input, self.config.reader);
        while !reader.is_exhausted() {
            let form = match reader.read() {
                Ok(form) => form,
                Err(err) => {
                    let Position { row, column, .. } = reader.position();
                    emit(out, format_args!("Error row {row}, column {column}: {err}"));
                    return Err(err);
                }
            };

            let result =
                Evaluator::with_config(&mut *out, self.config).eval(&form, &mut self.namespace);
            match result {
                Ok(Some(value)) => emit(out, format_args!("{value}")),
                Ok(None) => {}
                Err(err) => {
                    emit(out, format_args!("Error while executing: {err}"));
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

fn emit(out: &mut dyn Write, line: fmt::Arguments<'_>) {
    if let Err(err) = writeln!(out, "{line}") {
        warn!(%err, "session output failed");
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;
    use pretty_assertions::assert_eq;

    fn run(session: &mut Session, input: &str) -> (Result<(), Error>, String) {
        let mut out = Vec::new();
        let result = session.run(input, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_unit_buffer() {
        let mut buffer = UnitBuffer::new();
        assert!(!buffer.is_pending());

        assert_eq!(buffer.push_line("(define f"), None);
        assert!(buffer.is_pending());
        assert_eq!(buffer.push_line("  (lambda (x)"), None);
        assert_eq!(
            buffer.push_line("    x))").as_deref(),
            Some("(define f\n  (lambda (x)\n    x))\n")
        );
        assert!(!buffer.is_pending());

        assert_eq!(buffer.push_line("1 2").as_deref(), Some("1 2\n"));
        assert_eq!(buffer.push_line(")) (+ 1").as_deref(), Some(")) (+ 1\n"));
        assert_eq!(buffer.push_line("(car").as_deref(), None);

        buffer.clear();
        assert!(!buffer.is_pending());
        assert_eq!(buffer.push_line("x").as_deref(), Some("x\n"));
    }

    #[test]
    fn test_session_prints_each_value() {
        let mut session = Session::new();
        let (result, output) = run(&mut session, "(define x 2)\n(* x 3) 'done");
        assert_eq!(result, Ok(()));
        assert_eq!(output, "6.000000\ndone\n");

        // Bindings persist across units
        let (result, output) = run(&mut session, "(+ x 1)");
        assert_eq!(result, Ok(()));
        assert_eq!(output, "3.000000\n");
        assert_eq!(session.namespace().lookup("x").unwrap().value(), Some(&val(2)));
    }

    #[test]
    fn test_session_display_output() {
        let mut session = Session::new();
        let (_, output) = run(&mut session, "(display \"hi\") (begin (display 1) 2)");
        assert_eq!(output, "\"hi\"1.0000002.000000\n");
    }

    #[test]
    fn test_session_parse_error_stops_unit() {
        let mut session = Session::new();
        let (result, output) = run(&mut session, "(car '(1 2)) ) (define y 1)");
        assert_eq!(result, Err(Error::ExtraParens));
        assert_eq!(
            output,
            "1.000000\nError row 1, column 14: extraneous parentheses\n"
        );
        assert!(session.namespace().lookup("y").is_none());

        let (result, output) = run(&mut session, "1\n  (+ 1\n  #q)");
        assert_eq!(result, Err(Error::InvalidChar));
        assert_eq!(output, "1.000000\nError row 3, column 4: invalid character\n");
    }

    #[test]
    fn test_session_eval_error_stops_unit() {
        let mut session = Session::new();
        let (result, output) = run(&mut session, "(define a 1) (car '()) (define b 2)");
        assert_eq!(result, Err(Error::ExpectedPair));
        assert_eq!(output, "Error while executing: expected a pair\n");
        assert!(session.namespace().lookup("a").is_some());
        assert!(session.namespace().lookup("b").is_none());
    }

    #[test]
    fn test_session_comments_follow_config() {
        let mut session = Session::new();
        let (result, _) = run(&mut session, "; note\n1");
        assert!(result.is_err());

        let mut session = Session::with_config(EvalConfig {
            reader: crate::reader::ReaderConfig {
                handle_comments: true,
            },
            ..EvalConfig::default()
        });
        let (result, output) = run(&mut session, "; note\n1 ; trailing\n");
        assert_eq!(result, Ok(()));
        assert_eq!(output, "1.000000\n");
    }

    #[test]
    fn test_session_load_missing_file() {
        let mut session = Session::new();
        let mut out = Vec::new();
        let result = session.load(Path::new("/nonexistent/definitely/missing.scm"), &mut out);
        assert_eq!(result, Err(Error::CantOpenFile));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Error while executing: could not open file\n"
        );
    }
}
