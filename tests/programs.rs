#![expect(clippy::unwrap_used)] // test code OK

use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tinyscm::Error;
use tinyscm::ast::{Value, sym, val};
use tinyscm::driver::Session;
use tinyscm::evaluator::{EvalConfig, Evaluator, Namespace};
use tinyscm::reader::{ReaderConfig, parse, parse_all};

/// Temporary source file removed on drop
struct ScratchFile(PathBuf);

impl ScratchFile {
    fn new(name: &str, contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("tinyscm-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        ScratchFile(path)
    }

    /// The path as a string literal the reader accepts
    fn literal(&self) -> String {
        let escaped = self
            .0
            .to_string_lossy()
            .replace('\\', "\\\\")
            .replace('"', "\\\"");
        format!("\"{escaped}\"")
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn run(session: &mut Session, input: &str) -> (Result<(), Error>, String) {
    let mut out = Vec::new();
    let result = session.run(input, &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn eval_all(input: &str) -> Vec<Option<Value>> {
    let mut ns = Namespace::new();
    let mut sink = Vec::new();
    let mut ev = Evaluator::new(&mut sink);
    parse_all(input)
        .unwrap()
        .iter()
        .map(|form| ev.eval(form, &mut ns).unwrap())
        .collect()
}

#[test]
fn test_factorial_program() {
    let results = eval_all(
        "(define fact (lambda (n) (if (< n 2) 1 (* n (fact (- n 1))))))
         (fact 5)
         (fact 0)",
    );
    assert_eq!(results, vec![None, Some(val(120)), Some(val(1))]);
}

#[test]
fn test_list_processing_program() {
    let results = eval_all(
        "(define map1 (lambda (f xs)
           (if (null? xs) '() (cons (f (car xs)) (map1 f (cdr xs))))))
         (define reverse-onto (lambda (xs acc)
           (if (null? xs) acc (reverse-onto (cdr xs) (cons (car xs) acc)))))
         (map1 (lambda (x) (* x x)) '(1 2 3))
         (reverse-onto '(a b c) '())
         (map1 (lambda (x) (list x x)) '(1 2))",
    );
    assert_eq!(
        results,
        vec![
            None,
            None,
            Some(val([1, 4, 9])),
            Some(val(vec![sym("c"), sym("b"), sym("a")])),
            Some(val(vec![val([1, 1]), val([2, 2])])),
        ]
    );
}

#[test]
fn test_variadic_and_higher_order() {
    let results = eval_all(
        "(define sum (lambda xs (if (null? xs) 0 (+ (car xs) (eval (cons 'sum (cdr xs)))))))
         (sum 1 2 3 4)
         (define twice (lambda (f x) (f (f x))))
         (twice (lambda (n) (* n 3)) 2)",
    );
    assert_eq!(results, vec![None, Some(val(10)), None, Some(val(18))]);
}

#[test]
fn test_session_transcript() {
    let mut session = Session::new();
    let (result, output) = run(
        &mut session,
        "(define greeting \"hello\")
         greeting
         (list #t #\\a 'sym 1)
         (lambda (x) (+ x 1))
         (if #f #f)
         (eq? greeting greeting)",
    );
    assert_eq!(result, Ok(()));
    assert_eq!(
        output,
        "\"hello\"\n(#t #\\a sym 1.000000)\n(lambda (x) (+ x 1.000000))\n#t\n"
    );
}

#[test]
fn test_load_from_file() {
    let library = ScratchFile::new(
        "library.scm",
        "(define square (lambda (x) (* x x)))\n(define answer (square 6))\n(display \"loaded\")\n",
    );

    let mut session = Session::new();
    let (result, output) = run(
        &mut session,
        &format!("(load {}) (square answer)", library.literal()),
    );
    assert_eq!(result, Ok(()));
    assert_eq!(output, "\"loaded\"1296.000000\n");
}

#[test]
fn test_session_load_path() {
    let program = ScratchFile::new("program.scm", "(define n 3)\n(+ n 4)\n(car '())\n(+ n 5)\n");

    let mut session = Session::new();
    let mut out = Vec::new();
    let result = session.load(&program.0, &mut out);
    assert_eq!(result, Err(Error::ExpectedPair));
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "7.000000\nError while executing: expected a pair\n"
    );
    assert!(session.namespace().lookup("n").is_some());
}

#[test]
fn test_load_errors() {
    let broken = ScratchFile::new("broken.scm", "(define a 1)\n(define b (+ 1 2)\n");
    let commented = ScratchFile::new("commented.scm", "; header\n(define c 1)\n");

    let mut session = Session::new();
    let (result, _) = run(&mut session, &format!("(load {})", broken.literal()));
    assert_eq!(result, Err(Error::UnclosedParens));
    // Forms before the broken one have run
    assert!(session.namespace().lookup("a").is_some());

    let (result, output) = run(&mut session, "(load \"/nonexistent/definitely/missing.scm\")");
    assert_eq!(result, Err(Error::CantOpenFile));
    assert_eq!(output, "Error while executing: could not open file\n");

    // Comment handling in loaded files follows the session's reader config
    let mut session = Session::with_config(EvalConfig {
        reader: ReaderConfig {
            handle_comments: true,
        },
        ..EvalConfig::default()
    });
    let (result, _) = run(&mut session, &format!("(load {}) c", commented.literal()));
    assert_eq!(result, Ok(()));
}

#[test]
fn test_quoted_data_round_trips_through_eval() {
    let mut ns = Namespace::new();
    let mut sink = Vec::new();
    let mut ev = Evaluator::new(&mut sink);

    let program = parse("'(if (< 1 2) (quote yes) (quote no))").unwrap();
    let quoted = ev.eval(&program, &mut ns).unwrap().unwrap();
    assert_eq!(quoted.to_string(), "(if (< 1.000000 2.000000) (quote yes) (quote no))");
    assert_eq!(ev.eval(&quoted, &mut ns).unwrap(), Some(sym("yes")));
}
