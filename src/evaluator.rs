use crate::Error;
use crate::MAX_EVAL_DEPTH;
use crate::ast::{Value, procedure_parts};
use crate::builtinops::{OpKind, find_builtin_op};
use crate::list::List;
use crate::reader::{Reader, ReaderConfig};
use crate::source;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, trace, warn};

mod namespace;

pub use namespace::{Binding, Namespace};

/// Grow the stack once less than this much of it remains
const STACK_RED_ZONE: usize = 128 * 1024;

/// Size of each additional stack segment
const STACK_GROWTH: usize = 2 * 1024 * 1024;

/// Outcome of evaluating one expression.
///
/// `Ok(None)` means the expression produced no value, as `define`,
/// `display` or a one-armed `if` with a false condition do.
pub type Evaluation = Result<Option<Value>, Error>;

/// Evaluator options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Procedure call depth at which evaluation fails with [`Error::RecursionLimit`]
    pub max_depth: usize,
    /// Options for reading files passed to `load`
    pub reader: ReaderConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_depth: MAX_EVAL_DEPTH,
            reader: ReaderConfig::default(),
        }
    }
}

/// Tree-walking evaluator. `display` writes to the sink it was built with.
pub struct Evaluator<'o> {
    out: &'o mut dyn Write,
    config: EvalConfig,
}

/// Evaluate an expression, sending `display` output to stdout
pub fn eval(expr: &Value, ns: &mut Namespace<'_>) -> Evaluation {
    let mut stdout = io::stdout().lock();
    Evaluator::new(&mut stdout).eval(expr, ns)
}

impl<'o> Evaluator<'o> {
    pub fn new(out: &'o mut dyn Write) -> Self {
        Self::with_config(out, EvalConfig::default())
    }

    pub fn with_config(out: &'o mut dyn Write, config: EvalConfig) -> Self {
        Evaluator { out, config }
    }

    pub fn eval(&mut self, expr: &Value, ns: &mut Namespace<'_>) -> Evaluation {
        self.eval_at(expr, ns, 0)
    }

    /// Evaluate `expr` inside `depth` active procedure calls.
    ///
    /// Sub-forms share their parent's depth; only [`Evaluator::apply`] goes one
    /// deeper. The host stack is grown on demand, so the ceiling is a policy
    /// limit on runaway recursion.
    pub(crate) fn eval_at(
        &mut self,
        expr: &Value,
        ns: &mut Namespace<'_>,
        depth: usize,
    ) -> Evaluation {
        if depth >= self.config.max_depth {
            return Err(Error::RecursionLimit);
        }
        ensure_sufficient_stack(|| match expr {
            Value::Number(_) | Value::Char(_) | Value::String(_) | Value::Boolean(_) => {
                Ok(Some(expr.clone()))
            }

            Value::Symbol(name) => lookup(ns, name).cloned().map(Some),

            // Only reachable through application
            Value::Procedure(_) => Ok(None),

            Value::List(items) => match items.as_slice() {
                [] => Ok(Some(expr.clone())),
                [head, operands @ ..] => self.eval_form(head, operands, ns, depth),
            },
        })
    }

    /// Evaluate an operand that must produce a value
    pub(crate) fn eval_value(
        &mut self,
        expr: &Value,
        ns: &mut Namespace<'_>,
        depth: usize,
    ) -> Result<Value, Error> {
        self.eval_at(expr, ns, depth)?.ok_or(Error::Undefined)
    }

    fn eval_operands(
        &mut self,
        operands: &[Value],
        ns: &mut Namespace<'_>,
        depth: usize,
    ) -> Result<Vec<Value>, Error> {
        operands
            .iter()
            .map(|operand| self.eval_value(operand, ns, depth))
            .collect()
    }

    fn eval_form(
        &mut self,
        head: &Value,
        operands: &[Value],
        ns: &mut Namespace<'_>,
        depth: usize,
    ) -> Evaluation {
        match head {
            Value::Symbol(name) => {
                if let Some(op) = find_builtin_op(name) {
                    op.validate_arity(operands.len())?;
                    return match op.op_kind {
                        OpKind::Primitive(func) => {
                            let args = self.eval_operands(operands, ns, depth)?;
                            func(args).map(Some)
                        }
                        OpKind::SpecialForm(form) => form(self, operands, ns, depth),
                    };
                }
                signature(lookup(ns, name)?, operands.len())?;
                let args = self.eval_operands(operands, ns, depth)?;
                // Operands may have rebound the name, so look it up again
                let procedure = lookup(ns, name)?;
                self.apply(procedure, args, ns, depth)
            }
            Value::List(_) => {
                let procedure = self.eval_value(head, ns, depth)?;
                signature(&procedure, operands.len())?;
                let args = self.eval_operands(operands, ns, depth)?;
                self.apply(&procedure, args, ns, depth)
            }
            _ => Err(Error::FirstNotProc),
        }
    }

    /// Call a user procedure on already evaluated arguments.
    ///
    /// The body runs in a fresh frame whose parent is the caller's namespace.
    fn apply(
        &mut self,
        procedure: &Value,
        args: Vec<Value>,
        ns: &Namespace<'_>,
        depth: usize,
    ) -> Evaluation {
        let (params, body) = signature(procedure, args.len())?;
        trace!(%params, args = args.len(), depth, "apply");

        let mut frame = Namespace::with_parent(ns);
        match params {
            Value::List(names) => {
                for (name, arg) in names.iter().zip(args) {
                    let Value::Symbol(name) = name else {
                        return Err(Error::ExpectedSymbol);
                    };
                    frame.define(name, Some(arg));
                }
            }
            Value::Symbol(name) => {
                frame.define(name, Some(Value::List(List::try_from_iter(args)?)));
            }
            _ => return Err(Error::ExpectedList),
        }

        self.eval_at(body, &mut frame, depth + 1)
    }
}

/// Grow the host stack before it runs out
#[cfg(not(target_arch = "wasm32"))]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, f)
}

#[cfg(target_arch = "wasm32")]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Split a procedure into parameters and body, checking a fixed arity
fn signature(procedure: &Value, arg_count: usize) -> Result<(&Value, &Value), Error> {
    let Value::Procedure(record) = procedure else {
        return Err(Error::ExpectedProc);
    };
    let (params, body) = procedure_parts(record).ok_or(Error::ExpectedProc)?;
    if let Value::List(names) = params
        && names.size() != arg_count
    {
        return Err(Error::IncorrectArgCount);
    }
    Ok((params, body))
}

fn lookup<'n>(ns: &'n Namespace<'_>, name: &str) -> Result<&'n Value, Error> {
    let binding = ns.lookup(name).ok_or(Error::SymbolNotBound)?;
    binding.value().ok_or(Error::Undefined)
}

/// Evaluate define special form
pub(crate) fn eval_define(
    ev: &mut Evaluator<'_>,
    args: &[Value],
    ns: &mut Namespace<'_>,
    depth: usize,
) -> Evaluation {
    match args {
        [Value::Symbol(name), expr] => {
            // Placeholder so the expression can refer to the name being defined.
            // An existing binding stays visible until the new value is ready.
            let placeholder = !ns.binds(name);
            if placeholder {
                ns.define(name, None);
            }
            let value = match ev.eval_value(expr, ns, depth) {
                Ok(value) => value,
                Err(err) => {
                    if placeholder {
                        ns.remove(name);
                    }
                    return Err(err);
                }
            };
            debug!(name = name.as_str(), "define");
            ns.define(name, Some(value));
            Ok(None)
        }
        [_, _] => Err(Error::ExpectedSymbol),
        _ => Err(Error::IncorrectArgCount),
    }
}

/// Evaluate set! special form. Binds in the current frame even when the name
/// is not yet visible.
pub(crate) fn eval_set(
    ev: &mut Evaluator<'_>,
    args: &[Value],
    ns: &mut Namespace<'_>,
    depth: usize,
) -> Evaluation {
    match args {
        [Value::Symbol(name), expr] => {
            let value = ev.eval_value(expr, ns, depth)?;
            debug!(name = name.as_str(), "set!");
            ns.define(name, Some(value));
            Ok(None)
        }
        [_, _] => Err(Error::ExpectedSymbol),
        _ => Err(Error::IncorrectArgCount),
    }
}

/// Evaluate if special form
pub(crate) fn eval_if(
    ev: &mut Evaluator<'_>,
    args: &[Value],
    ns: &mut Namespace<'_>,
    depth: usize,
) -> Evaluation {
    let (condition_expr, then_expr, else_expr) = match args {
        [condition, then] => (condition, then, None),
        [condition, then, otherwise] => (condition, then, Some(otherwise)),
        _ => return Err(Error::IncorrectArgCount),
    };
    if ev.eval_value(condition_expr, ns, depth)?.is_truthy() {
        ev.eval_at(then_expr, ns, depth)
    } else if let Some(else_expr) = else_expr {
        ev.eval_at(else_expr, ns, depth)
    } else {
        Ok(None)
    }
}

/// Evaluate lambda special form
pub(crate) fn eval_lambda(
    _ev: &mut Evaluator<'_>,
    args: &[Value],
    _ns: &mut Namespace<'_>,
    _depth: usize,
) -> Evaluation {
    match args {
        [params @ Value::Symbol(_), body] => {
            Ok(Some(Value::procedure(params.clone(), body.clone())))
        }
        [params @ Value::List(names), body] => {
            if names.iter().any(|name| !matches!(name, Value::Symbol(_))) {
                return Err(Error::ExpectedSymbol);
            }
            Ok(Some(Value::procedure(params.clone(), body.clone())))
        }
        [_, _] => Err(Error::ExpectedList),
        _ => Err(Error::IncorrectArgCount),
    }
}

/// Evaluate quote special form. The result shares identity with the program text.
pub(crate) fn eval_quote(
    _ev: &mut Evaluator<'_>,
    args: &[Value],
    _ns: &mut Namespace<'_>,
    _depth: usize,
) -> Evaluation {
    match args {
        [expr] => Ok(Some(expr.clone())),
        _ => Err(Error::IncorrectArgCount),
    }
}

pub(crate) fn eval_begin(
    ev: &mut Evaluator<'_>,
    args: &[Value],
    ns: &mut Namespace<'_>,
    depth: usize,
) -> Evaluation {
    let mut result = None;
    for expr in args {
        result = ev.eval_at(expr, ns, depth)?;
    }
    Ok(result)
}

/// Evaluate the operand, then evaluate what it produced
pub(crate) fn eval_eval(
    ev: &mut Evaluator<'_>,
    args: &[Value],
    ns: &mut Namespace<'_>,
    depth: usize,
) -> Evaluation {
    match args {
        [expr] => {
            let program = ev.eval_value(expr, ns, depth)?;
            ev.eval_at(&program, ns, depth)
        }
        _ => Err(Error::IncorrectArgCount),
    }
}

pub(crate) fn eval_display(
    ev: &mut Evaluator<'_>,
    args: &[Value],
    ns: &mut Namespace<'_>,
    depth: usize,
) -> Evaluation {
    match args {
        [expr] => {
            let value = ev.eval_value(expr, ns, depth)?;
            if let Err(err) = write!(ev.out, "{value}").and_then(|()| ev.out.flush()) {
                warn!(%err, "display output failed");
            }
            Ok(None)
        }
        _ => Err(Error::IncorrectArgCount),
    }
}

/// Read a file and evaluate each of its forms in the caller's namespace
pub(crate) fn eval_load(
    ev: &mut Evaluator<'_>,
    args: &[Value],
    ns: &mut Namespace<'_>,
    depth: usize,
) -> Evaluation {
    let [expr] = args else {
        return Err(Error::IncorrectArgCount);
    };
    let path = ev
        .eval_value(expr, ns, depth)?
        .text()
        .ok_or(Error::ExpectedString)?;
    let contents = source::read_file(Path::new(&path))?;
    let bytes = contents.to_bytes().ok_or(Error::ExpectedString)?;
    debug!(path = path.as_str(), bytes = bytes.len(), "load");

    let mut reader = Reader::with_config(&bytes, ev.config.reader);
    while !reader.is_exhausted() {
        let form = reader.read()?;
        ev.eval_at(&form, ns, depth)?;
    }
    Ok(None)
}

// Generate boolean logic special forms
macro_rules! boolean_logic_op {
    ($name:ident, $short_circuit:literal) => {
        pub(crate) fn $name(
            ev: &mut Evaluator<'_>,
            args: &[Value],
            ns: &mut Namespace<'_>,
            depth: usize,
        ) -> Evaluation {
            for arg in args {
                if ev.eval_value(arg, ns, depth)?.is_truthy() == $short_circuit {
                    return Ok(Some(Value::Boolean($short_circuit)));
                }
            }
            Ok(Some(Value::Boolean(!$short_circuit)))
        }
    };
}

boolean_logic_op!(eval_and, false);
boolean_logic_op!(eval_or, true);
