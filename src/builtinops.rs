//! Built-in operations registry.
//!
//! Every special form and primitive is described once, in [`BUILTIN_OPS`],
//! together with the number of operands it accepts. The evaluator consults
//! this table before looking a head symbol up in the namespace, so built-ins
//! cannot be shadowed by user definitions.
//!
//! ## Primitives vs Special Forms
//!
//! - **Primitives**: receive their operands already evaluated (e.g. `+`, `car`, `eq?`)
//! - **Special Forms**: receive raw operands and the caller's namespace, and decide
//!   what to evaluate themselves (e.g. `if`, `define`, `and`)
//!
//! ## Adding New Operations
//!
//! 1. Write the function: `fn(Vec<Value>) -> Result<Value, Error>` for a primitive,
//!    or a [`SpecialFormFn`] in `evaluator.rs` for a special form
//! 2. Add a [`BuiltinOp`] entry with its identifier and [`Arity`]
//! 3. Add tests covering the happy path and each error code it can raise

use crate::Error;
use crate::ast::Value;
use crate::evaluator::{
    Evaluation, Evaluator, Namespace, eval_and, eval_begin, eval_define, eval_display, eval_eval,
    eval_if, eval_lambda, eval_load, eval_or, eval_quote, eval_set,
};
use crate::list::List;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Signature shared by every special form
pub type SpecialFormFn = fn(&mut Evaluator<'_>, &[Value], &mut Namespace<'_>, usize) -> Evaluation;

/// Signature shared by every primitive
pub type PrimitiveFn = fn(Vec<Value>) -> Result<Value, Error>;

/// How many operands an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Inclusive on both ends
    Range(usize, usize),
    Any,
}

impl Arity {
    pub fn validate(self, operand_count: usize) -> Result<(), Error> {
        let accepted = match self {
            Arity::Exact(n) => operand_count == n,
            Arity::AtLeast(n) => operand_count >= n,
            Arity::Range(min, max) => (min..=max).contains(&operand_count),
            Arity::Any => true,
        };
        if accepted {
            Ok(())
        } else {
            Err(Error::IncorrectArgCount)
        }
    }
}

/// Represents the implementation of a built-in operation
#[derive(Clone, Copy)]
pub enum OpKind {
    /// Takes evaluated operands and always produces a value
    Primitive(PrimitiveFn),
    /// Takes unevaluated operands, the caller's namespace and the current depth
    SpecialForm(SpecialFormFn),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Primitive(_) => write!(f, "Primitive(<fn>)"),
            OpKind::SpecialForm(_) => write!(f, "SpecialForm(<fn>)"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug, Clone, Copy)]
pub struct BuiltinOp {
    /// The head symbol that selects this operation
    pub id: &'static str,
    pub op_kind: OpKind,
    /// Accepted operand count, not counting the head
    pub arity: Arity,
}

impl BuiltinOp {
    pub fn is_special_form(&self) -> bool {
        matches!(self.op_kind, OpKind::SpecialForm(_))
    }

    pub(crate) fn validate_arity(&self, operand_count: usize) -> Result<(), Error> {
        self.arity.validate(operand_count)
    }
}

//
// Primitive implementations
//

fn numbers(args: &[Value]) -> Result<Vec<f64>, Error> {
    args.iter().map(f64::try_from).collect()
}

fn builtin_add(args: Vec<Value>) -> Result<Value, Error> {
    Ok(Value::Number(numbers(&args)?.into_iter().sum()))
}

fn builtin_mul(args: Vec<Value>) -> Result<Value, Error> {
    Ok(Value::Number(numbers(&args)?.into_iter().product()))
}

fn builtin_sub(args: Vec<Value>) -> Result<Value, Error> {
    match numbers(&args)?.as_slice() {
        [] => Err(Error::IncorrectArgCount),
        [only] => Ok(Value::Number(-only)),
        [first, rest @ ..] => Ok(Value::Number(rest.iter().fold(*first, |acc, n| acc - n))),
    }
}

// Chained comparison: every adjacent pair must satisfy the operator
macro_rules! numeric_comparison {
    ($name:ident, $op:tt) => {
        fn $name(args: Vec<Value>) -> Result<Value, Error> {
            let nums = numbers(&args)?;
            Ok(Value::Boolean(nums.windows(2).all(|pair| pair[0] $op pair[1])))
        }
    };
}

numeric_comparison!(builtin_lt, <);
numeric_comparison!(builtin_gt, >);
numeric_comparison!(builtin_le, <=);
numeric_comparison!(builtin_ge, >=);
numeric_comparison!(builtin_num_eq, ==);

fn builtin_not(args: Vec<Value>) -> Result<Value, Error> {
    match args.as_slice() {
        [value] => Ok(Value::Boolean(!value.is_truthy())),
        _ => Err(Error::IncorrectArgCount),
    }
}

fn builtin_car(args: Vec<Value>) -> Result<Value, Error> {
    match args.as_slice() {
        [Value::List(list)] => Ok(list.lookup(0).ok_or(Error::ExpectedPair)?.try_copy()?),
        [_] => Err(Error::ExpectedList),
        _ => Err(Error::IncorrectArgCount),
    }
}

fn builtin_cdr(args: Vec<Value>) -> Result<Value, Error> {
    match args.as_slice() {
        [Value::List(list)] => match list.as_slice() {
            [] => Err(Error::ExpectedPair),
            [_, rest @ ..] => {
                let mut tail = List::new();
                for value in rest {
                    tail.append(value.try_copy()?)?;
                }
                Ok(Value::List(tail))
            }
        },
        [_] => Err(Error::ExpectedList),
        _ => Err(Error::IncorrectArgCount),
    }
}

/// The head is moved in as is; tail elements are handles to the originals
fn builtin_cons(args: Vec<Value>) -> Result<Value, Error> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(head), Some(Value::List(tail))) => {
            let mut list = List::new();
            list.append(head)?;
            for value in &tail {
                list.append(value.clone())?;
            }
            Ok(Value::List(list))
        }
        (Some(_), Some(_)) => Err(Error::ExpectedList),
        _ => Err(Error::IncorrectArgCount),
    }
}

fn builtin_list(args: Vec<Value>) -> Result<Value, Error> {
    Ok(Value::List(List::try_from_iter(args)?))
}

fn builtin_eq(args: Vec<Value>) -> Result<Value, Error> {
    match args.as_slice() {
        [a, b] => Ok(Value::Boolean(a.is_eq(b))),
        _ => Err(Error::IncorrectArgCount),
    }
}

fn builtin_is_pair(args: Vec<Value>) -> Result<Value, Error> {
    match args.as_slice() {
        [Value::List(list)] => Ok(Value::Boolean(!list.is_empty())),
        [_] => Err(Error::ExpectedList),
        _ => Err(Error::IncorrectArgCount),
    }
}

fn builtin_is_null(args: Vec<Value>) -> Result<Value, Error> {
    match args.as_slice() {
        [value] => Ok(Value::Boolean(value.is_nil())),
        _ => Err(Error::IncorrectArgCount),
    }
}

macro_rules! type_predicate {
    ($name:ident, $pattern:pat) => {
        fn $name(args: Vec<Value>) -> Result<Value, Error> {
            match args.as_slice() {
                [value] => Ok(Value::Boolean(matches!(value, $pattern))),
                _ => Err(Error::IncorrectArgCount),
            }
        }
    };
}

type_predicate!(builtin_is_boolean, Value::Boolean(_));
type_predicate!(builtin_is_symbol, Value::Symbol(_));
type_predicate!(builtin_is_char, Value::Char(_));
type_predicate!(builtin_is_procedure, Value::Procedure(_));
type_predicate!(builtin_is_list, Value::List(_));
type_predicate!(builtin_is_number, Value::Number(_));
type_predicate!(builtin_is_string, Value::String(_));

/// Global registry of all built-in operations
static BUILTIN_OPS: &[BuiltinOp] = &[
    // Definitions and assignment
    BuiltinOp {
        id: "define",
        op_kind: OpKind::SpecialForm(eval_define),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "set!",
        op_kind: OpKind::SpecialForm(eval_set),
        arity: Arity::Exact(2),
    },
    // Arithmetic
    BuiltinOp {
        id: "+",
        op_kind: OpKind::Primitive(builtin_add),
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "-",
        op_kind: OpKind::Primitive(builtin_sub),
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        id: "*",
        op_kind: OpKind::Primitive(builtin_mul),
        arity: Arity::Any,
    },
    // Comparison
    BuiltinOp {
        id: "<",
        op_kind: OpKind::Primitive(builtin_lt),
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        id: ">",
        op_kind: OpKind::Primitive(builtin_gt),
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        id: "<=",
        op_kind: OpKind::Primitive(builtin_le),
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        id: ">=",
        op_kind: OpKind::Primitive(builtin_ge),
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        id: "=",
        op_kind: OpKind::Primitive(builtin_num_eq),
        arity: Arity::AtLeast(1),
    },
    // Logic
    BuiltinOp {
        id: "and",
        op_kind: OpKind::SpecialForm(eval_and),
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "or",
        op_kind: OpKind::SpecialForm(eval_or),
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "not",
        op_kind: OpKind::Primitive(builtin_not),
        arity: Arity::Exact(1),
    },
    // Control flow and language constructs
    BuiltinOp {
        id: "if",
        op_kind: OpKind::SpecialForm(eval_if),
        arity: Arity::Range(2, 3),
    },
    BuiltinOp {
        id: "lambda",
        op_kind: OpKind::SpecialForm(eval_lambda),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "quote",
        op_kind: OpKind::SpecialForm(eval_quote),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "begin",
        op_kind: OpKind::SpecialForm(eval_begin),
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "eval",
        op_kind: OpKind::SpecialForm(eval_eval),
        arity: Arity::Exact(1),
    },
    // Lists
    BuiltinOp {
        id: "car",
        op_kind: OpKind::Primitive(builtin_car),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "cdr",
        op_kind: OpKind::Primitive(builtin_cdr),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "cons",
        op_kind: OpKind::Primitive(builtin_cons),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "list",
        op_kind: OpKind::Primitive(builtin_list),
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "eq?",
        op_kind: OpKind::Primitive(builtin_eq),
        arity: Arity::Exact(2),
    },
    // Input and output
    BuiltinOp {
        id: "display",
        op_kind: OpKind::SpecialForm(eval_display),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "load",
        op_kind: OpKind::SpecialForm(eval_load),
        arity: Arity::Exact(1),
    },
    // Type predicates
    BuiltinOp {
        id: "boolean?",
        op_kind: OpKind::Primitive(builtin_is_boolean),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "symbol?",
        op_kind: OpKind::Primitive(builtin_is_symbol),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "char?",
        op_kind: OpKind::Primitive(builtin_is_char),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "procedure?",
        op_kind: OpKind::Primitive(builtin_is_procedure),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "list?",
        op_kind: OpKind::Primitive(builtin_is_list),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "number?",
        op_kind: OpKind::Primitive(builtin_is_number),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "string?",
        op_kind: OpKind::Primitive(builtin_is_string),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "pair?",
        op_kind: OpKind::Primitive(builtin_is_pair),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "null?",
        op_kind: OpKind::Primitive(builtin_is_null),
        arity: Arity::Exact(1),
    },
];

/// Lazy map from head symbol to operation (private - use find_builtin_op)
static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| BUILTIN_OPS.iter().map(|op| (op.id, op)).collect());

/// All built-in operations, in registry order
pub fn builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS
}

/// Find a built-in operation by its head symbol
pub fn find_builtin_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(id).copied()
}
