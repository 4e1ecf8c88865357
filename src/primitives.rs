//! Primitive procedures bound in the initial root scope.

use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::env::{Definition, SymbolTable};
use crate::error::RuntimeError;
use crate::interp::{Interpreter, Value};
use crate::tree_il::make_primref;

pub type PrimitiveFn = fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>;

pub struct Primitive {
    pub name: &'static str,
    /// Number of required arguments.
    pub nreq: usize,
    /// Whether arguments past `nreq` are accepted.
    pub rest: bool,
    pub func: PrimitiveFn,
}

impl Primitive {
    fn check_arity(&self, args: &[Value]) -> Result<(), RuntimeError> {
        let ok = if self.rest {
            args.len() >= self.nreq
        } else {
            args.len() == self.nreq
        };
        if ok {
            return Ok(());
        }
        let expected = match (self.nreq, self.rest) {
            (1, true) => "at least 1",
            (2, false) => "exactly 2",
            _ => "a different number",
        };
        Err(RuntimeError::WrongArgCount {
            procedure: self.name.to_string(),
            expected,
            given: args.len(),
        })
    }
}

static PRIMITIVES: Lazy<IndexMap<&'static str, Primitive>> = Lazy::new(|| {
    let mut table = IndexMap::new();

    macro_rules! define_primitive {
        ($name: literal, $nreq: literal, $rest: literal, $func: ident) => {
            table.insert(
                $name,
                Primitive {
                    name: $name,
                    nreq: $nreq,
                    rest: $rest,
                    func: $func,
                },
            );
        };
    }

    define_primitive!("+", 0, true, add);
    define_primitive!("-", 1, true, sub);
    define_primitive!("*", 0, true, mul);
    define_primitive!("/", 1, true, div);
    define_primitive!("=", 1, true, num_eq);
    define_primitive!("or", 0, true, or);
    define_primitive!("and", 0, true, and);
    define_primitive!("println", 0, true, println);
    define_primitive!("apply", 2, false, apply);

    table
});

pub fn lookup(name: &str) -> Option<&'static Primitive> {
    PRIMITIVES.get(name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    PRIMITIVES.keys().copied()
}

/// Creates a root table with every primitive bound to its `PrimRef`.
pub fn root_table() -> Rc<SymbolTable> {
    let env = SymbolTable::new();
    for name in names() {
        let name: Arc<str> = Arc::from(name);
        env.define(name.clone(), Definition::Bound(make_primref(name)));
    }
    env
}

/// Calls a primitive after checking its arity.
pub fn invoke(prim: &Primitive, interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    prim.check_arity(args)?;
    (prim.func)(interp, args)
}

fn wrong_type(procedure: &str, expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::WrongType {
        procedure: procedure.to_string(),
        expected,
        found: found.type_name().to_string(),
    }
}

fn int(procedure: &str, value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(wrong_type(procedure, "integer", other)),
    }
}

fn fold(
    procedure: &'static str,
    init: i64,
    args: &[Value],
    op: fn(i64, i64) -> Option<i64>,
) -> Result<Value, RuntimeError> {
    let mut acc = init;
    for arg in args {
        acc = op(acc, int(procedure, arg)?).ok_or_else(|| RuntimeError::Overflow(procedure.to_string()))?;
    }
    Ok(Value::Int(acc))
}

fn add(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    fold("+", 0, args, i64::checked_add)
}

fn mul(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    fold("*", 1, args, i64::checked_mul)
}

fn sub(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let first = int("-", &args[0])?;
    fold("-", first, &args[1..], i64::checked_sub)
}

fn div(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut acc = int("/", &args[0])?;
    for arg in &args[1..] {
        let divisor = int("/", arg)?;
        if divisor == 0 {
            return Err(RuntimeError::DivisionByZero);
        }
        acc = acc
            .checked_div(divisor)
            .ok_or_else(|| RuntimeError::Overflow("/".to_string()))?;
    }
    Ok(Value::Int(acc))
}

fn num_eq(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let first = int("=", &args[0])?;
    let mut equal = true;
    for arg in &args[1..] {
        equal &= int("=", arg)? == first;
    }
    Ok(Value::Bool(equal))
}

fn or(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(args.iter().find(|arg| arg.is_truthy()).cloned().unwrap_or(Value::Nil))
}

fn and(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match args.iter().find(|arg| !arg.is_truthy()) {
        Some(falsy) => Ok(falsy.clone()),
        None => Ok(args.last().cloned().unwrap_or(Value::Nil)),
    }
}

fn println(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut line = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        match arg {
            Value::Str(s) => line.push_str(s),
            other => line.push_str(&other.to_string()),
        }
    }
    writeln!(interp.output(), "{}", line).map_err(|err| RuntimeError::Io(err.to_string()))?;
    Ok(Value::Nil)
}

fn apply(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[1] {
        Value::List(list) => {
            let operands: Vec<Value> = list.iter().cloned().collect();
            interp.call(&args[0], &operands)
        }
        other => Err(wrong_type("apply", "list", other)),
    }
}
