//! Reference host: a tree-walking executor for compiled programs.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::compiler::Program;
use crate::env::{ExportKind, ImportResolver, ImportedUnit};
use crate::error::{ImportError, RuntimeError};
use crate::form::{write_string_literal, Form, Symbol};
use crate::list::List;
use crate::primitives::{self, Primitive};
use crate::tree_il::{Closure, Literal, TreeNode};
use crate::vector::Vector;

#[derive(Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Nil,
    Str(Arc<str>),
    Symbol(Symbol),
    List(List<Value>),
    Vector(Vector<Value>),
    Function(Rc<Function>),
}

impl Value {
    /// Only `nil` and `false` are false.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Nil => "nil",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::Function(_) => "function",
        }
    }

    pub fn string(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    pub fn symbol(name: &str) -> Self {
        Value::Symbol(Symbol::new(name))
    }
}

impl From<&Form> for Value {
    fn from(form: &Form) -> Self {
        match form {
            Form::Integer(n) => Value::Int(*n),
            Form::Boolean(b) => Value::Bool(*b),
            Form::Nil => Value::Nil,
            Form::String(s) => Value::Str(s.clone()),
            Form::Symbol(sym) => Value::Symbol(sym.clone()),
            Form::List(items) => Value::List(items.iter().map(Value::from).collect()),
            Form::Vector(items) => Value::Vector(items.iter().map(Value::from).collect()),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Int(n) => Value::Int(*n),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Nil => Value::Nil,
            Literal::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nil => f.write_str("nil"),
            Value::Str(s) => write_string_literal(f, s),
            Value::Symbol(sym) => write!(f, "{}", sym),
            Value::List(list) => write!(f, "{}", list),
            Value::Vector(vector) => write!(f, "{}", vector),
            Value::Function(func) => write!(f, "#<fn {}>", func.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A host function reachable through `import`.
///
/// It may return any number of results; the host turns zero results into
/// nil, one into that value and several into a vector.
pub trait ExternalFn {
    fn call(&self, args: &[Value]) -> Result<Vec<Value>, RuntimeError>;
}

impl<F> ExternalFn for F
where
    F: Fn(&[Value]) -> Result<Vec<Value>, RuntimeError>,
{
    fn call(&self, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        self(args)
    }
}

pub enum Function {
    Primitive(&'static Primitive),
    Closure {
        closure: Rc<Closure>,
        scope: Rc<Scope>,
    },
    External {
        name: Arc<str>,
        func: Rc<dyn ExternalFn>,
    },
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Primitive(prim) => prim.name,
            Function::Closure { .. } => "closure",
            Function::External { name, .. } => &**name,
        }
    }
}

/// Runtime scope: one per function invocation, plus the root.
pub struct Scope {
    parent: Option<Rc<Scope>>,
    bindings: RefCell<IndexMap<Arc<str>, Value>>,
}

impl Scope {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            parent: None,
            bindings: RefCell::new(IndexMap::new()),
        })
    }

    pub fn child(parent: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(parent.clone()),
            bindings: RefCell::new(IndexMap::new()),
        })
    }

    pub fn root(self: &Rc<Self>) -> Rc<Self> {
        let mut scope = self;
        while let Some(parent) = &scope.parent {
            scope = parent;
        }
        scope.clone()
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        let mut scope = self;
        loop {
            if let Some(value) = scope.bindings.borrow().get(name) {
                return Ok(value.clone());
            }
            match &scope.parent {
                Some(parent) => scope = parent,
                None => return Err(RuntimeError::UndefinedSymbol(name.to_string())),
            }
        }
    }

    pub fn define(&self, name: Arc<str>, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }
}

pub enum Export {
    Value(Value),
    Callable(Rc<dyn ExternalFn>),
}

/// A named unit of exports registered with the [`Host`].
pub struct Unit {
    path: Arc<str>,
    exports: IndexMap<Arc<str>, Export>,
}

impl Unit {
    pub fn new(path: &str) -> Self {
        Self {
            path: Arc::from(path),
            exports: IndexMap::new(),
        }
    }

    pub fn value(mut self, name: &str, value: Value) -> Self {
        self.exports.insert(Arc::from(name), Export::Value(value));
        self
    }

    pub fn function<F>(self, name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Vec<Value>, RuntimeError> + 'static,
    {
        self.external(name, func)
    }

    pub fn external(mut self, name: &str, func: impl ExternalFn + 'static) -> Self {
        self.exports.insert(Arc::from(name), Export::Callable(Rc::new(func)));
        self
    }
}

/// Import registry shared by the compiler and the interpreter.
#[derive(Default)]
pub struct Host {
    units: IndexMap<Arc<str>, Unit>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, unit: Unit) {
        self.units.insert(unit.path.clone(), unit);
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.register(unit);
        self
    }

    /// Fetches an export, wrapping callables into functions.
    pub fn lookup(&self, path: &str, name: &str) -> Result<Value, RuntimeError> {
        let export = self
            .units
            .get(path)
            .and_then(|unit| unit.exports.get(name))
            .ok_or_else(|| RuntimeError::UnknownImport {
                path: path.to_string(),
                name: name.to_string(),
            })?;
        log::debug!(target: "host", "resolved {}/{}", path, name);
        Ok(match export {
            Export::Value(value) => value.clone(),
            Export::Callable(func) => Value::Function(Rc::new(Function::External {
                name: Arc::from(name),
                func: func.clone(),
            })),
        })
    }
}

impl ImportResolver for Host {
    fn resolve(&self, path: &str) -> Result<ImportedUnit, ImportError> {
        let unit = self.units.get(path).ok_or_else(|| ImportError {
            path: path.to_string(),
            message: "no such unit".to_string(),
        })?;
        let mut imported = ImportedUnit::new(path);
        for (name, export) in &unit.exports {
            let kind = match export {
                Export::Value(_) => ExportKind::Value,
                Export::Callable(_) => ExportKind::Callable,
            };
            imported = imported.with_export(name, kind);
        }
        Ok(imported)
    }
}

pub struct Interpreter {
    host: Rc<Host>,
    out: Box<dyn Write>,
}

impl Interpreter {
    /// Creates an interpreter printing to stdout.
    pub fn new(host: Rc<Host>) -> Self {
        Self::with_output(host, Box::new(std::io::stdout()))
    }

    pub fn with_output(host: Rc<Host>, out: Box<dyn Write>) -> Self {
        Self { host, out }
    }

    pub fn output(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    /// Runs the prelude and then the body in a fresh root scope, returning
    /// the value of the last statement.
    pub fn run(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        let root = Scope::new();
        log::debug!(
            target: "host",
            "running {} statements ({} in prelude)",
            program.body.len(),
            program.prelude.len()
        );
        let mut last = Value::Nil;
        for node in program.statements() {
            last = self.eval(node, &root, &[])?;
        }
        self.out.flush().map_err(|err| RuntimeError::Io(err.to_string()))?;
        Ok(last)
    }

    /// Evaluates `node` in `scope`, with `args` being the arguments of the
    /// innermost invocation.
    pub fn eval(&mut self, node: &TreeNode, scope: &Rc<Scope>, args: &[Value]) -> Result<Value, RuntimeError> {
        match node {
            TreeNode::Const(literal) => Ok(Value::from(literal)),

            TreeNode::PrimRef(name) => primitives::lookup(name)
                .map(|prim| Value::Function(Rc::new(Function::Primitive(prim))))
                .ok_or_else(|| RuntimeError::UndefinedSymbol(name.to_string())),

            TreeNode::ScopeRef(name) => scope.get(name),

            TreeNode::ArgRef(index) => args.get(*index).cloned().ok_or(RuntimeError::MissingArgument {
                index: *index,
                given: args.len(),
            }),

            TreeNode::ImportRef(import) => self.host.lookup(&import.path, &import.name),

            TreeNode::Define(name, value) => {
                let value = self.eval(value, scope, args)?;
                scope.root().define(name.clone(), value);
                Ok(Value::Nil)
            }

            TreeNode::Closure(closure) => Ok(Value::Function(Rc::new(Function::Closure {
                closure: closure.clone(),
                scope: scope.clone(),
            }))),

            TreeNode::Test(test, consequent, alternative) => {
                if self.eval(test, scope, args)?.is_truthy() {
                    self.eval(consequent, scope, args)
                } else {
                    self.eval(alternative, scope, args)
                }
            }

            TreeNode::Call(callee, operands) => {
                let callee = self.eval(callee, scope, args)?;
                let mut values = Vec::with_capacity(operands.len());
                for operand in operands {
                    values.push(self.eval(operand, scope, args)?);
                }
                self.call(&callee, &values)
            }

            TreeNode::MakeList(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, scope, args)?);
                }
                Ok(Value::List(List::from(values)))
            }

            TreeNode::MakeVector(items) => {
                let mut vector = Vector::new();
                for item in items {
                    vector = vector.conj(self.eval(item, scope, args)?);
                }
                Ok(Value::Vector(vector))
            }

            TreeNode::MakeSymbol(namespace, name) => Ok(Value::Symbol(match namespace {
                Some(ns) => Symbol::qualified(ns.clone(), name.clone()),
                None => Symbol::new(name.clone()),
            })),

            TreeNode::Seq(nodes) => {
                let mut last = Value::Nil;
                for node in nodes {
                    last = self.eval(node, scope, args)?;
                }
                Ok(last)
            }
        }
    }

    /// Calls `callee` with already evaluated arguments.
    pub fn call(&mut self, callee: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        let func = match callee {
            Value::Function(func) => func.clone(),
            other => return Err(RuntimeError::NotCallable(other.to_string())),
        };

        match &*func {
            Function::Primitive(prim) => primitives::invoke(prim, self, args),

            Function::Closure { closure, scope } => {
                let frame = Scope::child(scope);
                for (name, binding) in &closure.bindings {
                    let value = self.eval(binding, &frame, args)?;
                    frame.define(name.clone(), value);
                }
                self.eval(&closure.body, &frame, args)
            }

            Function::External { func, .. } => {
                let mut results = func.call(args)?;
                Ok(match results.len() {
                    0 => Value::Nil,
                    1 => results.remove(0),
                    _ => Value::Vector(Vector::from(results)),
                })
            }
        }
    }
}
