//! Compiler from forms to TreeIL.
//!
//! Symbols are resolved against the compile-time [`SymbolTable`]; the emitted
//! tree rebuilds an equivalent scope chain at runtime, so every name the
//! compiler accepts is found again when the tree executes.

use std::io::BufRead;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use termcolor::WriteColor;

use crate::env::{Definition, ExportKind, SymbolTable};
use crate::error::CompileError;
use crate::form::{Form, Symbol};
use crate::list::List;
use crate::reader::{Reader, MAX_DEPTH};
use crate::tree_il::*;

/// Expander for a special form. Receives the operands, without the head.
pub type Special = fn(&List<Form>, &Rc<SymbolTable>) -> Result<Rc<TreeNode>, CompileError>;

static SPECIAL_FORMS: Lazy<IndexMap<&'static str, Special>> = Lazy::new(|| {
    let mut table: IndexMap<&'static str, Special> = IndexMap::new();

    macro_rules! define_special {
        ($name: literal, $rname: ident, $args: ident, $env: ident => $b: block) => {
            fn $rname($args: &List<Form>, $env: &Rc<SymbolTable>) -> Result<Rc<TreeNode>, CompileError> {
                $b
            }

            table.insert($name, $rname);
        };
    }

    define_special!("def", define, args, env => {
        if args.len() != 2 {
            return Err(CompileError::malformed(
                "def",
                format!("expected a name and an expression, got {} operands", args.len()),
            ));
        }
        let (name, value) = match (args.first(), args.nth(1)) {
            (Some(Form::Symbol(sym)), Some(value)) if sym.namespace().is_none() => (sym.name_rc().clone(), value),
            (other, _) => {
                let found = other.map(Form::type_name).unwrap_or("nothing");
                return Err(CompileError::malformed("def", format!("name must be an unqualified symbol, got {}", found)));
            }
        };

        let root = env.root();
        let existed = root.contains(&name);
        if !existed {
            root.define(name.clone(), Definition::Declared);
        }

        let value = match compile_node(value, env) {
            Ok(value) => value,
            Err(err) => {
                if !existed {
                    root.remove(&name);
                }
                return Err(err);
            }
        };
        log::debug!(target: "compiler", "def {}", name);
        root.define(name.clone(), Definition::Bound(value.clone()));

        Ok(make_define(name, value))
    });

    define_special!("fn*", lambda, args, env => {
        let params = match args.first() {
            Some(Form::Vector(params)) => params,
            Some(other) => {
                return Err(CompileError::malformed("fn*", format!("parameters must be a vector, got {}", other)))
            }
            None => return Err(CompileError::malformed("fn*", "missing parameter vector")),
        };

        let mut bindings = IndexMap::new();
        for (index, param) in params.iter().enumerate() {
            match param {
                Form::Symbol(sym) if sym.namespace().is_none() => {
                    bindings.insert(sym.name_rc().clone(), Definition::Bound(make_arg_ref(index)));
                }
                other => {
                    return Err(CompileError::malformed(
                        "fn*",
                        format!("parameter must be an unqualified symbol, got {}", other),
                    ))
                }
            }
        }

        let scope = SymbolTable::child(env, bindings);
        let mut body = Vec::new();
        for form in args.rest().iter() {
            body.push(compile_node(form, &scope)?);
        }
        let body = if body.is_empty() { make_nil() } else { make_seq(body) };

        let bindings = scope
            .bindings()
            .into_iter()
            .filter_map(|(name, def)| match def {
                Definition::Bound(node) => Some((name, node)),
                Definition::Declared => None,
            })
            .collect();

        Ok(make_closure(bindings, body))
    });

    define_special!("if", test, args, env => {
        let len = args.len();
        if len != 2 && len != 3 {
            return Err(CompileError::malformed(
                "if",
                format!("expected a test, a consequent and an optional alternative, got {} operands", len),
            ));
        }

        let mut operands = args.iter();
        let mut next = || match operands.next() {
            Some(form) => compile_node(form, env),
            None => Ok(make_nil()),
        };
        let test = next()?;
        let consequent = next()?;
        let alternative = next()?;

        Ok(make_test(test, consequent, alternative))
    });

    define_special!("quote", quote, args, _env => {
        match args.len() {
            0 => Ok(make_nil()),
            1 => Ok(args.first().map(lift).unwrap_or_else(make_nil)),
            n => Err(CompileError::malformed("quote", format!("expected one operand, got {}", n))),
        }
    });

    define_special!("import", import, args, env => {
        let path = match args.first() {
            None => return Ok(make_nil()),
            Some(Form::String(path)) => path.clone(),
            Some(other) => {
                return Err(CompileError::malformed("import", format!("path must be a string, got {}", other)))
            }
        };
        let alias = match args.nth(1) {
            None => None,
            Some(Form::Symbol(sym)) if sym.namespace().is_none() => Some(sym.name_rc().clone()),
            Some(other) => {
                return Err(CompileError::malformed("import", format!("alias must be an unqualified symbol, got {}", other)))
            }
        };
        if args.len() > 2 {
            return Err(CompileError::malformed(
                "import",
                format!("expected a path and an optional alias, got {} operands", args.len()),
            ));
        }

        let unit = env.resolve_import(&path)?;
        let alias = alias.unwrap_or_else(|| unit.name.clone());
        log::debug!(target: "compiler", "import {:?} as {} ({} exports)", path, alias, unit.exports.len());
        env.add_import(alias, unit);

        Ok(make_nil())
    });

    table
});

/// Returns true when `name` is handled by the compiler itself.
pub fn is_special_form(name: &str) -> bool {
    SPECIAL_FORMS.contains_key(name)
}

fn literal(form: &Form) -> Option<Literal> {
    match form {
        Form::Integer(n) => Some(Literal::Int(*n)),
        Form::Boolean(b) => Some(Literal::Bool(*b)),
        Form::Nil => Some(Literal::Nil),
        Form::String(s) => Some(Literal::Str(s.clone())),
        _ => None,
    }
}

/// Turns quoted data into constructors for the same data.
fn lift(form: &Form) -> Rc<TreeNode> {
    match form {
        Form::Symbol(sym) => make_symbol(sym.namespace().map(Arc::from), sym.name_rc().clone()),
        Form::List(items) => make_list(items.iter().map(lift).collect()),
        Form::Vector(items) => make_vector(items.iter().map(lift).collect()),
        other => make_constant(literal(other).unwrap_or(Literal::Nil)),
    }
}

fn compile_symbol(sym: &Symbol, env: &Rc<SymbolTable>) -> Result<Rc<TreeNode>, CompileError> {
    // A namespace that names no import is ignored.
    if let Some(alias) = sym.namespace().filter(|alias| env.has_alias(alias)) {
        return match env.lookup_import(alias, sym.name()) {
            Some((unit, kind)) => Ok(make_import_ref(
                unit.path.clone(),
                sym.name_rc().clone(),
                kind == ExportKind::Callable,
            )),
            None => Err(CompileError::UndefinedSymbol(sym.clone())),
        };
    }

    if env.is_bound(sym.name()) {
        Ok(make_scope_ref(sym.name_rc().clone()))
    } else {
        Err(CompileError::UndefinedSymbol(sym.clone()))
    }
}

fn compile_node(form: &Form, env: &Rc<SymbolTable>) -> Result<Rc<TreeNode>, CompileError> {
    match form {
        Form::Symbol(sym) => compile_symbol(sym, env),

        Form::List(list) => {
            let (head, args) = match list.split_first() {
                Some(split) => split,
                None => return Ok(make_list(vec![])),
            };

            if let Form::Symbol(sym) = head {
                if sym.namespace().is_none() {
                    if let Some(special) = SPECIAL_FORMS.get(sym.name()) {
                        log::trace!(target: "compiler", "special form {}", sym);
                        return special(args, env);
                    }
                }
            }

            let callee = compile_node(head, env)?;
            let mut operands = Vec::with_capacity(args.len());
            for arg in args.iter() {
                operands.push(compile_node(arg, env)?);
            }
            Ok(make_call(callee, operands))
        }

        Form::Vector(items) => {
            let mut nodes = Vec::with_capacity(items.len());
            for item in items.iter() {
                nodes.push(compile_node(item, env)?);
            }
            Ok(make_vector(nodes))
        }

        other => Ok(make_constant(literal(other).unwrap_or(Literal::Nil))),
    }
}

/// Compiles one form, returning its tree and the table to compile the next
/// form with. Forms nested deeper than [`MAX_DEPTH`] are rejected.
pub fn compile(form: &Form, env: Rc<SymbolTable>) -> Result<(Rc<TreeNode>, Rc<SymbolTable>), CompileError> {
    let depth = form.depth();
    if depth > MAX_DEPTH {
        return Err(CompileError::TooDeep(depth));
    }
    let node = compile_node(form, &env)?;
    Ok((node, env))
}

/// A compiled program.
#[derive(Debug)]
pub struct Program {
    /// One `Define` per binding the root table held before compilation.
    pub prelude: Vec<Rc<TreeNode>>,
    pub body: Vec<Rc<TreeNode>>,
    pub env: Rc<SymbolTable>,
}

impl Program {
    pub fn statements(&self) -> impl Iterator<Item = &Rc<TreeNode>> {
        self.prelude.iter().chain(self.body.iter())
    }

    pub fn pretty_print(&self, width: usize, mut out: impl WriteColor) -> std::io::Result<()> {
        for node in &self.body {
            node.pretty_print(width, &mut out)?;
            writeln!(out)?;
        }
        Ok(())
    }
}

fn prelude(env: &Rc<SymbolTable>) -> Vec<Rc<TreeNode>> {
    env.root()
        .bindings()
        .into_iter()
        .filter_map(|(name, def)| match def {
            Definition::Bound(node) => Some(make_define(name, node)),
            Definition::Declared => None,
        })
        .collect()
}

/// Compiles every form of `reader`. The first read or compile error aborts
/// the compilation.
pub fn compile_program<R: BufRead>(
    reader: &mut Reader<R>,
    env: Rc<SymbolTable>,
) -> Result<Program, CompileError> {
    let prelude = prelude(&env);
    let mut env = env;
    let mut body = Vec::new();

    while let Some(form) = reader.read()? {
        let (node, next) = compile(&form, env)?;
        env = next;
        if !node.is_nil_constant() {
            body.push(node);
        }
    }

    log::debug!(target: "compiler", "compiled {} statements ({} in prelude)", body.len(), prelude.len());

    Ok(Program { prelude, body, env })
}

pub fn compile_str(source: &str, env: Rc<SymbolTable>) -> Result<Program, CompileError> {
    compile_program(&mut Reader::from_string(source), env)
}
