//! Forms: the parsed representation of source code.
//!
//! Lists and vectors of forms are the persistent [`List`] and [`Vector`] types,
//! so quoted code and runtime collections share one representation.

use std::fmt;
use std::sync::Arc;

use pretty::{BoxAllocator, DocAllocator, DocBuilder};
use termcolor::{Color, ColorSpec, WriteColor};

use crate::list::List;
use crate::vector::Vector;

/// A possibly namespace-qualified symbol.
///
/// `namespace` is `None` for plain symbols and `Some("")` for the
/// empty namespace written as `/name`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Symbol {
    namespace: Option<Arc<str>>,
    name: Arc<str>,
}

impl Symbol {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn qualified(namespace: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_rc(&self) -> &Arc<str> {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// True when the symbol names a non-empty namespace. The empty
    /// namespace resolves like a plain symbol.
    pub fn is_qualified(&self) -> bool {
        self.namespace.as_deref().map_or(false, |ns| !ns.is_empty())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Form {
    Integer(i64),
    Boolean(bool),
    Nil,
    String(Arc<str>),
    Symbol(Symbol),
    List(List<Form>),
    Vector(Vector<Form>),
}

impl Form {
    pub fn symbol(name: &str) -> Self {
        Self::Symbol(Symbol::new(name))
    }

    pub fn string(s: &str) -> Self {
        Self::String(Arc::from(s))
    }

    pub fn list(items: Vec<Form>) -> Self {
        Self::List(List::from(items))
    }

    pub fn vector(items: Vec<Form>) -> Self {
        Self::Vector(Vector::from(items))
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Self::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::Nil => "nil",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::List(_) => "list",
            Self::Vector(_) => "vector",
        }
    }

    /// Levels of list and vector nesting. Atoms have depth 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 0)];
        while let Some((form, level)) = pending.pop() {
            match form {
                Self::List(list) => pending.extend(list.iter().map(|item| (item, level + 1))),
                Self::Vector(vector) => pending.extend(vector.iter().map(|item| (item, level + 1))),
                _ => continue,
            }
            deepest = deepest.max(level + 1);
        }
        deepest
    }
}

/// Writes `s` as a string literal the reader reads back unchanged.
pub fn write_string_literal(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Nil => f.write_str("nil"),
            Self::String(s) => write_string_literal(f, s),
            Self::Symbol(sym) => write!(f, "{}", sym),
            Self::List(list) => write!(f, "{}", list),
            Self::Vector(vector) => write!(f, "{}", vector),
        }
    }
}

fn fg(color: Color) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color));
    spec
}

impl Form {
    pub fn pretty<'a, D>(&self, allocator: &'a D) -> DocBuilder<'a, D, ColorSpec>
    where
        D: DocAllocator<'a, ColorSpec>,
        D::Doc: Clone,
    {
        match self {
            Self::Integer(n) => allocator.text(n.to_string()).annotate(fg(Color::Cyan)),
            Self::Boolean(_) | Self::Nil => allocator.text(self.to_string()).annotate(fg(Color::Magenta)),
            Self::String(_) => allocator.text(self.to_string()).annotate(fg(Color::Yellow)),
            Self::Symbol(sym) => allocator.text(sym.to_string()),
            Self::List(list) => allocator
                .intersperse(list.iter().map(|x| x.pretty(allocator)), allocator.line())
                .nest(1)
                .group()
                .parens(),
            Self::Vector(vector) => allocator
                .intersperse(vector.iter().map(|x| x.pretty(allocator)), allocator.line())
                .nest(1)
                .group()
                .brackets(),
        }
    }

    pub fn pretty_print(&self, width: usize, out: impl WriteColor) -> std::io::Result<()> {
        let allocator = BoxAllocator;

        self.pretty(&allocator).1.render_colored(width, out)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_display() {
        assert_eq!(Symbol::new("a").to_string(), "a");
        assert_eq!(Symbol::qualified("abc", "d").to_string(), "abc/d");
        assert_eq!(Symbol::qualified("", "a").to_string(), "/a");
        assert!(Symbol::qualified("abc", "d").is_qualified());
        assert!(!Symbol::qualified("", "a").is_qualified());
        assert!(!Symbol::new("a").is_qualified());
    }

    #[test]
    fn form_display() {
        let form = Form::list(vec![
            Form::symbol("f"),
            Form::Integer(-3),
            Form::vector(vec![Form::Boolean(true), Form::Nil]),
            Form::string("a\"b\n"),
        ]);
        assert_eq!(form.to_string(), r#"(f -3 [true nil] "a\"b\n")"#);
    }

    #[test]
    fn depth_counts_lists_and_vectors() {
        assert_eq!(Form::Integer(1).depth(), 0);
        assert_eq!(Form::list(vec![]).depth(), 1);
        let form = Form::list(vec![
            Form::symbol("f"),
            Form::vector(vec![Form::list(vec![Form::Nil])]),
            Form::list(vec![]),
        ]);
        assert_eq!(form.depth(), 3);
    }

    #[test]
    fn pretty_print_plain() {
        let form = Form::list(vec![Form::symbol("quote"), Form::vector(vec![Form::Integer(1)])]);
        let mut buf = Vec::new();
        form.pretty_print(80, termcolor::NoColor::new(&mut buf)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "(quote [1])");
    }
}
