//! TreeIL - Tree Intermediate Language
//!
//! The backend tree produced by the compiler. Nodes are immutable and shared
//! through `Rc`; a host code generator (or the reference host in
//! [`crate::interp`]) consumes them. The tree describes execution against a
//! runtime scope chain: every function invocation gets a fresh scope linked to
//! the scope the function was created in, and the program itself runs in the
//! root scope.

use std::rc::Rc;
use std::sync::Arc;

use pretty::{BoxAllocator, DocAllocator, DocBuilder};
use termcolor::{Color, ColorSpec, WriteColor};

use crate::form::write_string_literal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Nil,
    Str(Arc<str>),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Nil => f.write_str("nil"),
            Literal::Str(s) => write_string_literal(f, s),
        }
    }
}

/// Reference to a binding exported by an imported unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub path: Arc<str>,
    pub name: Arc<str>,
    /// Callable exports are adapted to the variadic calling convention by the host.
    pub callable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    /// Bindings installed into the invocation scope before the body runs.
    pub bindings: Vec<(Arc<str>, Rc<TreeNode>)>,
    pub body: Rc<TreeNode>,
}

/// TreeIL node.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Const(Literal),
    /// A primitive procedure supplied by the host.
    PrimRef(Arc<str>),
    /// Lookup by name through the runtime scope chain, innermost first.
    ScopeRef(Arc<str>),
    /// The i-th argument of the current invocation.
    ArgRef(usize),
    ImportRef(ImportRef),
    /// Store into the root scope; evaluates to nil.
    Define(Arc<str>, Rc<TreeNode>),
    Closure(Rc<Closure>),
    /// Evaluates the condition once, then exactly one branch. Only nil and
    /// `false` are false.
    Test(Rc<TreeNode>, Rc<TreeNode>, Rc<TreeNode>),
    /// Call of a variadic callable. The callee is evaluated first, then the
    /// arguments left to right.
    Call(Rc<TreeNode>, Vec<Rc<TreeNode>>),
    MakeList(Vec<Rc<TreeNode>>),
    MakeVector(Vec<Rc<TreeNode>>),
    MakeSymbol(Option<Arc<str>>, Arc<str>),
    /// Evaluates every node in order, yielding the last value (nil when empty).
    Seq(Vec<Rc<TreeNode>>),
}

impl TreeNode {
    pub fn is_nil_constant(&self) -> bool {
        matches!(self, TreeNode::Const(Literal::Nil))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, TreeNode::Const(_))
    }

    pub fn is_closure(&self) -> bool {
        matches!(self, TreeNode::Closure(_))
    }
}

pub fn make_constant(literal: Literal) -> Rc<TreeNode> {
    Rc::new(TreeNode::Const(literal))
}

pub fn make_nil() -> Rc<TreeNode> {
    make_constant(Literal::Nil)
}

pub fn make_primref(name: Arc<str>) -> Rc<TreeNode> {
    Rc::new(TreeNode::PrimRef(name))
}

pub fn make_scope_ref(name: Arc<str>) -> Rc<TreeNode> {
    Rc::new(TreeNode::ScopeRef(name))
}

pub fn make_arg_ref(index: usize) -> Rc<TreeNode> {
    Rc::new(TreeNode::ArgRef(index))
}

pub fn make_import_ref(path: Arc<str>, name: Arc<str>, callable: bool) -> Rc<TreeNode> {
    Rc::new(TreeNode::ImportRef(ImportRef {
        path,
        name,
        callable,
    }))
}

pub fn make_define(name: Arc<str>, value: Rc<TreeNode>) -> Rc<TreeNode> {
    Rc::new(TreeNode::Define(name, value))
}

pub fn make_closure(bindings: Vec<(Arc<str>, Rc<TreeNode>)>, body: Rc<TreeNode>) -> Rc<TreeNode> {
    Rc::new(TreeNode::Closure(Rc::new(Closure { bindings, body })))
}

pub fn make_test(cond: Rc<TreeNode>, then: Rc<TreeNode>, else_: Rc<TreeNode>) -> Rc<TreeNode> {
    Rc::new(TreeNode::Test(cond, then, else_))
}

pub fn make_call(callee: Rc<TreeNode>, args: Vec<Rc<TreeNode>>) -> Rc<TreeNode> {
    Rc::new(TreeNode::Call(callee, args))
}

pub fn make_list(items: Vec<Rc<TreeNode>>) -> Rc<TreeNode> {
    Rc::new(TreeNode::MakeList(items))
}

pub fn make_vector(items: Vec<Rc<TreeNode>>) -> Rc<TreeNode> {
    Rc::new(TreeNode::MakeVector(items))
}

pub fn make_symbol(namespace: Option<Arc<str>>, name: Arc<str>) -> Rc<TreeNode> {
    Rc::new(TreeNode::MakeSymbol(namespace, name))
}

pub fn make_seq(mut seq: Vec<Rc<TreeNode>>) -> Rc<TreeNode> {
    if seq.len() == 1 {
        return seq.remove(0);
    }
    Rc::new(TreeNode::Seq(seq))
}

fn fg(color: Color) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color));
    spec
}

fn kw(color: Color) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(color));
    spec.set_bold(true);
    spec
}

impl TreeNode {
    pub fn pretty<'a, D>(&self, allocator: &'a D) -> DocBuilder<'a, D, ColorSpec>
    where
        D: DocAllocator<'a, ColorSpec>,
        D::Doc: Clone,
    {
        fn head<'a, D>(allocator: &'a D, name: &'static str) -> DocBuilder<'a, D, ColorSpec>
        where
            D: DocAllocator<'a, ColorSpec>,
            D::Doc: Clone,
        {
            allocator.text(name).annotate(fg(Color::Green))
        }

        fn with_operands<'a, D>(
            allocator: &'a D,
            doc: DocBuilder<'a, D, ColorSpec>,
            operands: &[Rc<TreeNode>],
        ) -> DocBuilder<'a, D, ColorSpec>
        where
            D: DocAllocator<'a, ColorSpec>,
            D::Doc: Clone,
        {
            if operands.is_empty() {
                return doc.parens();
            }
            let operands = allocator.intersperse(
                operands.iter().map(|operand| operand.pretty(allocator)),
                allocator.line(),
            );
            doc.append(allocator.line())
                .append(operands)
                .nest(1)
                .group()
                .parens()
                .align()
        }

        match self {
            Self::Const(literal) => head(allocator, "const")
                .append(allocator.space())
                .append(allocator.text(literal.to_string()))
                .group()
                .parens(),

            Self::PrimRef(name) => head(allocator, "primref")
                .append(allocator.space())
                .append(allocator.text(name.to_string()).annotate(kw(Color::Blue)))
                .parens(),

            Self::ScopeRef(name) => head(allocator, "ref")
                .append(allocator.space())
                .append(allocator.text(name.to_string()).annotate(kw(Color::Blue)))
                .parens(),

            Self::ArgRef(index) => head(allocator, "arg")
                .append(allocator.space())
                .append(allocator.text(index.to_string()))
                .parens(),

            Self::ImportRef(import) => {
                let mut path = String::new();
                let _ = write_string_literal(&mut path, &import.path);
                head(allocator, if import.callable { "import-fn" } else { "import-ref" })
                    .append(allocator.space())
                    .append(allocator.text(path))
                    .append(allocator.space())
                    .append(allocator.text(import.name.to_string()).annotate(kw(Color::Blue)))
                    .parens()
            }

            Self::Define(name, value) => head(allocator, "define")
                .append(allocator.space())
                .append(allocator.text(name.to_string()).annotate(kw(Color::Blue)))
                .append(allocator.line())
                .append(value.pretty(allocator))
                .nest(1)
                .group()
                .parens()
                .align(),

            Self::Closure(closure) => {
                let bindings = allocator
                    .intersperse(
                        closure.bindings.iter().map(|(name, value)| {
                            allocator
                                .text(name.to_string())
                                .annotate(kw(Color::Blue))
                                .append(allocator.space())
                                .append(value.pretty(allocator))
                                .group()
                                .brackets()
                        }),
                        allocator.line(),
                    )
                    .align()
                    .parens();

                head(allocator, "closure")
                    .append(allocator.space())
                    .append(bindings)
                    .append(allocator.line())
                    .append(closure.body.pretty(allocator))
                    .nest(1)
                    .group()
                    .parens()
                    .align()
            }

            Self::Test(cond, then, else_) => head(allocator, "test")
                .append(allocator.space())
                .append(cond.pretty(allocator))
                .append(allocator.line())
                .append(then.pretty(allocator))
                .append(allocator.line())
                .append(else_.pretty(allocator))
                .nest(1)
                .group()
                .parens()
                .align(),

            Self::Call(callee, args) => {
                let doc = head(allocator, "call")
                    .append(allocator.space())
                    .append(callee.pretty(allocator));
                with_operands(allocator, doc, args)
            }

            Self::MakeList(items) => with_operands(allocator, head(allocator, "make-list"), items),

            Self::MakeVector(items) => {
                with_operands(allocator, head(allocator, "make-vector"), items)
            }

            Self::MakeSymbol(namespace, name) => {
                let mut doc = head(allocator, "make-symbol").append(allocator.space());
                if let Some(ns) = namespace {
                    let mut text = String::new();
                    let _ = write_string_literal(&mut text, ns);
                    doc = doc.append(allocator.text(text)).append(allocator.space());
                }
                let mut text = String::new();
                let _ = write_string_literal(&mut text, name);
                doc.append(allocator.text(text)).parens()
            }

            Self::Seq(seq) => with_operands(allocator, head(allocator, "seq"), seq),
        }
    }

    pub fn pretty_print(&self, width: usize, out: impl WriteColor) -> std::io::Result<()> {
        let allocator = BoxAllocator;

        self.pretty(&allocator).1.render_colored(width, out)?;

        Ok(())
    }
}

impl std::fmt::Display for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buf = Vec::new();
        match self.pretty_print(80, termcolor::NoColor::new(&mut buf)) {
            Ok(()) => f.write_str(&String::from_utf8_lossy(&buf)),
            Err(_) => Err(std::fmt::Error),
        }
    }
}
