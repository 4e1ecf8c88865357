//! A small Lisp front end.
//!
//! The [`reader`] turns source text into [`form::Form`]s built from the
//! persistent [`list::List`] and [`vector::Vector`]. The [`compiler`] resolves
//! them against a compile-time [`env::SymbolTable`] and emits a
//! [`tree_il::TreeNode`] tree for a host code generator. [`interp`] is a
//! reference host that executes the tree directly.

pub mod compiler;
pub mod env;
pub mod error;
pub mod form;
pub mod interp;
pub mod list;
pub mod options;
pub mod primitives;
pub mod reader;
pub mod tree_il;
pub mod vector;

pub use compiler::{compile, compile_program, compile_str, Program};
pub use error::{CompileError, ReadError, RuntimeError};
pub use form::{Form, Symbol};
