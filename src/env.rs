//! Compile-time symbol table.
//!
//! A parent-linked chain of scopes mapping names to the backend tree that
//! fetches them at runtime. The root scope additionally owns the namespace
//! alias table filled by `import` and the resolver used to load units.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ImportError;
use crate::tree_il::TreeNode;

#[derive(Clone, Debug, PartialEq)]
pub enum Definition {
    /// Name reserved by `def` before its value is compiled.
    Declared,
    Bound(Rc<TreeNode>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
    Callable,
    Value,
}

/// Compile-time view of an imported unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportedUnit {
    /// Alias used when `import` names none.
    pub name: Arc<str>,
    pub path: Arc<str>,
    pub exports: IndexMap<Arc<str>, ExportKind>,
}

impl ImportedUnit {
    /// Creates a unit whose short name is the last `/`-separated segment of `path`.
    pub fn new(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        Self {
            name: Arc::from(name),
            path: Arc::from(path),
            exports: IndexMap::new(),
        }
    }

    pub fn with_export(mut self, name: &str, kind: ExportKind) -> Self {
        self.exports.insert(Arc::from(name), kind);
        self
    }

    pub fn export(&self, name: &str) -> Option<ExportKind> {
        self.exports.get(name).copied()
    }
}

/// Loads units named by `import`.
pub trait ImportResolver {
    fn resolve(&self, path: &str) -> Result<ImportedUnit, ImportError>;
}

/// Alias whose imports accumulate instead of replacing each other.
pub fn is_accumulating_alias(alias: &str) -> bool {
    alias == "." || alias == "_"
}

pub struct SymbolTable {
    parent: Option<Rc<SymbolTable>>,
    bindings: RefCell<IndexMap<Arc<str>, Definition>>,
    imports: RefCell<IndexMap<Arc<str>, Vec<Rc<ImportedUnit>>>>,
    resolver: RefCell<Option<Rc<dyn ImportResolver>>>,
}

impl SymbolTable {
    /// Creates an empty root table.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            parent: None,
            bindings: RefCell::new(IndexMap::new()),
            imports: RefCell::new(IndexMap::new()),
            resolver: RefCell::new(None),
        })
    }

    /// Creates a scope nested in `parent`.
    pub fn child(parent: &Rc<Self>, bindings: IndexMap<Arc<str>, Definition>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(parent.clone()),
            bindings: RefCell::new(bindings),
            imports: RefCell::new(IndexMap::new()),
            resolver: RefCell::new(None),
        })
    }

    pub fn parent(&self) -> Option<&Rc<SymbolTable>> {
        self.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn root(self: &Rc<Self>) -> Rc<Self> {
        let mut env = self;
        while let Some(parent) = &env.parent {
            env = parent;
        }
        env.clone()
    }

    /// Looks `name` up, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<Definition> {
        let mut env = self;
        loop {
            if let Some(def) = env.bindings.borrow().get(name) {
                return Some(def.clone());
            }
            match &env.parent {
                Some(parent) => env = parent,
                None => return None,
            }
        }
    }

    /// True when this scope itself binds `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Binds `name` in this scope, replacing any previous binding here.
    pub fn define(&self, name: Arc<str>, def: Definition) {
        self.bindings.borrow_mut().insert(name, def);
    }

    /// Drops this scope's own binding of `name`, keeping the order of the rest.
    pub fn remove(&self, name: &str) -> Option<Definition> {
        self.bindings.borrow_mut().shift_remove(name)
    }

    /// Snapshot of this scope's own bindings in insertion order.
    pub fn bindings(&self) -> Vec<(Arc<str>, Definition)> {
        self.bindings
            .borrow()
            .iter()
            .map(|(name, def)| (name.clone(), def.clone()))
            .collect()
    }

    pub fn set_resolver(self: &Rc<Self>, resolver: Rc<dyn ImportResolver>) {
        *self.root().resolver.borrow_mut() = Some(resolver);
    }

    pub fn resolve_import(self: &Rc<Self>, path: &str) -> Result<ImportedUnit, ImportError> {
        let root = self.root();
        let resolver = root.resolver.borrow().clone();
        match resolver {
            Some(resolver) => resolver.resolve(path),
            None => Err(ImportError {
                path: path.to_string(),
                message: "no import resolver configured".to_string(),
            }),
        }
    }

    /// Registers `unit` under `alias` in the root alias table.
    pub fn add_import(self: &Rc<Self>, alias: Arc<str>, unit: ImportedUnit) {
        let root = self.root();
        let mut imports = root.imports.borrow_mut();
        let units = imports.entry(alias.clone()).or_default();
        if is_accumulating_alias(&alias) {
            units.push(Rc::new(unit));
        } else {
            units.clear();
            units.push(Rc::new(unit));
        }
    }

    pub fn has_alias(self: &Rc<Self>, alias: &str) -> bool {
        self.root().imports.borrow().contains_key(alias)
    }

    /// Finds the first unit registered under `alias` that exports `name`.
    pub fn lookup_import(self: &Rc<Self>, alias: &str, name: &str) -> Option<(Rc<ImportedUnit>, ExportKind)> {
        let root = self.root();
        let imports = root.imports.borrow();
        imports.get(alias)?.iter().find_map(|unit| {
            unit.export(name).map(|kind| (unit.clone(), kind))
        })
    }

    /// Paths currently registered under `alias`.
    pub fn import_paths(self: &Rc<Self>, alias: &str) -> Vec<Arc<str>> {
        let root = self.root();
        let imports = root.imports.borrow();
        imports
            .get(alias)
            .map(|units| units.iter().map(|unit| unit.path.clone()).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("bindings", &self.bindings.borrow().keys().collect::<Vec<_>>())
            .field("imports", &self.imports.borrow().keys().collect::<Vec<_>>())
            .field("parent", &self.parent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_il::make_arg_ref;

    #[test]
    fn lookup_walks_innermost_first() {
        let root = SymbolTable::new();
        root.define("x".into(), Definition::Declared);

        let mut bindings = IndexMap::new();
        bindings.insert(Arc::from("x"), Definition::Bound(make_arg_ref(0)));
        let inner = SymbolTable::child(&root, bindings);

        assert_eq!(inner.lookup("x"), Some(Definition::Bound(make_arg_ref(0))));
        assert_eq!(root.lookup("x"), Some(Definition::Declared));
        assert_eq!(inner.lookup("y"), None);
        assert!(Rc::ptr_eq(&inner.root(), &root));
    }

    #[test]
    fn root_definitions_are_shared() {
        let root = SymbolTable::new();
        let inner = SymbolTable::child(&root, IndexMap::new());
        assert!(!inner.is_bound("late"));
        root.define("late".into(), Definition::Declared);
        assert!(inner.is_bound("late"));
    }

    #[test]
    fn remove_keeps_binding_order() {
        let root = SymbolTable::new();
        for name in ["a", "b", "c"] {
            root.define(Arc::from(name), Definition::Declared);
        }
        assert!(matches!(root.remove("b"), Some(Definition::Declared)));
        assert!(root.remove("b").is_none());
        let names: Vec<String> = root.bindings().into_iter().map(|(name, _)| name.to_string()).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn import_alias_overwrites_unless_accumulating() {
        let root = SymbolTable::new();
        root.add_import("m".into(), ImportedUnit::new("a/m"));
        root.add_import("m".into(), ImportedUnit::new("b/m"));
        assert_eq!(root.import_paths("m"), vec![Arc::from("b/m")]);

        root.add_import(".".into(), ImportedUnit::new("a"));
        root.add_import(".".into(), ImportedUnit::new("b"));
        assert_eq!(root.import_paths("."), vec![Arc::from("a"), Arc::from("b")]);

        root.add_import("_".into(), ImportedUnit::new("c"));
        root.add_import("_".into(), ImportedUnit::new("d"));
        assert_eq!(root.import_paths("_").len(), 2);
    }

    #[test]
    fn lookup_import_searches_accumulated_units() {
        let root = SymbolTable::new();
        let inner = SymbolTable::child(&root, IndexMap::new());
        inner.add_import(".".into(), ImportedUnit::new("a").with_export("f", ExportKind::Callable));
        inner.add_import(".".into(), ImportedUnit::new("b").with_export("v", ExportKind::Value));

        let (unit, kind) = root.lookup_import(".", "v").unwrap();
        assert_eq!(&*unit.path, "b");
        assert_eq!(kind, ExportKind::Value);
        assert!(root.lookup_import(".", "nope").is_none());
        assert!(root.has_alias("."));
    }

    #[test]
    fn unit_short_name() {
        assert_eq!(&*ImportedUnit::new("strings").name, "strings");
        assert_eq!(&*ImportedUnit::new("net/http").name, "http");
    }

    #[test]
    fn missing_resolver_is_an_import_error() {
        let root = SymbolTable::new();
        let err = root.resolve_import("fmt").unwrap_err();
        assert_eq!(err.path, "fmt");
    }
}
