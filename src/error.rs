use std::fmt;

use crate::form::Symbol;

/// Index outside `[0, count)` (or `[0, count]` for `assoc`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOutOfBounds {
    pub index: usize,
    pub count: usize,
}

impl fmt::Display for IndexOutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index {} out of bounds for length {}", self.index, self.count)
    }
}

impl std::error::Error for IndexOutOfBounds {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadErrorKind {
    /// A token starts with a character that can't begin any form.
    BadSymbolStart,
    /// More than one `/`, or nothing after the `/`.
    MalformedNamespace,
    UnterminatedString,
    /// Input ended inside a list, a vector, or right after `'`.
    UnexpectedEof,
    InvalidInteger,
    InvalidUtf8,
    /// Lists, vectors and quotes nested past [`MAX_DEPTH`](crate::reader::MAX_DEPTH).
    TooDeep,
    Io(std::io::ErrorKind),
}

/// Syntax error reported by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadError {
    pub kind: ReadErrorKind,
    /// The offending piece of source text.
    pub fragment: String,
    /// Byte offset into the stream where the error was detected.
    pub position: usize,
}

impl ReadError {
    pub fn new(kind: ReadErrorKind, fragment: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            fragment: fragment.into(),
            position,
        }
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match &self.kind {
            ReadErrorKind::BadSymbolStart => "bad symbol start",
            ReadErrorKind::MalformedNamespace => "malformed namespace in symbol",
            ReadErrorKind::UnterminatedString => "unterminated string",
            ReadErrorKind::UnexpectedEof => "unexpected end of input",
            ReadErrorKind::InvalidInteger => "invalid integer literal",
            ReadErrorKind::InvalidUtf8 => "invalid UTF-8 in string",
            ReadErrorKind::TooDeep => "nesting too deep",
            ReadErrorKind::Io(kind) => return write!(f, "read failed at byte {}: {}", self.position, kind),
        };
        write!(f, "{} at byte {}: {:?}", what, self.position, self.fragment)
    }
}

impl std::error::Error for ReadError {}

/// Failure reported by an [`ImportResolver`](crate::env::ImportResolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot import {:?}: {}", self.path, self.message)
    }
}

impl std::error::Error for ImportError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    UndefinedSymbol(Symbol),
    Import(ImportError),
    MalformedSpecialForm {
        form: &'static str,
        reason: String,
    },
    Read(ReadError),
    /// The form nests deeper than the compiler recurses.
    TooDeep(usize),
}

impl CompileError {
    pub(crate) fn malformed(form: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedSpecialForm {
            form,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedSymbol(sym) => write!(f, "Undefined symbol: {}", sym),
            Self::Import(err) => write!(f, "{}", err),
            Self::MalformedSpecialForm { form, reason } => write!(f, "malformed {}: {}", form, reason),
            Self::Read(err) => write!(f, "{}", err),
            Self::TooDeep(depth) => {
                write!(f, "form nested {} levels deep (limit {})", depth, crate::reader::MAX_DEPTH)
            }
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Import(err) => Some(err),
            Self::Read(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ReadError> for CompileError {
    fn from(err: ReadError) -> Self {
        Self::Read(err)
    }
}

impl From<ImportError> for CompileError {
    fn from(err: ImportError) -> Self {
        Self::Import(err)
    }
}

/// Faults raised while the reference host executes a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    UndefinedSymbol(String),
    MissingArgument { index: usize, given: usize },
    NotCallable(String),
    WrongType { procedure: String, expected: &'static str, found: String },
    WrongArgCount { procedure: String, expected: &'static str, given: usize },
    DivisionByZero,
    Overflow(String),
    UnknownImport { path: String, name: String },
    Io(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedSymbol(name) => write!(f, "Undefined symbol {}", name),
            Self::MissingArgument { index, given } => {
                write!(f, "missing argument {} ({} given)", index, given)
            }
            Self::NotCallable(value) => write!(f, "{} is not callable", value),
            Self::WrongType { procedure, expected, found } => {
                write!(f, "{}: expected {}, found {}", procedure, expected, found)
            }
            Self::WrongArgCount { procedure, expected, given } => {
                write!(f, "bad number of arguments to {}: expected {}, given {}", procedure, expected, given)
            }
            Self::DivisionByZero => f.write_str("division by zero"),
            Self::Overflow(procedure) => write!(f, "{}: integer overflow", procedure),
            Self::UnknownImport { path, name } => write!(f, "{:?} does not export {}", path, name),
            Self::Io(message) => write!(f, "output failed: {}", message),
        }
    }
}

impl std::error::Error for RuntimeError {}
