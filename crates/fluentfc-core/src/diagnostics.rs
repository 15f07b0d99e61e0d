//! Diagnostic taxonomy for the semantic analyzer and IR lowering pipeline.
//!
//! Every analyzer operation returns either a concrete value or a `Diagnostic`
//! tagged with a `DiagnosticKind` and a source location. Diagnostics are
//! compared by kind/position in tests, never by rendered message text — the
//! terminal-coloured renderer that turns these into user-facing output is an
//! external collaborator.

use std::fmt;

/// A location within a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self { file: file.into(), line, column }
    }
}

/// The kind of a diagnostic, independent of its rendered message.
///
/// `Parser` wraps kinds surfaced unchanged from the external parser — the
/// analyzer never constructs one itself, it only threads it through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    CannotInferType,
    CannotTakeAddress,
    ConstantReassignment,
    DataOutlivesStack,
    InvalidDereference,
    InvalidPointer,
    Redefinition,
    ShouldNotReturn,
    TypeMismatch,
    UndefinedReference,
    /// Warning, not fatal.
    UnusedVariable,
    CircularImport,
    MissingReturn,
    InvalidAssignmentTarget,
    Parser(String),
}

impl DiagnosticKind {
    /// `UnusedVariable` is the only non-fatal kind; everything else aborts the compile.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::UnusedVariable)
    }
}

/// A single analyzer or lowering diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: u32,
    pub column: u32,
    /// Additional string fields (expected/got type marshals, referenced names, ...).
    pub additional: Vec<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, line: u32, column: u32) -> Self {
        Self { kind, line, column, additional: Vec::new() }
    }

    #[must_use]
    pub fn with_additional(mut self, additional: Vec<String>) -> Self {
        self.additional = additional;
        self
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.kind.is_warning()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {}:{}", self.kind, self.line, self.column)?;
        if !self.additional.is_empty() {
            write!(f, " ({})", self.additional.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// A compile-aborting failure: either a single analyzer diagnostic or a
/// structural failure of the file-code graph (import cycle, redefinition).
///
/// Kept distinct from `Diagnostic` because the latter always carries a
/// single source location while a cycle or redefinition names more than one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    Diagnostic(Diagnostic),
    /// A non-std file was reached twice while resolving imports.
    ///
    /// `chain` is the import path from the entry file down to (and
    /// including) the re-visited file, in traversal order.
    CircularImport { chain: Vec<String> },
    /// A function and a module (or two of the same kind) share a name in one file.
    Redefinition { name: String, first: Location, second: Location },
    /// Parsing failed before semantic analysis ran, surfaced from the external loader unchanged.
    Parse { file: String, message: String },
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diagnostic(d) => write!(f, "{d}"),
            Self::CircularImport { chain } => {
                write!(f, "circular import: {}", chain.join(" -> "))
            }
            Self::Redefinition { name, first, second } => {
                write!(
                    f,
                    "redefinition of `{name}` at {}:{} (first defined at {}:{})",
                    second.line, second.column, first.line, first.column
                )
            }
            Self::Parse { file, message } => write!(f, "{file}: {message}"),
        }
    }
}

impl std::error::Error for FatalError {}

impl From<Diagnostic> for FatalError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::Diagnostic(diagnostic)
    }
}
