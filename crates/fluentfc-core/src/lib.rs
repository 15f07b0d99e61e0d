#![doc = include_str!("../../../README.md")]

pub mod analyzer;
pub mod ast;
pub mod compile;
pub mod diagnostics;
pub mod filecode;
pub mod ir;
pub mod scope;
pub mod types;

pub use analyzer::{analyze_expression, analyze_function_body, AnalysisContext, Frame, Object, StaticValue};
pub use ast::{Ast, Rule};
pub use compile::{compile, CompileContext, CompileError, CompileOutput, NoPrecompiled, PrecompiledLookup};
pub use diagnostics::{Diagnostic, DiagnosticKind, FatalError, Location};
pub use filecode::{resolve_imports, rewrite_std_import, Corpus, FileCode, Function, Module, ParsedFile, Property, SourceLoader, STD_IMPORT_PREFIX};
pub use scope::{ScopeId, ScopedStack, Variable};
pub use types::{Type, INFER_SENTINEL};
