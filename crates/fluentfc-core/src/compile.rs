//! The compile driver (component J, ambient): owns the pools and orchestrates
//! C -> D/E -> F/G -> serialize in the order §5 mandates.
//!
//! Grouped into one `CompileContext` per the Design Notes ("model [the pools]
//! as a `CompileContext` passed explicitly through every analyze/lower call.
//! This removes hidden state and eases testing") rather than as globals.

use ahash::AHashMap;

use crate::analyzer::frame::AnalysisContext;
use crate::analyzer::stmt::analyze_function_body;
use crate::diagnostics::{Diagnostic, Location};
use crate::filecode::Corpus;
use crate::ir::block::BlockPool;
use crate::ir::lower::{lower_function, mangle_function, mangle_method, LowerCtx};
use crate::ir::pool::{new_number_pool, new_string_pool, new_trace_number_pool, NumberPool, StringPool, TraceNumberPool};

/// Asks whether a std file already has a precompiled IR sibling for the host
/// OS (§4.G "Standard-library short-circuit"). Kept as a trait so the file
/// layout under `FLUENT_STD_PATH/include/{posix,win}` — out of scope per §1 —
/// never needs real disk I/O to exercise or test this module; the CLI
/// harness supplies the real filesystem-backed implementation.
pub trait PrecompiledLookup {
    /// Returns the `.ll` sibling path to `link` instead of lowering `file_path`, if any.
    fn precompiled_path(&mut self, file_path: &str) -> Option<String>;
}

/// A lookup that never finds a precompiled sibling; every std file is
/// analyzed and lowered like any other. Useful for tests and for compiling a
/// corpus with no `FLUENT_STD_PATH` configured.
#[derive(Debug, Default)]
pub struct NoPrecompiled;

impl PrecompiledLookup for NoPrecompiled {
    fn precompiled_path(&mut self, _file_path: &str) -> Option<String> {
        None
    }
}

/// Everything a successful compile produces: the serialized IR text plus any
/// buffered non-fatal warnings (currently only `UnusedVariable`), each paired
/// with the file it was raised in.
#[derive(Debug, Default)]
pub struct CompileOutput {
    pub ir: String,
    pub warnings: Vec<(String, Diagnostic)>,
}

/// The pools shared across the whole compile (component F), threaded
/// explicitly rather than stored in a global/`static` (Design Notes).
#[derive(Debug, Default)]
pub struct CompileContext {
    strings: StringPool,
    numbers: NumberPool,
    traces: TraceNumberPool,
}

impl CompileContext {
    #[must_use]
    pub fn new() -> Self {
        Self { strings: new_string_pool(), numbers: new_number_pool(), traces: new_trace_number_pool() }
    }
}

/// A fatal failure during the analyze/lower stage, naming the file it
/// occurred in (the file-code graph's own `FatalError` already names its
/// files; this wraps the analyzer's single-location `Diagnostic`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub file: String,
    pub diagnostic: Diagnostic,
}

/// Analyzes and lowers every function of every file in `corpus`
/// (`corpus.file_order`, i.e. BFS discovery order — the `file_index` half of
/// every mangled name), then serializes the result to a single IR text file:
/// the fixed two-line preamble, then each pool's entries in insertion order,
/// then lowered function/module text (§6 "IR file format").
///
/// Per file, `main` is the only function excluded from its own `nothing`-ness
/// exemption for the std short-circuit: std-marked files with a precompiled
/// sibling (`lookup`) are skipped wholesale and replaced by one `link` line,
/// exactly as the original's build command special-cases them (§4.G).
pub fn compile(corpus: &Corpus, lookup: &mut impl PrecompiledLookup) -> Result<CompileOutput, CompileError> {
    let mut ctx = CompileContext::new();
    let mut warnings = Vec::new();
    let mut function_bodies = String::new();

    for path in &corpus.file_order {
        let file = corpus.get(path).expect("file_order entry missing from corpus");

        if let Some(link_path) = lookup.precompiled_path(path) {
            let mut line = String::new();
            crate::ir::opcode::write_link(&mut line, &link_path);
            function_bodies.push_str(&line);
            continue;
        }

        let actx = AnalysisContext { file, corpus };

        let mut functions: Vec<_> = file.functions.values().collect();
        functions.sort_by_key(|function| function.local_index);
        for function in functions {
            let function_warnings = analyze_function_body(function, &actx)
                .map_err(|diagnostic| CompileError { file: path.clone(), diagnostic })?;
            warnings.extend(function_warnings.into_iter().map(|d| (path.clone(), d)));

            let mut lower_ctx = LowerCtx { strings: &mut ctx.strings, numbers: &mut ctx.numbers, traces: &mut ctx.traces };
            let label = mangle_function(corpus, function);
            function_bodies.push_str(&lower_function(&mut lower_ctx, &actx, function, &label));
        }

        let mut modules: Vec<_> = file.modules.values().collect();
        modules.sort_by_key(|module| module.local_index);
        for module in modules {
            // `module.functions` is an `IndexMap`: its iteration order already
            // is declaration order (§3 "Declaration order is preserved"), so
            // unlike the file's top-level functions (an unordered map), no
            // sort by `local_index` is needed — or reliable, since a method's
            // `local_index` is not populated by the file-code graph.
            for method in module.functions.values() {
                let method_warnings = analyze_function_body(method, &actx)
                    .map_err(|diagnostic| CompileError { file: path.clone(), diagnostic })?;
                warnings.extend(method_warnings.into_iter().map(|d| (path.clone(), d)));

                let mut lower_ctx = LowerCtx { strings: &mut ctx.strings, numbers: &mut ctx.numbers, traces: &mut ctx.traces };
                let label = mangle_method(corpus, module, &method.name);
                let lowered = lower_function(&mut lower_ctx, &actx, method, &label);
                function_bodies.push_str(&lowered);
            }
        }
    }

    let mut ir = String::new();
    ir.push_str("ref __TRUE num 1\n");
    ir.push_str("ref __FALSE num 0\n");
    for (addr, value) in ctx.strings.entries() {
        crate::ir::opcode::write_ref(&mut ir, &addr, "str", &format!("{value:?}"));
    }
    for (addr, key) in ctx.numbers.entries() {
        crate::ir::opcode::write_ref(&mut ir, &addr, key.kind, &key.text);
    }
    for (addr, key) in ctx.traces.entries() {
        // Trace numbers are always plain integers; `key.kind` only
        // distinguishes file/line/column within the pool's dedup key.
        crate::ir::opcode::write_ref(&mut ir, &addr, "num", &key.text);
    }
    ir.push('\n');
    ir.push_str(&function_bodies);

    Ok(CompileOutput { ir, warnings })
}

/// Fatal main-function shape or import-graph failures are reported before
/// any analysis runs a single function; this is a thin convenience that
/// turns a `CompileError` into the same `(file, line, column)` triple the
/// file-code graph's `FatalError` exposes, for a uniform CLI rendering path.
#[must_use]
pub fn location_of(error: &CompileError) -> Location {
    Location::new(error.file.clone(), error.diagnostic.line, error.diagnostic.column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, Rule};
    use crate::filecode::{FileCode, Function};
    use crate::types::Type;
    use ahash::{AHashMap as Map, AHashSet};

    fn id_function() -> Function {
        let mut body = Ast::new(Rule::Block, 1, 1);
        let mut ret = Ast::new(Rule::Return, 1, 1);
        let mut expr = Ast::new(Rule::Expression, 1, 1);
        expr.children.push(Ast::new(Rule::Identifier, 1, 1).with_value("x"));
        ret.children.push(expr);
        body.children.push(ret);

        Function {
            name: "id".to_owned(),
            is_public: true,
            params: vec![("x".to_owned(), Type::primitive("num"))],
            return_type: Type::primitive("num"),
            body,
            templates: AHashSet::default(),
            is_std: false,
            file_path: "a.fluent".to_owned(),
            location: Location::new("a.fluent", 1, 1),
            local_index: 0,
        }
    }

    #[test]
    fn identity_function_lowers_to_a_single_ret() {
        let mut functions = Map::default();
        functions.insert("id".to_owned(), id_function());
        let file = FileCode { path: "a.fluent".to_owned(), functions, modules: Map::default(), imports: Vec::new(), raw: String::new() };

        let mut corpus = Corpus::default();
        corpus.file_order.push("a.fluent".to_owned());
        corpus.files.insert("a.fluent".to_owned(), file);

        let output = compile(&corpus, &mut NoPrecompiled).unwrap();
        assert!(output.ir.contains("f__0_0:\n"));
        assert!(output.ir.contains("ret x0\n"));
        assert!(output.warnings.is_empty());
    }
}
