//! IR lowering (component G): lowers a type-checked AST into the flat,
//! block-addressed IR described in §4.G / §6 of the specification.
//!
//! By the time lowering runs, the analyzer (component D/E) has closed every
//! `inferred_type` on the tree; lowering re-reads those annotations rather
//! than re-inferring anything; an unreachable pattern here indicates an
//! analyzer bug, not bad user input, so this module panics with an
//! "internal compiler error" marker rather than returning a `Diagnostic`
//! (§7: "IR lowering assumes well-typed input").
//!
//! Unlike the analyzer's explicit `VecDeque<Frame>` worklist (needed there
//! because sibling frames share mutable inference state), lowering's frames
//! have no such sharing — each subtree lowers to an operand independently of
//! its siblings — so this module uses ordinary function recursion bounded by
//! source expression nesting depth instead of a second worklist type.

use ahash::AHashMap;

use crate::analyzer::frame::AnalysisContext;
use crate::analyzer::{resolve_function, resolve_module};
use crate::ast::{Ast, Rule};
use crate::filecode::{Corpus, Function, Module};
use crate::ir::block::{BlockPool, BLOCK_END};
use crate::ir::opcode;
use crate::ir::pool::{NumKey, NumberPool, StringPool, TraceNumberPool};
use crate::types::Type;

/// `f__{file_index}_{local_index}` (§4.G).
#[must_use]
pub fn mangle_function(corpus: &Corpus, function: &Function) -> String {
    format!("f__{}_{}", corpus.file_index(&function.file_path).unwrap_or_default(), function.local_index)
}

/// `m__{file_index}_{local_index}` (§4.G).
#[must_use]
pub fn mangle_module(corpus: &Corpus, module: &Module) -> String {
    format!("m__{}_{}", corpus.file_index(&module.file_path).unwrap_or_default(), module.local_index)
}

/// A module member is suffixed `__m_<k>` for a method at declaration
/// position `k`, or the bare integer index for a property (§4.G).
#[must_use]
pub fn mangle_method(corpus: &Corpus, module: &Module, name: &str) -> String {
    let index = module.functions.get_index_of(name).unwrap_or(0);
    format!("{}__m_{index}", mangle_module(corpus, module))
}

#[must_use]
pub fn property_index(module: &Module, name: &str) -> usize {
    module.declarations.get_index_of(name).unwrap_or(0)
}

/// Shared pool state threaded through lowering, mirroring the `CompileContext`
/// Design Notes ask for: explicit, never a global.
pub struct LowerCtx<'a> {
    pub strings: &'a mut StringPool,
    pub numbers: &'a mut NumberPool,
    pub traces: &'a mut TraceNumberPool,
}

/// Per-function lowering state: the function-scoped block pool, the
/// temp-name counter, and the current binding of every in-scope name to its
/// IR operand text (`x<n>` for a parameter/temp, or the variable's own name
/// for a `let`/`const` binding — see `DESIGN.md` for why declarations bind
/// by name while intermediates bind by temp).
struct FnState {
    blocks: BlockPool,
    temps: u32,
    locals: AHashMap<String, String>,
}

impl FnState {
    fn fresh_temp(&mut self) -> String {
        let id = self.temps;
        self.temps += 1;
        opcode::temp(id)
    }
}

/// Lowers one function to its IR text: `label` as the leading block label
/// followed by its body, followed by every block its control flow requested.
///
/// The caller supplies `label` rather than this function deriving it via
/// [`mangle_function`] because a module method's own `local_index` is scoped
/// to its module's method list, not its file's top-level function list — the
/// caller mangles with [`mangle_method`] for those and [`mangle_function`]
/// for plain functions.
#[must_use]
pub fn lower_function(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, function: &Function, label: &str) -> String {
    let mut state = FnState { blocks: BlockPool::new(), temps: 0, locals: AHashMap::default() };

    for (index, (name, _ty)) in function.params.iter().enumerate() {
        state.locals.insert(name.clone(), opcode::temp(index as u32));
    }
    state.temps = function.params.len() as u32;

    let mut body = String::new();
    let end = lower_block(ctx, actx, &mut state, &function.body.children, BLOCK_END);
    body.push_str(&end);

    let mut out = String::new();
    out.push_str(label);
    out.push_str(":\n");
    out.push_str(&body);
    out.push('\n');
    out.push_str(&state.blocks.serialize());
    out
}

/// Lowers every statement of one block into a fresh buffer, threading
/// `remaining` (§9: the explicit `__block_end__` marker, never an implicit
/// "parent's continuation") through to whichever statement is the last one
/// that needs to know where control flows after it.
fn lower_block(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, statements: &[Ast], remaining: &str) -> String {
    let mut out = String::new();
    for (index, statement) in statements.iter().enumerate() {
        let is_last = index + 1 == statements.len();
        let next = if is_last { remaining.to_owned() } else { BLOCK_END.to_owned() };
        lower_statement(ctx, actx, state, statement, &mut out, &next);
    }
    out
}

fn lower_statement(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, statement: &Ast, out: &mut String, remaining: &str) {
    match statement.rule {
        Rule::Declaration => lower_declaration(ctx, actx, state, statement, out),
        Rule::Reassignment => lower_reassignment(ctx, actx, state, statement, out),
        Rule::Return => lower_return(ctx, actx, state, statement, out),
        Rule::ExpressionStatement => {
            lower_expr(ctx, actx, state, out, &statement.children[0]);
        }
        Rule::If => lower_if(ctx, actx, state, statement, out, remaining),
        Rule::While => lower_while(ctx, actx, state, statement, out, remaining),
        other => unreachable!("internal compiler error: unhandled statement rule {other:?}"),
    }
}

fn lower_declaration(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, statement: &Ast, out: &mut String) {
    let is_constant = statement.children.first().is_some_and(|child| child.rule == Rule::Const);
    let expr = statement.children.last().expect("internal compiler error: declaration with no expression");
    let ty = expr.inferred_type().expect("internal compiler error: declaration expression has no inferred type");

    let value = lower_expr(ctx, actx, state, out, expr);
    opcode::write_mov(out, statement.value(), &ty.marshal(), &value);
    let _ = is_constant;
    state.locals.insert(statement.value().to_owned(), statement.value().to_owned());
}

fn lower_reassignment(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, statement: &Ast, out: &mut String) {
    let lhs = &statement.children[0];
    let rhs = &statement.children[1];
    let ty = lhs.inferred_type().expect("internal compiler error: reassignment lhs has no inferred type");
    let value = lower_expr(ctx, actx, state, out, rhs);

    if lhs.children.last().is_some_and(|c| c.rule == Rule::Identifier) && lhs.children.iter().all(|c| !matches!(c.rule, Rule::Pointer | Rule::Dereference)) {
        opcode::write_mov(out, lhs.value(), &ty.marshal(), &value);
        return;
    }

    // Property-store: not modelled as a dedicated opcode in §4.G's table;
    // lowered as a named `mov` into the mangled `base.index` address,
    // mirroring the read-side convention used by `lower_property`.
    let target = lower_expr(ctx, actx, state, out, lhs);
    opcode::write_mov(out, &target, &ty.marshal(), &value);
}

fn lower_return(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, statement: &Ast, out: &mut String) {
    let Some(expr) = statement.children.first() else {
        opcode::write_ret_void(out);
        return;
    };
    let value = lower_expr(ctx, actx, state, out, expr);
    opcode::write_ret(out, &value);
}

fn lower_if(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, statement: &Ast, out: &mut String, remaining: &str) {
    let condition = &statement.children[0];
    let then_block = &statement.children[1];
    let clauses = &statement.children[2..];

    let cond_value = lower_expr(ctx, actx, state, out, condition);

    let then_id = state.blocks.request();
    let then_addr = BlockPool::address(then_id);
    let else_addr = if clauses.is_empty() {
        remaining.to_owned()
    } else {
        let else_id = state.blocks.request();
        let else_addr = BlockPool::address(else_id);
        lower_else_chain(ctx, actx, state, clauses, else_id, remaining);
        else_addr
    };

    opcode::write_if(out, &cond_value, &then_addr, &else_addr);

    let then_body = lower_block(ctx, actx, state, &then_block.children, remaining);
    state.blocks.buffer_mut(then_id).push_str(&then_body);
}

fn lower_else_chain(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, clauses: &[Ast], block_id: usize, remaining: &str) {
    let Some(clause) = clauses.first() else {
        return;
    };
    match clause.rule {
        Rule::ElseIf => {
            let condition = &clause.children[0];
            let body = &clause.children[1];
            let rest = &clauses[1..];

            let mut local_out = String::new();
            let cond_value = lower_expr(ctx, actx, state, &mut local_out, condition);

            let then_id = state.blocks.request();
            let then_addr = BlockPool::address(then_id);
            let next_addr = if rest.is_empty() {
                remaining.to_owned()
            } else {
                let next_id = state.blocks.request();
                let next_addr = BlockPool::address(next_id);
                lower_else_chain(ctx, actx, state, rest, next_id, remaining);
                next_addr
            };

            opcode::write_if(&mut local_out, &cond_value, &then_addr, &next_addr);
            state.blocks.buffer_mut(block_id).push_str(&local_out);

            let then_body = lower_block(ctx, actx, state, &body.children, remaining);
            state.blocks.buffer_mut(then_id).push_str(&then_body);
        }
        Rule::Else => {
            let body = lower_block(ctx, actx, state, &clause.children[0].children, remaining);
            state.blocks.buffer_mut(block_id).push_str(&body);
        }
        other => unreachable!("internal compiler error: unexpected if-clause rule {other:?}"),
    }
}

fn lower_while(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, statement: &Ast, out: &mut String, remaining: &str) {
    let condition = &statement.children[0];
    let body = &statement.children[1];

    let condition_id = state.blocks.request();
    let condition_addr = BlockPool::address(condition_id);
    let body_id = state.blocks.request();
    let body_addr = BlockPool::address(body_id);

    opcode::write_jump(out, &condition_addr);

    let mut cond_out = String::new();
    let cond_value = lower_expr(ctx, actx, state, &mut cond_out, condition);
    opcode::write_if(&mut cond_out, &cond_value, &body_addr, remaining);
    state.blocks.buffer_mut(condition_id).push_str(&cond_out);

    let mut body_out = lower_block(ctx, actx, state, &body.children, &condition_addr);
    opcode::write_jump(&mut body_out, &condition_addr);
    state.blocks.buffer_mut(body_id).push_str(&body_out);
}

/// Lowers one expression subtree to the operand text that should be used
/// wherever it is referenced, emitting whatever `mov`s computing it requires
/// into `out` first. Pure reads (literals, identifiers already bound) emit
/// nothing and return existing text; everything that produces a new value
/// (arithmetic, calls, arrays, object creation) allocates a fresh temp.
fn lower_expr(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, out: &mut String, tree: &Ast) -> String {
    let mut start = 0usize;
    let mut pointers = 0u32;
    let mut derefs = 0u32;
    for modifier in &tree.children {
        match modifier.rule {
            Rule::Pointer => {
                pointers += 1;
                start += 1;
            }
            Rule::Dereference => {
                derefs += 1;
                start += 1;
            }
            _ => break,
        }
    }

    let child = &tree.children[start];
    let base = lower_expr_node(ctx, actx, state, out, child, tree);

    let mut operand = base;
    for _ in 0..derefs {
        let ty = tree.inferred_type().unwrap_or_default();
        let temp = state.fresh_temp();
        opcode::write_mov(out, &temp, &ty.marshal(), &format!("deref {operand}"));
        operand = temp;
    }
    for _ in 0..pointers {
        let ty = tree.inferred_type().unwrap_or_default();
        let temp = state.fresh_temp();
        opcode::write_mov(out, &temp, &ty.marshal(), &format!("addr {operand}"));
        operand = temp;
    }
    operand
}

fn lower_expr_node(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, out: &mut String, child: &Ast, parent: &Ast) -> String {
    match child.rule {
        Rule::StringLiteral => ctx.strings.request_address(child.value().to_owned()),
        Rule::NumberLiteral => ctx.numbers.request_address(NumKey::new(child.value(), "num")),
        Rule::DecimalLiteral => ctx.numbers.request_address(NumKey::new(child.value(), "dec")),
        Rule::BooleanLiteral => if child.value() == "true" { "__TRUE".to_owned() } else { "__FALSE".to_owned() },
        Rule::Identifier => state.locals.get(child.value()).cloned().unwrap_or_else(|| {
            unreachable!("internal compiler error: undefined identifier `{}` survived analysis", child.value())
        }),
        Rule::Array => lower_array(ctx, actx, state, out, child, parent),
        Rule::Expression => lower_expr(ctx, actx, state, out, child),
        Rule::ArithmeticExpression => lower_arithmetic(ctx, actx, state, out, child, parent),
        Rule::BooleanExpression => lower_boolean(ctx, actx, state, out, child),
        Rule::FunctionCall => lower_call(ctx, actx, state, out, child),
        Rule::ObjectCreation => lower_object_creation(ctx, actx, state, out, child),
        Rule::PropertyAccess => lower_property(ctx, actx, state, out, child),
        other => unreachable!("internal compiler error: unhandled expression rule {other:?}"),
    }
}

fn lower_array(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, out: &mut String, tree: &Ast, parent: &Ast) -> String {
    let elements: Vec<String> = tree.children.iter().map(|element| lower_expr(ctx, actx, state, out, element)).collect();
    let value = format!("arr {} {}", elements.len(), elements.join(" "));
    let ty = parent.inferred_type().unwrap_or_default();
    let temp = state.fresh_temp();
    opcode::write_mov(out, &temp, &ty.marshal(), &value);
    temp
}

const ARITH_OPS: &[(Rule, &str)] = &[(Rule::Plus, "+"), (Rule::Minus, "-"), (Rule::Star, "*"), (Rule::Slash, "/")];
const BOOL_OPS: &[(Rule, &str)] = &[
    (Rule::Eq, "=="),
    (Rule::Ne, "!="),
    (Rule::Lt, "<"),
    (Rule::Gt, ">"),
    (Rule::Le, "<="),
    (Rule::Ge, ">="),
    (Rule::And, "&&"),
    (Rule::Or, "||"),
];

fn op_symbol(table: &[(Rule, &str)], rule: Rule) -> &'static str {
    table.iter().find(|(r, _)| *r == rule).map_or("?", |(_, sym)| sym)
}

/// Folds the flat `[operand, op, operand, op, operand, ...]` child list
/// respecting `*`/`/` binding tighter than `+`/`-` (the only two precedence
/// tiers this grammar has), emitting one `mov` per binary operator applied.
///
/// The analyzer only ever closes `inferred_type` on the wrapping `Expression`
/// node (`parent`), never on the `ArithmeticExpression` node itself — same
/// reasoning as `lower_array`'s use of `parent.inferred_type()`.
fn lower_arithmetic(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, out: &mut String, tree: &Ast, parent: &Ast) -> String {
    let ty = parent.inferred_type().unwrap_or_default();
    let mut values: Vec<String> = Vec::new();
    let mut ops: Vec<Rule> = Vec::new();
    for child in &tree.children {
        if child.rule.is_operator() {
            ops.push(child.rule);
        } else {
            values.push(lower_expr(ctx, actx, state, out, child));
        }
    }

    let mut i = 0;
    while i < ops.len() {
        if matches!(ops[i], Rule::Star | Rule::Slash) {
            let lhs = values.remove(i);
            let rhs = values.remove(i);
            let temp = state.fresh_temp();
            opcode::write_mov(out, &temp, &ty.marshal(), &format!("{} {lhs} {rhs}", op_symbol(ARITH_OPS, ops[i])));
            values.insert(i, temp);
            ops.remove(i);
        } else {
            i += 1;
        }
    }

    let mut acc = values.remove(0);
    for op in ops {
        let rhs = values.remove(0);
        let temp = state.fresh_temp();
        opcode::write_mov(out, &temp, &ty.marshal(), &format!("{} {acc} {rhs}", op_symbol(ARITH_OPS, op)));
        acc = temp;
    }
    acc
}

fn lower_boolean(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, out: &mut String, tree: &Ast) -> String {
    let mut values: Vec<String> = Vec::new();
    let mut ops: Vec<Rule> = Vec::new();
    for child in &tree.children {
        if child.rule.is_operator() {
            ops.push(child.rule);
        } else {
            values.push(lower_expr(ctx, actx, state, out, child));
        }
    }

    let mut acc = values.remove(0);
    for op in ops {
        let rhs = values.remove(0);
        let temp = state.fresh_temp();
        opcode::write_mov(out, &temp, "bool", &format!("{} {acc} {rhs}", op_symbol(BOOL_OPS, op)));
        acc = temp;
    }
    acc
}

fn trace_triple(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, node: &Ast) -> (String, String, String) {
    let file_index = actx.corpus.file_index(&actx.file.path).unwrap_or_default();
    let file_addr = ctx.traces.request_address(NumKey::new(file_index.to_string(), "file"));
    let line_addr = ctx.traces.request_address(NumKey::new(node.line.to_string(), "line"));
    let col_addr = ctx.traces.request_address(NumKey::new(node.column.to_string(), "col"));
    (file_addr, line_addr, col_addr)
}

fn lower_call(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, out: &mut String, tree: &Ast) -> String {
    let function = resolve_function(actx, tree.value())
        .unwrap_or_else(|| unreachable!("internal compiler error: undefined function `{}` survived analysis", tree.value()));
    let mangled = mangle_function(actx.corpus, function);
    let return_type = function.return_type.clone();

    let args: Vec<String> = tree.children.iter().map(|argument| lower_expr(ctx, actx, state, out, argument)).collect();
    let (file_addr, line_addr, col_addr) = trace_triple(ctx, actx, tree);

    let target = if return_type.base_name == "nothing" { None } else { Some(state.fresh_temp()) };
    opcode::write_call(out, &mangled, target.as_deref(), &args, &file_addr, &line_addr, &col_addr);
    target.unwrap_or_default()
}

fn lower_object_creation(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, out: &mut String, tree: &Ast) -> String {
    let name = tree.value();
    let module = resolve_module(actx, name)
        .unwrap_or_else(|| unreachable!("internal compiler error: undefined module `{name}` survived analysis"));
    let mangled_module = mangle_module(actx.corpus, module);

    let mut fields = Vec::new();
    for (field_name, property) in &module.declarations {
        let value = match &property.default {
            Some(default) => lower_expr(ctx, actx, state, out, default),
            None => zero_value(ctx, &property.ty),
        };
        let _ = field_name;
        fields.push(value);
    }

    let object_ty = Type::named(module.name.clone());
    let temp = state.fresh_temp();
    let mut co = String::new();
    opcode::write_co_header(&mut co, &mangled_module);
    co.push_str(&fields.join(" "));
    co.push(' ');
    opcode::write_end_co(&mut co);
    opcode::write_mov(out, &temp, &object_ty.marshal(), co.trim_end());

    if let Some(constructor) = module.constructor() {
        let ctor_mangled = mangle_method(actx.corpus, module, &module.name);
        let _ = constructor;
        let args: Vec<String> = tree.children.iter().map(|argument| lower_expr(ctx, actx, state, out, argument)).collect();
        let (file_addr, line_addr, col_addr) = trace_triple(ctx, actx, tree);
        opcode::write_call(out, &ctor_mangled, Some(&temp), &args, &file_addr, &line_addr, &col_addr);
    }

    temp
}

/// A default-less declared property gets a zero/empty initializer typed by
/// the field (§4.G: "incomplete (no default) fields get zero/empty
/// initializers typed by the field").
fn zero_value(ctx: &mut LowerCtx<'_>, ty: &Type) -> String {
    if ty.array_rank > 0 {
        return "arr 0".to_owned();
    }
    if !ty.is_primitive {
        return "__ZERO__".to_owned();
    }
    match ty.base_name.as_str() {
        "num" | "bool" => "0".to_owned(),
        "dec" => "0.0".to_owned(),
        "str" => ctx.strings.request_address(String::new()),
        _ => "0".to_owned(),
    }
}

fn lower_property(ctx: &mut LowerCtx<'_>, actx: &AnalysisContext<'_>, state: &mut FnState, out: &mut String, tree: &Ast) -> String {
    let base_tree = &tree.children[0];
    let mut current = lower_expr(ctx, actx, state, out, base_tree);
    let mut current_module_name = base_tree.inferred_type().map(|t| t.base_name);

    for step in &tree.children[1..] {
        let Some(module_name) = &current_module_name else {
            unreachable!("internal compiler error: property step on a non-module base survived analysis");
        };
        let module = actx
            .file
            .modules
            .get(module_name)
            .or_else(|| actx.file.imports.iter().find_map(|path| actx.corpus.get(path).and_then(|f| f.modules.get(module_name))))
            .unwrap_or_else(|| unreachable!("internal compiler error: undefined module `{module_name}` survived analysis"));

        let name = step.value();
        if module.declarations.contains_key(name) {
            let index = property_index(module, name);
            let ty = step.inferred_type().unwrap_or_default();
            let temp = state.fresh_temp();
            opcode::write_mov(out, &temp, &ty.marshal(), &format!("prop {current} {index}"));
            current = temp;
            current_module_name = step.inferred_type().map(|t| t.base_name);
        } else {
            let mangled = mangle_method(actx.corpus, module, name);
            let (file_addr, line_addr, col_addr) = trace_triple(ctx, actx, step);
            let return_type = step.inferred_type().unwrap_or_default();
            let target = if return_type.base_name == "nothing" { None } else { Some(state.fresh_temp()) };
            let args = [current.clone()];
            opcode::write_call(out, &mangled, target.as_deref(), &args, &file_addr, &line_addr, &col_addr);
            current = target.unwrap_or_default();
            current_module_name = Some(return_type.base_name);
        }
    }

    current
}
