//! Property-access sub-rule: `a.b.c` chains bottoming out in a property
//! (an l-value) or a method call (an r-value).

use crate::analyzer::call::resolve_module;
use crate::analyzer::expr::analyze_expression;
use crate::analyzer::frame::AnalysisContext;
use crate::analyzer::object::Object;
use crate::ast::{Ast, Rule};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::scope::{ScopeId, ScopedStack};

/// Finds the `Identifier` this (possibly pointer/dereference-prefixed)
/// subtree bottoms out in, if it is one directly (not a call or nested
/// computation) — used to decide whether `&` may be taken on the chain.
fn identifier_leaf(tree: &Ast) -> Option<&Ast> {
    let mut start = 0;
    for child in &tree.children {
        match child.rule {
            Rule::Pointer | Rule::Dereference => start += 1,
            _ => break,
        }
    }
    tree.children.get(start).filter(|node| node.rule == Rule::Identifier)
}

/// Resolves `child` (a `PropertyAccess` node: `children[0]` is the base
/// expression, `children[1..]` are `.name` identifier steps) and returns the
/// resulting object plus whether `&` may legally be taken on the chain.
///
/// Each step identifier's own `inferred_type` is stamped as it resolves, so
/// `lower_property` can read a step's type directly rather than re-deriving
/// it from the module table a second time.
pub fn analyze_property(
    child: &Ast,
    ctx: &AnalysisContext<'_>,
    variables: &mut ScopedStack,
    is_prop_reassignment: bool,
    allowed_ids: Option<&[ScopeId]>,
) -> Result<(Object, bool), Diagnostic> {
    let base_tree = &child.children[0];
    let base = analyze_expression(base_tree, ctx, variables, None, false, false, allowed_ids)?;

    let mutable_root = identifier_leaf(base_tree)
        .and_then(|identifier| variables.load(identifier.value(), allowed_ids))
        .is_some_and(|variable| !variable.is_constant);

    let mut current = base;
    let mut last_was_method = false;
    let steps = &child.children[1..];

    for (index, step) in steps.iter().enumerate() {
        let module = resolve_module(ctx, &current.base_name).ok_or_else(|| {
            Diagnostic::new(DiagnosticKind::TypeMismatch, step.line, step.column)
                .with_additional(vec!["Module".to_owned(), current.base_name.clone()])
        })?;
        let same_file = module.file_path == ctx.file.path;
        let name = step.value();
        let is_last = index == steps.len() - 1;

        if let Some(property) = module.declarations.get(name) {
            if !module.is_public && !same_file {
                return Err(Diagnostic::new(DiagnosticKind::UndefinedReference, step.line, step.column)
                    .with_additional(vec![name.to_owned()]));
            }
            current = Object::from_type(property.ty.clone(), false);
            step.set_inferred_type(current.to_type());
            last_was_method = false;
        } else if let Some(method) = module.functions.get(name) {
            if !method.is_public && !same_file {
                return Err(Diagnostic::new(DiagnosticKind::UndefinedReference, step.line, step.column)
                    .with_additional(vec![name.to_owned()]));
            }
            if !is_last {
                return Err(Diagnostic::new(DiagnosticKind::TypeMismatch, step.line, step.column)
                    .with_additional(vec!["Module".to_owned(), method.return_type.marshal()]));
            }
            current = Object::from_type(method.return_type.clone(), false);
            step.set_inferred_type(current.to_type());
            last_was_method = true;
        } else {
            return Err(Diagnostic::new(DiagnosticKind::UndefinedReference, step.line, step.column)
                .with_additional(vec![name.to_owned()]));
        }
    }

    if is_prop_reassignment && last_was_method {
        return Err(Diagnostic::new(DiagnosticKind::InvalidAssignmentTarget, child.line, child.column));
    }

    Ok((current, mutable_root))
}
