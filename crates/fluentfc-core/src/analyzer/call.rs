//! Function-call and object-creation sub-rule.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::analyzer::frame::{AnalysisContext, Frame};
use crate::analyzer::object::Object;
use crate::ast::Ast;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::filecode::{Function, Module};
use crate::types::Type;

/// Finds a function visible from `ctx.file`: declared locally, or imported
/// and public (or imported and local to that file — imports never expose
/// private declarations across files).
pub(crate) fn resolve_function<'a>(ctx: &'a AnalysisContext<'a>, name: &str) -> Option<&'a Function> {
    if let Some(function) = ctx.file.functions.get(name) {
        return Some(function);
    }
    ctx.file.imports.iter().find_map(|path| {
        ctx.corpus.get(path).and_then(|file| file.functions.get(name)).filter(|f| f.is_public)
    })
}

/// As [`resolve_function`], for modules (used by object-creation).
pub fn resolve_module<'a>(ctx: &'a AnalysisContext<'a>, name: &str) -> Option<&'a Module> {
    if let Some(module) = ctx.file.modules.get(name) {
        return Some(module);
    }
    ctx.file.imports.iter().find_map(|path| {
        ctx.corpus.get(path).and_then(|file| file.modules.get(name)).filter(|m| m.is_public)
    })
}

/// Schedules one frame per argument (expected = the matching parameter's
/// type, `is_param = true`) and sets the call node's own `got` to the
/// callee's result type.
pub fn analyze_call<'a>(
    child: &'a Ast,
    ctx: &AnalysisContext<'_>,
    got: &Rc<RefCell<Object>>,
    queue: &mut VecDeque<Frame<'a>>,
    is_object_creation: bool,
) -> Result<(), Diagnostic> {
    let name = child.value();

    if is_object_creation {
        let module = resolve_module(ctx, name).ok_or_else(|| {
            Diagnostic::new(DiagnosticKind::UndefinedReference, child.line, child.column)
                .with_additional(vec![name.to_owned()])
        })?;

        let params: &[(String, Type)] = module.constructor().map_or(&[][..], |c| &c.params);
        schedule_arguments(child, params, queue)?;

        got.borrow_mut().base_name = module.name.clone();
        got.borrow_mut().is_primitive = false;
        got.borrow_mut().is_heap = true;
        return Ok(());
    }

    let function = resolve_function(ctx, name).ok_or_else(|| {
        Diagnostic::new(DiagnosticKind::UndefinedReference, child.line, child.column)
            .with_additional(vec![name.to_owned()])
    })?;

    schedule_arguments(child, &function.params, queue)?;

    let mut obj = got.borrow_mut();
    let old_pointer_rank = obj.pointer_rank;
    let return_type = function.return_type.clone();
    obj.base_name = return_type.base_name;
    obj.array_rank = return_type.array_rank;
    obj.is_primitive = return_type.is_primitive;
    obj.children = return_type.children;
    obj.pointer_rank = old_pointer_rank + i32::try_from(return_type.pointer_rank).unwrap_or(i32::MAX);
    obj.is_heap = function.is_std;
    Ok(())
}

fn schedule_arguments<'a>(
    child: &'a Ast,
    params: &[(String, Type)],
    queue: &mut VecDeque<Frame<'a>>,
) -> Result<(), Diagnostic> {
    if child.children.len() != params.len() {
        return Err(Diagnostic::new(DiagnosticKind::TypeMismatch, child.line, child.column)
            .with_additional(vec![format!("{} argument(s)", params.len()), format!("{} argument(s)", child.children.len())]));
    }

    for (argument, (_, param_type)) in child.children.iter().zip(params) {
        queue.push_back(Frame {
            expected: Rc::new(RefCell::new(param_type.clone())),
            got: Rc::new(RefCell::new(Object::default())),
            tree: argument,
            has_met_dereference: false,
            actual_pointers: 0,
            is_param: true,
            is_prop_reassignment: false,
            is_arithmetic: false,
            allowed_ids: None,
        });
    }

    Ok(())
}
