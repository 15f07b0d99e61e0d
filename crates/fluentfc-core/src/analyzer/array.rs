//! Array-literal sub-rule.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::analyzer::frame::Frame;
use crate::analyzer::object::Object;
use crate::ast::Ast;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::scope::ScopeId;
use crate::types::Type;

/// Schedules one frame per array element, all sharing a single decremented
/// clone of `expected` so that every element constrains (and is constrained
/// by) its siblings — mirrors the original's one shared `*TypeWrapper` clone
/// across all element `ExpectedPair`s.
pub fn analyze_array<'a>(
    tree: &'a Ast,
    expected: &Rc<RefCell<Type>>,
    queue: &mut VecDeque<Frame<'a>>,
    allowed_ids: Option<&[ScopeId]>,
) -> Result<(), Diagnostic> {
    let expected_snapshot = expected.borrow().clone();

    if expected_snapshot.array_rank < 1 && expected_snapshot.base_name.is_empty() {
        return Err(Diagnostic::new(DiagnosticKind::CannotInferType, tree.line, tree.column));
    }
    if expected_snapshot.array_rank < 1 {
        return Err(Diagnostic::new(DiagnosticKind::TypeMismatch, tree.line, tree.column)
            .with_additional(vec![expected_snapshot.marshal(), "unknown[]".to_owned()]));
    }

    if tree.children.is_empty() {
        return Ok(());
    }

    let element_expected = Rc::new(RefCell::new(expected_snapshot.with_array_rank_decremented()));

    for element in &tree.children {
        queue.push_back(Frame {
            expected: Rc::clone(&element_expected),
            got: Rc::new(RefCell::new(Object::default())),
            tree: element,
            has_met_dereference: false,
            actual_pointers: 0,
            is_param: true,
            is_prop_reassignment: false,
            is_arithmetic: false,
            allowed_ids: allowed_ids.map(<[_]>::to_vec),
        });
    }

    Ok(())
}
