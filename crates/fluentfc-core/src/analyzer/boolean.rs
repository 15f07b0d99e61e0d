//! Boolean-expression sub-rule: comparisons and logical `&&`/`||`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::analyzer::frame::Frame;
use crate::analyzer::object::Object;
use crate::ast::Ast;
use crate::diagnostics::Diagnostic;
use crate::scope::ScopeId;
use crate::types::Type;

/// Two shapes: a comparison (`==`, `!=`, `<`, `>`, `<=`, `>=`) requires its
/// two operands be structurally equal (any type); a logical expression
/// (`&&`, `||`) requires every operand be `bool`. Distinguished by the
/// operator leaves actually present — the parser only ever mixes one kind
/// per node.
pub fn analyze_boolean<'a>(
    tree: &'a Ast,
    queue: &mut VecDeque<Frame<'a>>,
    allowed_ids: Option<&[ScopeId]>,
) -> Result<(), Diagnostic> {
    let is_logical = tree.children.iter().any(|child| child.rule.is_logical());
    let shared_expected = if is_logical {
        Rc::new(RefCell::new(Type::primitive("bool")))
    } else {
        Rc::new(RefCell::new(Type::infer()))
    };

    for operand in tree.children.iter().filter(|child| !child.rule.is_operator()) {
        queue.push_back(Frame {
            expected: Rc::clone(&shared_expected),
            got: Rc::new(RefCell::new(Object::default())),
            tree: operand,
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
