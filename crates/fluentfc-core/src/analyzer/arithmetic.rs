//! Arithmetic-expression sub-rule: `+ - * /` over `num`/`dec` operands.
//!
//! Structural validity (alternating operand/operator, balanced parentheses)
//! is guaranteed by the external parser; this sub-rule only type-checks.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::analyzer::frame::Frame;
use crate::analyzer::object::Object;
use crate::ast::{Ast, Rule};
use crate::diagnostics::Diagnostic;
use crate::scope::ScopeId;
use crate::types::Type;

/// Operands share one `expected` slot (an infer sentinel unless the caller
/// supplied a concrete numeric expectation) so the first resolved operand's
/// concrete type constrains the rest — this is what rejects mixed `num`/`dec`.
pub fn analyze_arithmetic<'a>(
    tree: &'a Ast,
    expected: &Rc<RefCell<Type>>,
    queue: &mut VecDeque<Frame<'a>>,
    allowed_ids: Option<&[ScopeId]>,
) -> Result<(), Diagnostic> {
    let shared_expected = Rc::clone(expected);

    for operand in tree.children.iter().filter(|child| !child.rule.is_operator()) {
        queue.push_back(Frame {
            expected: Rc::clone(&shared_expected),
            got: Rc::new(RefCell::new(Object::default())),
            tree: operand,
            has_met_dereference: false,
            actual_pointers: 0,
            is_param: true,
            is_prop_reassignment: false,
            is_arithmetic: true,
            allowed_ids: allowed_ids.map(<[_]>::to_vec),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedules_one_frame_per_non_operator_child() {
        let mut tree = Ast::new(Rule::ArithmeticExpression, 1, 1);
        tree.children.push(Ast::new(Rule::NumberLiteral, 1, 1).with_value("2"));
        tree.children.push(Ast::new(Rule::Plus, 1, 2));
        tree.children.push(Ast::new(Rule::NumberLiteral, 1, 3).with_value("3"));

        let expected = Rc::new(RefCell::new(Type::infer()));
        let mut queue = VecDeque::new();
        analyze_arithmetic(&tree, &expected, &mut queue, None).unwrap();
        assert_eq!(queue.len(), 2);
        assert!(queue.iter().all(|frame| frame.is_arithmetic));
    }
}
