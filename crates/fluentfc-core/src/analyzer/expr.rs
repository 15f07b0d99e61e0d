//! The expression analyzer worklist (component D): the heart of the system.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::analyzer::arithmetic::analyze_arithmetic;
use crate::analyzer::array::analyze_array;
use crate::analyzer::boolean::analyze_boolean;
use crate::analyzer::call::analyze_call;
use crate::analyzer::frame::{AnalysisContext, Frame};
use crate::analyzer::object::{Object, StaticValue};
use crate::analyzer::property::analyze_property;
use crate::ast::{Ast, Rule};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::scope::ScopeId;
use crate::types::Type;

/// Analyzes one expression subtree against an (optionally absent) expected
/// type, returning the resulting object or the first diagnostic raised.
///
/// A single worklist of frames replaces recursive descent: each iteration
/// processes up to one syntactic layer and may push child frames — nested
/// parenthesized expressions are pushed to the *front* (processed next,
/// reusing the same `expected`/`got` slots as the parent); array elements,
/// arithmetic/boolean operands, and call arguments are pushed to the *back*.
pub fn analyze_expression(
    tree: &Ast,
    ctx: &AnalysisContext<'_>,
    variables: &mut crate::scope::ScopedStack,
    first_expected: Option<Type>,
    is_prop_reassignment: bool,
    allow_pointers: bool,
    allowed_ids: Option<&[ScopeId]>,
) -> Result<Object, Diagnostic> {
    if let Some(ty) = &first_expected {
        tree.set_inferred_type(ty.clone());
    }

    let mut queue: VecDeque<Frame<'_>> = VecDeque::new();
    let root = Frame::root(
        tree,
        first_expected.unwrap_or_default(),
        allow_pointers,
        is_prop_reassignment,
        allowed_ids.map(<[_]>::to_vec),
    );
    let result = Rc::clone(&root.got);
    let root_expected = Rc::clone(&root.expected);
    queue.push_back(root);

    while let Some(mut frame) = queue.pop_front() {
        let mut start_at = 0usize;
        let mut has_pointer_token = false;

        for modifier in &frame.tree.children {
            match modifier.rule {
                Rule::Pointer => {
                    start_at += 1;
                    has_pointer_token = true;
                    frame.got.borrow_mut().pointer_rank += 1;
                    if frame.has_met_dereference {
                        frame.actual_pointers += 1;
                    }
                }
                Rule::Dereference => {
                    start_at += 1;
                    frame.has_met_dereference = true;
                    frame.actual_pointers -= 1;
                    frame.got.borrow_mut().pointer_rank -= 1;
                }
                _ => break,
            }
        }

        if has_pointer_token && !frame.is_param {
            return Err(Diagnostic::new(DiagnosticKind::InvalidPointer, frame.tree.line, frame.tree.column));
        }

        let Some(child) = frame.tree.children.get(start_at) else {
            return Err(Diagnostic::new(DiagnosticKind::CannotInferType, frame.tree.line, frame.tree.column));
        };

        if child.rule.is_literal() && frame.got.borrow().pointer_rank > 0 {
            return Err(Diagnostic::new(DiagnosticKind::CannotTakeAddress, child.line, child.column));
        }

        let mut has_nested = false;

        match child.rule {
            Rule::StringLiteral => {
                let mut obj = frame.got.borrow_mut();
                obj.base_name = "str".to_owned();
                obj.is_primitive = true;
                obj.value = Some(StaticValue::Str(child.value().to_owned()));
            }
            Rule::NumberLiteral => {
                let mut obj = frame.got.borrow_mut();
                obj.base_name = "num".to_owned();
                obj.is_primitive = true;
                obj.value = Some(StaticValue::Num(child.value().to_owned()));
            }
            Rule::DecimalLiteral => {
                let mut obj = frame.got.borrow_mut();
                obj.base_name = "dec".to_owned();
                obj.is_primitive = true;
                obj.value = Some(StaticValue::Dec(child.value().to_owned()));
            }
            Rule::BooleanLiteral => {
                let mut obj = frame.got.borrow_mut();
                obj.base_name = "bool".to_owned();
                obj.is_primitive = true;
                obj.value = Some(StaticValue::Bool(child.value() == "true"));
            }
            Rule::Identifier => {
                let variable = variables.load(child.value(), frame.allowed_ids.as_deref()).ok_or_else(|| {
                    Diagnostic::new(DiagnosticKind::UndefinedReference, frame.tree.line, frame.tree.column)
                        .with_additional(vec![child.value().to_owned()])
                })?;

                if frame.is_prop_reassignment && variable.is_constant {
                    return Err(Diagnostic::new(DiagnosticKind::ConstantReassignment, frame.tree.line, frame.tree.column));
                }

                let mut obj = frame.got.borrow_mut();
                let old_pointer_rank = obj.pointer_rank;
                obj.base_name = variable.ty.base_name.clone();
                obj.array_rank = variable.ty.array_rank;
                obj.is_primitive = variable.ty.is_primitive;
                obj.children = variable.ty.children.clone();
                obj.pointer_rank = old_pointer_rank + i32::try_from(variable.ty.pointer_rank).unwrap_or(i32::MAX);
                obj.is_heap = variable.is_heap;
                drop(obj);
                frame.actual_pointers += i32::try_from(variable.ty.pointer_rank).unwrap_or(i32::MAX);
            }
            Rule::Array => {
                analyze_array(child, &frame.expected, &mut queue, frame.allowed_ids.as_deref())?;
                let expected_snapshot = frame.expected.borrow().clone();
                let mut obj = frame.got.borrow_mut();
                obj.base_name = expected_snapshot.base_name;
                obj.array_rank = expected_snapshot.array_rank;
                obj.is_primitive = expected_snapshot.is_primitive;
                obj.children = expected_snapshot.children;
            }
            Rule::FunctionCall | Rule::ObjectCreation => {
                frame.got.borrow_mut().is_heap = false;
                analyze_call(child, ctx, &frame.got, &mut queue, child.rule == Rule::ObjectCreation)?;
            }
            Rule::Expression => {
                has_nested = true;
                let expected_snapshot = frame.expected.borrow().clone();
                {
                    let mut obj = frame.got.borrow_mut();
                    obj.base_name = expected_snapshot.base_name;
                    obj.array_rank = expected_snapshot.array_rank;
                    obj.is_primitive = expected_snapshot.is_primitive;
                    obj.children = expected_snapshot.children;
                }
                queue.push_front(Frame {
                    expected: Rc::clone(&frame.expected),
                    got: Rc::clone(&frame.got),
                    tree: child,
                    has_met_dereference: frame.has_met_dereference,
                    actual_pointers: frame.actual_pointers,
                    is_param: frame.is_param,
                    is_prop_reassignment: false,
                    is_arithmetic: frame.is_arithmetic,
                    allowed_ids: frame.allowed_ids.clone(),
                });
            }
            Rule::PropertyAccess => {
                has_nested = false;
                frame.got.borrow_mut().is_heap = false;
                let (object, mutable_root) = analyze_property(
                    child,
                    ctx,
                    variables,
                    frame.is_prop_reassignment,
                    frame.allowed_ids.as_deref(),
                )?;
                if frame.got.borrow().pointer_rank > 0 && !mutable_root {
                    return Err(Diagnostic::new(DiagnosticKind::CannotTakeAddress, child.line, child.column));
                }
                let old_pointer_rank = frame.got.borrow().pointer_rank;
                *frame.got.borrow_mut() = object;
                frame.got.borrow_mut().pointer_rank += old_pointer_rank;
            }
            Rule::ArithmeticExpression => {
                analyze_arithmetic(child, &frame.expected, &mut queue, frame.allowed_ids.as_deref())?;
                let expected_snapshot = frame.expected.borrow().clone();
                let mut obj = frame.got.borrow_mut();
                obj.base_name = expected_snapshot.base_name;
                obj.is_primitive = expected_snapshot.is_primitive;
                obj.children = expected_snapshot.children;
            }
            Rule::BooleanExpression => {
                analyze_boolean(child, &mut queue, frame.allowed_ids.as_deref())?;
                let mut obj = frame.got.borrow_mut();
                obj.base_name = "bool".to_owned();
                obj.is_primitive = true;
            }
            _ => {}
        }

        if frame.expected.borrow().is_infer() {
            let got_type = frame.got.borrow().to_type();
            let mut expected = frame.expected.borrow_mut();
            let pointer_rank = expected.pointer_rank;
            let array_rank = expected.array_rank;
            *expected = got_type;
            expected.pointer_rank = pointer_rank;
            expected.array_rank = array_rank;
        }

        if !has_nested && frame.actual_pointers < 0 {
            return Err(Diagnostic::new(DiagnosticKind::InvalidDereference, frame.tree.line, frame.tree.column));
        }

        if has_nested {
            continue;
        }

        let expected_snapshot = frame.expected.borrow().clone();
        let got_type = frame.got.borrow().to_type();

        if !expected_snapshot.is_unconstrained() && !expected_snapshot.compare(&got_type) {
            return Err(Diagnostic::new(DiagnosticKind::TypeMismatch, frame.tree.line, frame.tree.column)
                .with_additional(vec![expected_snapshot.marshal(), got_type.marshal()]));
        }

        if frame.is_arithmetic && got_type.base_name != "num" && got_type.base_name != "dec" && !frame.got.borrow().is_infer() {
            return Err(Diagnostic::new(DiagnosticKind::TypeMismatch, frame.tree.line, frame.tree.column)
                .with_additional(vec!["num or dec".to_owned(), got_type.marshal()]));
        }

        if !got_type.base_name.is_empty() && frame.tree.inferred_type().is_none() {
            frame.tree.set_inferred_type(got_type);
        }
    }

    let mut object = result.borrow().clone();

    // `ArithmeticExpression` stamps its result from `expected` before its own
    // operand frames (merely enqueued, not yet run) have resolved it from the
    // infer sentinel — so once the worklist has fully drained, re-read the
    // shared slot those operands actually constrained.
    if object.is_infer() {
        let resolved = root_expected.borrow().clone();
        if !resolved.is_infer() {
            object.base_name = resolved.base_name;
            object.is_primitive = resolved.is_primitive;
            object.children = resolved.children;
        }
    }

    if !object.base_name.is_empty() {
        tree.set_inferred_type(object.to_type());
    }

    Ok(object)
}
