//! The worklist entry and the collaborators expression analysis needs
//! beyond the AST itself.

use std::cell::RefCell;
use std::rc::Rc;

use crate::analyzer::object::Object;
use crate::ast::Ast;
use crate::filecode::{Corpus, FileCode};
use crate::scope::ScopeId;
use crate::types::Type;

/// The file currently under analysis and the corpus it can import from.
///
/// Grouped the way the Design Notes ask for `CompileContext`-adjacent
/// collaborators to be grouped: passed by reference, never stored globally.
pub struct AnalysisContext<'a> {
    pub file: &'a FileCode,
    pub corpus: &'a Corpus,
}

/// One entry in the expression-analyzer worklist.
///
/// `expected` and `got` are reference-counted so that nested parenthesized
/// expressions and array/arithmetic siblings can share the same mutable
/// slot the way the original's raw `*TypeWrapper` / `*Object` pointers did —
/// the first sibling to resolve an infer sentinel constrains every other
/// sibling sharing the same `expected`.
pub struct Frame<'a> {
    pub expected: Rc<RefCell<Type>>,
    pub got: Rc<RefCell<Object>>,
    pub tree: &'a Ast,
    pub has_met_dereference: bool,
    pub actual_pointers: i32,
    /// Pointers are only legal in argument/return/declaration position.
    pub is_param: bool,
    pub is_prop_reassignment: bool,
    pub is_arithmetic: bool,
    pub allowed_ids: Option<Vec<ScopeId>>,
}

impl<'a> Frame<'a> {
    #[must_use]
    pub fn root(tree: &'a Ast, expected: Type, is_param: bool, is_prop_reassignment: bool, allowed_ids: Option<Vec<ScopeId>>) -> Self {
        Self {
            expected: Rc::new(RefCell::new(expected)),
            got: Rc::new(RefCell::new(Object::default())),
            tree,
            has_met_dereference: false,
            actual_pointers: 0,
            is_param,
            is_prop_reassignment,
            is_arithmetic: false,
            allowed_ids,
        }
    }
}
