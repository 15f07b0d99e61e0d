//! Scoped symbol table (component B): nested scopes for variables and
//! unused-variable tracking.

use ahash::{AHashMap, AHashSet};

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind},
    types::Type,
};

/// Integer id identifying a scope; stable for the scope's lifetime.
pub type ScopeId = u32;

/// A variable bound in some scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    /// Forbids reassignment.
    pub is_constant: bool,
    /// The value's backing storage outlives the enclosing function.
    pub is_heap: bool,
}

impl Variable {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Type, is_constant: bool, is_heap: bool) -> Self {
        Self { name: name.into(), ty, is_constant, is_heap }
    }
}

#[derive(Debug, Default)]
struct Scope {
    variables: AHashMap<String, Variable>,
    used: AHashSet<String>,
}

/// A stack of scopes; lookup walks top-to-bottom, insertion targets the top.
#[derive(Debug, Default)]
pub struct ScopedStack {
    scopes: Vec<(ScopeId, Scope)>,
    next_id: ScopeId,
}

impl ScopedStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a fresh scope and returns its id.
    pub fn new_scope(&mut self) -> ScopeId {
        let id = self.next_id;
        self.next_id += 1;
        self.scopes.push((id, Scope::default()));
        id
    }

    /// Pops the scope identified by `id` (must be the top of the stack) and
    /// returns the names that were declared but never loaded — a name is
    /// "unused" iff it does not begin with `_` and was never loaded.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not the topmost scope; scopes are destroyed in
    /// strict LIFO order by construction (one scope per block/function body).
    pub fn destroy_scope(&mut self, id: ScopeId) -> Vec<String> {
        let (popped_id, scope) = self.scopes.pop().expect("destroy_scope called with no open scope");
        assert_eq!(popped_id, id, "scopes must be destroyed in LIFO order");

        scope
            .variables
            .keys()
            .filter(|name| !name.starts_with('_') && !scope.used.contains(*name))
            .cloned()
            .collect()
    }

    /// Inserts `variable` into the topmost scope. Duplicate insertion of the
    /// same name in the same scope is a `Redefinition` error.
    pub fn append(&mut self, name: impl Into<String>, variable: Variable, line: u32, column: u32) -> Result<(), Diagnostic> {
        let name = name.into();
        let (_, scope) = self.scopes.last_mut().expect("append called with no open scope");
        if scope.variables.contains_key(&name) {
            return Err(Diagnostic::new(DiagnosticKind::Redefinition, line, column).with_additional(vec![name]));
        }
        scope.variables.insert(name, variable);
        Ok(())
    }

    /// Returns the nearest-enclosing entry whose scope id is in
    /// `allowed_ids` (or any scope when `None`), marking it used.
    pub fn load(&mut self, name: &str, allowed_ids: Option<&[ScopeId]>) -> Option<Variable> {
        for (id, scope) in self.scopes.iter_mut().rev() {
            if let Some(allowed) = allowed_ids {
                if !allowed.contains(id) {
                    continue;
                }
            }
            if let Some(variable) = scope.variables.get(name) {
                scope.used.insert(name.to_owned());
                return Some(variable.clone());
            }
        }
        None
    }

    /// The id of the topmost (current) scope, if any.
    #[must_use]
    pub fn current_scope_id(&self) -> Option<ScopeId> {
        self.scopes.last().map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_isolation() {
        let mut stack = ScopedStack::new();
        let outer = stack.new_scope();
        stack.append("x", Variable::new("x", Type::primitive("num"), false, false), 1, 1).unwrap();

        let inner = stack.new_scope();
        assert!(stack.load("x", None).is_some());
        stack.destroy_scope(inner);

        assert!(stack.load("x", None).is_some());
        stack.destroy_scope(outer);
        assert!(stack.load("x", None).is_none());
    }

    #[test]
    fn unused_variable_detection() {
        let mut stack = ScopedStack::new();
        let scope = stack.new_scope();
        stack.append("used", Variable::new("used", Type::primitive("num"), false, false), 1, 1).unwrap();
        stack.append("unused", Variable::new("unused", Type::primitive("num"), false, false), 2, 1).unwrap();
        stack.append("_ignored", Variable::new("_ignored", Type::primitive("num"), false, false), 3, 1).unwrap();

        stack.load("used", None);

        let mut unused = stack.destroy_scope(scope);
        unused.sort();
        assert_eq!(unused, vec!["unused".to_owned()]);
    }

    #[test]
    fn redefinition_in_same_scope_is_an_error() {
        let mut stack = ScopedStack::new();
        stack.new_scope();
        stack.append("x", Variable::new("x", Type::primitive("num"), false, false), 1, 1).unwrap();
        let err = stack.append("x", Variable::new("x", Type::primitive("str"), false, false), 2, 1).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Redefinition);
    }

    #[test]
    fn allowed_ids_filters_lookup() {
        let mut stack = ScopedStack::new();
        let outer = stack.new_scope();
        stack.append("x", Variable::new("x", Type::primitive("num"), false, false), 1, 1).unwrap();
        let inner = stack.new_scope();

        assert!(stack.load("x", Some(&[inner])).is_none());
        assert!(stack.load("x", Some(&[outer, inner])).is_some());
    }
}
