//! Statement/block analyzer (component E): dispatches statement kinds and
//! threads scope lifetimes.

use crate::analyzer::expr::analyze_expression;
use crate::analyzer::frame::AnalysisContext;
use crate::ast::{Ast, Rule};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Location};
use crate::filecode::Function;
use crate::scope::{ScopeId, ScopedStack, Variable};
use crate::types::Type;

/// Analyzes a function's body against its signature, returning the
/// non-fatal warnings collected (currently only `UnusedVariable`) or the
/// first fatal diagnostic.
pub fn analyze_function_body(function: &Function, ctx: &AnalysisContext<'_>) -> Result<Vec<Diagnostic>, Diagnostic> {
    check_main_constraints(function)?;

    let mut variables = ScopedStack::new();
    let scope = variables.new_scope();
    for (name, ty) in &function.params {
        variables.append(name.clone(), Variable::new(name.clone(), ty.clone(), false, false), function.location.line, function.location.column)?;
    }

    let mut warnings = Vec::new();
    let allowed_ids = [scope];
    analyze_statements(&function.body.children, ctx, &mut variables, &function.return_type, &allowed_ids, &mut warnings)?;

    let unused = variables.destroy_scope(scope);
    warnings.extend(unused_warnings(unused, &function.location));
    Ok(warnings)
}

/// Main must be private, parameterless, and return `nothing`.
fn check_main_constraints(function: &Function) -> Result<(), Diagnostic> {
    if function.name != "main" {
        return Ok(());
    }
    if function.is_public {
        return Err(Diagnostic::new(DiagnosticKind::TypeMismatch, function.location.line, function.location.column)
            .with_additional(vec!["main must not be public".to_owned()]));
    }
    if !function.params.is_empty() {
        return Err(Diagnostic::new(DiagnosticKind::TypeMismatch, function.location.line, function.location.column)
            .with_additional(vec!["main must take no parameters".to_owned()]));
    }
    if function.return_type.base_name != "nothing" {
        return Err(Diagnostic::new(DiagnosticKind::TypeMismatch, function.location.line, function.location.column)
            .with_additional(vec!["nothing".to_owned(), function.return_type.marshal()]));
    }
    Ok(())
}

fn unused_warnings(names: Vec<String>, location: &Location) -> Vec<Diagnostic> {
    names
        .into_iter()
        .map(|name| Diagnostic::new(DiagnosticKind::UnusedVariable, location.line, location.column).with_additional(vec![name]))
        .collect()
}

fn analyze_statements(
    statements: &[Ast],
    ctx: &AnalysisContext<'_>,
    variables: &mut ScopedStack,
    return_type: &Type,
    allowed_ids: &[ScopeId],
    warnings: &mut Vec<Diagnostic>,
) -> Result<(), Diagnostic> {
    for statement in statements {
        analyze_statement(statement, ctx, variables, return_type, allowed_ids, warnings)?;
    }
    Ok(())
}

fn analyze_block_in_new_scope(
    block: &Ast,
    ctx: &AnalysisContext<'_>,
    variables: &mut ScopedStack,
    return_type: &Type,
    allowed_ids: &[ScopeId],
    warnings: &mut Vec<Diagnostic>,
) -> Result<(), Diagnostic> {
    let scope = variables.new_scope();
    let mut branch_ids = allowed_ids.to_vec();
    branch_ids.push(scope);

    analyze_statements(&block.children, ctx, variables, return_type, &branch_ids, warnings)?;

    let unused = variables.destroy_scope(scope);
    warnings.extend(unused_warnings(unused, &Location::new(ctx.file.path.clone(), block.line, block.column)));
    Ok(())
}

fn analyze_statement(
    statement: &Ast,
    ctx: &AnalysisContext<'_>,
    variables: &mut ScopedStack,
    return_type: &Type,
    allowed_ids: &[ScopeId],
    warnings: &mut Vec<Diagnostic>,
) -> Result<(), Diagnostic> {
    match statement.rule {
        Rule::Declaration => analyze_declaration(statement, ctx, variables, allowed_ids),
        Rule::Reassignment => analyze_reassignment(statement, ctx, variables, allowed_ids),
        Rule::Return => analyze_return(statement, ctx, variables, return_type, allowed_ids),
        Rule::If => analyze_if(statement, ctx, variables, return_type, allowed_ids, warnings),
        Rule::While => analyze_while(statement, ctx, variables, return_type, allowed_ids, warnings),
        Rule::ExpressionStatement => {
            analyze_expression(&statement.children[0], ctx, variables, None, false, false, Some(allowed_ids))?;
            Ok(())
        }
        _ => Ok(()),
    }
}

fn analyze_declaration(
    statement: &Ast,
    ctx: &AnalysisContext<'_>,
    variables: &mut ScopedStack,
    allowed_ids: &[ScopeId],
) -> Result<(), Diagnostic> {
    let mut index = 0;
    let is_constant = statement.children.first().is_some_and(|child| child.rule == Rule::Const);
    if is_constant {
        index += 1;
    }

    let declared_type = match statement.children.get(index) {
        Some(annotation) if annotation.rule == Rule::TypeAnnotation => {
            index += 1;
            Type::parse(annotation.value()).ok_or_else(|| {
                Diagnostic::new(DiagnosticKind::TypeMismatch, annotation.line, annotation.column)
                    .with_additional(vec![annotation.value().to_owned()])
            })?
        }
        _ => Type::infer(),
    };

    let expr = &statement.children[index];
    let object = analyze_expression(expr, ctx, variables, Some(declared_type), false, true, Some(allowed_ids))?;
    let ty = object.to_type();

    variables.append(
        statement.value().to_owned(),
        Variable::new(statement.value(), ty, is_constant, object.is_heap),
        statement.line,
        statement.column,
    )
}

fn analyze_reassignment(
    statement: &Ast,
    ctx: &AnalysisContext<'_>,
    variables: &mut ScopedStack,
    allowed_ids: &[ScopeId],
) -> Result<(), Diagnostic> {
    let lhs = &statement.children[0];
    let rhs = &statement.children[1];

    let lhs_object = analyze_expression(lhs, ctx, variables, None, true, false, Some(allowed_ids))?;
    analyze_expression(rhs, ctx, variables, Some(lhs_object.to_type()), false, true, Some(allowed_ids))?;
    Ok(())
}

fn analyze_return(
    statement: &Ast,
    ctx: &AnalysisContext<'_>,
    variables: &mut ScopedStack,
    return_type: &Type,
    allowed_ids: &[ScopeId],
) -> Result<(), Diagnostic> {
    let Some(expr) = statement.children.first() else {
        return Ok(());
    };

    if return_type.base_name == "nothing" {
        return Err(Diagnostic::new(DiagnosticKind::ShouldNotReturn, expr.line, expr.column));
    }

    let object = analyze_expression(expr, ctx, variables, Some(return_type.clone()), false, true, Some(allowed_ids))?;
    if object.pointer_rank > 0 && !object.is_heap {
        return Err(Diagnostic::new(DiagnosticKind::DataOutlivesStack, expr.line, expr.column));
    }
    Ok(())
}

fn analyze_if(
    statement: &Ast,
    ctx: &AnalysisContext<'_>,
    variables: &mut ScopedStack,
    return_type: &Type,
    allowed_ids: &[ScopeId],
    warnings: &mut Vec<Diagnostic>,
) -> Result<(), Diagnostic> {
    let condition = &statement.children[0];
    analyze_expression(condition, ctx, variables, Some(Type::primitive("bool")), false, false, Some(allowed_ids))?;

    let then_block = &statement.children[1];
    analyze_block_in_new_scope(then_block, ctx, variables, return_type, allowed_ids, warnings)?;

    for clause in &statement.children[2..] {
        match clause.rule {
            Rule::ElseIf => {
                let clause_condition = &clause.children[0];
                analyze_expression(clause_condition, ctx, variables, Some(Type::primitive("bool")), false, false, Some(allowed_ids))?;
                analyze_block_in_new_scope(&clause.children[1], ctx, variables, return_type, allowed_ids, warnings)?;
            }
            Rule::Else => {
                analyze_block_in_new_scope(&clause.children[0], ctx, variables, return_type, allowed_ids, warnings)?;
            }
            _ => {}
        }
    }

    Ok(())
}

fn analyze_while(
    statement: &Ast,
    ctx: &AnalysisContext<'_>,
    variables: &mut ScopedStack,
    return_type: &Type,
    allowed_ids: &[ScopeId],
    warnings: &mut Vec<Diagnostic>,
) -> Result<(), Diagnostic> {
    let condition = &statement.children[0];
    analyze_expression(condition, ctx, variables, Some(Type::primitive("bool")), false, false, Some(allowed_ids))?;

    let body = &statement.children[1];
    analyze_block_in_new_scope(body, ctx, variables, return_type, allowed_ids, warnings)
}
