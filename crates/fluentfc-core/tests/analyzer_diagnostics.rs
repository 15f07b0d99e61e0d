//! Boundary diagnostic cases driven end-to-end through `compile`, rather than
//! through the per-rule analyzer unit tests each module already carries.

use ahash::{AHashMap, AHashSet};
use fluentfc_core::{compile, Ast, CompileError, Corpus, DiagnosticKind, FileCode, Function, Location, NoPrecompiled, Rule, Type};
use pretty_assertions::assert_eq;

fn expr_wrapper(inner: Ast) -> Ast {
    Ast::new(Rule::Expression, inner.line, inner.column).with_children(vec![inner])
}

fn ident(name: &str) -> Ast {
    Ast::new(Rule::Identifier, 1, 1).with_value(name)
}

fn number(text: &str) -> Ast {
    Ast::new(Rule::NumberLiteral, 1, 1).with_value(text)
}

fn single_function_corpus(function: Function) -> Corpus {
    let mut functions = AHashMap::default();
    let name = function.name.clone();
    functions.insert(name, function);
    let file = FileCode { path: "a.fluent".to_owned(), functions, modules: AHashMap::default(), imports: Vec::new(), raw: String::new() };

    let mut corpus = Corpus::default();
    corpus.file_order.push("a.fluent".to_owned());
    corpus.files.insert("a.fluent".to_owned(), file);
    corpus
}

fn compile_one(function: Function) -> Result<fluentfc_core::CompileOutput, CompileError> {
    let corpus = single_function_corpus(function);
    compile(&corpus, &mut NoPrecompiled)
}

fn bare_function(name: &str, return_type: Type, params: Vec<(String, Type)>, body: Ast) -> Function {
    Function {
        name: name.to_owned(),
        is_public: true,
        params,
        return_type,
        body,
        templates: AHashSet::default(),
        is_std: false,
        file_path: "a.fluent".to_owned(),
        location: Location::new("a.fluent", 1, 1),
        local_index: 0,
    }
}

/// `fn main(): num { return 1; }` — wrong return type.
#[test]
fn main_must_return_nothing() {
    let mut ret = Ast::new(Rule::Return, 1, 1);
    ret.children.push(expr_wrapper(number("1")));
    let mut body = Ast::new(Rule::Block, 1, 1);
    body.children.push(ret);

    let mut function = bare_function("main", Type::primitive("num"), Vec::new(), body);
    function.is_public = false;
    let err = compile_one(function).unwrap_err();
    assert_eq!(err.diagnostic.kind, DiagnosticKind::TypeMismatch);
}

/// `fn main(a: num) { }` — main must take no parameters.
#[test]
fn main_must_take_no_parameters() {
    let body = Ast::new(Rule::Block, 1, 1);
    let mut function = bare_function("main", Type::primitive("nothing"), vec![("a".to_owned(), Type::primitive("num"))], body);
    function.is_public = false;
    let err = compile_one(function).unwrap_err();
    assert_eq!(err.diagnostic.kind, DiagnosticKind::TypeMismatch);
}

/// `fn nothing_fn() { return 1; }` — returning a value from a `nothing`-returning function.
#[test]
fn returning_a_value_from_a_nothing_function_is_rejected() {
    let mut ret = Ast::new(Rule::Return, 2, 5);
    ret.children.push(expr_wrapper(number("1")));
    let mut body = Ast::new(Rule::Block, 1, 1);
    body.children.push(ret);

    let function = bare_function("helper", Type::primitive("nothing"), Vec::new(), body);
    let err = compile_one(function).unwrap_err();
    assert_eq!(err.diagnostic.kind, DiagnosticKind::ShouldNotReturn);
}

/// `fn broken(): num { return missing; }` — an identifier nothing declares.
#[test]
fn an_undefined_identifier_is_reported() {
    let mut ret = Ast::new(Rule::Return, 2, 5);
    ret.children.push(expr_wrapper(ident("missing")));
    let mut body = Ast::new(Rule::Block, 1, 1);
    body.children.push(ret);

    let function = bare_function("broken", Type::primitive("num"), Vec::new(), body);
    let err = compile_one(function).unwrap_err();
    assert_eq!(err.diagnostic.kind, DiagnosticKind::UndefinedReference);
}

/// `fn broken(): num { const x = 1; x = 2; return x; }` — reassigning a `const`.
#[test]
fn reassigning_a_constant_binding_is_rejected() {
    let mut declaration = Ast::new(Rule::Declaration, 2, 5).with_value("x");
    declaration.children.push(Ast::new(Rule::Const, 2, 5));
    declaration.children.push(expr_wrapper(number("1")));

    let mut reassignment = Ast::new(Rule::Reassignment, 3, 5);
    reassignment.children.push(expr_wrapper(ident("x")));
    reassignment.children.push(expr_wrapper(number("2")));

    let mut ret = Ast::new(Rule::Return, 4, 5);
    ret.children.push(expr_wrapper(ident("x")));

    let mut body = Ast::new(Rule::Block, 1, 1);
    body.children.push(declaration);
    body.children.push(reassignment);
    body.children.push(ret);

    let function = bare_function("broken", Type::primitive("num"), Vec::new(), body);
    let err = compile_one(function).unwrap_err();
    assert_eq!(err.diagnostic.kind, DiagnosticKind::ConstantReassignment);
}

/// `fn broken(a: num): num { return *a; }` — dereferencing a non-pointer.
#[test]
fn dereferencing_past_a_type_pointer_rank_of_zero_is_rejected() {
    let mut deref_expr = Ast::new(Rule::Expression, 1, 1);
    deref_expr.children.push(Ast::new(Rule::Dereference, 1, 1));
    deref_expr.children.push(ident("a"));

    let mut ret = Ast::new(Rule::Return, 1, 1);
    ret.children.push(deref_expr);
    let mut body = Ast::new(Rule::Block, 1, 1);
    body.children.push(ret);

    let function = bare_function("broken", Type::primitive("num"), vec![("a".to_owned(), Type::primitive("num"))], body);
    let err = compile_one(function).unwrap_err();
    assert_eq!(err.diagnostic.kind, DiagnosticKind::InvalidDereference);
}

/// `fn broken(): &num { return &1; }` — taking the address of a literal.
#[test]
fn taking_the_address_of_a_literal_is_rejected() {
    let mut address_expr = Ast::new(Rule::Expression, 1, 1);
    address_expr.children.push(Ast::new(Rule::Pointer, 1, 1));
    address_expr.children.push(number("1"));

    let mut ret = Ast::new(Rule::Return, 1, 1);
    ret.children.push(address_expr);
    let mut body = Ast::new(Rule::Block, 1, 1);
    body.children.push(ret);

    let return_type = Type { base_name: "num".to_owned(), pointer_rank: 1, ..Type::default() };
    let function = bare_function("broken", return_type, Vec::new(), body);
    let err = compile_one(function).unwrap_err();
    assert_eq!(err.diagnostic.kind, DiagnosticKind::CannotTakeAddress);
}

/// `fn add(a: num, b: num): num { return a; }` and `fn broken(x: num): num
/// { return add(x); }` — `add` takes two arguments, `broken` passes one.
#[test]
fn calling_a_function_with_the_wrong_argument_count_is_rejected() {
    let mut callee_ret = Ast::new(Rule::Return, 1, 1);
    callee_ret.children.push(expr_wrapper(ident("a")));
    let mut callee_body = Ast::new(Rule::Block, 1, 1);
    callee_body.children.push(callee_ret);
    let callee = bare_function(
        "add",
        Type::primitive("num"),
        vec![("a".to_owned(), Type::primitive("num")), ("b".to_owned(), Type::primitive("num"))],
        callee_body,
    );

    let mut call = Ast::new(Rule::FunctionCall, 2, 5).with_value("add");
    call.children.push(expr_wrapper(ident("x")));

    let mut ret = Ast::new(Rule::Return, 2, 5);
    ret.children.push(expr_wrapper(call));

    let mut body = Ast::new(Rule::Block, 1, 1);
    body.children.push(ret);
    let caller = bare_function("broken", Type::primitive("num"), vec![("x".to_owned(), Type::primitive("num"))], body);

    let mut functions = AHashMap::default();
    functions.insert("add".to_owned(), callee);
    functions.insert("broken".to_owned(), caller);
    let file = FileCode { path: "a.fluent".to_owned(), functions, modules: AHashMap::default(), imports: Vec::new(), raw: String::new() };

    let mut corpus = Corpus::default();
    corpus.file_order.push("a.fluent".to_owned());
    corpus.files.insert("a.fluent".to_owned(), file);

    let err = compile(&corpus, &mut NoPrecompiled).unwrap_err();
    assert_eq!(err.diagnostic.kind, DiagnosticKind::TypeMismatch);
}

/// `fn leaks(): &num { let x = 1; return &x; }` — a pointer to a non-heap
/// stack local must not escape the function.
#[test]
fn returning_the_address_of_a_stack_local_is_rejected() {
    let declaration = {
        let mut d = Ast::new(Rule::Declaration, 1, 1).with_value("x");
        d.children.push(expr_wrapper(number("1")));
        d
    };

    let mut address_expr = Ast::new(Rule::Expression, 2, 5);
    address_expr.children.push(Ast::new(Rule::Pointer, 2, 5));
    address_expr.children.push(ident("x"));

    let mut ret = Ast::new(Rule::Return, 2, 5);
    ret.children.push(address_expr);

    let mut body = Ast::new(Rule::Block, 1, 1);
    body.children.push(declaration);
    body.children.push(ret);

    let return_type = Type { base_name: "num".to_owned(), pointer_rank: 1, ..Type::default() };
    let function = bare_function("leaks", return_type, Vec::new(), body);
    let err = compile_one(function).unwrap_err();
    assert_eq!(err.diagnostic.kind, DiagnosticKind::DataOutlivesStack);
}
