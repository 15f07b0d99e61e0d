//! End-to-end analyze-then-lower scenarios, driven through `compile` the way
//! the CLI harness drives it: build a small corpus by hand (standing in for
//! what the JSON AST loader would hand back) and check the emitted IR text.

use ahash::{AHashMap, AHashSet};
use fluentfc_core::{compile, Ast, Corpus, FileCode, Function, Location, NoPrecompiled, Rule, Type};
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

/// `pub fn sum(a: num, b: num): num { let total = a + b; return total; }`
///
/// Exercises shared-slot type inference (`total`'s declared type is never
/// annotated — it is inferred from the arithmetic expression's operands)
/// and the arithmetic-folding lowering path.
#[test]
fn arithmetic_with_inference_lowers_to_a_single_add_and_two_movs() {
    let mut arithmetic = Ast::new(Rule::ArithmeticExpression, 2, 17);
    arithmetic.children.push(expr_wrapper(ident("a")));
    arithmetic.children.push(Ast::new(Rule::Plus, 2, 19));
    arithmetic.children.push(expr_wrapper(ident("b")));

    let mut declaration = Ast::new(Rule::Declaration, 2, 5).with_value("total");
    declaration.children.push(expr_wrapper(arithmetic));

    let mut ret = Ast::new(Rule::Return, 3, 5);
    ret.children.push(expr_wrapper(ident("total")));

    let mut body = Ast::new(Rule::Block, 1, 1);
    body.children.push(declaration);
    body.children.push(ret);

    let function = Function {
        name: "sum".to_owned(),
        is_public: true,
        params: vec![("a".to_owned(), Type::primitive("num")), ("b".to_owned(), Type::primitive("num"))],
        return_type: Type::primitive("num"),
        body,
        templates: AHashSet::default(),
        is_std: false,
        file_path: "a.fluent".to_owned(),
        location: Location::new("a.fluent", 2, 1),
        local_index: 0,
    };

    let corpus = single_function_corpus(function);
    let output = compile(&corpus, &mut NoPrecompiled).unwrap();

    assert!(output.ir.contains("f__0_0:\n"));
    assert!(output.ir.contains("mov x2 num + x0 x1\n"));
    assert!(output.ir.contains("mov total num x2\n"));
    assert!(output.ir.contains("ret total\n"));
    assert!(output.warnings.is_empty());
}

/// `pub fn count_up(n: num): num { let i = 0; while i < n { i = i + 1; } return i; }`
///
/// Exercises block-addressed while-loop lowering: a jump into the condition
/// block, the condition block's own conditional branch to the body or out,
/// and the body's closing jump back to the condition.
#[test]
fn while_loop_lowers_to_a_jump_condition_body_cycle() {
    let declaration = {
        let mut d = Ast::new(Rule::Declaration, 2, 5).with_value("i");
        d.children.push(expr_wrapper(number("0")));
        d
    };

    let condition = {
        let mut cond = Ast::new(Rule::BooleanExpression, 3, 11);
        cond.children.push(expr_wrapper(ident("i")));
        cond.children.push(Ast::new(Rule::Lt, 3, 13));
        cond.children.push(expr_wrapper(ident("n")));
        cond
    };

    let reassignment = {
        let mut incremented = Ast::new(Rule::ArithmeticExpression, 4, 13);
        incremented.children.push(expr_wrapper(ident("i")));
        incremented.children.push(Ast::new(Rule::Plus, 4, 15));
        incremented.children.push(expr_wrapper(number("1")));

        let mut r = Ast::new(Rule::Reassignment, 4, 9);
        r.children.push(expr_wrapper(ident("i")));
        r.children.push(expr_wrapper(incremented));
        r
    };

    let mut while_body = Ast::new(Rule::Block, 3, 1);
    while_body.children.push(reassignment);

    let mut while_stmt = Ast::new(Rule::While, 3, 5);
    while_stmt.children.push(expr_wrapper(condition));
    while_stmt.children.push(while_body);

    let mut ret = Ast::new(Rule::Return, 5, 5);
    ret.children.push(expr_wrapper(ident("i")));

    let mut body = Ast::new(Rule::Block, 1, 1);
    body.children.push(declaration);
    body.children.push(while_stmt);
    body.children.push(ret);

    let function = Function {
        name: "count_up".to_owned(),
        is_public: true,
        params: vec![("n".to_owned(), Type::primitive("num"))],
        return_type: Type::primitive("num"),
        body,
        templates: AHashSet::default(),
        is_std: false,
        file_path: "a.fluent".to_owned(),
        location: Location::new("a.fluent", 2, 1),
        local_index: 0,
    };

    let corpus = single_function_corpus(function);
    let output = compile(&corpus, &mut NoPrecompiled).unwrap();

    assert!(output.ir.contains("jump __block_0__\n"));
    assert!(output.ir.contains("__block_0__:\n"));
    assert!(output.ir.contains("__block_1__:\n"));
    assert!(output.ir.contains("ret i\n"));
    assert!(output.warnings.is_empty());

    let condition_pos = output.ir.find("__block_0__:").unwrap();
    let body_pos = output.ir.find("__block_1__:").unwrap();
    let body_jump_back = output.ir[body_pos..].find("jump __block_0__").unwrap() + body_pos;
    assert!(condition_pos < body_pos, "condition block must be allocated before the body block");
    assert!(body_jump_back > body_pos, "body must close with a jump back to the condition");
}
