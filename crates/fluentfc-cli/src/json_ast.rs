//! A JSON encoding of the AST shape `fluentfc-core` expects, standing in for
//! the real lexer/parser (out of scope per the specification's §1 — "they
//! hand us an AST"). The harness reads one JSON document per source path;
//! production Fluent tooling would hand `fluentfc-core` the same shapes
//! directly, in memory, without ever touching this module.

use std::fs;
use std::path::Path;

use ahash::AHashSet;
use fluentfc_core::ast::{Ast, Rule};
use fluentfc_core::diagnostics::Location;
use fluentfc_core::filecode::{Function, Module, ParsedFile, Property, SourceLoader};
use fluentfc_core::types::Type;
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JsonNode {
    rule: String,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    column: u32,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    children: Vec<JsonNode>,
}

#[derive(Debug, Deserialize)]
struct JsonParam {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
struct JsonFunction {
    name: String,
    #[serde(default)]
    is_public: bool,
    #[serde(default)]
    params: Vec<JsonParam>,
    #[serde(rename = "return_type", default = "nothing_type")]
    return_type: String,
    body: JsonNode,
    #[serde(default)]
    templates: Vec<String>,
    #[serde(default)]
    is_std: bool,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    column: u32,
}

fn nothing_type() -> String {
    "nothing".to_owned()
}

#[derive(Debug, Deserialize)]
struct JsonProperty {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    default: Option<JsonNode>,
}

#[derive(Debug, Deserialize)]
struct JsonModule {
    name: String,
    #[serde(default)]
    is_public: bool,
    #[serde(default)]
    declarations: Vec<JsonProperty>,
    #[serde(default)]
    functions: Vec<JsonFunction>,
    #[serde(default)]
    templates: Vec<String>,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    column: u32,
}

#[derive(Debug, Deserialize)]
struct JsonFile {
    #[serde(default)]
    functions: Vec<JsonFunction>,
    #[serde(default)]
    modules: Vec<JsonModule>,
    #[serde(default)]
    imports: Vec<String>,
}

fn rule_from_name(name: &str) -> Result<Rule, String> {
    Ok(match name {
        "StringLiteral" => Rule::StringLiteral,
        "NumberLiteral" => Rule::NumberLiteral,
        "DecimalLiteral" => Rule::DecimalLiteral,
        "BooleanLiteral" => Rule::BooleanLiteral,
        "Identifier" => Rule::Identifier,
        "Array" => Rule::Array,
        "FunctionCall" => Rule::FunctionCall,
        "ObjectCreation" => Rule::ObjectCreation,
        "Expression" => Rule::Expression,
        "PropertyAccess" => Rule::PropertyAccess,
        "ArithmeticExpression" => Rule::ArithmeticExpression,
        "BooleanExpression" => Rule::BooleanExpression,
        "Pointer" => Rule::Pointer,
        "Dereference" => Rule::Dereference,
        "Const" => Rule::Const,
        "TypeAnnotation" => Rule::TypeAnnotation,
        "Plus" => Rule::Plus,
        "Minus" => Rule::Minus,
        "Star" => Rule::Star,
        "Slash" => Rule::Slash,
        "Eq" => Rule::Eq,
        "Ne" => Rule::Ne,
        "Lt" => Rule::Lt,
        "Gt" => Rule::Gt,
        "Le" => Rule::Le,
        "Ge" => Rule::Ge,
        "And" => Rule::And,
        "Or" => Rule::Or,
        "Declaration" => Rule::Declaration,
        "Reassignment" => Rule::Reassignment,
        "Return" => Rule::Return,
        "If" => Rule::If,
        "ElseIf" => Rule::ElseIf,
        "Else" => Rule::Else,
        "While" => Rule::While,
        "Block" => Rule::Block,
        "ExpressionStatement" => Rule::ExpressionStatement,
        "FunctionDecl" => Rule::FunctionDecl,
        "ModuleDecl" => Rule::ModuleDecl,
        "Import" => Rule::Import,
        "Param" => Rule::Param,
        "PropertyDecl" => Rule::PropertyDecl,
        other => return Err(format!("unknown AST rule `{other}`")),
    })
}

fn to_ast(node: JsonNode) -> Result<Ast, String> {
    let rule = rule_from_name(&node.rule)?;
    let children = node.children.into_iter().map(to_ast).collect::<Result<Vec<_>, _>>()?;
    let mut ast = Ast::new(rule, node.line, node.column).with_children(children);
    if let Some(value) = node.value {
        ast = ast.with_value(value);
    }
    Ok(ast)
}

fn parse_type(text: &str) -> Result<Type, String> {
    Type::parse(text).ok_or_else(|| format!("unparseable type `{text}`"))
}

fn to_function(json: JsonFunction, file_path: &str) -> Result<Function, String> {
    let mut params = Vec::with_capacity(json.params.len());
    for param in json.params {
        params.push((param.name, parse_type(&param.ty)?));
    }

    Ok(Function {
        name: json.name,
        is_public: json.is_public,
        params,
        return_type: parse_type(&json.return_type)?,
        body: to_ast(json.body)?,
        templates: json.templates.into_iter().collect::<AHashSet<_>>(),
        is_std: json.is_std,
        file_path: file_path.to_owned(),
        location: Location::new(file_path, json.line, json.column),
        local_index: 0,
    })
}

fn to_module(json: JsonModule, file_path: &str) -> Result<Module, String> {
    let mut declarations = IndexMap::new();
    for property in json.declarations {
        let default = property.default.map(to_ast).transpose()?;
        declarations.insert(property.name, Property { ty: parse_type(&property.ty)?, default });
    }

    let mut functions = IndexMap::new();
    for function in json.functions {
        functions.insert(function.name.clone(), to_function(function, file_path)?);
    }

    Ok(Module {
        name: json.name,
        is_public: json.is_public,
        declarations,
        functions,
        templates: json.templates.into_iter().collect::<AHashSet<_>>(),
        location: Location::new(file_path, json.line, json.column),
        file_path: file_path.to_owned(),
        local_index: 0,
    })
}

/// Reads `<path>` as a JSON-encoded [`JsonFile`] and converts it into the
/// `ParsedFile` the file-code graph (component C) expects.
#[derive(Debug, Default)]
pub struct JsonFileLoader;

impl SourceLoader for JsonFileLoader {
    fn load(&mut self, path: &str) -> Result<ParsedFile, String> {
        let text = fs::read_to_string(path).map_err(|err| format!("reading {path}: {err}"))?;
        let json: JsonFile = serde_json::from_str(&text).map_err(|err| format!("parsing {path}: {err}"))?;

        let functions = json
            .functions
            .into_iter()
            .map(|function| {
                let location = Location::new(path, function.line, function.column);
                to_function(function, path).map(|f| (f, location))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let modules = json
            .modules
            .into_iter()
            .map(|module| {
                let location = Location::new(path, module.line, module.column);
                to_module(module, path).map(|m| (m, location))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let imports = json.imports.into_iter().map(|import| (import, Location::new(path, 0, 0))).collect();

        Ok(ParsedFile { functions, modules, imports, raw: text })
    }
}

/// The JSON source-path convention this harness expects: a `.fluent` path's
/// actual JSON AST dump lives alongside it with a `.json` suffix appended, so
/// `@std`-rewritten and relative import paths need no special-casing.
#[must_use]
pub fn json_sidecar(path: &str) -> String {
    if Path::new(path).extension().is_some_and(|ext| ext == "json") {
        path.to_owned()
    } else {
        format!("{path}.json")
    }
}
