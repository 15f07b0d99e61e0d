//! File-code graph (component C): resolves imports into a map of per-file
//! functions and modules, detecting cycles and redefinitions.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;

use crate::{
    ast::Ast,
    diagnostics::{FatalError, Location},
    types::Type,
};

/// The sentinel prefix for standard-library imports, rewritten to the
/// configured std path with `::` replaced by the host path separator.
pub const STD_IMPORT_PREFIX: &str = "@std";

/// A function declaration.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub is_public: bool,
    pub params: Vec<(String, Type)>,
    pub return_type: Type,
    pub body: Ast,
    pub templates: AHashSet<String>,
    pub is_std: bool,
    pub file_path: String,
    pub location: Location,
    /// Position within this file's function list in source order; combined
    /// with the file's index in the corpus, this is the IR mangled name's
    /// `{file_index}_{local_index}` suffix (§4.G).
    pub local_index: u32,
}

/// A declared module property: its type and an optional default-value
/// expression (`None` marks an incomplete/required field).
#[derive(Debug)]
pub struct Property {
    pub ty: Type,
    pub default: Option<Ast>,
}

/// The language's named aggregate of properties and methods.
///
/// `declarations` preserves source order: constructors must initialize
/// fields in the order they were declared.
#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub is_public: bool,
    pub declarations: IndexMap<String, Property>,
    /// Declaration order is preserved: IR lowering assigns each method a
    /// stable `__m_<k>` suffix from its position here (§4.G).
    pub functions: IndexMap<String, Function>,
    pub templates: AHashSet<String>,
    pub location: Location,
    pub file_path: String,
    /// As [`Function::local_index`], for module mangling.
    pub local_index: u32,
}

impl Module {
    /// A module has a declared constructor iff a method's name equals the module's name.
    #[must_use]
    pub fn constructor(&self) -> Option<&Function> {
        self.functions.get(&self.name)
    }
}

/// What the external lexer/parser hands the file-code graph for one file.
pub struct ParsedFile {
    pub functions: Vec<(Function, Location)>,
    pub modules: Vec<(Module, Location)>,
    /// Import paths as written in source, in declaration order (std imports
    /// still carry the `@std` sentinel; rewriting happens in this module).
    pub imports: Vec<(String, Location)>,
    pub raw: String,
}

/// A single file's functions, modules, and resolved imports.
#[derive(Debug)]
pub struct FileCode {
    pub path: String,
    pub functions: AHashMap<String, Function>,
    pub modules: AHashMap<String, Module>,
    /// Resolved import paths, in source order.
    pub imports: Vec<String>,
    pub raw: String,
}

/// The full resolved corpus: path -> `FileCode`, plus the BFS discovery
/// order IR lowering uses as the `file_index` half of mangled names.
#[derive(Debug, Default)]
pub struct Corpus {
    pub files: AHashMap<String, FileCode>,
    pub file_order: Vec<String>,
}

impl Corpus {
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileCode> {
        self.files.get(path)
    }

    /// This file's position in BFS discovery order, the `file_index` used in
    /// mangled function/module names (§4.G).
    #[must_use]
    pub fn file_index(&self, path: &str) -> Option<u32> {
        self.file_order.iter().position(|p| p == path).map(|i| i as u32)
    }
}

/// The external lexer/parser collaborator: given a resolved file path,
/// produces its `ParsedFile` or a parse failure.
pub trait SourceLoader {
    fn load(&mut self, path: &str) -> Result<ParsedFile, String>;
}

/// Rewrites an `@std/...::...` import into a path rooted at `std_root`,
/// replacing `::` separators with the host path separator. Only recognized
/// when `@std` is the literal first path segment.
#[must_use]
pub fn rewrite_std_import(import: &str, std_root: &str) -> Option<String> {
    let rest = import.strip_prefix(STD_IMPORT_PREFIX)?;
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let rewritten = rest.split("::").collect::<Vec<_>>().join(std::path::MAIN_SEPARATOR_STR);
    Some(format!("{std_root}{}{rewritten}", std::path::MAIN_SEPARATOR))
}

/// Resolves the import graph starting at `entry`, breadth-first.
///
/// A per-file set suppresses duplicate std imports within that file; a
/// global `seen` set detects cycles among non-std files — if a non-std file
/// reappears, the returned error names the full import chain from `entry`
/// down to the re-visited file, with that file repeated at the end.
pub fn resolve_imports(
    entry: &str,
    std_root: &str,
    loader: &mut impl SourceLoader,
) -> Result<Corpus, FatalError> {
    let mut corpus = Corpus::default();
    let mut seen: AHashSet<String> = AHashSet::default();
    // chain[path] = the import path from entry down to (not including) path.
    let mut chains: AHashMap<String, Vec<String>> = AHashMap::default();
    chains.insert(entry.to_owned(), Vec::new());

    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(entry.to_owned());
    seen.insert(entry.to_owned());

    while let Some(path) = queue.pop_front() {
        let parsed = loader
            .load(&path)
            .map_err(|message| FatalError::Parse { file: path.clone(), message })?;

        let mut functions = AHashMap::default();
        for (index, (mut function, location)) in parsed.functions.into_iter().enumerate() {
            check_redefinition(&functions, &AHashMap::default(), &function.name, &location)?;
            function.local_index = index as u32;
            functions.insert(function.name.clone(), function);
        }

        let mut modules = AHashMap::default();
        for (index, (mut module, location)) in parsed.modules.into_iter().enumerate() {
            check_redefinition(&functions, &modules, &module.name, &location)?;
            module.local_index = index as u32;
            modules.insert(module.name.clone(), module);
        }

        let mut resolved_imports = Vec::new();
        let mut std_seen_this_file: AHashSet<String> = AHashSet::default();
        let chain_so_far = chains.get(&path).cloned().unwrap_or_default();

        for (import, _location) in parsed.imports {
            let is_std = import.starts_with(STD_IMPORT_PREFIX);
            let resolved = if is_std {
                rewrite_std_import(&import, std_root).unwrap_or(import.clone())
            } else {
                import.clone()
            };

            if is_std {
                if !std_seen_this_file.insert(resolved.clone()) {
                    continue;
                }
                resolved_imports.push(resolved);
                continue;
            }

            resolved_imports.push(resolved.clone());

            if seen.contains(&resolved) {
                let mut full_chain = chain_so_far.clone();
                full_chain.push(path.clone());
                full_chain.push(resolved.clone());
                return Err(FatalError::CircularImport { chain: full_chain });
            }

            seen.insert(resolved.clone());
            let mut child_chain = chain_so_far.clone();
            child_chain.push(path.clone());
            chains.insert(resolved.clone(), child_chain);
            queue.push_back(resolved);
        }

        corpus.file_order.push(path.clone());
        corpus.files.insert(
            path.clone(),
            FileCode { path, functions, modules, imports: resolved_imports, raw: parsed.raw },
        );
    }

    Ok(corpus)
}

fn check_redefinition(
    functions: &AHashMap<String, Function>,
    modules: &AHashMap<String, Module>,
    name: &str,
    location: &Location,
) -> Result<(), FatalError> {
    if let Some(existing) = functions.get(name) {
        return Err(FatalError::Redefinition {
            name: name.to_owned(),
            first: existing.location.clone(),
            second: location.clone(),
        });
    }
    if let Some(existing) = modules.get(name) {
        return Err(FatalError::Redefinition {
            name: name.to_owned(),
            first: existing.location.clone(),
            second: location.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_function(name: &str, file: &str) -> (Function, Location) {
        (
            Function {
                name: name.to_owned(),
                is_public: true,
                params: Vec::new(),
                return_type: Type::primitive("nothing"),
                body: Ast::new(crate::ast::Rule::Block, 1, 1),
                templates: AHashSet::default(),
                is_std: false,
                file_path: file.to_owned(),
                location: Location::new(file, 1, 1),
                local_index: 0,
            },
            Location::new(file, 1, 1),
        )
    }

    struct MapLoader(AHashMap<String, ParsedFile>);

    impl SourceLoader for MapLoader {
        fn load(&mut self, path: &str) -> Result<ParsedFile, String> {
            self.0.remove(path).ok_or_else(|| format!("no such file: {path}"))
        }
    }

    #[test]
    fn rewrite_std_import_replaces_separators() {
        let rewritten = rewrite_std_import("@std/io::file", "/opt/fluent/std").unwrap();
        assert_eq!(rewritten, format!("/opt/fluent/std{0}io{0}file", std::path::MAIN_SEPARATOR));
    }

    #[test]
    fn non_std_import_is_untouched() {
        assert!(rewrite_std_import("./sibling.fluent", "/opt/fluent/std").is_none());
    }

    #[test]
    fn resolves_a_linear_import_chain() {
        let mut files = AHashMap::default();
        files.insert(
            "a".to_owned(),
            ParsedFile { functions: vec![dummy_function("main", "a")], modules: vec![], imports: vec![("b".to_owned(), Location::new("a", 1, 1))], raw: String::new() },
        );
        files.insert(
            "b".to_owned(),
            ParsedFile { functions: vec![dummy_function("helper", "b")], modules: vec![], imports: vec![], raw: String::new() },
        );
        let mut loader = MapLoader(files);
        let corpus = resolve_imports("a", "/std", &mut loader).unwrap();
        assert!(corpus.get("a").is_some());
        assert!(corpus.get("b").is_some());
    }

    #[test]
    fn detects_a_three_file_cycle() {
        let mut files = AHashMap::default();
        files.insert(
            "a".to_owned(),
            ParsedFile { functions: vec![], modules: vec![], imports: vec![("b".to_owned(), Location::new("a", 1, 1))], raw: String::new() },
        );
        files.insert(
            "b".to_owned(),
            ParsedFile { functions: vec![], modules: vec![], imports: vec![("c".to_owned(), Location::new("b", 1, 1))], raw: String::new() },
        );
        files.insert(
            "c".to_owned(),
            ParsedFile { functions: vec![], modules: vec![], imports: vec![("a".to_owned(), Location::new("c", 1, 1))], raw: String::new() },
        );
        let mut loader = MapLoader(files);
        let err = resolve_imports("a", "/std", &mut loader).unwrap_err();
        match err {
            FatalError::CircularImport { chain } => {
                assert_eq!(chain, vec!["a".to_owned(), "b".to_owned(), "c".to_owned(), "a".to_owned()]);
            }
            other => panic!("expected CircularImport, got {other:?}"),
        }
    }

    #[test]
    fn redefinition_of_function_and_module_is_reported_on_both_sites() {
        let mut files = AHashMap::default();
        let (function, _) = dummy_function("Thing", "a");
        let module = Module {
            name: "Thing".to_owned(),
            is_public: true,
            declarations: IndexMap::new(),
            functions: IndexMap::new(),
            templates: AHashSet::default(),
            location: Location::new("a", 10, 1),
            file_path: "a".to_owned(),
            local_index: 0,
        };
        files.insert(
            "a".to_owned(),
            ParsedFile {
                functions: vec![(function, Location::new("a", 1, 1))],
                modules: vec![(module, Location::new("a", 10, 1))],
                imports: vec![],
                raw: String::new(),
            },
        );
        let mut loader = MapLoader(files);
        let err = resolve_imports("a", "/std", &mut loader).unwrap_err();
        match err {
            FatalError::Redefinition { name, first, second } => {
                assert_eq!(name, "Thing");
                assert_eq!(first.line, 1);
                assert_eq!(second.line, 10);
            }
            other => panic!("expected Redefinition, got {other:?}"),
        }
    }
}
