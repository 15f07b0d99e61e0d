use std::path::Path;
use std::{env, process::ExitCode};

use fluentfc_core::compile::{compile, location_of, PrecompiledLookup};
use fluentfc_core::diagnostics::FatalError;
use fluentfc_core::filecode::resolve_imports;

mod json_ast;

use json_ast::JsonFileLoader;

/// Names the root of the standard-library tree, matching the original
/// `FLUENT_STD_PATH` convention. Defaults to a sibling `std` directory.
const STD_PATH_VAR: &str = "FLUENT_STD_PATH";

/// Looks for a precompiled `.ll` sibling under
/// `<std_root>/include/{posix,win}/<relative-path>.ll`, exactly as the
/// original build command's standard-library short-circuit does (§4.G).
struct FsPrecompiledLookup<'a> {
    std_root: &'a str,
}

impl PrecompiledLookup for FsPrecompiledLookup<'_> {
    fn precompiled_path(&mut self, file_path: &str) -> Option<String> {
        let relative = Path::new(file_path).strip_prefix(self.std_root).ok()?;
        let os_dir = if cfg!(windows) { "win" } else { "posix" };
        let candidate = Path::new(self.std_root).join("include").join(os_dir).join(relative).with_extension("ll");
        candidate.exists().then(|| candidate.to_string_lossy().into_owned())
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let entry = if args.len() > 1 { &args[1] } else { "example.fluent" };

    let std_root = env::var(STD_PATH_VAR).unwrap_or_else(|_| "std".to_owned());

    let mut loader = JsonFileLoader;
    let corpus = match resolve_imports(&json_ast::json_sidecar(entry), &std_root, &mut loader) {
        Ok(corpus) => corpus,
        Err(err) => {
            report_fatal(&err);
            return ExitCode::FAILURE;
        }
    };

    let mut lookup = FsPrecompiledLookup { std_root: &std_root };
    let output = match compile(&corpus, &mut lookup) {
        Ok(output) => output,
        Err(err) => {
            let location = location_of(&err);
            eprintln!("error: {} at {}:{}", err.diagnostic, location.line, location.column);
            return ExitCode::FAILURE;
        }
    };

    for (file, warning) in &output.warnings {
        eprintln!("warning: {file}: {warning}");
    }

    print!("{}", output.ir);
    ExitCode::SUCCESS
}

fn report_fatal(err: &FatalError) {
    eprintln!("error: {err}");
}
