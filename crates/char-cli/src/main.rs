//! Char CLI - parses every `.char` file in a directory.

mod output;

use std::path::Path;
use std::{env, fs, process};

use char_ast::printer;
use char_diagnostics::convert::file_diagnostics;
use char_diagnostics::formatter::DiagnosticFormatter;
use char_diagnostics::ToDiagnostic;
use char_lexer::Lexer;
use char_parser::Parser;

#[derive(Default)]
struct Options {
    build: bool,
    format: bool,
    print_tokens: bool,
    print_ast: bool,
}

fn main() {
    output::init();
    println!("{}", output::heading("Char Compiler v0.1"));

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let path = &args[1];
    let mut opts = Options::default();
    for arg in &args[2..] {
        match arg.as_str() {
            "-build" => opts.build = true,
            "-format" => opts.format = true,
            "-printTokens" => opts.print_tokens = true,
            "-printAST" => opts.print_ast = true,
            other => eprintln!("Unknown parameter {}", other),
        }
    }
    // Bare invocation means build.
    if !(opts.build || opts.format || opts.print_tokens || opts.print_ast) {
        opts.build = true;
    }

    match build(Path::new(path), &opts) {
        Ok(0) => println!("\n{}", output::banner_ok("Build")),
        Ok(errors) => {
            eprintln!("\n{}", output::banner_failed("Build", errors));
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error reading {}: {}", path, e);
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Usage: char <path> [parameters]");
    println!();
    println!("Parameters:");
    println!("  -build        Parse the directory's .char files");
    println!("  -format       Retain the full token stream (comments included)");
    println!("  -printTokens  Print the token stream of each file");
    println!("  -printAST     Print the parsed tree of each file");
}

/// Parse every regular `.char` file directly inside `dir`, returning
/// the total error count across files.
fn build(dir: &Path, opts: &Options) -> std::io::Result<usize> {
    println!("Building {}", dir.display());

    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map(|ext| ext == "char").unwrap_or(false))
        .collect();
    entries.sort();

    let mut errors = 0;
    for path in entries {
        errors += parse_file(&path, opts);
    }
    Ok(errors)
}

fn parse_file(path: &Path, opts: &Options) -> usize {
    println!("\nParsing file {}", path.display());

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            return 1;
        }
    };
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

    let lex = Lexer::new(&source).tokenize();

    if opts.print_tokens {
        println!("\n{}", output::heading("Tokens"));
        for t in &lex.tokens {
            if t.text.is_empty() {
                println!("{:5}:{:<5} {:?}", t.span.start, t.span.end, t.kind);
            } else {
                println!("{:5}:{:<5} {:?} '{}'", t.span.start, t.span.end, t.kind, t.text);
            }
        }
    }

    let diag_fmt = DiagnosticFormatter::new(&source).with_file_name(&name);

    if !lex.is_ok() {
        for err in &lex.errors {
            eprintln!("{}", diag_fmt.format(&err.to_diagnostic()));
        }
        return lex.errors.len();
    }

    if !(opts.build || opts.format || opts.print_ast) {
        // Token printing alone doesn't need a parse.
        return 0;
    }

    let mut parser = Parser::new(&name, &source, lex);
    let file = parser.parse();

    if opts.format {
        // The format mode keeps the comment-bearing stream around for
        // a future formatting pass; nothing consumes it yet.
        println!("Format buffer: {} token(s) retained", parser.format_tokens().len());
    }

    if opts.print_ast {
        println!("\n{}", output::heading("AST"));
        print!("{}", printer::print_file(&file));
    }

    let diagnostics = file_diagnostics(&file);
    for d in &diagnostics {
        eprintln!("{}", diag_fmt.format(d));
    }

    diagnostics.len()
}
