//! Parser for the Char language.
//!
//! Transforms a token stream into an abstract syntax tree. Parse
//! failures never unwind: each one becomes an `Error` node in the
//! tree and the parser resynchronizes at the next line, so `parse`
//! always returns a `File`.

mod parser;

pub use parser::Parser;

use char_ast::stmt::File;
use char_lexer::Lexer;

/// Lex and parse a whole source file.
pub fn parse_source(file_name: &str, source: &str) -> File {
    let lex = Lexer::new(source).tokenize();
    Parser::new(file_name, source, lex).parse()
}
