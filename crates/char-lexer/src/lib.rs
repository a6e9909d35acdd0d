//! Lexer for the Char language.
//!
//! Tokenizes source code into a stream of tokens for the parser,
//! synthesizing the INDENT / DEDENT / EOL layout tokens from an
//! indentation stack (the off-side rule, tab = 4 columns).

mod lexer;

pub use lexer::{LexError, LexResult, Lexer};
