// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conversions from phase errors to diagnostics.

use char_ast::printer::collect_errors;
use char_ast::stmt::File;
use char_lexer::LexError;

use crate::{Diagnostic, ToDiagnostic};

impl ToDiagnostic for LexError {
    fn to_diagnostic(&self) -> Diagnostic {
        let d = Diagnostic::error(self.message.clone()).with_primary(self.span, "here");
        if self.message.starts_with("Unclosed") {
            d.with_note("string and character literals cannot span lines")
        } else {
            d
        }
    }
}

/// One diagnostic per Error node in the tree, in source order.
pub fn file_diagnostics(file: &File) -> Vec<Diagnostic> {
    collect_errors(file)
        .into_iter()
        .map(|(msg, span)| Diagnostic::error(msg).with_primary(span, "parsing stopped here"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use char_ast::Span;
    use char_ast::stmt::{Stmt, StmtKind};

    #[test]
    fn lex_error_conversion() {
        let lex = char_lexer::Lexer::new("\"oops\n").tokenize();
        assert!(!lex.is_ok());
        let d = lex.errors[0].to_diagnostic();
        assert!(d.message.contains("Unclosed"));
        assert_eq!(d.primary_span(), Some(lex.errors[0].span));
        assert_eq!(d.notes.len(), 1);
    }

    #[test]
    fn error_nodes_become_diagnostics() {
        let file = File {
            name: "t.char".into(),
            stmts: vec![Stmt::new(
                StmtKind::Error("Invalid token (1:1) '%'".into()),
                Span::new(0, 1),
            )],
        };
        let ds = file_diagnostics(&file);
        assert_eq!(ds.len(), 1);
        assert!(ds[0].message.contains("Invalid token"));
    }
}
