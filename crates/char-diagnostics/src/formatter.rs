// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal formatter for diagnostics.
//!
//! Produces multi-line, color-coded output:
//!
//! ```text
//! error: Invalid token in class statement: (3:7) '='
//!   --> shapes.char:3:7
//!    |
//!  3 |     x = =
//!    |       ^
//!    = note: ...
//! ```

use colored::Colorize;

use char_ast::LineMap;

use crate::{Diagnostic, Severity};

/// Formats diagnostics for terminal output.
pub struct DiagnosticFormatter<'a> {
    source: &'a str,
    file_name: Option<&'a str>,
    line_map: LineMap,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            file_name: None,
            line_map: LineMap::new(source),
        }
    }

    pub fn with_file_name(mut self, name: &'a str) -> Self {
        self.file_name = Some(name);
        self
    }

    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();

        let severity = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Note => "note".cyan().bold(),
        };
        out.push_str(&format!("{}: {}\n", severity, diagnostic.message));

        if let Some(span) = diagnostic.primary_span() {
            let (line, col) = self.line_map.line_col(span.start);
            let file = self.file_name.unwrap_or("<source>");
            out.push_str(&format!("  {} {}:{}:{}\n", "-->".blue(), file, line, col));

            if let Some(text) = self.line_map.line_text(self.source, line) {
                let gutter = line.to_string().len().max(2);
                out.push_str(&format!("{} {}\n", " ".repeat(gutter + 1), "|".blue()));
                out.push_str(&format!(
                    "{:>width$} {} {}\n",
                    line.to_string().blue().bold(),
                    "|".blue(),
                    text,
                    width = gutter,
                ));
                let underline_len = span.end.saturating_sub(span.start).max(1);
                let underline_len = underline_len.min(text.len().saturating_sub(col as usize - 1).max(1));
                out.push_str(&format!(
                    "{} {} {}{}\n",
                    " ".repeat(gutter + 1),
                    "|".blue(),
                    " ".repeat(col as usize - 1),
                    "^".repeat(underline_len).red().bold(),
                ));
            }
        }

        for note in &diagnostic.notes {
            out.push_str(&format!("    {} note: {}\n", "=".cyan(), note));
        }
        if let Some(help) = &diagnostic.help {
            out.push_str(&format!("    {} help: {}\n", "=".cyan(), help));
        }

        out
    }
}
