// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The lexer implementation using logos.

use char_ast::token::{Token, TokenKind};
use char_ast::Span;
use logos::Logos;
use thiserror::Error;

/// Raw token type for logos — scans the statement text of one line.
/// Indentation, EOL synthesis and the blank/comment-line rules live in
/// the layout driver below; no token ever spans a line break.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r]+")]
enum RawToken {
    // === Keywords ===
    #[token("use")]
    Use,
    #[token("as")]
    As,
    #[token("if")]
    If,
    #[token("is")]
    Is,
    #[token("in")]
    In,
    #[token("with")]
    With,
    #[token("fn")]
    Fn,
    #[token("intf")]
    Intf,
    #[token("mix")]
    Mix,
    #[token("var")]
    Var,
    #[token("ret")]
    Ret,
    #[token("defer")]
    Defer,
    #[token("for")]
    For,
    #[token("loop")]
    Loop,
    #[token("break")]
    Break,
    #[token("iota")]
    Iota,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("and")]
    And,
    #[token("or")]
    Or,

    // === Operators (longest first; logos applies maximal munch) ===
    // There is deliberately no ">>": two adjacent '>' must stay
    // separate so nested generics like Map<Map<Int>> can close, and
    // the parser re-fuses them into a right shift on demand. ">>=" is
    // unambiguous and stays in the table.
    #[token("<<=")]
    LtLtEq,
    #[token(">>=")]
    GtGtEq,

    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<<")]
    LtLt,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("&=")]
    AmpEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("_")]
    Blank,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LCurly,
    #[token("}")]
    RCurly,

    // === Comments (run to end of line, kept as tokens) ===
    #[regex(r";[^\n]*")]
    Comment,

    // === Literals ===
    // A backslash escapes exactly one character; a newline inside the
    // quotes never matches, which surfaces as an "Unclosed" error.
    #[regex(r#""([^"\\\r\n]|\\[^\r\n])*""#)]
    Str,

    // 'x' or '\x' only; anything else is an error at the quote.
    #[regex(r"'([^'\\\r\n]|\\[^\r\n])'")]
    CharLit,

    // digits ('.' digits)? — no exponent, no sign (unary minus is an
    // operator).
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    // === Identifier (must come after keywords) ===
    #[regex(r"[\p{L}][\p{L}\p{Nd}_]*")]
    Ident,
}

/// The lexer for Char source code.
///
/// The original design streams tokens through a small bounded channel
/// to a concurrently running parser; the lexer has no side effects
/// besides emission, so materializing the whole stream eagerly is
/// observationally identical and what `tokenize` does.
pub struct Lexer<'a> {
    source: &'a str,
    /// Column widths of the currently open blocks; base level 0 stays.
    indent_levels: Vec<usize>,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            indent_levels: vec![0],
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// The stream always ends with exactly one EOF — or with a single
    /// ERROR token as its last element if a lexical error was hit, in
    /// which case nothing after the error is scanned.
    pub fn tokenize(mut self) -> LexResult {
        let source = self.source;
        let mut line_start = 0;
        loop {
            let line_end = source[line_start..]
                .find('\n')
                .map(|i| line_start + i)
                .unwrap_or(source.len());
            let mut content = &source[line_start..line_end];
            if content.ends_with('\r') {
                content = &content[..content.len() - 1];
            }

            self.scan_line(line_start, content);
            if !self.errors.is_empty() {
                break;
            }

            if line_end == source.len() {
                break;
            }
            line_start = line_end + 1;
        }

        if self.errors.is_empty() {
            // Close every open block, then finish the stream.
            let end = self.source.len();
            self.emit_indent(0, end);
            if self.errors.is_empty() {
                self.tokens.push(Token::new(TokenKind::Eof, Span::at(end)));
            }
        }

        LexResult {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    /// Lex one physical line. Blank lines are elided entirely;
    /// comment-only lines emit their COMMENT token but leave the
    /// indent stack untouched.
    fn scan_line(&mut self, line_start: usize, content: &str) {
        let mut cols = 0;
        let mut ws_bytes = 0;
        for c in content.chars() {
            match c {
                ' ' => cols += 1,
                '\t' => cols += 4,
                _ => break,
            }
            ws_bytes += c.len_utf8();
        }
        let stmt_text = &content[ws_bytes..];
        if stmt_text.chars().all(|c| matches!(c, ' ' | '\t' | '\r')) {
            return;
        }
        let base = line_start + ws_bytes;

        if let Some(comment) = stmt_text.strip_prefix(';') {
            self.tokens.push(Token::with_text(
                TokenKind::Comment,
                Span::new(base + 1, line_start + content.len()),
                comment,
            ));
            return;
        }

        self.emit_indent(cols, base);
        if !self.errors.is_empty() {
            return;
        }

        let mut in_stmt = false;
        let mut lexer = RawToken::lexer(stmt_text);
        while let Some(result) = lexer.next() {
            let span = Span::new(base + lexer.span().start, base + lexer.span().end);
            match result {
                Ok(RawToken::Comment) => {
                    let text = &lexer.slice()[1..];
                    self.tokens.push(Token::with_text(
                        TokenKind::Comment,
                        Span::new(span.start + 1, span.end),
                        text,
                    ));
                }
                Ok(raw) => {
                    in_stmt = true;
                    self.tokens.push(convert_token(raw, lexer.slice(), span));
                }
                Err(()) => {
                    let offset = span.start;
                    let error = match stmt_text[lexer.span().start..].chars().next() {
                        Some('"') => LexError::unclosed_string(offset),
                        Some('\'') => LexError::unclosed_char(offset),
                        Some(c) => LexError::invalid_rune(c, offset),
                        None => LexError::invalid_rune('\u{FFFD}', offset),
                    };
                    self.emit_error(error);
                    return;
                }
            }
        }

        if in_stmt {
            self.tokens.push(Token::new(
                TokenKind::Eol,
                Span::at(line_start + content.len()),
            ));
        }
    }

    /// Reconcile a statement line's indent with the stack: deeper
    /// pushes INDENT, shallower pops DEDENT+EOL per closed block, and
    /// the final level must match exactly.
    fn emit_indent(&mut self, cols: usize, offset: usize) {
        let top = *self.indent_levels.last().unwrap();
        if cols > top {
            self.tokens.push(Token::new(TokenKind::Indent, Span::at(offset)));
            self.indent_levels.push(cols);
            return;
        }
        while self.indent_levels.len() > 1 && cols < *self.indent_levels.last().unwrap() {
            self.tokens.push(Token::new(TokenKind::Dedent, Span::at(offset)));
            self.tokens.push(Token::new(TokenKind::Eol, Span::at(offset)));
            self.indent_levels.pop();
        }
        if cols != *self.indent_levels.last().unwrap() {
            self.emit_error(LexError::mismatched_indent(offset));
        }
    }

    /// Record the error and terminate the stream with an ERROR token.
    fn emit_error(&mut self, error: LexError) {
        self.tokens.push(Token::with_text(
            TokenKind::Error,
            error.span,
            error.message.clone(),
        ));
        self.errors.push(error);
    }
}

/// Convert a raw logos token to a `Token`, carrying text only for the
/// kinds that have any.
fn convert_token(raw: RawToken, slice: &str, span: Span) -> Token {
    let kind = match raw {
        RawToken::Use => TokenKind::Use,
        RawToken::As => TokenKind::As,
        RawToken::If => TokenKind::If,
        RawToken::Is => TokenKind::Is,
        RawToken::In => TokenKind::In,
        RawToken::With => TokenKind::With,
        RawToken::Fn => TokenKind::Fn,
        RawToken::Intf => TokenKind::Intf,
        RawToken::Mix => TokenKind::Mix,
        RawToken::Var => TokenKind::Var,
        RawToken::Ret => TokenKind::Ret,
        RawToken::Defer => TokenKind::Defer,
        RawToken::For => TokenKind::For,
        RawToken::Loop => TokenKind::Loop,
        RawToken::Break => TokenKind::Break,
        RawToken::Iota => TokenKind::Iota,
        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::And => TokenKind::And,
        RawToken::Or => TokenKind::Or,

        RawToken::LtLtEq => TokenKind::LtLtEq,
        RawToken::GtGtEq => TokenKind::GtGtEq,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::BangEq => TokenKind::BangEq,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::LtLt => TokenKind::LtLt,
        RawToken::PlusEq => TokenKind::PlusEq,
        RawToken::MinusEq => TokenKind::MinusEq,
        RawToken::StarEq => TokenKind::StarEq,
        RawToken::SlashEq => TokenKind::SlashEq,
        RawToken::PercentEq => TokenKind::PercentEq,
        RawToken::AmpEq => TokenKind::AmpEq,
        RawToken::PipeEq => TokenKind::PipeEq,
        RawToken::CaretEq => TokenKind::CaretEq,

        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        RawToken::Eq => TokenKind::Eq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::Gt => TokenKind::Gt,
        RawToken::Bang => TokenKind::Bang,
        RawToken::Amp => TokenKind::Amp,
        RawToken::Pipe => TokenKind::Pipe,
        RawToken::Caret => TokenKind::Caret,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Blank => TokenKind::Blank,

        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::LCurly => TokenKind::LCurly,
        RawToken::RCurly => TokenKind::RCurly,

        RawToken::Str => {
            return Token::with_text(TokenKind::Str, span, &slice[1..slice.len() - 1]);
        }
        RawToken::CharLit => {
            return Token::with_text(TokenKind::Char, span, &slice[1..slice.len() - 1]);
        }
        RawToken::Number => return Token::with_text(TokenKind::Number, span, slice),
        RawToken::Ident => return Token::with_text(TokenKind::Ident, span, slice),

        // Handled before conversion so the text can drop the ';'.
        RawToken::Comment => unreachable!("comments are emitted by the line scanner"),
    };
    Token::new(kind, span)
}

/// Result of lexing: tokens plus any error found.
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

impl LexResult {
    /// Returns true if lexing completed without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A lexer error with location and message. The stream terminates at
/// the first one, so a `LexResult` holds at most a single entry.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

impl LexError {
    fn unclosed_string(offset: usize) -> Self {
        Self {
            span: Span::new(offset, offset + 1),
            message: "Unclosed \"".to_string(),
        }
    }

    fn unclosed_char(offset: usize) -> Self {
        Self {
            span: Span::new(offset, offset + 1),
            message: "Unclosed '".to_string(),
        }
    }

    fn invalid_rune(c: char, offset: usize) -> Self {
        Self {
            span: Span::new(offset, offset + c.len_utf8()),
            message: format!("Invalid rune '{}' encountered", c),
        }
    }

    fn mismatched_indent(offset: usize) -> Self {
        Self {
            span: Span::at(offset),
            message: "Mismatched indentation level encountered".to_string(),
        }
    }
}
