// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The parser implementation: recursive descent for statements with
//! precedence climbing for expressions.
//!
//! The parser operates on a random-access token buffer with a mutable
//! position. `accept` is the single speculation primitive: it matches
//! a token-kind sequence atomically and restores the position on
//! failure. Errors are data — every failed production yields an
//! `Error` node in place and the parser skips to the next line, so
//! one bad statement does not take its siblings with it.

use char_ast::expr::{Expr, ExprKind, IdentPart, KeyVal};
use char_ast::stmt::{
    Class, File, For, FuncDef, If, Interface, IntfFuncSig, Is, Loop, Param, Property, PropertySet,
    Stmt, StmtKind, UsePackage, VarDecl, VarSetLine,
};
use char_ast::token::{Token, TokenKind};
use char_ast::types::{FuncSig, Type, TypeIdent};
use char_ast::{LineMap, Span};
use char_lexer::{LexError, LexResult};

/// The parser for Char source code.
pub struct Parser {
    file_name: String,
    /// Parse-side buffer; comments are stripped from this view.
    tokens: Vec<Token>,
    /// Full token stream including comments, retained for formatting.
    fmt_tokens: Vec<Token>,
    pos: usize,
    line_map: LineMap,
    /// Terminal lexer error, if the token stream ended in one.
    lex_error: Option<LexError>,
}

impl Parser {
    pub fn new(file_name: impl Into<String>, source: &str, lex: LexResult) -> Self {
        let fmt_tokens = lex.tokens;
        let tokens = fmt_tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .cloned()
            .collect();
        Self {
            file_name: file_name.into(),
            tokens,
            fmt_tokens,
            pos: 0,
            line_map: LineMap::new(source),
            lex_error: lex.errors.into_iter().next(),
        }
    }

    /// The full token stream with comments, for the format mode.
    pub fn format_tokens(&self) -> &[Token] {
        &self.fmt_tokens
    }

    /// Parse the buffered tokens into a file. Never fails: a lexical
    /// error yields a file whose only statement is an Error carrying
    /// the lexer message, and parse errors become Error nodes in situ.
    pub fn parse(&mut self) -> File {
        let mut file = File {
            name: self.file_name.clone(),
            stmts: Vec::new(),
        };

        if let Some(err) = self.lex_error.take() {
            let (line, col) = self.line_map.line_col(err.span.start);
            file.stmts.push(Stmt::new(
                StmtKind::Error(format!("({}:{}) {}", line, col, err.message)),
                err.span,
            ));
            return file;
        }

        while self.pos < self.tokens.len() {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Ident => {
                    let st = self.parse_top_level_ident();
                    file.stmts.push(st);
                }
                TokenKind::Fn => {
                    let st = self.parse_type_redirect();
                    file.stmts.push(st);
                }
                TokenKind::Use => {
                    let st = self.parse_use();
                    file.stmts.push(st);
                }
                TokenKind::Intf => {
                    let st = self.parse_interface();
                    file.stmts.push(st);
                }
                TokenKind::Mix => {
                    let st = self.parse_mixin();
                    file.stmts.push(st);
                }
                _ => {
                    let t = self.peek().clone();
                    let msg = format!("Invalid token {}", self.describe(&t));
                    let st = self.error_stmt(true, msg, t.span);
                    file.stmts.push(st);
                }
            }
        }

        file
    }

    // =========================================================================
    // Token Navigation
    // =========================================================================

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with EOF"))
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn next(&mut self) -> Token {
        let t = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn backup(&mut self, count: usize) {
        self.pos = self.pos.saturating_sub(count);
    }

    /// Atomically match a sequence of token kinds starting at the
    /// current position. On success the position advances past the
    /// sequence and the matched tokens are returned; on failure the
    /// position is restored and the offending token is returned.
    fn accept(&mut self, kinds: &[TokenKind]) -> Result<Vec<Token>, Token> {
        let start = self.pos;
        let mut toks = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let t = self.next();
            if t.kind != kind {
                self.pos = start;
                return Err(t);
            }
            toks.push(t);
        }
        Ok(toks)
    }

    /// The next token kind for precedence decisions, fusing two
    /// adjacent `>` into `>>` so shifts work in expressions while the
    /// lexer keeps them separate for nested generics.
    fn peek_combo(&self) -> TokenKind {
        let t = self.peek_kind();
        if t == TokenKind::Gt
            && self.tokens.get(self.pos + 1).map(|t2| t2.kind) == Some(TokenKind::Gt)
        {
            return TokenKind::GtGt;
        }
        t
    }

    /// Consume the next token, fusing `> >` into a single `>>` token.
    fn next_combo(&mut self) -> Token {
        let t = self.next();
        if t.kind == TokenKind::Gt && self.peek_kind() == TokenKind::Gt {
            let t2 = self.next();
            return Token::new(TokenKind::GtGt, t.span.to(t2.span));
        }
        t
    }

    // =========================================================================
    // Error Recovery
    // =========================================================================

    fn describe(&self, t: &Token) -> String {
        let (line, col) = self.line_map.line_col(t.span.start);
        match t.kind {
            TokenKind::Str
            | TokenKind::Char
            | TokenKind::Number
            | TokenKind::Ident
            | TokenKind::Comment
            | TokenKind::Error => {
                format!("({}:{}) {} '{}'", line, col, t.kind.display_name(), t.text)
            }
            _ => format!("({}:{}) {}", line, col, t.kind.display_name()),
        }
    }

    fn error_stmt(&mut self, to_next_line: bool, message: String, span: Span) -> Stmt {
        self.to_next_line(to_next_line);
        Stmt::new(StmtKind::Error(message), span)
    }

    fn error_expr(&mut self, to_next_line: bool, message: String, span: Span) -> Expr {
        self.to_next_line(to_next_line);
        Expr::new(ExprKind::Error(message), span)
    }

    /// Skip to the start of the next sibling line: consume through the
    /// next EOL, then any DEDENT/EOL pairs that close blocks ended by
    /// the skipped line.
    fn to_next_line(&mut self, advance: bool) {
        if !advance {
            return;
        }
        loop {
            match self.peek_kind() {
                TokenKind::Eol | TokenKind::Eof => break,
                _ => {
                    self.next();
                }
            }
        }
        if self.peek_kind() == TokenKind::Eol {
            self.next();
            while self
                .accept(&[TokenKind::Dedent, TokenKind::Eol])
                .is_ok()
            {}
        }
    }

    /// Span from a production's first byte to the last consumed token.
    fn span_from(&self, start: usize) -> Span {
        let end = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span.end)
            .unwrap_or(start);
        Span::new(start, end.max(start))
    }

    fn error_expr_to_stmt(e: Expr) -> Stmt {
        let span = e.span;
        match e.kind {
            ExprKind::Error(msg) => Stmt::new(StmtKind::Error(msg), span),
            _ => Stmt::new(StmtKind::Expr(e), span),
        }
    }

    // =========================================================================
    // Top-Level Statements
    // =========================================================================

    /// A top-level identifier starts either a type redirect or a class
    /// declaration; scan ahead for `as` before the line end to decide.
    fn parse_top_level_ident(&mut self) -> Stmt {
        if self.is_type_redirect() {
            self.parse_type_redirect()
        } else {
            self.parse_class(false)
        }
    }

    fn is_type_redirect(&mut self) -> bool {
        let mut count = 0;
        let mut redirect = false;
        while !matches!(self.peek_kind(), TokenKind::Eol | TokenKind::Eof) {
            if self.peek_kind() == TokenKind::As {
                redirect = true;
                break;
            }
            self.next();
            count += 1;
        }
        self.backup(count);
        redirect
    }

    fn parse_mixin(&mut self) -> Stmt {
        self.next(); // eat mix
        self.parse_class(true)
    }

    fn parse_type_redirect(&mut self) -> Stmt {
        let start = self.peek().span.start;
        let ty = self.parse_type();

        if let Err(t) = self.accept(&[TokenKind::As]) {
            let msg = format!("Invalid token in type redirect: {}", self.describe(&t));
            return self.error_stmt(true, msg, t.span);
        }

        match self.accept(&[TokenKind::Ident, TokenKind::Eol]) {
            Ok(toks) => Stmt::new(
                StmtKind::TypeRedirect { ty, name: toks[0].text.clone() },
                self.span_from(start),
            ),
            Err(t) => {
                let msg = format!("Invalid token in type redirect: {}", self.describe(&t));
                self.error_stmt(true, msg, t.span)
            }
        }
    }

    fn parse_use(&mut self) -> Stmt {
        let start = self.peek().span.start;
        self.next(); // eat use
        let mut packages = Vec::new();

        if self.accept(&[TokenKind::Eol, TokenKind::Indent]).is_ok() {
            // Indented block of packages.
            while let Some(p) = self.parse_use_package() {
                packages.push(p);
            }
            if self.accept(&[TokenKind::Dedent, TokenKind::Eol]).is_err() {
                let t = self.peek().clone();
                let msg = format!("Invalid token in use statement: {}", self.describe(&t));
                return self.error_stmt(true, msg, t.span);
            }
        } else {
            match self.parse_use_package() {
                Some(p) => packages.push(p),
                None => {
                    let t = self.peek().clone();
                    let msg = format!("Invalid token in use statement: {}", self.describe(&t));
                    return self.error_stmt(true, msg, t.span);
                }
            }
        }

        Stmt::new(StmtKind::Use(packages), self.span_from(start))
    }

    fn parse_use_package(&mut self) -> Option<UsePackage> {
        if let Ok(toks) = self.accept(&[TokenKind::Str, TokenKind::Eol]) {
            return Some(UsePackage { path: toks[0].text.clone(), alias: None });
        }
        if let Ok(toks) = self.accept(&[
            TokenKind::Str,
            TokenKind::As,
            TokenKind::Ident,
            TokenKind::Eol,
        ]) {
            return Some(UsePackage {
                path: toks[0].text.clone(),
                alias: Some(toks[2].text.clone()),
            });
        }
        None
    }

    fn parse_interface(&mut self) -> Stmt {
        let start = self.peek().span.start;
        let toks = match self.accept(&[TokenKind::Intf, TokenKind::Ident]) {
            Ok(toks) => toks,
            Err(t) => {
                let msg = format!("Invalid token in interface: {}", self.describe(&t));
                return self.error_stmt(true, msg, t.span);
            }
        };
        let mut intf = Interface {
            name: toks[1].text.clone(),
            withs: Vec::new(),
            func_sigs: Vec::new(),
        };

        if self.accept(&[TokenKind::With]).is_ok() {
            loop {
                if self.peek_kind() != TokenKind::Ident {
                    let t = self.peek().clone();
                    let msg = format!(
                        "Invalid token in interface {}: {}",
                        intf.name,
                        self.describe(&t)
                    );
                    return self.error_stmt(true, msg, t.span);
                }
                intf.withs.push(self.parse_type_ident());
                if self.accept(&[TokenKind::Comma]).is_err() {
                    break;
                }
            }
        }

        if let Err(t) = self.accept(&[TokenKind::Eol, TokenKind::Indent]) {
            let msg = format!(
                "Invalid token in interface {}: {}",
                intf.name,
                self.describe(&t)
            );
            return self.error_stmt(true, msg, t.span);
        }

        while !matches!(self.peek_kind(), TokenKind::Dedent | TokenKind::Eof) {
            // function_name(types)
            let toks = match self.accept(&[TokenKind::Ident, TokenKind::LParen]) {
                Ok(toks) => toks,
                Err(t) => {
                    let msg = format!(
                        "Invalid token in interface {}: {}",
                        intf.name,
                        self.describe(&t)
                    );
                    return self.error_stmt(true, msg, t.span);
                }
            };
            let mut fs = IntfFuncSig { name: toks[0].text.clone(), sig: FuncSig::default() };
            while !matches!(self.peek_kind(), TokenKind::RParen | TokenKind::Eof) {
                fs.sig.params.push(self.parse_type());
                match self.peek_kind() {
                    TokenKind::Comma => {
                        self.next();
                    }
                    TokenKind::RParen => {}
                    _ => {
                        let t = self.peek().clone();
                        let msg = format!(
                            "Invalid token in interface {} function signature {}: {}",
                            intf.name,
                            fs.name,
                            self.describe(&t)
                        );
                        return self.error_stmt(true, msg, t.span);
                    }
                }
            }
            self.next(); // eat )

            fs.sig.returns = self.parse_return_values();

            if self.accept(&[TokenKind::Eol]).is_err() {
                let t = self.peek().clone();
                let msg = format!(
                    "Invalid token in interface {} function signature {}: {}",
                    intf.name,
                    fs.name,
                    self.describe(&t)
                );
                return self.error_stmt(true, msg, t.span);
            }
            intf.func_sigs.push(fs);
        }

        if let Err(t) = self.accept(&[TokenKind::Dedent, TokenKind::Eol]) {
            let msg = format!(
                "Invalid token in interface {}: {}",
                intf.name,
                self.describe(&t)
            );
            return self.error_stmt(true, msg, t.span);
        }

        Stmt::new(StmtKind::Interface(intf), self.span_from(start))
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn parse_type(&mut self) -> Type {
        match self.peek_kind() {
            TokenKind::Ident => self.parse_type_ident(),
            TokenKind::LBracket => self.parse_array_type(),
            TokenKind::Fn => self.parse_func_sig_type(),
            _ => {
                let t = self.peek().clone();
                let msg = format!("Invalid token in type identifier: {}", self.describe(&t));
                self.type_error(msg)
            }
        }
    }

    fn type_error(&mut self, message: String) -> Type {
        self.to_next_line(true);
        Type::Error(message)
    }

    fn parse_type_ident(&mut self) -> Type {
        let mut ti = TypeIdent::new(self.next().text);
        while let Ok(toks) = self.accept(&[TokenKind::Dot, TokenKind::Ident]) {
            ti.parts.push(toks[1].text.clone());
        }
        if self.accept(&[TokenKind::Lt]).is_ok() {
            while self.peek_kind().is_type_start() {
                ti.type_params.push(self.parse_type());
                if self.accept(&[TokenKind::Comma]).is_err() {
                    break;
                }
            }
            if let Err(t) = self.accept(&[TokenKind::Gt]) {
                let msg = format!(
                    "Invalid token parsing type identifier: {}",
                    self.describe(&t)
                );
                return self.type_error(msg);
            }
        }
        Type::Ident(ti)
    }

    fn parse_array_type(&mut self) -> Type {
        self.next(); // eat [
        if let Err(t) = self.accept(&[TokenKind::RBracket]) {
            let msg = format!("Invalid token in array type: {}", self.describe(&t));
            return self.type_error(msg);
        }
        Type::Array(Box::new(self.parse_type()))
    }

    fn parse_func_sig_type(&mut self) -> Type {
        let mut sig = FuncSig::default();

        // fn(types)
        if let Err(t) = self.accept(&[TokenKind::Fn, TokenKind::LParen]) {
            let msg = format!("Invalid token in function signature: {}", self.describe(&t));
            return self.type_error(msg);
        }
        while !matches!(self.peek_kind(), TokenKind::RParen | TokenKind::Eof) {
            sig.params.push(self.parse_type());
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.next();
                }
                TokenKind::RParen => {}
                _ => {
                    let t = self.peek().clone();
                    let msg =
                        format!("Invalid token in function signature: {}", self.describe(&t));
                    return self.type_error(msg);
                }
            }
        }
        self.next(); // eat )

        sig.returns = self.parse_return_values();
        Type::FuncSig(sig)
    }

    /// Return values: a bare type when the next token can start one,
    /// or a parenthesized comma-separated list, or nothing.
    fn parse_return_values(&mut self) -> Vec<Type> {
        let mut rvs = Vec::new();
        if self.peek_kind().is_type_start() {
            rvs.push(self.parse_type());
        } else if self.peek_kind() == TokenKind::LParen {
            self.next(); // eat (
            while !matches!(self.peek_kind(), TokenKind::RParen | TokenKind::Eof) {
                rvs.push(self.parse_type());
                match self.peek_kind() {
                    TokenKind::Comma => {
                        self.next();
                    }
                    TokenKind::RParen => {}
                    _ => {
                        let t = self.peek().clone();
                        let msg =
                            format!("Invalid token in return types: {}", self.describe(&t));
                        rvs.push(self.type_error(msg));
                        return rvs;
                    }
                }
            }
            self.next(); // eat )
        }
        rvs
    }

    // =========================================================================
    // Classes
    // =========================================================================

    fn parse_class(&mut self, mixin: bool) -> Stmt {
        let start = self.peek().span.start;
        let toks = match self.accept(&[TokenKind::Ident]) {
            Ok(toks) => toks,
            Err(t) => {
                let msg = format!("Invalid token in class declaration: {}", self.describe(&t));
                return self.error_stmt(true, msg, t.span);
            }
        };
        let mut class = Class {
            name: toks[0].text.clone(),
            mixin,
            type_params: Vec::new(),
            withs: Vec::new(),
            stmts: Vec::new(),
        };

        if self.accept(&[TokenKind::Lt]).is_ok() {
            loop {
                match self.accept(&[TokenKind::Ident]) {
                    Ok(toks) => class.type_params.push(toks[0].text.clone()),
                    Err(t) => {
                        let msg = format!(
                            "Invalid token in class {} type declaration: {}",
                            class.name,
                            self.describe(&t)
                        );
                        return self.error_stmt(true, msg, t.span);
                    }
                }
                if self.accept(&[TokenKind::Comma]).is_err() {
                    break;
                }
            }
            if let Err(t) = self.accept(&[TokenKind::Gt]) {
                let msg = format!(
                    "Invalid token in class {} type declaration: {}",
                    class.name,
                    self.describe(&t)
                );
                return self.error_stmt(true, msg, t.span);
            }
        }

        if self.accept(&[TokenKind::With]).is_ok() {
            loop {
                if self.peek_kind() != TokenKind::Ident {
                    let t = self.peek().clone();
                    let msg = format!(
                        "Invalid token in class {} with declaration: {}",
                        class.name,
                        self.describe(&t)
                    );
                    return self.error_stmt(true, msg, t.span);
                }
                class.withs.push(self.parse_type_ident());
                if self.accept(&[TokenKind::Comma]).is_err() {
                    break;
                }
            }
        }

        if let Err(t) = self.accept(&[TokenKind::Eol, TokenKind::Indent]) {
            let msg = format!(
                "Invalid token in class {} declaration: {}",
                class.name,
                self.describe(&t)
            );
            return self.error_stmt(true, msg, t.span);
        }

        while !matches!(self.peek_kind(), TokenKind::Dedent | TokenKind::Eof) {
            let st = self.parse_class_stmt();
            class.stmts.push(st);
        }

        if let Err(t) = self.accept(&[TokenKind::Dedent, TokenKind::Eol]) {
            let msg = format!(
                "Invalid token in class {} declaration: {}",
                class.name,
                self.describe(&t)
            );
            let st = self.error_stmt(true, msg, t.span);
            class.stmts.push(st);
        }

        Stmt::new(StmtKind::Class(class), self.span_from(start))
    }

    fn parse_class_stmt(&mut self) -> Stmt {
        match self.peek_kind() {
            TokenKind::Dot | TokenKind::Ident => self.parse_class_stmt_ident(),
            TokenKind::Iota => self.parse_iota_stmt(),
            _ => {
                let t = self.peek().clone();
                let msg = format!("Invalid token in class statement: {}", self.describe(&t));
                self.error_stmt(true, msg, t.span)
            }
        }
    }

    /// A class-body line starting with `.` or a name: either a
    /// function definition (name followed by `(`) or a property line.
    /// Static members are the ones without a leading dot.
    fn parse_class_stmt_ident(&mut self) -> Stmt {
        let start = self.peek().span.start;
        let mut ps = PropertySet { props: Vec::new(), vals: None };

        loop {
            let dotted = self.accept(&[TokenKind::Dot]).is_ok();
            let toks = match self.accept(&[TokenKind::Ident]) {
                Ok(toks) => toks,
                Err(t) => {
                    let msg =
                        format!("Invalid token in class statement: {}", self.describe(&t));
                    return self.error_stmt(true, msg, t.span);
                }
            };
            let name = toks[0].text.clone();

            let mut ty = None;
            match self.peek_kind() {
                TokenKind::LParen => return self.parse_func_def(dotted, Some(name), start),
                k if k.is_type_start() => ty = Some(self.parse_type()),
                _ => {}
            }

            ps.props.push(Property { is_static: !dotted, name, ty });
            if self.accept(&[TokenKind::Comma]).is_err() {
                break;
            }
        }

        if self.accept(&[TokenKind::Eq]).is_ok() {
            ps.vals = Some(self.parse_expr_list());
        }

        if let Err(t) = self.accept(&[TokenKind::Eol]) {
            let msg = format!("Invalid token in class statement: {}", self.describe(&t));
            return self.error_stmt(true, msg, t.span);
        }

        Stmt::new(StmtKind::PropertySet(ps), self.span_from(start))
    }

    fn parse_iota_stmt(&mut self) -> Stmt {
        let start = self.peek().span.start;
        match self.accept(&[TokenKind::Iota, TokenKind::Eol]) {
            Ok(_) => Stmt::new(StmtKind::IotaReset, self.span_from(start)),
            Err(t) => {
                let msg = format!("Invalid token in iota reset: {}", self.describe(&t));
                self.error_stmt(true, msg, t.span)
            }
        }
    }

    // =========================================================================
    // Function Definitions
    // =========================================================================

    /// Parse a function definition with the optional dot and name
    /// already consumed.
    fn parse_func_def(&mut self, dotted: bool, name: Option<String>, start: usize) -> Stmt {
        if let Err(t) = self.accept(&[TokenKind::LParen]) {
            let msg = format!("Invalid token in function definition: {}", self.describe(&t));
            return self.error_stmt(true, msg, t.span);
        }
        let mut func = FuncDef {
            is_static: !dotted,
            name,
            params: Vec::new(),
            returns: Vec::new(),
            body: Vec::new(),
        };

        while !matches!(self.peek_kind(), TokenKind::RParen | TokenKind::Eof) {
            let t = self.peek().clone();
            let param_name = match t.kind {
                TokenKind::Ident => {
                    self.next();
                    t.text.clone()
                }
                TokenKind::Blank => {
                    self.next();
                    "_".to_string()
                }
                _ => {
                    let msg =
                        format!("Invalid token in function definition: {}", self.describe(&t));
                    return self.error_stmt(true, msg, t.span);
                }
            };
            let ty = if self.peek_kind().is_type_start() {
                Some(self.parse_type())
            } else {
                None
            };
            func.params.push(Param { name: param_name, ty });
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.next();
                }
                TokenKind::RParen => {}
                _ => {
                    let t = self.peek().clone();
                    let msg =
                        format!("Invalid token in function definition: {}", self.describe(&t));
                    return self.error_stmt(true, msg, t.span);
                }
            }
        }
        if let Err(t) = self.accept(&[TokenKind::RParen]) {
            let msg = format!("Invalid token in function definition: {}", self.describe(&t));
            return self.error_stmt(true, msg, t.span);
        }

        func.returns = self.parse_return_values();

        if let Err(t) = self.accept(&[TokenKind::Eol, TokenKind::Indent]) {
            let msg = format!("Invalid token in function definition: {}", self.describe(&t));
            return self.error_stmt(true, msg, t.span);
        }

        while !matches!(self.peek_kind(), TokenKind::Dedent | TokenKind::Eof) {
            let st = self.parse_func_stmt();
            func.body.push(st);
        }

        if let Err(t) = self.accept(&[TokenKind::Dedent, TokenKind::Eol]) {
            let msg = format!("Invalid token in function definition: {}", self.describe(&t));
            let st = self.error_stmt(true, msg, t.span);
            func.body.push(st);
        }

        // If it's an anonymous function and we're not in the middle of
        // a block (followed by ',' or ')'), put the EOL back so the
        // enclosing statement can consume it.
        if func.name.is_none() && !self.peek_kind().is_in_block() {
            self.backup(1);
        }

        Stmt::new(StmtKind::FuncDef(func), self.span_from(start))
    }

    // =========================================================================
    // Function-Body Statements
    // =========================================================================

    fn parse_func_stmt(&mut self) -> Stmt {
        match self.peek_kind() {
            TokenKind::Var => self.parse_var_stmt(false),
            TokenKind::Ret => self.parse_return_stmt(),
            TokenKind::Defer => self.parse_defer_stmt(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Break => self.parse_break_stmt(),
            TokenKind::For | TokenKind::Loop => self.parse_for_or_loop(None),
            _ => {
                if let Ok(toks) = self.accept(&[TokenKind::Ident, TokenKind::Colon]) {
                    return self.parse_for_or_loop(Some(toks[0].text.clone()));
                }
                self.parse_expr_stmt(false)
            }
        }
    }

    fn parse_break_stmt(&mut self) -> Stmt {
        let start = self.peek().span.start;
        self.next(); // eat break
        let label = self
            .accept(&[TokenKind::Ident])
            .ok()
            .map(|toks| toks[0].text.clone());
        if let Err(t) = self.accept(&[TokenKind::Eol]) {
            let msg = format!("Invalid token in break: {}", self.describe(&t));
            return self.error_stmt(true, msg, t.span);
        }
        Stmt::new(StmtKind::Break { label }, self.span_from(start))
    }

    fn parse_for_or_loop(&mut self, label: Option<String>) -> Stmt {
        match self.peek_kind() {
            TokenKind::For => self.parse_for_stmt(label),
            TokenKind::Loop => self.parse_loop_stmt(label),
            _ => {
                let t = self.peek().clone();
                let msg = format!("Invalid token after label: {}", self.describe(&t));
                self.error_stmt(true, msg, t.span)
            }
        }
    }

    fn parse_for_stmt(&mut self, label: Option<String>) -> Stmt {
        let start = self.peek().span.start;
        self.next(); // eat for

        let mut vars = Vec::new();
        loop {
            match self.accept(&[TokenKind::Ident]) {
                Ok(toks) => vars.push(toks[0].text.clone()),
                Err(t) => {
                    let msg = format!("Invalid token in for: {}", self.describe(&t));
                    return self.error_stmt(true, msg, t.span);
                }
            }
            if self.accept(&[TokenKind::Comma]).is_err() {
                break;
            }
        }

        if let Err(t) = self.accept(&[TokenKind::In]) {
            let msg = format!("Invalid token in for: {}", self.describe(&t));
            return self.error_stmt(true, msg, t.span);
        }

        let iter = self.parse_expr();
        if iter.is_error() {
            return Self::error_expr_to_stmt(iter);
        }

        if let Err(t) = self.accept(&[TokenKind::Eol, TokenKind::Indent]) {
            let msg = format!("Invalid token in for: {}", self.describe(&t));
            return self.error_stmt(true, msg, t.span);
        }

        let mut body = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Dedent | TokenKind::Eof) {
            body.push(self.parse_func_stmt());
        }

        if let Err(t) = self.accept(&[TokenKind::Dedent, TokenKind::Eol]) {
            let msg = format!("Invalid token in for: {}", self.describe(&t));
            let st = self.error_stmt(true, msg, t.span);
            body.push(st);
        }

        Stmt::new(
            StmtKind::For(For { label, vars, iter, body }),
            self.span_from(start),
        )
    }

    fn parse_loop_stmt(&mut self, label: Option<String>) -> Stmt {
        let start = self.peek().span.start;
        if let Err(t) = self.accept(&[TokenKind::Loop, TokenKind::Eol, TokenKind::Indent]) {
            let msg = format!("Invalid token in loop: {}", self.describe(&t));
            return self.error_stmt(true, msg, t.span);
        }

        let mut body = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Dedent | TokenKind::Eof) {
            body.push(self.parse_func_stmt());
        }

        if let Err(t) = self.accept(&[TokenKind::Dedent, TokenKind::Eol]) {
            let msg = format!("Invalid token in loop: {}", self.describe(&t));
            let st = self.error_stmt(true, msg, t.span);
            body.push(st);
        }

        Stmt::new(StmtKind::Loop(Loop { label, body }), self.span_from(start))
    }

    fn parse_if_inner_stmt(&mut self) -> Stmt {
        match self.peek_kind() {
            TokenKind::Is => self.parse_is_stmt(),
            _ => self.parse_func_stmt(),
        }
    }

    fn parse_is_stmt(&mut self) -> Stmt {
        let start = self.peek().span.start;
        self.next(); // eat is
        let cond = self.parse_expr_list();
        if let Err(t) = self.accept(&[TokenKind::Eol, TokenKind::Indent]) {
            let msg = format!("Invalid token in is statement: {}", self.describe(&t));
            return self.error_stmt(true, msg, t.span);
        }

        let mut body = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Dedent | TokenKind::Eof) {
            body.push(self.parse_func_stmt());
        }

        if let Err(t) = self.accept(&[TokenKind::Dedent, TokenKind::Eol]) {
            let msg = format!("Invalid token in is statement: {}", self.describe(&t));
            let st = self.error_stmt(true, msg, t.span);
            body.push(st);
        }

        Stmt::new(StmtKind::Is(Is { cond, body }), self.span_from(start))
    }

    fn parse_if_stmt(&mut self) -> Stmt {
        let start = self.peek().span.start;
        self.next(); // eat if

        let mut cond = None;
        if !matches!(self.peek_kind(), TokenKind::Eol | TokenKind::With) {
            let e = self.parse_expr();
            if e.is_error() {
                return Self::error_expr_to_stmt(e);
            }
            cond = Some(e);
        }

        let mut with = None;
        if self.accept(&[TokenKind::With]).is_ok() {
            let st = match self.peek_kind() {
                TokenKind::Var => self.parse_var_stmt(true),
                _ => self.parse_expr_stmt(true),
            };
            with = Some(Box::new(st));
        }

        if let Err(t) = self.accept(&[TokenKind::Eol, TokenKind::Indent]) {
            let msg = format!("Invalid token in if statement: {}", self.describe(&t));
            return self.error_stmt(true, msg, t.span);
        }

        let mut body = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Dedent | TokenKind::Eof) {
            body.push(self.parse_if_inner_stmt());
        }

        if let Err(t) = self.accept(&[TokenKind::Dedent, TokenKind::Eol]) {
            let msg = format!("Invalid token in if statement: {}", self.describe(&t));
            let st = self.error_stmt(true, msg, t.span);
            body.push(st);
        }

        Stmt::new(StmtKind::If(If { cond, with, body }), self.span_from(start))
    }

    /// Expression statement with optional assignment. Inside a `with`
    /// clause the line's EOL belongs to the enclosing `if`, so it is
    /// neither expected nor skipped on error there.
    fn parse_expr_stmt(&mut self, in_with: bool) -> Stmt {
        let start = self.peek().span.start;
        let ex = self.parse_expr_list();

        let kind = if self.peek_kind().is_assign_op() {
            let op = self.next().kind;
            let right = self.parse_expr_list();
            StmtKind::Assign { op, left: ex, right }
        } else {
            StmtKind::Expr(ex)
        };

        if !in_with {
            if let Err(t) = self.accept(&[TokenKind::Eol]) {
                let msg =
                    format!("Invalid token in expression statement: {}", self.describe(&t));
                return self.error_stmt(true, msg, t.span);
            }
        }

        Stmt::new(kind, self.span_from(start))
    }

    fn parse_return_stmt(&mut self) -> Stmt {
        let start = self.peek().span.start;
        self.next(); // eat ret
        let mut vals = None;
        if self.peek_kind() != TokenKind::Eol {
            vals = Some(self.parse_expr_list());
        }
        if let Err(t) = self.accept(&[TokenKind::Eol]) {
            let msg = format!("Invalid token in return statement: {}", self.describe(&t));
            vals = Some(self.error_expr(true, msg, t.span));
        }
        Stmt::new(StmtKind::Return { vals }, self.span_from(start))
    }

    fn parse_defer_stmt(&mut self) -> Stmt {
        let start = self.peek().span.start;
        self.next(); // eat defer
        let mut expr = self.parse_expr();
        if let Err(t) = self.accept(&[TokenKind::Eol]) {
            let msg = format!("Invalid token in defer statement: {}", self.describe(&t));
            expr = self.error_expr(true, msg, t.span);
        }
        Stmt::new(StmtKind::Defer { expr }, self.span_from(start))
    }

    /// `var` statement: the first line sits on the `var` line itself;
    /// further lines may follow in an indented block.
    fn parse_var_stmt(&mut self, in_with: bool) -> Stmt {
        let start = self.peek().span.start;
        self.next(); // eat var
        let mut lines = Vec::new();

        match self.parse_var_line(in_with) {
            Ok(line) => lines.push(line),
            Err(st) => return st,
        }

        if !in_with && self.accept(&[TokenKind::Indent]).is_ok() {
            while !matches!(self.peek_kind(), TokenKind::Dedent | TokenKind::Eof) {
                match self.parse_var_line(in_with) {
                    Ok(line) => lines.push(line),
                    Err(st) => return st,
                }
            }
            if let Err(t) = self.accept(&[TokenKind::Dedent, TokenKind::Eol]) {
                let msg = format!("Invalid token in var statement: {}", self.describe(&t));
                return self.error_stmt(true, msg, t.span);
            }
        }

        Stmt::new(StmtKind::VarSet(lines), self.span_from(start))
    }

    fn parse_var_line(&mut self, in_with: bool) -> Result<VarSetLine, Stmt> {
        let mut line = VarSetLine { vars: Vec::new(), vals: None };
        loop {
            let t = self.peek().clone();
            let name = match t.kind {
                TokenKind::Ident => {
                    self.next();
                    t.text.clone()
                }
                TokenKind::Blank => {
                    self.next();
                    "_".to_string()
                }
                _ => {
                    let msg = format!("Invalid token in var statement: {}", self.describe(&t));
                    return Err(self.error_stmt(!in_with, msg, t.span));
                }
            };

            let ty = if self.peek_kind().is_type_start() {
                Some(self.parse_type())
            } else {
                None
            };

            line.vars.push(VarDecl { name, ty });
            if self.accept(&[TokenKind::Comma]).is_err() {
                break;
            }
        }

        if self.accept(&[TokenKind::Eq]).is_ok() {
            line.vals = Some(self.parse_expr_list());
        }

        if !in_with {
            if let Err(t) = self.accept(&[TokenKind::Eol]) {
                let msg = format!("Invalid token in var statement: {}", self.describe(&t));
                return Err(self.error_stmt(true, msg, t.span));
            }
        }
        Ok(line)
    }

    // =========================================================================
    // Expression Lists
    // =========================================================================

    fn parse_expr_list(&mut self) -> Expr {
        let start = self.peek().span.start;
        let mut items = Vec::new();
        loop {
            let e = self.parse_expr();
            let had_error = e.is_error();
            items.push(e);
            if had_error {
                break;
            }
            if self.accept(&[TokenKind::Comma]).is_err() {
                break;
            }
        }
        Expr::new(ExprKind::List(items), self.span_from(start))
    }

    /// Bracketed expression list that may span lines:
    /// `(a, b)` or `(\n  a,\n  b\n)`, same for `{…}`.
    fn parse_ml_expr_list(&mut self, open: TokenKind, close: TokenKind) -> Expr {
        let start = self.peek().span.start;
        let mut items = Vec::new();

        if let Err(t) = self.accept(&[open]) {
            let msg = format!("Invalid token in expression list: {}", self.describe(&t));
            let e = self.error_expr(true, msg, t.span);
            items.push(e);
            return Expr::new(ExprKind::List(items), self.span_from(start));
        }

        if self.peek_kind() != close {
            if self.accept(&[TokenKind::Eol, TokenKind::Indent]).is_ok() {
                loop {
                    let e = self.parse_expr();
                    let had_error = e.is_error();
                    items.push(e);
                    if had_error {
                        break;
                    }
                    if self
                        .accept(&[TokenKind::Eol, TokenKind::Dedent, TokenKind::Eol])
                        .is_ok()
                    {
                        break;
                    }
                    if let Err(t) = self.accept(&[TokenKind::Comma]) {
                        let msg =
                            format!("Invalid token in expression list: {}", self.describe(&t));
                        let e = self.error_expr(true, msg, t.span);
                        items.push(e);
                        break;
                    }
                    let _ = self.accept(&[TokenKind::Eol]); // eat EOL if it's there
                    if self.peek_kind() == TokenKind::Eof {
                        break;
                    }
                }
            } else {
                let list = self.parse_expr_list();
                match list.kind {
                    ExprKind::List(inner) => items = inner,
                    _ => items.push(list),
                }
            }
        }

        if let Err(t) = self.accept(&[close]) {
            let msg = format!("Invalid token in expression list: {}", self.describe(&t));
            let e = self.error_expr(true, msg, t.span);
            items.push(e);
        }

        Expr::new(ExprKind::List(items), self.span_from(start))
    }

    // =========================================================================
    // Expressions (precedence climbing)
    // =========================================================================

    fn parse_expr(&mut self) -> Expr {
        let lhs = self.parse_primary_expr();
        if lhs.is_error() {
            return lhs;
        }
        self.parse_binop_rhs(0, lhs)
    }

    fn parse_binop_rhs(&mut self, expr_prec: i8, mut lhs: Expr) -> Expr {
        loop {
            let tok_prec = self.peek_combo().precedence();

            // If this is a binary operator that binds as tightly as the
            // current one, consume it. Otherwise we're done.
            if tok_prec < expr_prec {
                return lhs;
            }

            let op = self.next_combo();

            let mut rhs = self.parse_primary_expr();
            if rhs.is_error() {
                return rhs;
            }

            // If the operator after rhs binds tighter, let it take rhs
            // as its lhs first.
            let next_prec = self.peek_combo().precedence();
            if tok_prec < next_prec {
                rhs = self.parse_binop_rhs(tok_prec + 1, rhs);
                if rhs.is_error() {
                    return rhs;
                }
            }

            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op: op.kind,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                span,
            );
        }
    }

    fn parse_primary_expr(&mut self) -> Expr {
        let lhs = match self.peek_kind() {
            TokenKind::LParen => Some(self.parse_paren_expr()),
            TokenKind::LCurly => Some(self.parse_curly_expr()),
            TokenKind::LBracket => Some(self.parse_array_cons()),
            TokenKind::Ident => Some(self.parse_ident_expr()),
            TokenKind::Iota => {
                let t = self.next();
                Some(Expr::new(ExprKind::Iota, t.span))
            }
            TokenKind::Blank => {
                let t = self.next();
                Some(Expr::new(ExprKind::Blank, t.span))
            }
            TokenKind::Str => {
                let t = self.next();
                Some(Expr::new(ExprKind::Str(t.text), t.span))
            }
            TokenKind::Number => {
                let t = self.next();
                Some(Expr::new(ExprKind::Number(t.text), t.span))
            }
            TokenKind::Char => {
                let t = self.next();
                Some(Expr::new(ExprKind::Char(t.text), t.span))
            }
            TokenKind::True | TokenKind::False => {
                let t = self.next();
                Some(Expr::new(ExprKind::Bool(t.kind == TokenKind::True), t.span))
            }
            TokenKind::Fn => Some(self.parse_anon_func_expr()),
            k if k.is_unary_op() => Some(self.parse_unary_expr()),
            _ => None,
        };

        match lhs {
            Some(mut lhs) => {
                // Accessors, constructors and function calls chain as
                // long as an opening bracket follows.
                loop {
                    match self.peek_kind() {
                        TokenKind::LBracket => lhs = self.parse_accessor(lhs),
                        TokenKind::LCurly => lhs = self.parse_constructor(lhs),
                        TokenKind::LParen => lhs = self.parse_func_call(lhs),
                        _ => break,
                    }
                }
                lhs
            }
            None => {
                let t = self.peek().clone();
                let msg = format!("Token is not an expression: {}", self.describe(&t));
                self.error_expr(true, msg, t.span)
            }
        }
    }

    fn parse_paren_expr(&mut self) -> Expr {
        self.next(); // eat (
        let expr = self.parse_expr();
        if let Err(t) = self.accept(&[TokenKind::RParen]) {
            let msg = format!("Invalid token in (): {}", self.describe(&t));
            return self.error_expr(true, msg, t.span);
        }
        expr
    }

    fn parse_curly_expr(&mut self) -> Expr {
        let start = self.peek().span.start;
        let vals = self.parse_ml_expr_list(TokenKind::LCurly, TokenKind::RCurly);
        Expr::new(ExprKind::ArrayValues(Box::new(vals)), self.span_from(start))
    }

    /// Array constructor `[size]Type`.
    fn parse_array_cons(&mut self) -> Expr {
        let start = self.peek().span.start;
        self.next(); // eat [
        let size = self.parse_expr();
        if size.is_error() {
            return size;
        }
        if let Err(t) = self.accept(&[TokenKind::RBracket]) {
            let msg = format!("Invalid token in array constructor: {}", self.describe(&t));
            return self.error_expr(true, msg, t.span);
        }
        let elem = self.parse_type();
        if let Type::Error(msg) = elem {
            return Expr::new(ExprKind::Error(msg), self.span_from(start));
        }
        Expr::new(
            ExprKind::ArrayCons { elem, size: Box::new(size) },
            self.span_from(start),
        )
    }

    /// Dotted identifier chain. Each part may carry generic arguments
    /// in `<…>`; if no closing `>` turns up before a non-type token,
    /// the position is rewound and the `<` is left for the comparison
    /// operator — this resolves the generics-vs-less-than ambiguity.
    fn parse_ident_expr(&mut self) -> Expr {
        let start = self.peek().span.start;
        let mut parts = Vec::new();
        loop {
            let toks = match self.accept(&[TokenKind::Ident]) {
                Ok(toks) => toks,
                Err(t) => {
                    let msg = format!("Invalid token in identifier: {}", self.describe(&t));
                    return self.error_expr(true, msg, t.span);
                }
            };
            let mut part = IdentPart::new(toks[0].text.clone());

            if self.accept(&[TokenKind::Lt]).is_ok() {
                let reset_pos = self.pos - 1; // at the '<', in case it isn't a generic
                while self.peek_kind().is_type_start() {
                    part.type_params.push(self.parse_type());
                    if self.accept(&[TokenKind::Comma]).is_err() {
                        break;
                    }
                }
                if self.accept(&[TokenKind::Gt]).is_err() {
                    // No closing caret: rewind and discard the
                    // speculative type arguments.
                    self.pos = reset_pos;
                    part.type_params.clear();
                }
            }

            parts.push(part);
            if self.accept(&[TokenKind::Dot]).is_err() {
                break;
            }
        }
        Expr::new(ExprKind::Ident(parts), self.span_from(start))
    }

    fn parse_unary_expr(&mut self) -> Expr {
        let t = self.next();
        let expr = self.parse_primary_expr();
        let span = t.span.to(expr.span);
        Expr::new(ExprKind::Unary { op: t.kind, expr: Box::new(expr) }, span)
    }

    fn parse_anon_func_expr(&mut self) -> Expr {
        let start = self.peek().span.start;
        self.next(); // eat fn
        let st = self.parse_func_def(true, None, start);
        let span = st.span;
        match st.kind {
            StmtKind::FuncDef(func) => Expr::new(ExprKind::FuncDef(Box::new(func)), span),
            StmtKind::Error(msg) => Expr::new(ExprKind::Error(msg), span),
            _ => Expr::new(ExprKind::Error("Invalid anonymous function".into()), span),
        }
    }

    /// Single-index accessor `a[i]` or range accessor `a[low:high]`
    /// with either bound optional.
    fn parse_accessor(&mut self, lhs: Expr) -> Expr {
        let start = lhs.span.start;
        self.next(); // eat [

        let mut low = None;
        let mut high = None;
        let mut is_range = false;

        if self.peek_kind() != TokenKind::Colon {
            let e = self.parse_expr();
            if e.is_error() {
                return e;
            }
            low = Some(e);
        }

        if self.accept(&[TokenKind::Colon]).is_ok() {
            is_range = true;
            if self.peek_kind() != TokenKind::RBracket {
                let e = self.parse_expr();
                if e.is_error() {
                    return e;
                }
                high = Some(e);
            }
        }

        if let Err(t) = self.accept(&[TokenKind::RBracket]) {
            let msg = format!("Invalid token in accessor: {}", self.describe(&t));
            return self.error_expr(true, msg, t.span);
        }

        let span = self.span_from(start);
        if is_range {
            Expr::new(
                ExprKind::AccessorRange {
                    object: Box::new(lhs),
                    low: low.map(Box::new),
                    high: high.map(Box::new),
                },
                span,
            )
        } else {
            match low {
                Some(index) => Expr::new(
                    ExprKind::Accessor { object: Box::new(lhs), index: Box::new(index) },
                    span,
                ),
                None => {
                    let t = self.peek().clone();
                    let msg = format!("Invalid token in accessor: {}", self.describe(&t));
                    self.error_expr(true, msg, t.span)
                }
            }
        }
    }

    fn parse_constructor(&mut self, lhs: Expr) -> Expr {
        let start = lhs.span.start;
        self.next(); // eat {
        let mut fields: Vec<KeyVal> = Vec::new();

        if self.peek_kind() != TokenKind::RCurly {
            if self.accept(&[TokenKind::Eol, TokenKind::Indent]).is_ok() {
                loop {
                    match self.parse_key_val() {
                        Ok(kv) => {
                            let had_error = kv.val.is_error();
                            fields.push(kv);
                            if had_error {
                                break;
                            }
                        }
                        Err(e) => return e,
                    }
                    if self
                        .accept(&[TokenKind::Eol, TokenKind::Dedent, TokenKind::Eol])
                        .is_ok()
                    {
                        break;
                    }
                    if let Err(t) = self.accept(&[TokenKind::Comma]) {
                        let msg =
                            format!("Invalid token in constructor: {}", self.describe(&t));
                        return self.error_expr(true, msg, t.span);
                    }
                    let _ = self.accept(&[TokenKind::Eol]); // eat EOL if it's there
                    if self.peek_kind() == TokenKind::Eof {
                        break;
                    }
                }
            } else {
                loop {
                    match self.parse_key_val() {
                        Ok(kv) => {
                            let had_error = kv.val.is_error();
                            fields.push(kv);
                            if had_error {
                                break;
                            }
                        }
                        Err(e) => return e,
                    }
                    if self.accept(&[TokenKind::Comma]).is_err() {
                        break;
                    }
                }
            }
        }

        if let Err(t) = self.accept(&[TokenKind::RCurly]) {
            let msg = format!("Invalid token in constructor: {}", self.describe(&t));
            return self.error_expr(true, msg, t.span);
        }

        Expr::new(
            ExprKind::Constructor { ty: Box::new(lhs), fields },
            self.span_from(start),
        )
    }

    fn parse_key_val(&mut self) -> Result<KeyVal, Expr> {
        let toks = match self.accept(&[TokenKind::Ident, TokenKind::Colon]) {
            Ok(toks) => toks,
            Err(t) => {
                let msg = format!("Invalid token in key:value pair: {}", self.describe(&t));
                return Err(self.error_expr(true, msg, t.span));
            }
        };
        let val = self.parse_expr();
        Ok(KeyVal { key: toks[0].text.clone(), val })
    }

    fn parse_func_call(&mut self, lhs: Expr) -> Expr {
        let start = lhs.span.start;
        let args = self.parse_ml_expr_list(TokenKind::LParen, TokenKind::RParen);
        Expr::new(
            ExprKind::Call { callee: Box::new(lhs), args: Box::new(args) },
            self.span_from(start),
        )
    }
}
