// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Debug tree printer and error-collection walk.
//!
//! Rendering is a plain function over the tree; the AST itself knows
//! nothing about presentation. Error nodes print inline, so a tree
//! with recovery points is still fully printable.

use crate::expr::{Expr, ExprKind};
use crate::stmt::{File, FuncDef, Stmt, StmtKind};
use crate::types::Type;
use crate::Span;

/// Render a parsed file as an indented tree, one node per line.
pub fn print_file(file: &File) -> String {
    let mut p = Printer { out: String::new() };
    p.line(0, &file.name);
    for s in &file.stmts {
        p.stmt(s, 1);
    }
    p.out
}

/// Collect every Error node in tree order, with its span.
pub fn collect_errors(file: &File) -> Vec<(&str, Span)> {
    let mut errs = Vec::new();
    for s in &file.stmts {
        walk_stmt(s, &mut errs);
    }
    errs
}

fn walk_stmt<'a>(stmt: &'a Stmt, errs: &mut Vec<(&'a str, Span)>) {
    match &stmt.kind {
        StmtKind::Error(msg) => errs.push((msg, stmt.span)),
        StmtKind::Expr(e) => walk_expr(e, errs),
        StmtKind::TypeRedirect { ty, .. } => walk_type(ty, stmt.span, errs),
        StmtKind::Class(c) => {
            for w in &c.withs {
                walk_type(w, stmt.span, errs);
            }
            for s in &c.stmts {
                walk_stmt(s, errs);
            }
        }
        StmtKind::Interface(i) => {
            for w in &i.withs {
                walk_type(w, stmt.span, errs);
            }
            for fs in &i.func_sigs {
                for t in fs.sig.params.iter().chain(&fs.sig.returns) {
                    walk_type(t, stmt.span, errs);
                }
            }
        }
        StmtKind::PropertySet(ps) => {
            for p in &ps.props {
                if let Some(ty) = &p.ty {
                    walk_type(ty, stmt.span, errs);
                }
            }
            if let Some(vals) = &ps.vals {
                walk_expr(vals, errs);
            }
        }
        StmtKind::FuncDef(f) => walk_func_def(f, stmt.span, errs),
        StmtKind::VarSet(lines) => {
            for line in lines {
                for v in &line.vars {
                    if let Some(ty) = &v.ty {
                        walk_type(ty, stmt.span, errs);
                    }
                }
                if let Some(vals) = &line.vals {
                    walk_expr(vals, errs);
                }
            }
        }
        StmtKind::Return { vals } => {
            if let Some(vals) = vals {
                walk_expr(vals, errs);
            }
        }
        StmtKind::Defer { expr } => walk_expr(expr, errs),
        StmtKind::If(i) => {
            if let Some(cond) = &i.cond {
                walk_expr(cond, errs);
            }
            if let Some(with) = &i.with {
                walk_stmt(with, errs);
            }
            for s in &i.body {
                walk_stmt(s, errs);
            }
        }
        StmtKind::Is(i) => {
            walk_expr(&i.cond, errs);
            for s in &i.body {
                walk_stmt(s, errs);
            }
        }
        StmtKind::For(f) => {
            walk_expr(&f.iter, errs);
            for s in &f.body {
                walk_stmt(s, errs);
            }
        }
        StmtKind::Loop(l) => {
            for s in &l.body {
                walk_stmt(s, errs);
            }
        }
        StmtKind::Assign { left, right, .. } => {
            walk_expr(left, errs);
            walk_expr(right, errs);
        }
        StmtKind::Use(_) | StmtKind::IotaReset | StmtKind::Break { .. } => {}
    }
}

fn walk_func_def<'a>(f: &'a FuncDef, span: Span, errs: &mut Vec<(&'a str, Span)>) {
    for p in &f.params {
        if let Some(ty) = &p.ty {
            walk_type(ty, span, errs);
        }
    }
    for r in &f.returns {
        walk_type(r, span, errs);
    }
    for s in &f.body {
        walk_stmt(s, errs);
    }
}

/// Type errors have no span of their own; they borrow the enclosing
/// node's.
fn walk_type<'a>(ty: &'a Type, span: Span, errs: &mut Vec<(&'a str, Span)>) {
    match ty {
        Type::Error(msg) => errs.push((msg, span)),
        Type::Ident(ti) => {
            for tp in &ti.type_params {
                walk_type(tp, span, errs);
            }
        }
        Type::Array(elem) => walk_type(elem, span, errs),
        Type::FuncSig(sig) => {
            for t in sig.params.iter().chain(&sig.returns) {
                walk_type(t, span, errs);
            }
        }
    }
}

fn walk_expr<'a>(expr: &'a Expr, errs: &mut Vec<(&'a str, Span)>) {
    match &expr.kind {
        ExprKind::Error(msg) => errs.push((msg, expr.span)),
        ExprKind::Call { callee, args } => {
            walk_expr(callee, errs);
            walk_expr(args, errs);
        }
        ExprKind::Accessor { object, index } => {
            walk_expr(object, errs);
            walk_expr(index, errs);
        }
        ExprKind::AccessorRange { object, low, high } => {
            walk_expr(object, errs);
            if let Some(low) = low {
                walk_expr(low, errs);
            }
            if let Some(high) = high {
                walk_expr(high, errs);
            }
        }
        ExprKind::Constructor { ty, fields } => {
            walk_expr(ty, errs);
            for kv in fields {
                walk_expr(&kv.val, errs);
            }
        }
        ExprKind::ArrayCons { elem, size } => {
            walk_type(elem, expr.span, errs);
            walk_expr(size, errs);
        }
        ExprKind::ArrayValues(vals) => walk_expr(vals, errs),
        ExprKind::Unary { expr, .. } => walk_expr(expr, errs),
        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, errs);
            walk_expr(right, errs);
        }
        ExprKind::List(items) => {
            for item in items {
                walk_expr(item, errs);
            }
        }
        ExprKind::FuncDef(f) => walk_func_def(f, expr.span, errs),
        ExprKind::Ident(parts) => {
            for part in parts {
                for tp in &part.type_params {
                    walk_type(tp, expr.span, errs);
                }
            }
        }
        ExprKind::FuncSig(sig) => {
            for t in sig.params.iter().chain(&sig.returns) {
                walk_type(t, expr.span, errs);
            }
        }
        ExprKind::Number(_)
        | ExprKind::Str(_)
        | ExprKind::Char(_)
        | ExprKind::Bool(_)
        | ExprKind::Iota
        | ExprKind::Blank => {}
    }
}

struct Printer {
    out: String,
}

impl Printer {
    fn line(&mut self, indent: usize, text: &str) {
        for _ in 0..indent {
            self.out.push_str("|   ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn stmt(&mut self, stmt: &Stmt, indent: usize) {
        match &stmt.kind {
            StmtKind::Error(msg) => self.line(indent, &format!("ERROR: {}", msg)),
            StmtKind::Expr(e) => {
                self.line(indent, "expr stmt");
                self.expr(e, indent + 1);
            }
            StmtKind::Use(packages) => {
                self.line(indent, "use");
                for p in packages {
                    match &p.alias {
                        Some(alias) => self.line(indent + 1, &format!("{} as {}", p.path, alias)),
                        None => self.line(indent + 1, &p.path),
                    }
                }
            }
            StmtKind::TypeRedirect { ty, name } => {
                self.line(indent, &format!("{} as {}", ty, name));
            }
            StmtKind::Class(c) => {
                let mut header = String::new();
                if c.mixin {
                    header.push_str("mixin ");
                }
                header.push_str("class ");
                header.push_str(&c.name);
                if !c.type_params.is_empty() {
                    header.push('<');
                    header.push_str(&c.type_params.join(", "));
                    header.push('>');
                }
                if !c.withs.is_empty() {
                    header.push_str(" with ");
                    let withs: Vec<String> = c.withs.iter().map(|w| w.to_string()).collect();
                    header.push_str(&withs.join(", "));
                }
                self.line(indent, &header);
                for s in &c.stmts {
                    self.stmt(s, indent + 1);
                }
            }
            StmtKind::Interface(i) => {
                let mut header = format!("interface {}", i.name);
                if !i.withs.is_empty() {
                    header.push_str(" with ");
                    let withs: Vec<String> = i.withs.iter().map(|w| w.to_string()).collect();
                    header.push_str(&withs.join(", "));
                }
                self.line(indent, &header);
                for fs in &i.func_sigs {
                    // Reuse the signature rendering, swapping `fn` for the name.
                    let sig = fs.sig.to_string();
                    self.line(indent + 1, &format!("{}{}", fs.name, &sig[2..]));
                }
            }
            StmtKind::PropertySet(ps) => {
                let props: Vec<String> = ps
                    .props
                    .iter()
                    .map(|p| {
                        let mut s = String::new();
                        if p.is_static {
                            s.push_str("static ");
                        }
                        s.push_str(&p.name);
                        if let Some(ty) = &p.ty {
                            s.push_str(&format!(" {}", ty));
                        }
                        s
                    })
                    .collect();
                self.line(indent, &format!("prop set: {}", props.join(", ")));
                if let Some(vals) = &ps.vals {
                    self.expr(vals, indent + 1);
                }
            }
            StmtKind::FuncDef(f) => self.func_def(f, indent),
            StmtKind::IotaReset => self.line(indent, "iota reset"),
            StmtKind::VarSet(lines) => {
                self.line(indent, "var set");
                for l in lines {
                    let vars: Vec<String> = l
                        .vars
                        .iter()
                        .map(|v| match &v.ty {
                            Some(ty) => format!("{} {}", v.name, ty),
                            None => v.name.clone(),
                        })
                        .collect();
                    self.line(indent + 1, &vars.join(", "));
                    if let Some(vals) = &l.vals {
                        self.expr(vals, indent + 2);
                    }
                }
            }
            StmtKind::Return { vals } => {
                self.line(indent, "ret");
                if let Some(vals) = vals {
                    self.expr(vals, indent + 1);
                }
            }
            StmtKind::Defer { expr } => {
                self.line(indent, "defer");
                self.expr(expr, indent + 1);
            }
            StmtKind::If(i) => {
                self.line(indent, "if");
                if let Some(cond) = &i.cond {
                    self.expr(cond, indent + 1);
                }
                if let Some(with) = &i.with {
                    self.line(indent + 1, "with");
                    self.stmt(with, indent + 2);
                }
                self.line(indent + 1, "then");
                for s in &i.body {
                    self.stmt(s, indent + 2);
                }
            }
            StmtKind::Is(i) => {
                self.line(indent, "is");
                self.expr(&i.cond, indent + 1);
                self.line(indent + 1, "then");
                for s in &i.body {
                    self.stmt(s, indent + 2);
                }
            }
            StmtKind::For(f) => {
                let label = f
                    .label
                    .as_ref()
                    .map(|l| format!("{}: ", l))
                    .unwrap_or_default();
                self.line(indent, &format!("{}for {} in", label, f.vars.join(", ")));
                self.expr(&f.iter, indent + 2);
                for s in &f.body {
                    self.stmt(s, indent + 1);
                }
            }
            StmtKind::Loop(l) => {
                let label = l
                    .label
                    .as_ref()
                    .map(|l| format!("{}: ", l))
                    .unwrap_or_default();
                self.line(indent, &format!("{}loop", label));
                for s in &l.body {
                    self.stmt(s, indent + 1);
                }
            }
            StmtKind::Break { label } => match label {
                Some(l) => self.line(indent, &format!("break {}", l)),
                None => self.line(indent, "break"),
            },
            StmtKind::Assign { op, left, right } => {
                self.line(indent, &format!("assign {}", op.display_name()));
                self.expr(left, indent + 1);
                self.expr(right, indent + 1);
            }
        }
    }

    fn func_def(&mut self, f: &FuncDef, indent: usize) {
        let mut header = String::new();
        if f.is_static {
            header.push_str("static ");
        }
        match &f.name {
            Some(name) => header.push_str(name),
            None => header.push_str("fn"),
        }
        header.push('(');
        for (i, p) in f.params.iter().enumerate() {
            if i > 0 {
                header.push_str(", ");
            }
            header.push_str(&p.name);
            if let Some(ty) = &p.ty {
                header.push_str(&format!(" {}", ty));
            }
        }
        header.push(')');
        if !f.returns.is_empty() {
            header.push(' ');
            if f.returns.len() > 1 {
                header.push('(');
            }
            let rets: Vec<String> = f.returns.iter().map(|r| r.to_string()).collect();
            header.push_str(&rets.join(", "));
            if f.returns.len() > 1 {
                header.push(')');
            }
        }
        self.line(indent, &header);
        for s in &f.body {
            self.stmt(s, indent + 1);
        }
    }

    fn expr(&mut self, expr: &Expr, indent: usize) {
        match &expr.kind {
            ExprKind::Error(msg) => self.line(indent, &format!("ERROR: {}", msg)),
            ExprKind::Ident(parts) => {
                let rendered: Vec<String> = parts
                    .iter()
                    .map(|p| {
                        let mut s = p.name.clone();
                        if !p.type_params.is_empty() {
                            s.push('<');
                            let tps: Vec<String> =
                                p.type_params.iter().map(|t| t.to_string()).collect();
                            s.push_str(&tps.join(", "));
                            s.push('>');
                        }
                        s
                    })
                    .collect();
                self.line(indent, &rendered.join("."));
            }
            ExprKind::Call { callee, args } => {
                self.line(indent, "func");
                self.expr(callee, indent + 2);
                self.line(indent + 1, "params");
                self.expr(args, indent + 2);
            }
            ExprKind::Accessor { object, index } => {
                self.line(indent, "accessor");
                self.expr(object, indent + 2);
                self.line(indent + 1, "index");
                self.expr(index, indent + 2);
            }
            ExprKind::AccessorRange { object, low, high } => {
                self.line(indent, "range accessor");
                self.expr(object, indent + 2);
                self.line(indent + 1, "from");
                match low {
                    Some(low) => self.expr(low, indent + 2),
                    None => self.line(indent + 2, "implicit 0"),
                }
                self.line(indent + 1, "to");
                match high {
                    Some(high) => self.expr(high, indent + 2),
                    None => self.line(indent + 2, "implicit length - 1"),
                }
            }
            ExprKind::Constructor { ty, fields } => {
                self.line(indent, "cons");
                self.expr(ty, indent + 2);
                self.line(indent + 1, "vals");
                for kv in fields {
                    self.line(indent + 2, &format!("{}:", kv.key));
                    self.expr(&kv.val, indent + 3);
                }
            }
            ExprKind::ArrayCons { elem, size } => {
                self.line(indent, &format!("array cons {}", elem));
                self.expr(size, indent + 1);
            }
            ExprKind::ArrayValues(vals) => {
                self.line(indent, "array val list");
                self.expr(vals, indent + 1);
            }
            ExprKind::Unary { op, expr: inner } => {
                self.line(indent, op.display_name());
                self.expr(inner, indent + 1);
            }
            ExprKind::Binary { op, left, right } => {
                self.line(indent, op.display_name());
                self.expr(left, indent + 1);
                self.expr(right, indent + 1);
            }
            ExprKind::List(items) => {
                self.line(indent, "expression list");
                for item in items {
                    self.expr(item, indent + 1);
                }
            }
            ExprKind::Number(v) => self.line(indent, &format!("number {}", v)),
            ExprKind::Str(v) => self.line(indent, &format!("string '{}'", v)),
            ExprKind::Char(v) => self.line(indent, &format!("char '{}'", v)),
            ExprKind::Bool(v) => self.line(indent, &format!("bool {}", v)),
            ExprKind::Iota => self.line(indent, "iota"),
            ExprKind::Blank => self.line(indent, "_"),
            ExprKind::FuncDef(f) => self.func_def(f, indent),
            ExprKind::FuncSig(sig) => self.line(indent, &sig.to_string()),
        }
    }
}
