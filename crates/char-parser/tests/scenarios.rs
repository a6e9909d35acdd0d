//! End-to-end parsing scenarios over small sources.

use char_ast::expr::{Expr, ExprKind};
use char_ast::stmt::{Class, File, FuncDef, Stmt, StmtKind};
use char_ast::token::TokenKind;
use char_ast::types::Type;
use char_parser::parse_source;

fn parse(src: &str) -> File {
    parse_source("test.char", src)
}

fn as_class(stmt: &Stmt) -> &Class {
    match &stmt.kind {
        StmtKind::Class(c) => c,
        k => panic!("expected class, got {:?}", k),
    }
}

fn as_func_def(stmt: &Stmt) -> &FuncDef {
    match &stmt.kind {
        StmtKind::FuncDef(f) => f,
        k => panic!("expected function definition, got {:?}", k),
    }
}

/// Unwrap a one-element expression list.
fn only_item(e: &Expr) -> &Expr {
    match &e.kind {
        ExprKind::List(items) => {
            assert_eq!(items.len(), 1, "expected a single item: {:?}", items);
            &items[0]
        }
        k => panic!("expected expression list, got {:?}", k),
    }
}

fn ident_name(e: &Expr) -> &str {
    match &e.kind {
        ExprKind::Ident(parts) => {
            assert_eq!(parts.len(), 1);
            &parts[0].name
        }
        k => panic!("expected identifier, got {:?}", k),
    }
}

/// A class with one nullary function whose body is the given lines,
/// so statement-level scenarios can run in a function context.
fn in_func_body(lines: &[&str]) -> File {
    let mut src = String::from("foo\n  run()\n");
    for line in lines {
        src.push_str("    ");
        src.push_str(line);
        src.push('\n');
    }
    parse(&src)
}

fn body_of(file: &File) -> &[Stmt] {
    let class = as_class(&file.stmts[0]);
    let func = as_func_def(&class.stmts[0]);
    &func.body
}

// ---------------------------------------------------------------------------
// Top-level forms
// ---------------------------------------------------------------------------

#[test]
fn use_single_line() {
    let f = parse("use \"io\"\n");
    assert_eq!(f.stmts.len(), 1);
    match &f.stmts[0].kind {
        StmtKind::Use(ps) => {
            assert_eq!(ps.len(), 1);
            assert_eq!(ps[0].path, "io");
            assert!(ps[0].alias.is_none());
        }
        k => panic!("expected use, got {:?}", k),
    }
}

#[test]
fn use_indented_block_with_alias() {
    let f = parse("use\n  \"x\"\n  \"y\" as z\n");
    match &f.stmts[0].kind {
        StmtKind::Use(ps) => {
            assert_eq!(ps.len(), 2);
            assert_eq!(ps[0].path, "x");
            assert!(ps[0].alias.is_none());
            assert_eq!(ps[1].path, "y");
            assert_eq!(ps[1].alias.as_deref(), Some("z"));
        }
        k => panic!("expected use, got {:?}", k),
    }
}

#[test]
fn type_redirect() {
    let f = parse("Point as P\n");
    match &f.stmts[0].kind {
        StmtKind::TypeRedirect { ty, name } => {
            assert_eq!(name, "P");
            match ty {
                Type::Ident(ti) => assert_eq!(ti.parts, vec!["Point".to_string()]),
                t => panic!("expected type identifier, got {:?}", t),
            }
        }
        k => panic!("expected type redirect, got {:?}", k),
    }
}

#[test]
fn function_signature_redirect() {
    let f = parse("fn(Int, Int) Int as Combine\n");
    match &f.stmts[0].kind {
        StmtKind::TypeRedirect { ty, name } => {
            assert_eq!(name, "Combine");
            match ty {
                Type::FuncSig(sig) => {
                    assert_eq!(sig.params.len(), 2);
                    assert_eq!(sig.returns.len(), 1);
                }
                t => panic!("expected signature type, got {:?}", t),
            }
        }
        k => panic!("expected type redirect, got {:?}", k),
    }
}

#[test]
fn nested_generic_type_closes_both_brackets() {
    // The inner `>>` must be consumed as two separate closing carets.
    let f = parse("Map<Map<Int>> as M\n");
    match &f.stmts[0].kind {
        StmtKind::TypeRedirect { ty, name } => {
            assert_eq!(name, "M");
            let outer = match ty {
                Type::Ident(ti) => ti,
                t => panic!("expected type identifier, got {:?}", t),
            };
            assert_eq!(outer.parts, vec!["Map".to_string()]);
            assert_eq!(outer.type_params.len(), 1);
            let mid = match &outer.type_params[0] {
                Type::Ident(ti) => ti,
                t => panic!("expected type identifier, got {:?}", t),
            };
            assert_eq!(mid.parts, vec!["Map".to_string()]);
            match &mid.type_params[0] {
                Type::Ident(ti) => assert_eq!(ti.parts, vec!["Int".to_string()]),
                t => panic!("expected type identifier, got {:?}", t),
            }
        }
        k => panic!("expected type redirect, got {:?}", k),
    }
}

#[test]
fn class_with_instance_func_and_static_prop() {
    let f = parse("foo\n  .bar()\n    ret 1\n  baz Int = 2\n");
    let class = as_class(&f.stmts[0]);
    assert_eq!(class.name, "foo");
    assert!(!class.mixin);
    assert_eq!(class.stmts.len(), 2);

    let bar = as_func_def(&class.stmts[0]);
    assert_eq!(bar.name.as_deref(), Some("bar"));
    assert!(!bar.is_static);
    assert!(bar.params.is_empty());
    assert_eq!(bar.body.len(), 1);
    match &bar.body[0].kind {
        StmtKind::Return { vals: Some(vals) } => match &only_item(vals).kind {
            ExprKind::Number(n) => assert_eq!(n, "1"),
            k => panic!("expected number, got {:?}", k),
        },
        k => panic!("expected return, got {:?}", k),
    }

    match &class.stmts[1].kind {
        StmtKind::PropertySet(ps) => {
            assert_eq!(ps.props.len(), 1);
            assert!(ps.props[0].is_static);
            assert_eq!(ps.props[0].name, "baz");
            match ps.props[0].ty.as_ref() {
                Some(Type::Ident(ti)) => assert_eq!(ti.parts, vec!["Int".to_string()]),
                t => panic!("expected Int type, got {:?}", t),
            }
            assert!(ps.vals.is_some());
        }
        k => panic!("expected property set, got {:?}", k),
    }
}

#[test]
fn mixin_class_sets_flag() {
    let f = parse("mix Helper\n  .log()\n    ret\n");
    let class = as_class(&f.stmts[0]);
    assert!(class.mixin);
    assert_eq!(class.name, "Helper");
}

#[test]
fn interface_signatures() {
    let f = parse("intf Shape\n  area() Int\n  resize(Int, Int)\n");
    match &f.stmts[0].kind {
        StmtKind::Interface(i) => {
            assert_eq!(i.name, "Shape");
            assert_eq!(i.func_sigs.len(), 2);
            assert_eq!(i.func_sigs[0].name, "area");
            assert!(i.func_sigs[0].sig.params.is_empty());
            assert_eq!(i.func_sigs[0].sig.returns.len(), 1);
            assert_eq!(i.func_sigs[1].name, "resize");
            assert_eq!(i.func_sigs[1].sig.params.len(), 2);
            assert!(i.func_sigs[1].sig.returns.is_empty());
        }
        k => panic!("expected interface, got {:?}", k),
    }
}

#[test]
fn iota_reset_and_expression() {
    let f = parse("foo\n  iota\n  a = iota\n");
    let class = as_class(&f.stmts[0]);
    assert!(matches!(class.stmts[0].kind, StmtKind::IotaReset));
    match &class.stmts[1].kind {
        StmtKind::PropertySet(ps) => {
            let vals = ps.vals.as_ref().unwrap();
            assert!(matches!(only_item(vals).kind, ExprKind::Iota));
        }
        k => panic!("expected property set, got {:?}", k),
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[test]
fn precedence_mul_over_add() {
    let f = in_func_body(&["a = 1 + 2 * 3"]);
    let body = body_of(&f);
    match &body[0].kind {
        StmtKind::Assign { op, left, right } => {
            assert_eq!(*op, TokenKind::Eq);
            assert_eq!(ident_name(only_item(left)), "a");
            match &only_item(right).kind {
                ExprKind::Binary { op, left, right } => {
                    assert_eq!(*op, TokenKind::Plus);
                    assert!(matches!(&left.kind, ExprKind::Number(n) if n == "1"));
                    match &right.kind {
                        ExprKind::Binary { op, left, right } => {
                            assert_eq!(*op, TokenKind::Star);
                            assert!(matches!(&left.kind, ExprKind::Number(n) if n == "2"));
                            assert!(matches!(&right.kind, ExprKind::Number(n) if n == "3"));
                        }
                        k => panic!("expected multiplication, got {:?}", k),
                    }
                }
                k => panic!("expected addition, got {:?}", k),
            }
        }
        k => panic!("expected assignment, got {:?}", k),
    }
}

#[test]
fn equal_precedence_is_left_associative() {
    let f = in_func_body(&["a = 1 - 2 - 3"]);
    let body = body_of(&f);
    match &body[0].kind {
        StmtKind::Assign { right, .. } => match &only_item(right).kind {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(*op, TokenKind::Minus);
                assert!(matches!(&right.kind, ExprKind::Number(n) if n == "3"));
                match &left.kind {
                    ExprKind::Binary { op, .. } => assert_eq!(*op, TokenKind::Minus),
                    k => panic!("expected nested subtraction, got {:?}", k),
                }
            }
            k => panic!("expected subtraction, got {:?}", k),
        },
        k => panic!("expected assignment, got {:?}", k),
    }
}

#[test]
fn right_shift_fused_in_expressions() {
    let f = in_func_body(&["a = b >> 2"]);
    let body = body_of(&f);
    match &body[0].kind {
        StmtKind::Assign { right, .. } => match &only_item(right).kind {
            ExprKind::Binary { op, .. } => assert_eq!(*op, TokenKind::GtGt),
            k => panic!("expected shift, got {:?}", k),
        },
        k => panic!("expected assignment, got {:?}", k),
    }
}

#[test]
fn compound_assign_operators() {
    let f = in_func_body(&["a += 1", "b >>= 2"]);
    let body = body_of(&f);
    assert!(matches!(
        body[0].kind,
        StmtKind::Assign { op: TokenKind::PlusEq, .. }
    ));
    assert!(matches!(
        body[1].kind,
        StmtKind::Assign { op: TokenKind::GtGtEq, .. }
    ));
}

#[test]
fn generic_call_vs_comparison() {
    // With a closing caret the arguments are generic parameters...
    let f = in_func_body(&["x = a<b, c>(d)"]);
    match &body_of(&f)[0].kind {
        StmtKind::Assign { right, .. } => match &only_item(right).kind {
            ExprKind::Call { callee, .. } => match &callee.kind {
                ExprKind::Ident(parts) => {
                    assert_eq!(parts[0].name, "a");
                    assert_eq!(parts[0].type_params.len(), 2);
                }
                k => panic!("expected identifier callee, got {:?}", k),
            },
            k => panic!("expected call, got {:?}", k),
        },
        k => panic!("expected assignment, got {:?}", k),
    }

    // ...without one, the position is rewound and `<` is comparison.
    let f = in_func_body(&["x = a < b + 1"]);
    match &body_of(&f)[0].kind {
        StmtKind::Assign { right, .. } => match &only_item(right).kind {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(*op, TokenKind::Lt);
                match &left.kind {
                    ExprKind::Ident(parts) => assert!(parts[0].type_params.is_empty()),
                    k => panic!("expected identifier, got {:?}", k),
                }
                assert!(matches!(&right.kind, ExprKind::Binary { op: TokenKind::Plus, .. }));
            }
            k => panic!("expected comparison, got {:?}", k),
        },
        k => panic!("expected assignment, got {:?}", k),
    }
}

#[test]
fn postfix_chains() {
    let f = in_func_body(&[
        "x = items[0]",
        "y = items[1:n]",
        "z = items[:]",
        "p = Point{a: 1, b: 2}",
        "q = make(1, 2)",
    ]);
    let body = body_of(&f);

    let rhs = |stmt: &Stmt| match &stmt.kind {
        StmtKind::Assign { right, .. } => only_item(right).kind.clone(),
        k => panic!("expected assignment, got {:?}", k),
    };

    assert!(matches!(rhs(&body[0]), ExprKind::Accessor { .. }));
    match rhs(&body[1]) {
        ExprKind::AccessorRange { low, high, .. } => {
            assert!(low.is_some());
            assert!(high.is_some());
        }
        k => panic!("expected range accessor, got {:?}", k),
    }
    match rhs(&body[2]) {
        ExprKind::AccessorRange { low, high, .. } => {
            assert!(low.is_none());
            assert!(high.is_none());
        }
        k => panic!("expected range accessor, got {:?}", k),
    }
    match rhs(&body[3]) {
        ExprKind::Constructor { fields, .. } => {
            assert_eq!(fields.len(), 2);
            assert_eq!(fields[0].key, "a");
            assert_eq!(fields[1].key, "b");
        }
        k => panic!("expected constructor, got {:?}", k),
    }
    match rhs(&body[4]) {
        ExprKind::Call { args, .. } => match &args.kind {
            ExprKind::List(items) => assert_eq!(items.len(), 2),
            k => panic!("expected argument list, got {:?}", k),
        },
        k => panic!("expected call, got {:?}", k),
    }
}

#[test]
fn array_cons_and_value_list() {
    let f = in_func_body(&["a = [8]Int", "b = {1, 2, 3}"]);
    let body = body_of(&f);
    match &body[0].kind {
        StmtKind::Assign { right, .. } => match &only_item(right).kind {
            ExprKind::ArrayCons { elem, size } => {
                assert!(matches!(elem, Type::Ident(ti) if ti.parts == ["Int"]));
                assert!(matches!(&size.kind, ExprKind::Number(n) if n == "8"));
            }
            k => panic!("expected array constructor, got {:?}", k),
        },
        k => panic!("expected assignment, got {:?}", k),
    }
    match &body[1].kind {
        StmtKind::Assign { right, .. } => match &only_item(right).kind {
            ExprKind::ArrayValues(vals) => match &vals.kind {
                ExprKind::List(items) => assert_eq!(items.len(), 3),
                k => panic!("expected list, got {:?}", k),
            },
            k => panic!("expected array values, got {:?}", k),
        },
        k => panic!("expected assignment, got {:?}", k),
    }
}

#[test]
fn unary_binds_to_primary() {
    let f = in_func_body(&["a = -b * c", "ok = !done"]);
    let body = body_of(&f);
    match &body[0].kind {
        StmtKind::Assign { right, .. } => match &only_item(right).kind {
            ExprKind::Binary { op, left, .. } => {
                assert_eq!(*op, TokenKind::Star);
                assert!(matches!(
                    &left.kind,
                    ExprKind::Unary { op: TokenKind::Minus, .. }
                ));
            }
            k => panic!("expected multiplication, got {:?}", k),
        },
        k => panic!("expected assignment, got {:?}", k),
    }
    match &body[1].kind {
        StmtKind::Assign { right, .. } => {
            assert!(matches!(
                &only_item(right).kind,
                ExprKind::Unary { op: TokenKind::Bang, .. }
            ));
        }
        k => panic!("expected assignment, got {:?}", k),
    }
}

// ---------------------------------------------------------------------------
// Function-body statements
// ---------------------------------------------------------------------------

#[test]
fn var_multi_line_block() {
    let f = in_func_body(&["var a Int = 1", "  b Str", "  _ = use_it()"]);
    match &body_of(&f)[0].kind {
        StmtKind::VarSet(lines) => {
            assert_eq!(lines.len(), 3);
            assert_eq!(lines[0].vars[0].name, "a");
            assert!(lines[0].vals.is_some());
            assert_eq!(lines[1].vars[0].name, "b");
            assert!(lines[1].vals.is_none());
            assert_eq!(lines[2].vars[0].name, "_");
        }
        k => panic!("expected var set, got {:?}", k),
    }
}

#[test]
fn if_with_clause_and_is_blocks() {
    let f = in_func_body(&[
        "if ok with var t Int = 1",
        "  ret t",
        "if",
        "  is a == 1",
        "    ret a",
        "  ret 0",
    ]);
    let body = body_of(&f);

    match &body[0].kind {
        StmtKind::If(i) => {
            assert!(i.cond.is_some());
            let with = i.with.as_ref().expect("with clause");
            assert!(matches!(with.kind, StmtKind::VarSet(_)));
            assert_eq!(i.body.len(), 1);
        }
        k => panic!("expected if, got {:?}", k),
    }

    match &body[1].kind {
        StmtKind::If(i) => {
            assert!(i.cond.is_none());
            assert!(i.with.is_none());
            assert_eq!(i.body.len(), 2);
            assert!(matches!(&i.body[0].kind, StmtKind::Is(_)));
            assert!(matches!(&i.body[1].kind, StmtKind::Return { .. }));
        }
        k => panic!("expected if, got {:?}", k),
    }
}

#[test]
fn loops_labels_break_defer() {
    let f = in_func_body(&[
        "outer: for a, b in pairs()",
        "  break outer",
        "loop",
        "  break",
        "defer close()",
    ]);
    let body = body_of(&f);

    match &body[0].kind {
        StmtKind::For(fl) => {
            assert_eq!(fl.label.as_deref(), Some("outer"));
            assert_eq!(fl.vars, vec!["a".to_string(), "b".to_string()]);
            assert_eq!(fl.body.len(), 1);
            match &fl.body[0].kind {
                StmtKind::Break { label } => assert_eq!(label.as_deref(), Some("outer")),
                k => panic!("expected break, got {:?}", k),
            }
        }
        k => panic!("expected for, got {:?}", k),
    }

    match &body[1].kind {
        StmtKind::Loop(l) => {
            assert!(l.label.is_none());
            assert!(matches!(l.body[0].kind, StmtKind::Break { label: None }));
        }
        k => panic!("expected loop, got {:?}", k),
    }

    assert!(matches!(body[2].kind, StmtKind::Defer { .. }));
}

#[test]
fn anonymous_function_pushes_back_eol() {
    let f = in_func_body(&["var v fn() = fn()", "  ret", "ret"]);
    let body = body_of(&f);
    assert_eq!(body.len(), 2);
    match &body[0].kind {
        StmtKind::VarSet(lines) => {
            let vals = lines[0].vals.as_ref().expect("initializer");
            match &only_item(vals).kind {
                ExprKind::FuncDef(func) => {
                    assert!(func.name.is_none());
                    assert_eq!(func.body.len(), 1);
                }
                k => panic!("expected anonymous function, got {:?}", k),
            }
        }
        k => panic!("expected var set, got {:?}", k),
    }
    assert!(matches!(body[1].kind, StmtKind::Return { .. }));
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

#[test]
fn lexical_error_yields_single_error_statement() {
    let f = parse("\"hi\n");
    assert_eq!(f.stmts.len(), 1);
    match &f.stmts[0].kind {
        StmtKind::Error(msg) => assert!(msg.contains("Unclosed \""), "message: {}", msg),
        k => panic!("expected error, got {:?}", k),
    }
}

#[test]
fn bad_line_does_not_cascade() {
    let f = parse("foo\n  %bad\n  ok Int = 1\nbar\n  x Int\n");
    assert_eq!(f.stmts.len(), 2);

    let foo = as_class(&f.stmts[0]);
    assert_eq!(foo.stmts.len(), 2);
    assert!(foo.stmts[0].is_error());
    assert!(matches!(foo.stmts[1].kind, StmtKind::PropertySet(_)));

    let bar = as_class(&f.stmts[1]);
    assert_eq!(bar.name, "bar");
    assert!(matches!(bar.stmts[0].kind, StmtKind::PropertySet(_)));
}

#[test]
fn unexpected_eof_mid_block_is_an_error_not_a_panic() {
    let f = parse("foo\n  run()\n");
    assert_eq!(f.stmts.len(), 1);
    let class = as_class(&f.stmts[0]);
    assert!(class.stmts.iter().any(|s| s.is_error()));
}

#[test]
fn empty_and_comment_only_files() {
    assert!(parse("").stmts.is_empty());
    assert!(parse("\n\n").stmts.is_empty());
    assert!(parse("; just commentary\n; more\n").stmts.is_empty());
}

#[test]
fn error_messages_carry_position() {
    let f = parse("foo\n  %bad\n  ok Int = 1\n");
    let errs = char_ast::printer::collect_errors(&f);
    assert_eq!(errs.len(), 1);
    // (line:col) of the offending token
    assert!(errs[0].0.contains("(2:3)"), "message: {}", errs[0].0);
}
