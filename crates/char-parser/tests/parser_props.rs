//! Property tests: the pipeline must terminate and uphold its stream
//! invariants for arbitrary input.

use char_ast::token::TokenKind;
use char_lexer::Lexer;
use char_parser::parse_source;
use proptest::prelude::*;

fn check_stream(s: &str) -> Result<(), TestCaseError> {
    let result = Lexer::new(s).tokenize();
    let toks = &result.tokens;
    prop_assert!(!toks.is_empty(), "stream may not be empty");

    let last = toks.last().unwrap();
    if result.is_ok() {
        prop_assert_eq!(last.kind, TokenKind::Eof, "clean streams end with EOF");
        let indents = toks.iter().filter(|t| t.kind == TokenKind::Indent).count();
        let dedents = toks.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        prop_assert_eq!(indents, dedents, "INDENT/DEDENT must balance");
    } else {
        prop_assert_eq!(last.kind, TokenKind::Error, "failed streams end with ERROR");
        prop_assert_eq!(result.errors.len(), 1, "the first error terminates the stream");
    }

    let mut prev_start = 0usize;
    for (i, t) in toks.iter().enumerate() {
        prop_assert!(t.span.start <= t.span.end, "span inverted: {:?}", t);
        prop_assert!(t.span.end <= s.len(), "span out of bounds: {:?}", t);
        prop_assert!(
            t.span.start >= prev_start,
            "token moved backwards: {:?} after {}",
            t,
            prev_start
        );
        prev_start = t.span.start;

        if t.kind == TokenKind::Eof {
            prop_assert_eq!(i, toks.len() - 1, "nothing may follow EOF");
        }
        if t.kind == TokenKind::Dedent {
            prop_assert_eq!(
                toks[i + 1].kind,
                TokenKind::Eol,
                "every DEDENT is followed by EOL"
            );
        }
    }
    Ok(())
}

fn check_parse(name: &str, s: &str) -> Result<(), TestCaseError> {
    // `parse` must return a file for any input; errors are data.
    let file = parse_source(name, s);
    for (msg, span) in char_ast::printer::collect_errors(&file) {
        prop_assert!(!msg.is_empty());
        prop_assert!(span.start <= span.end);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn lexer_invariants_hold_for_any_input(s in ".*") {
        check_stream(&s)?;
    }

    #[test]
    fn lexer_invariants_hold_for_line_shaped_input(
        s in r#"([a-zA-Z0-9 \t.,:<>(){}\[\]=+*/%&|^!'";_-]{0,24}\n){0,10}"#
    ) {
        check_stream(&s)?;
    }

    #[test]
    fn parser_terminates_for_any_input(s in ".*") {
        check_parse("fuzz.char", &s)?;
    }

    #[test]
    fn parser_terminates_for_line_shaped_input(
        s in r#"(\t{0,3}[a-z Int.,:<>(){}=+*/%"_-]{0,24}\n){0,12}"#
    ) {
        check_parse("fuzz.char", &s)?;
    }
}
