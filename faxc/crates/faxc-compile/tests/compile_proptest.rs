use faxc_lex::{Scanner, TokenKind};
use faxc_util::Handler;
use fgc::Heap;
use proptest::prelude::*;

/// True iff the scanner would tokenize `name` as a plain `Identifier` rather
/// than one of the reserved words (`if`, `or`, `for`, `var`, `fun`, `nil`,
/// `and`, `this`, `else`, `true`, ...) the `[a-z][a-z0-9]{0,4}` charset can
/// also produce.
fn is_identifier(name: &str) -> bool {
    Scanner::new(name).scan().kind == TokenKind::Identifier
}

fn variable_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,4}".prop_filter("must not be a reserved word", |s| is_identifier(s))
}

fn number_literal() -> impl Strategy<Value = String> {
    (0u32..1000).prop_map(|n| n.to_string())
}

fn arithmetic_expr() -> impl Strategy<Value = String> {
    let leaf = number_literal();
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            (inner.clone(), "[+\\-*/]", inner.clone())
                .prop_map(|(a, op, b)| format!("({a} {op} {b})")),
        ]
    })
}

proptest! {
    /// Any expression built from number literals and the four arithmetic
    /// operators, fully parenthesized, always compiles without a diagnostic.
    #[test]
    fn random_arithmetic_expressions_always_compile(expr in arithmetic_expr()) {
        let source = format!("{expr};");
        let mut heap = Heap::new();
        let handler = Handler::new();
        let result = faxc_compile::compile(&source, &mut heap, &handler);
        prop_assert!(result.is_some(), "failed to compile: {source}");
    }

    /// Random sequences of var declarations, prints and nested blocks,
    /// referencing only names already declared in scope, always compile.
    #[test]
    fn random_var_print_block_sequences_compile(names in prop::collection::vec(variable_name(), 1..6)) {
        let mut source = String::new();
        let mut declared = Vec::new();
        for name in &names {
            if declared.contains(name) {
                continue;
            }
            source.push_str(&format!("var {name} = 0;\n"));
            declared.push(name.clone());
        }
        source.push_str("{\n");
        for name in &declared {
            source.push_str(&format!("print {name};\n"));
        }
        source.push_str("}\n");

        let mut heap = Heap::new();
        let handler = Handler::new();
        let result = faxc_compile::compile(&source, &mut heap, &handler);
        prop_assert!(result.is_some(), "failed to compile: {source}");
    }
}
