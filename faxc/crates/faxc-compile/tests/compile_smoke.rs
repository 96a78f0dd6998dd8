use faxc_util::Handler;
use fgc::Heap;

fn compiles(source: &str) -> bool {
    let mut heap = Heap::new();
    let handler = Handler::new();
    faxc_compile::compile(source, &mut heap, &handler).is_some()
}

#[test]
fn empty_source_compiles_to_an_empty_script() {
    assert!(compiles(""));
}

#[test]
fn arithmetic_expression_statement_compiles() {
    assert!(compiles("1 + 2 * 3 - 4 / 2;"));
}

#[test]
fn var_and_print_compile() {
    assert!(compiles("var x = 1; print x;"));
}

#[test]
fn block_scoping_compiles() {
    assert!(compiles("{ var x = 1; { var x = 2; print x; } print x; }"));
}

#[test]
fn control_flow_compiles() {
    assert!(compiles(
        "var i = 0; while (i < 10) { if (i == 5) { print i; } i = i + 1; }"
    ));
    assert!(compiles("for (var i = 0; i < 3; i = i + 1) print i;"));
}

#[test]
fn function_and_closure_compile() {
    assert!(compiles(
        "fun outer() { var x = 1; fun inner() { return x; } return inner; } outer();"
    ));
}

#[test]
fn class_with_inheritance_and_super_compiles() {
    assert!(compiles(
        "class Animal { speak() { print \"...\"; } }\n\
         class Dog < Animal { speak() { super.speak(); print \"woof\"; } }\n\
         var d = Dog(); d.speak();"
    ));
}

#[test]
fn this_outside_class_is_reported_but_does_not_panic() {
    assert!(!compiles("fun f() { return this; }"));
}

#[test]
fn return_from_top_level_is_an_error() {
    assert!(!compiles("return 1;"));
}

#[test]
fn reading_local_in_its_own_initializer_is_an_error() {
    assert!(!compiles("{ var a = a; }"));
}

#[test]
fn duplicate_local_in_same_scope_is_an_error() {
    assert!(!compiles("{ var a = 1; var a = 2; }"));
}

#[test]
fn invalid_assignment_target_is_an_error() {
    assert!(!compiles("1 + 2 = 3;"));
}

#[test]
fn compiler_keeps_going_after_the_first_error_and_reports_more() {
    let mut heap = Heap::new();
    let handler = Handler::new();
    faxc_compile::compile("1 = 2; return 1; { var a = a; }", &mut heap, &handler);
    assert!(handler.diagnostics().len() >= 2);
}
