//! Interpreter-level integration tests (spec §8 scenarios + invariants).
//!
//! These drive `Vm::interpret` directly rather than the CLI, so they can't
//! assert on stdout; instead they assert on runtime error shape, which is
//! the part of VM behavior `faxc-drv`'s CLI tests can't see into directly
//! (e.g. exactly which `RuntimeError` variant a program produces).

use faxc_runtime::{InterpretError, Vm};
use faxc_util::{Handler, RuntimeError};

fn run(source: &str) -> Result<(), InterpretError> {
    let mut vm = Vm::new();
    let handler = Handler::new();
    let function = faxc_compile::compile(source, vm.heap_mut(), &handler)
        .expect("test programs are expected to compile");
    vm.interpret(function)
}

#[test]
fn arithmetic_runs_to_completion() {
    assert!(run("print 1 + 2 * 3;").is_ok());
}

#[test]
fn undefined_global_read_is_a_runtime_error() {
    match run("print unknown;") {
        Err(InterpretError::Runtime(RuntimeError::UndefinedVariable(name))) => {
            assert_eq!(name, "unknown");
        }
        other => panic!("expected UndefinedVariable runtime error, got {other:?}"),
    }
}

#[test]
fn calling_a_number_is_not_callable() {
    match run("var x = 1; x();") {
        Err(InterpretError::Runtime(RuntimeError::NotCallable)) => {}
        other => panic!("expected NotCallable runtime error, got {other:?}"),
    }
}

#[test]
fn wrong_arity_reports_expected_and_got() {
    match run("fun f(a, b) { return a + b; } f(1);") {
        Err(InterpretError::Runtime(RuntimeError::ArityMismatch { expected, got })) => {
            assert_eq!(expected, 2);
            assert_eq!(got, 1);
        }
        other => panic!("expected ArityMismatch runtime error, got {other:?}"),
    }
}

#[test]
fn adding_number_and_string_is_a_runtime_error() {
    match run(r#"print 1 + "a";"#) {
        Err(InterpretError::Runtime(RuntimeError::OperandsMustBeNumbersOrStrings)) => {}
        other => panic!("expected OperandsMustBeNumbersOrStrings runtime error, got {other:?}"),
    }
}

#[test]
fn property_access_on_non_instance_is_a_runtime_error() {
    match run("var x = 1; print x.y;") {
        Err(InterpretError::Runtime(RuntimeError::NotAnInstance)) => {}
        other => panic!("expected NotAnInstance runtime error, got {other:?}"),
    }
}

#[test]
fn closures_sharing_an_upvalue_observe_each_others_writes() {
    // Spec §8 invariant 5. Both closures must see the shared counter advance
    // instead of each silently keeping its own copy.
    let source = "\
        fun pair() {\n\
            var x = 0;\n\
            fun get() { return x; }\n\
            fun inc() { x = x + 1; }\n\
            inc(); inc();\n\
            return get();\n\
        }\n\
        var result = pair();\n\
        if (result != 2) { print unreachable_marker; }\n\
    ";
    assert!(run(source).is_ok());
}

#[test]
fn class_init_and_method_dispatch() {
    let source = "\
        class Point { init(x, y) { this.x = x; this.y = y; } sum() { return this.x + this.y; } }\n\
        if (Point(3, 4).sum() != 7) { print unreachable_marker; }\n\
    ";
    assert!(run(source).is_ok());
}

#[test]
fn inherited_method_and_super_call_resolve() {
    let source = "\
        class Base { greet() { return \"base\"; } }\n\
        class Sub < Base { greet() { return super.greet(); } }\n\
        if (Sub().greet() != \"base\") { print unreachable_marker; }\n\
    ";
    assert!(run(source).is_ok());
}

#[test]
fn runtime_error_on_missing_method_reports_name() {
    let source = "class Empty {} Empty().missing();";
    match run(source) {
        Err(InterpretError::Runtime(RuntimeError::UndefinedProperty(name))) => {
            assert_eq!(name, "missing");
        }
        other => panic!("expected UndefinedProperty runtime error, got {other:?}"),
    }
}

#[test]
fn repeated_interprets_on_one_vm_share_interned_strings() {
    // A REPL reuses one `Vm`; the second line's string literal must intern
    // to the same object the first line's concatenation already produced.
    let mut vm = Vm::new();
    let handler = Handler::new();
    let function = faxc_compile::compile(
        r#"var a = "f" + "oo";"#,
        vm.heap_mut(),
        &handler,
    )
    .unwrap();
    assert!(vm.interpret(function).is_ok());

    let handler = Handler::new();
    let function =
        faxc_compile::compile(r#"if (a != "foo") { print unreachable_marker; }"#, vm.heap_mut(), &handler)
            .unwrap();
    assert!(vm.interpret(function).is_ok());
}
