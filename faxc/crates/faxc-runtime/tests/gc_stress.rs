//! Runs programs that allocate heavily under the `stress_gc` feature (spec
//! §6, §8 invariant 2 "GC neutrality"): every allocation that would grow the
//! heap triggers a full collection, so any of these completing with the
//! expected control flow (no spurious runtime error) is strong evidence the
//! collector never frees something still reachable from the stack, a call
//! frame, an open upvalue, or a global.
#![cfg(feature = "stress_gc")]

use faxc_runtime::Vm;
use faxc_util::Handler;

fn run(source: &str) {
    let mut vm = Vm::new();
    let handler = Handler::new();
    let function = faxc_compile::compile(source, vm.heap_mut(), &handler)
        .expect("test programs are expected to compile");
    vm.interpret(function).expect("program should run to completion under stress GC");
}

#[test]
fn many_string_concatenations_survive_stress_gc() {
    run("\
        var s = \"\";\n\
        for (var i = 0; i < 500; i = i + 1) {\n\
            s = s + \"x\";\n\
        }\n\
        if (s == \"\") { print unreachable_marker; }\n\
    ");
}

#[test]
fn deeply_nested_closures_survive_stress_gc() {
    run("\
        fun makeCounter() {\n\
            var x = 0;\n\
            fun inc() { x = x + 1; return x; }\n\
            return inc;\n\
        }\n\
        var c = makeCounter();\n\
        for (var i = 0; i < 300; i = i + 1) {\n\
            c();\n\
        }\n\
        if (c() != 301) { print unreachable_marker; }\n\
    ");
}

#[test]
fn many_instances_and_inheritance_survive_stress_gc() {
    run("\
        class Base { greet() { return \"base\"; } }\n\
        class Sub < Base { greet() { return super.greet(); } }\n\
        for (var i = 0; i < 300; i = i + 1) {\n\
            Sub().greet();\n\
        }\n\
    ");
}
