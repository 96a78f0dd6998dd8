//! End-to-end CLI tests driving the built `faxc` binary (spec §6, §8 S1-S6).

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn faxc() -> Command {
    Command::cargo_bin("faxc").expect("faxc binary built by this workspace")
}

fn script(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp script");
    file.write_all(source.as_bytes()).expect("write script");
    file
}

#[test]
fn s1_arithmetic() {
    let file = script("print 1 + 2 * 3;\n");
    faxc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("7\n"));
}

#[test]
fn s2_string_concat_interning() {
    let file = script(r#"var a = "foo"; var b = "f" + "oo"; print a == b;"#);
    faxc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("true\n"));
}

#[test]
fn s3_closures_share_upvalue() {
    let file = script(
        "fun makeCounter() { var x = 0; fun inc() { x = x + 1; print x; } return inc; }\n\
         var c = makeCounter(); c(); c(); c();\n",
    );
    faxc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("1\n2\n3\n"));
}

#[test]
fn s4_class_init_and_method() {
    let file = script(
        "class Point { init(x,y) { this.x = x; this.y = y; } sum() { return this.x + this.y; } }\n\
         print Point(3,4).sum();\n",
    );
    faxc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("7\n"));
}

#[test]
fn s5_runtime_error_on_unknown_global() {
    let file = script("print unknown;\n");
    faxc()
        .arg(file.path())
        .assert()
        .code(70)
        .stderr(predicate::str::contains("Undefined variable 'unknown'."));
}

#[test]
fn s6_for_loop() {
    let file = script("for (var i = 0; i < 3; i = i + 1) print i;\n");
    faxc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("0\n1\n2\n"));
}

#[test]
fn compile_error_exits_65() {
    let file = script("print ;\n");
    faxc().arg(file.path()).assert().code(65);
}

#[test]
fn missing_file_exits_74() {
    faxc()
        .arg("/nonexistent/path/does/not/exist.fax")
        .assert()
        .code(74);
}

#[test]
fn wrong_argc_exits_64_with_usage() {
    faxc()
        .arg("one")
        .arg("two")
        .assert()
        .code(64)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn inheritance_and_super() {
    let file = script(
        "class Base { greet() { return \"base\"; } }\n\
         class Sub < Base { greet() { return super.greet() + \"+sub\"; } }\n\
         print Sub().greet();\n",
    );
    faxc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("base+sub\n"));
}
