//! End-to-end tests: read, compile and run programs with the reference host.

mod common;
use common::*;

use tinyclj::error::RuntimeError;
use tinyclj::interp::{Host, Unit, Value};
use tinyclj::list::List;
use tinyclj::vector::Vector;
use tinyclj::{CompileError, Symbol};

#[test]
fn factorial() {
    let code = "(def fact (fn* [n] (if (= n 0) 1 (* n (fact (- n 1)))))) (fact 6)";
    assert_eq!(run(code).unwrap(), Value::Int(720));
}

#[test]
fn y_combinator() {
    let code = r#"
        (def Y (fn* [f]
          ((fn* [x] (x x))
           (fn* [x] (f (fn* [y] ((x x) y)))))))
        (def fact (Y (fn* [self]
          (fn* [n] (if (= n 0) 1 (* n (self (- n 1))))))))
        (fact 10)
    "#;
    assert_eq!(run(code).unwrap(), Value::Int(3628800));
}

#[test]
fn mutual_recursion() {
    let code = r#"
        (def odd? nil)
        (def even? (fn* [n] (if (= n 0) true (odd? (- n 1)))))
        (def odd? (fn* [n] (if (= n 0) false (even? (- n 1)))))
        [(even? 10) (odd? 7) (even? 3)]
    "#;
    assert_eq!(
        run(code).unwrap(),
        Value::Vector(Vector::from(vec![Value::Bool(true), Value::Bool(true), Value::Bool(false)]))
    );
}

#[test]
fn closures_capture_their_defining_scope() {
    let code = r#"
        (def adder (fn* [n] (fn* [x] (+ x n))))
        (def add5 (adder 5))
        (def add7 (adder 7))
        [(add5 1) (add7 1)]
    "#;
    assert_eq!(run(code).unwrap(), Value::Vector(Vector::from(ints(&[6, 8]))));
}

#[test]
fn truthiness() {
    assert_eq!(run(r#"(if 0 "a" "b")"#).unwrap(), Value::string("a"));
    assert_eq!(run(r#"(if nil "a" "b")"#).unwrap(), Value::string("b"));
    assert_eq!(run(r#"(if false "a" "b")"#).unwrap(), Value::string("b"));
    assert_eq!(run(r#"(if "" "a" "b")"#).unwrap(), Value::string("a"));
    assert_eq!(run(r#"(if () "a" "b")"#).unwrap(), Value::string("a"));
    assert_eq!(run("(if false 1)").unwrap(), Value::Nil);
}

#[test]
fn only_the_taken_branch_runs() {
    let (result, output) = run_with(r#"(if true (println "yes") (println "no"))"#, Host::new());
    assert_eq!(result.unwrap(), Value::Nil);
    assert_eq!(output, "yes\n");
}

#[test]
fn quote_builds_data() {
    let expected = List::from(vec![Value::symbol("a"), Value::symbol("b"), Value::symbol("c")]);
    assert_eq!(run("(quote (a b c))").unwrap(), Value::List(expected.clone()));
    assert_eq!(run("'(a b c)").unwrap(), Value::List(expected));

    let value = run("'[ns/x 1 \"s\" (nil)]").unwrap();
    let expected = Vector::from(vec![
        Value::Symbol(Symbol::qualified("ns", "x")),
        Value::Int(1),
        Value::string("s"),
        Value::List(List::from(vec![Value::Nil])),
    ]);
    assert_eq!(value, Value::Vector(expected));
}

#[test]
fn empty_list_evaluates_to_empty_list() {
    assert_eq!(run("()").unwrap(), Value::List(List::new()));
}

#[test]
fn undefined_symbol_fails_to_compile() {
    let err = run("(nonexistent 1 2)").unwrap_err();
    assert_eq!(err, Failure::Compile(CompileError::UndefinedSymbol(Symbol::new("nonexistent"))));
    assert!(err.to_string().contains("nonexistent"));
}

#[test]
fn println_writes_space_separated_values() {
    let (result, output) = run_with(r#"(println "x =" 1 [2 "s"] nil) (println)"#, Host::new());
    assert_eq!(result.unwrap(), Value::Nil);
    assert_eq!(output, "x = 1 [2 \"s\"] nil\n\n");
}

#[test]
fn apply_and_logic() {
    assert_eq!(run("(apply + '(1 2 3))").unwrap(), Value::Int(6));
    assert_eq!(run("(apply (fn* [a b] (- a b)) '(10 4))").unwrap(), Value::Int(6));
    assert_eq!(run("(and 1 2 3)").unwrap(), Value::Int(3));
    assert_eq!(run("(and 1 nil 3)").unwrap(), Value::Nil);
    assert_eq!(run("(or false nil 4)").unwrap(), Value::Int(4));
    assert_eq!(run("(/ 20 2 5)").unwrap(), Value::Int(2));
}

#[test]
fn runtime_faults() {
    assert_eq!(run("(/ 1 0)").unwrap_err(), Failure::Runtime(RuntimeError::DivisionByZero));
    assert!(matches!(
        run("((fn* [a b] b) 1)").unwrap_err(),
        Failure::Runtime(RuntimeError::MissingArgument { index: 1, given: 1 })
    ));
    assert!(matches!(run("(1 2)").unwrap_err(), Failure::Runtime(RuntimeError::NotCallable(_))));
    assert!(matches!(run("(+ 1 \"a\")").unwrap_err(), Failure::Runtime(RuntimeError::WrongType { .. })));
}

#[test]
fn def_inside_a_function_defines_globally() {
    let code = "(def init (fn* [v] (def state v))) (init 42) state";
    assert_eq!(run(code).unwrap(), Value::Int(42));
}

#[test]
fn primitives_can_be_redefined() {
    assert_eq!(run("(def + *) (+ 3 4)").unwrap(), Value::Int(12));
}

fn strings_host() -> Host {
    Host::new()
        .with_unit(
            Unit::new("strings")
                .function("ToUpper", |args: &[Value]| match args {
                    [Value::Str(s)] => Ok(vec![Value::string(&s.to_uppercase())]),
                    _ => Ok(vec![]),
                })
                .function("Cut", |args: &[Value]| match args {
                    [Value::Str(s), Value::Str(sep)] => Ok(match s.split_once(&**sep) {
                        Some((before, after)) => vec![Value::string(before), Value::string(after), Value::Bool(true)],
                        None => vec![Value::string(s), Value::string(""), Value::Bool(false)],
                    }),
                    _ => Ok(vec![]),
                })
                .value("Sep", Value::string(",")),
        )
        .with_unit(Unit::new("net/url").function("Nothing", |_: &[Value]| Ok(vec![])))
}

#[test]
fn imported_functions_and_values() {
    let code = r#"
        (import "strings")
        (import "net/url" u)
        [(strings/ToUpper "abc") strings/Sep (u/Nothing) (strings/Cut "a=b" "=")]
    "#;
    let (result, _) = run_with(code, strings_host());
    let expected = Vector::from(vec![
        Value::string("ABC"),
        Value::string(","),
        Value::Nil,
        Value::Vector(Vector::from(vec![Value::string("a"), Value::string("b"), Value::Bool(true)])),
    ]);
    assert_eq!(result.unwrap(), Value::Vector(expected));
}

#[test]
fn imported_functions_work_with_apply() {
    let code = r#"(import "strings" s) (apply s/ToUpper '("q"))"#;
    assert_eq!(run_with(code, strings_host()).0.unwrap(), Value::string("Q"));
}

#[test]
fn import_failures() {
    let (result, _) = run_with(r#"(import "os")"#, strings_host());
    assert!(matches!(result, Err(Failure::Compile(CompileError::Import(_)))));

    let (result, _) = run_with(r#"(import "strings") (strings/Missing 1)"#, strings_host());
    assert!(matches!(result, Err(Failure::Compile(CompileError::UndefinedSymbol(_)))));

    let (result, _) = run_with("(url/Nothing)", strings_host());
    assert!(matches!(result, Err(Failure::Compile(CompileError::UndefinedSymbol(_)))));
}

#[test]
fn unimported_namespace_names_a_definition() {
    assert_eq!(run("(def x 1) foo/x").unwrap(), Value::Int(1));
    assert_eq!(run("((fn* [n] (+ n my/n)) 4)").unwrap(), Value::Int(8));
}

#[test]
fn failed_def_is_forgotten() {
    assert!(matches!(
        run("(def y (nope)) y").unwrap_err(),
        Failure::Compile(CompileError::UndefinedSymbol(sym)) if sym.name() == "nope"
    ));
}

#[test]
fn deep_nesting_is_an_error() {
    let deep = format!("{}{}", "(".repeat(5000), ")".repeat(5000));
    match run(&deep).unwrap_err() {
        Failure::Compile(CompileError::Read(err)) => assert_eq!(err.kind, tinyclj::error::ReadErrorKind::TooDeep),
        other => panic!("expected read error, got {:?}", other),
    }
}

#[test]
fn last_statement_is_the_result() {
    assert_eq!(run("").unwrap(), Value::Nil);
    assert_eq!(run("1 2 3").unwrap(), Value::Int(3));
    assert_eq!(run("(def x 5)").unwrap(), Value::Nil);
}
