//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use tinyclj::interp::{Host, Interpreter, Value};
use tinyclj::{compile_str, primitives, CompileError, RuntimeError};

/// Output sink the test can read back after the interpreter is done with it.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub enum Failure {
    Compile(CompileError),
    Runtime(RuntimeError),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Failure::Compile(err) => write!(f, "{}", err),
            Failure::Runtime(err) => write!(f, "{}", err),
        }
    }
}

/// Compiles `source` against the primitive root table and runs it with `host`.
pub fn run_with(source: &str, host: Host) -> (Result<Value, Failure>, String) {
    let host = Rc::new(host);
    let env = primitives::root_table();
    env.set_resolver(host.clone());

    let output = SharedOutput::default();
    let program = match compile_str(source, env) {
        Ok(program) => program,
        Err(err) => return (Err(Failure::Compile(err)), output.contents()),
    };

    let mut interp = Interpreter::with_output(host, Box::new(output.clone()));
    let result = interp.run(&program).map_err(Failure::Runtime);
    (result, output.contents())
}

pub fn run(source: &str) -> Result<Value, Failure> {
    run_with(source, Host::new()).0
}

pub fn ints(ns: &[i64]) -> Vec<Value> {
    ns.iter().map(|n| Value::Int(*n)).collect()
}
