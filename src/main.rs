use std::error::Error;
use std::fs::File;
use std::io::{BufReader, IsTerminal};
use std::rc::Rc;

use termcolor::{ColorChoice, StandardStream};
use tinyclj::compiler::compile_program;
use tinyclj::error::RuntimeError;
use tinyclj::interp::{Host, Interpreter, Unit, Value};
use tinyclj::options::{self, Options};
use tinyclj::primitives;
use tinyclj::reader::Reader;

fn string_arg<'a>(procedure: &str, args: &'a [Value]) -> Result<&'a str, RuntimeError> {
    match args {
        [Value::Str(s)] => Ok(&**s),
        [other] => Err(RuntimeError::WrongType {
            procedure: procedure.to_string(),
            expected: "string",
            found: other.type_name().to_string(),
        }),
        _ => Err(RuntimeError::WrongArgCount {
            procedure: procedure.to_string(),
            expected: "exactly 1",
            given: args.len(),
        }),
    }
}

/// Units available to `import` from the command line.
fn default_host() -> Host {
    Host::new().with_unit(
        Unit::new("strings")
            .function("ToUpper", |args: &[Value]| {
                Ok(vec![Value::string(&string_arg("ToUpper", args)?.to_uppercase())])
            })
            .function("ToLower", |args: &[Value]| {
                Ok(vec![Value::string(&string_arg("ToLower", args)?.to_lowercase())])
            })
            .function("Fields", |args: &[Value]| {
                Ok(string_arg("Fields", args)?.split_whitespace().map(Value::string).collect())
            }),
    )
}

fn run(options: &Options) -> Result<(), Box<dyn Error>> {
    let path = options.filename.as_ref().ok_or("no input file")?;
    let file = File::open(path).map_err(|err| format!("{}: {}", path.display(), err))?;

    let host = Rc::new(default_host());
    let env = primitives::root_table();
    env.set_resolver(host.clone());

    let program = compile_program(&mut Reader::new(BufReader::new(file)), env)?;
    log::info!("compiled {} ({} statements)", path.display(), program.body.len());

    if options.print_tree {
        let choice = if std::io::stdout().is_terminal() {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        let mut out = StandardStream::stdout(choice);
        program.pretty_print(options.width, &mut out)?;
    }

    if options.run {
        let mut interp = Interpreter::new(host);
        let value = interp.run(&program)?;
        println!("{}", value);
    }

    Ok(())
}

fn main() {
    env_logger::init();

    let options = match options::parse() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("Error: {}", err);
            options::usage();
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&options) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
