use std::path::PathBuf;

pub struct Options {
    pub run: bool,
    pub print_tree: bool,
    pub width: usize,
    pub filename: Option<PathBuf>,
}

impl Options {
    pub fn new() -> Self {
        Options {
            run: false,
            print_tree: true,
            width: 80,
            filename: None,
        }
    }

    pub fn parse() -> Result<Self, String> {
        parse()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

pub fn usage() {
    println!("Usage: tinyclj [options] <input file>");
    println!("Options:");
    println!("  -h, --help: Print this help message");
    println!("  --run: Execute the program with the reference host and print its result");
    println!("  --no-tree: Do not print the compiled tree");
    println!("  --width <columns>: Line width for the printed tree (default: 80)");
}

pub fn parse() -> Result<Options, String> {
    parse_from(pico_args::Arguments::from_env())
}

pub fn parse_from(mut args: pico_args::Arguments) -> Result<Options, String> {
    let mut options = Options::new();

    if args.contains(["-h", "--help"]) {
        usage();
        std::process::exit(0);
    }

    options.run = args.contains("--run");
    options.print_tree = !args.contains("--no-tree");

    options.width = match args.opt_value_from_str::<_, usize>("--width") {
        Ok(Some(width)) if width > 0 => width,
        Ok(Some(_)) => return Err("--width must be positive".to_string()),
        Ok(None) => 80,
        Err(e) => return Err(e.to_string()),
    };

    let filename = args.free_from_str::<PathBuf>();

    if let Err(e) = filename {
        return Err(e.to_string());
    }

    options.filename = filename.ok();

    let rest = args.finish();
    if !rest.is_empty() {
        return Err(format!("unexpected arguments: {:?}", rest));
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn parse_args(args: &[&str]) -> Result<Options, String> {
        parse_from(pico_args::Arguments::from_vec(
            args.iter().map(OsString::from).collect(),
        ))
    }

    #[test]
    fn defaults() {
        let options = parse_args(&["prog.clj"]).unwrap();
        assert!(!options.run);
        assert!(options.print_tree);
        assert_eq!(options.width, 80);
        assert_eq!(options.filename, Some(PathBuf::from("prog.clj")));
    }

    #[test]
    fn flags() {
        let options = parse_args(&["--run", "--no-tree", "--width", "40", "prog.clj"]).unwrap();
        assert!(options.run);
        assert!(!options.print_tree);
        assert_eq!(options.width, 40);
    }

    #[test]
    fn bad_arguments() {
        assert!(parse_args(&[]).is_err());
        assert!(parse_args(&["--width", "x", "prog.clj"]).is_err());
        assert!(parse_args(&["--width", "0", "prog.clj"]).is_err());
        assert!(parse_args(&["a.clj", "b.clj"]).is_err());
    }
}
