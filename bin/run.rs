use clap::{App, Arg, ArgMatches};
use slog::{o, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use armlet::{
    error::{CompileError, RuntimeError},
    machine::Machine,
};

enum Error {
    Compile(CompileError),
    Runtime(RuntimeError),
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IO(e)
    }
}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Error {
        Error::Compile(e)
    }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Error {
        Error::Runtime(e)
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("armletrun")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Utility for compiling and executing armlet programs")
        .arg(
            Arg::with_name("source")
                .help("File containing armlet source")
                .value_name("SOURCE")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("steps")
                .help("Maximum number of steps before execution is aborted")
                .long("steps")
                .short("s")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .help("Enables verbose logging")
                .long("verbose")
                .short("v"),
        )
        .get_matches()
}

fn main() {
    let args = parse_arguments();

    let file_path = args.value_of("source").unwrap();

    let mut machine = Machine::new();

    if args.is_present("verbose") {
        let decorator = TermDecorator::new().build();
        let drain = FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        machine.set_logger(Logger::root(drain, o!()));
    }

    if let Some(steps) = args.value_of("steps") {
        match steps.parse() {
            Ok(limit) => machine.step_limit = limit,
            Err(_) => {
                eprintln!("Invalid step count: {}", steps);
                std::process::exit(2);
            }
        }
    }

    match run(&mut machine, file_path) {
        Ok(()) => println!("{}", machine.render()),
        Err(Error::IO(io)) => eprintln!("IO error: {}", io),
        Err(Error::Compile(error)) => eprintln!("Compile error: {}", error),
        Err(Error::Runtime(error)) => eprintln!("Runtime error: {}", error),
    }
}

fn run(machine: &mut Machine, file_path: &str) -> Result<(), Error> {
    let source = std::fs::read_to_string(file_path)?;

    machine.compile(&source)?;
    machine.run()?;

    Ok(())
}
