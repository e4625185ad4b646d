use std::io::Write;

use clap::{App, Arg, ArgMatches};
use slog::{o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use armlet::{
    error::{CompileError, RuntimeError},
    machine::Machine,
};

#[derive(Debug)]
enum Error {
    Compile(CompileError),
    Runtime(RuntimeError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Compile(e) => write!(f, "compile error: {}", e),
            Error::Runtime(e) => write!(f, "runtime error: {}", e),
        }
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

struct Repl {
    machine: Machine,

    /// The program as entered so far, one entry per line.
    source: Vec<String>,
    logger: Logger,
}

impl Repl {
    fn new() -> Repl {
        Repl {
            machine: Machine::new(),
            source: Vec::new(),
            logger: Logger::root(Discard, o!()),
        }
    }

    fn set_logger(&mut self, logger: Logger) {
        self.logger = logger.clone();
        self.machine.set_logger(logger);
    }

    fn run(&mut self) {
        println!("Type .help for a list of all available commands or start typing instructions");

        loop {
            print!("{}> ", self.machine.counter);
            let _ = std::io::stdout().flush();

            let mut input = String::new();

            match std::io::stdin().read_line(&mut input) {
                Ok(0) | Err(_) => break,
                Ok(_) => (),
            }

            match self.handle_line(input.trim_end_matches('\n')) {
                Ok(()) => (),
                Err(err) => eprintln!("Error: {}", err),
            }
        }
    }

    fn handle_line(&mut self, input: &str) -> Result<(), Error> {
        if input.starts_with('.') {
            self.handle_command(&input[1..]);
            return Ok(());
        }

        self.source.push(input.to_string());

        let source = self.source.join("\n");

        if let Err(error) = self.machine.compile(&source) {
            self.source.pop();
            return Err(error.into());
        }

        self.machine.run()?;

        Ok(())
    }

    fn handle_command(&mut self, command: &str) {
        let mut parts = command.split(char::is_whitespace);
        let cmd = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.filter(|part| !part.is_empty()).collect();

        match (cmd, args.as_slice()) {
            ("help", _) => {
                println!("Available commands:");
                println!("  .stack            Print the data stack, top last");
                println!("  .memory           Print the rendered memory");
                println!("  .flag             Print the comparison flag");
                println!("  .step [n]         Execute n steps (default 1)");
                println!("  .run              Run until the machine halts");
                println!("  .reset            Rewind the counter, stacks and flag");
            }
            ("stack", _) => {
                for value in &self.machine.stack {
                    println!("{}", value.render());
                }
            }
            ("memory", _) => println!("{}", self.machine.render()),
            ("flag", _) => println!("{:?}", self.machine.flag),
            ("step", args) => {
                let count = args
                    .first()
                    .and_then(|arg| arg.parse().ok())
                    .unwrap_or(1);

                for _ in 0..count {
                    if let Err(error) = self.machine.step() {
                        eprintln!("Error: runtime error: {}", error);
                        break;
                    }
                }
            }
            ("run", _) => {
                if let Err(error) = self.machine.run() {
                    eprintln!("Error: runtime error: {}", error);
                }
            }
            ("reset", _) => self.machine.reset(),
            _ => (),
        }
    }
}

fn parse_args() -> ArgMatches<'static> {
    App::new("armletrepl")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Read-Evaluate-Print-Loop utility for armlet")
        .arg(
            Arg::with_name("verbose")
                .help("Enables verbose logging")
                .long("verbose")
                .short("v"),
        )
        .get_matches()
}

fn main() {
    let args = parse_args();

    let mut repl = Repl::new();

    if args.is_present("verbose") {
        let decorator = TermDecorator::new().build();
        let drain = FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        repl.set_logger(Logger::root(drain, o!()));
    }

    repl.run();
}
