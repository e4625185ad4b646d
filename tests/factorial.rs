use armlet::{machine::Machine, value::Value};

use slog::{o, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

fn compile_program() -> Machine {
    let source = include_str!("factorial.asm");

    let mut machine = Machine::new();

    machine
        .compile(source)
        .expect("could not compile the source code");

    machine
}

#[test]
fn test_factorial_compile() {
    let machine = compile_program();

    assert_eq!(machine.labels.get("fact"), Some(&4));
    assert_eq!(machine.memory.len(), 17);
    assert!(machine.comments.contains_key(&0));
}

#[test]
fn test_factorial_run() {
    let mut machine = compile_program();

    machine
        .run()
        .expect("an error occured while running the program");

    assert_eq!(machine.memory[0], Value::Number(720.0));
    assert!(machine.stack.is_empty());
    assert!(machine.calls.is_empty());
    assert!(machine.halted());
}

#[test]
fn test_factorial_stepwise() {
    let decorator = TermDecorator::new().build();
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = Logger::root(drain, o!());

    let source = include_str!("factorial.asm");

    let mut machine = Machine::with_logger(logger);

    machine
        .compile(source)
        .expect("could not compile the source code");

    let mut steps = 0;

    while !machine.halted() && steps < 1000 {
        machine.step().expect("error while executing the program");
        steps += 1;
    }

    assert!(machine.halted());
    assert_eq!(machine.memory[0], Value::Number(720.0));
}

#[test]
fn test_factorial_reset_keeps_memory() {
    let mut machine = compile_program();

    machine
        .run()
        .expect("an error occured while running the program");

    machine.reset();

    assert_eq!(machine.counter, 0);
    assert_eq!(machine.flag, None);
    assert_eq!(machine.memory[0], Value::Number(720.0));
}
