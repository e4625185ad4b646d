use armlet::{error::CompileError, machine::Machine};

#[test]
fn unexecuted_program_renders_to_its_source() {
    let source = "\
start: push 6 @ six
push 'x'
jump start + 2";

    let mut machine = Machine::new();

    machine
        .compile(source)
        .expect("could not compile the source code");

    assert_eq!(machine.render(), source);
}

#[test]
fn data_lines_render_back() {
    let source = "\
top: 5 @ a cell
     @ note only
42
\"text\"
'c'
end:";

    let mut machine = Machine::new();

    machine
        .compile(source)
        .expect("could not compile the source code");

    assert_eq!(machine.render(), source);
}

#[test]
fn written_cells_take_canonical_spelling() {
    let mut machine = Machine::new();

    machine
        .compile("move 3.50, 1\n\"xy\"")
        .expect("could not compile the source code");
    machine
        .run()
        .expect("an error occured while running the program");

    assert_eq!(machine.render(), "move 3.50, 1\n3.5");
}

#[test]
fn labels_survive_overwrites() {
    let mut machine = Machine::new();

    machine
        .compile("move 9, out\nout: 0")
        .expect("could not compile the source code");
    machine
        .run()
        .expect("an error occured while running the program");

    assert_eq!(machine.render(), "move 9, out\nout: 9");
}

#[test]
fn compile_errors_carry_the_line_number() {
    let mut machine = Machine::new();

    match machine.compile("push 1\npush 2\njump [") {
        Err(CompileError::Syntax { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected a syntax error, got {:?}", other),
    }

    match machine.compile("one:\ntwo:\none:") {
        Err(CompileError::DuplicateLabel { name, line }) => {
            assert_eq!(name, "one");
            assert_eq!(line, 2);
        }
        other => panic!("expected a duplicate label error, got {:?}", other),
    }
}
