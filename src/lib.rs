//! A crate for compiling and executing armlet, a small line-oriented
//! assembly language with ARM-style condition code suffixes.
//!
//! An armlet program and its memory are the same thing: each source
//! line compiles into one memory cell, which holds an instruction, a
//! number, a string or nothing. Programs run directly on that memory,
//! may overwrite their own instructions, and render back into source
//! when they are done.
//!
//! Currently this crate provides the functionality to:
//! - Compile armlet source into a [Machine](machine::Machine).
//! - Execute programs stepwise or to completion under a step budget.
//! - Render the resulting memory back into source text.
//!
//! # Example
//! ```
//! use armlet::machine::Machine;
//! use armlet::value::Value;
//!
//! fn main() {
//!     // Adds 13 and 15 together and stores the answer on line 0,
//!     // overwriting the PUSH instruction there.
//!     let source = "\
//! push 13
//! push 15
//! add
//! pop 0";
//!
//!     let mut machine = Machine::new();
//!
//!     machine.compile(source)
//!         .expect("could not compile the program");
//!
//!     machine.run()
//!         .expect("an error occured while running the program");
//!
//!     assert_eq!(machine.memory[0], Value::Number(28.0));
//! }
//! ```
//!
//! # Executables
//!
//! ## `armletrepl`
//!
//! The `armletrepl` provides a Read-Execute-Print-Loop environment for
//! the armlet language. It supports alternating between writing and
//! executing code and provides commands for inspecting the machine.
//!
//! ```text
//! 0> push 5
//! 1> push 2
//! 2> mul
//! 3> .stack
//! 10
//! 3> pop 9
//! 4> .memory
//! ```
//!
//! ## `armletrun`
//!
//! Compiles and runs a source file, then prints the rendered memory.
pub mod error;
pub mod instruction;
pub mod lexer;
pub mod machine;
pub mod parser;
pub mod value;
