//! [Machine] combines the compiler and the executing processor.
//!
//! Source is compiled line by line straight into the machine's memory:
//! line `n` becomes memory cell `n`, so labels are just names for line
//! numbers and the program counter indexes lines. Execution mutates
//! the same memory, and [render](Machine::render) turns it back into
//! source, which is how a program's output is observed.

use std::cmp::Ordering;
use std::collections::HashMap;

use edit_distance::edit_distance;
use itertools::Itertools;
use slog::{debug, o, trace, Discard, Logger};

use crate::error::{CompileError, RuntimeError};
use crate::instruction::{Expr, Instruction, OpCode};
use crate::parser;
use crate::value::{self, Value};

/// Writes at or beyond this address are rejected with
/// [MemoryLimit](RuntimeError::MemoryLimit).
pub const MEMORY_LIMIT: usize = 10_000;

/// Default step budget of [run](Machine::run).
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// A machine: memory, a data stack, a call stack, the comparison flag
/// and the program counter.
pub struct Machine {
    /// One cell per source line, plus whatever the program has grown
    /// past that.
    pub memory: Vec<Value>,

    /// The data stack used by the zero-argument instruction forms.
    pub stack: Vec<Value>,

    /// Return addresses pushed by CALL and popped by RETURN.
    pub calls: Vec<usize>,

    /// Result of the latest comparison. `None` until one has executed;
    /// condition codes treat that as an equal result.
    pub flag: Option<Ordering>,

    /// The program counter. Execution halts once it moves past the end
    /// of memory.
    pub counter: usize,

    /// Name to address bindings visible to argument expressions: every
    /// label, plus `pc` tracking the program counter.
    pub environment: HashMap<String, usize>,

    /// Label name to address, as compiled.
    pub labels: HashMap<String, usize>,

    /// Verbatim `label:` prefixes by address, for rendering.
    pub indices: HashMap<usize, String>,

    /// Verbatim `@ comment` suffixes by address, for rendering.
    pub comments: HashMap<usize, String>,

    /// Step budget enforced by [run](Machine::run).
    pub step_limit: usize,

    logger: Logger,
}

impl Default for Machine {
    fn default() -> Machine {
        let mut environment = HashMap::new();
        environment.insert("pc".to_string(), 0);

        Machine {
            memory: Vec::new(),
            stack: Vec::new(),
            calls: Vec::new(),
            flag: None,
            counter: 0,
            environment,
            labels: HashMap::new(),
            indices: HashMap::new(),
            comments: HashMap::new(),
            step_limit: DEFAULT_STEP_LIMIT,
            logger: Logger::root(Discard, o!()),
        }
    }
}

impl Machine {
    pub fn new() -> Machine {
        Default::default()
    }

    pub fn with_logger<L>(logger: L) -> Machine
    where
        L: Into<Option<Logger>>,
    {
        Machine {
            logger: logger.into().unwrap_or_else(|| Logger::root(Discard, o!())),
            ..Default::default()
        }
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    /// Compiles `source` into memory, replacing the previous contents.
    ///
    /// Each line is split into its label, code and comment parts; the
    /// code part becomes the memory cell of the line's address. Label
    /// names must be unique and may not shadow `pc` or a mnemonic. On
    /// error the machine's memory and tables are left untouched.
    ///
    /// The program counter, stacks and flag are not reset, so a paused
    /// program can be edited and resumed. Use [reset](Machine::reset)
    /// to start over.
    pub fn compile(&mut self, source: &str) -> Result<(), CompileError> {
        let logger = self.logger.new(o!("stage" => "compilation"));

        let mut comments = HashMap::new();
        let mut indices = HashMap::new();
        let mut labels: HashMap<String, usize> = HashMap::new();
        let mut memory = Vec::new();

        for (index, line) in source.split('\n').enumerate() {
            let (rest, comment) = parser::split_comment(line);

            if !comment.is_empty() {
                comments.insert(index, comment.to_string());
            }

            let (prefix, code) = parser::split_label(rest);

            if !prefix.is_empty() {
                indices.insert(index, prefix.to_string());
            }

            if let Some(name) = parser::label_name(prefix) {
                if name.eq_ignore_ascii_case("pc") {
                    return Err(CompileError::ReservedName {
                        name: name.to_string(),
                        line: index,
                    });
                }

                if labels.contains_key(name) {
                    return Err(CompileError::DuplicateLabel {
                        name: name.to_string(),
                        line: index,
                    });
                }

                if OpCode::is_mnemonic(name) {
                    return Err(CompileError::ReservedName {
                        name: name.to_string(),
                        line: index,
                    });
                }

                trace!(logger, "label"; "name" => name, "address" => index);
                labels.insert(name.to_string(), index);
            }

            let cell = parser::parse_line(code)
                .map_err(|error| CompileError::Syntax { line: index, error })?;

            trace!(logger, "cell"; "line" => index, "value" => %cell);
            memory.push(cell);
        }

        debug!(logger, "compiled"; "cells" => memory.len(), "labels" => labels.len());

        let mut environment: HashMap<String, usize> = labels
            .iter()
            .map(|(name, address)| (name.clone(), *address))
            .collect();
        environment.insert("pc".to_string(), self.counter);

        self.memory = memory;
        self.labels = labels;
        self.indices = indices;
        self.comments = comments;
        self.environment = environment;

        Ok(())
    }

    /// Renders memory back into source.
    ///
    /// Cell values take their canonical spelling; the label and
    /// comment parts of each line are reattached verbatim, so an
    /// unexecuted program renders back into its own source.
    pub fn render(&self) -> String {
        (0..self.memory.len())
            .map(|index| {
                format!(
                    "{}{}{}",
                    self.indices.get(&index).map(String::as_str).unwrap_or(""),
                    self.memory[index].render(),
                    self.comments.get(&index).map(String::as_str).unwrap_or(""),
                )
            })
            .join("\n")
    }

    /// True once the program counter has moved past the end of memory.
    pub fn halted(&self) -> bool {
        self.counter >= self.memory.len()
    }

    /// Rewinds the program counter, the stacks and the flag. Memory is
    /// left as the program last modified it.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.flag = None;
        self.stack.clear();
        self.calls.clear();
    }

    /// Executes the cell under the program counter.
    ///
    /// An instruction whose condition holds is executed; any other
    /// cell, including an instruction whose condition fails, just
    /// advances the counter. On a halted machine this is a no-op.
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        if self.halted() {
            return Ok(());
        }

        self.environment.insert("pc".to_string(), self.counter);

        let cell = self.memory[self.counter].clone();

        match cell {
            Value::Code(instruction) if instruction.condition.holds(self.flag) => {
                trace!(
                    self.logger, "execute";
                    "counter" => self.counter,
                    "instruction" => %instruction
                );

                let args = instruction
                    .args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<Result<Vec<Value>, RuntimeError>>()?;

                self.execute(&instruction, args)
            }
            _ => {
                self.counter += 1;
                Ok(())
            }
        }
    }

    /// Steps until the machine halts or the step budget runs out.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        for steps in 0..self.step_limit {
            if self.halted() {
                debug!(self.logger, "halted"; "steps" => steps);
                return Ok(());
            }

            self.step()?;
        }

        if self.halted() {
            Ok(())
        } else {
            Err(RuntimeError::StepLimit {
                limit: self.step_limit,
            })
        }
    }

    /// Evaluates an argument expression against the current machine
    /// state.
    pub fn evaluate(&self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Identifier(name) => match self.environment.get(name) {
                Some(address) => Ok(Value::Number(*address as f64)),
                None => Err(RuntimeError::UndefinedSymbol {
                    name: name.clone(),
                    suggestion: self.suggestion(name),
                }),
            },
            Expr::Deref(inner) => {
                let address = self.evaluate(inner)?.as_address()?;
                Ok(self.read(address))
            }
            Expr::Sum(lhs, rhs) => {
                let lhs = self.evaluate(lhs)?.as_number()?;
                let rhs = self.evaluate(rhs)?.as_number()?;
                Ok(Value::Number(lhs + rhs))
            }
        }
    }

    /// The closest name in the environment, if any is within an edit
    /// distance of two.
    fn suggestion(&self, name: &str) -> Option<String> {
        self.environment
            .keys()
            .map(|known| (edit_distance(name, known), known))
            .filter(|(distance, _)| *distance <= 2)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, known)| known.clone())
    }

    fn read(&self, address: usize) -> Value {
        self.memory.get(address).cloned().unwrap_or(Value::Empty)
    }

    /// Writes a cell, growing memory up to [MEMORY_LIMIT].
    fn write(&mut self, address: usize, value: Value) -> Result<(), RuntimeError> {
        if address >= MEMORY_LIMIT {
            return Err(RuntimeError::MemoryLimit { address });
        }

        if address >= self.memory.len() {
            self.memory.resize(address + 1, Value::Empty);
        }

        self.memory[address] = value;

        Ok(())
    }

    fn pop(&mut self, opcode: OpCode) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow { opcode })
    }

    fn execute(
        &mut self,
        instruction: &Instruction,
        args: Vec<Value>,
    ) -> Result<(), RuntimeError> {
        use OpCode::*;

        let opcode = instruction.opcode;

        match opcode {
            Inc => {
                check_arity(opcode, 0, &args)?;
                self.counter += 1;
            }
            Move => {
                check_arity(opcode, 2, &args)?;
                let address = args[1].as_address()?;
                self.write(address, args[0].clone())?;
                self.counter += 1;
            }
            Jump => {
                check_arity(opcode, 1, &args)?;
                self.counter = args[0].as_address()?;
            }
            Call => {
                check_arity(opcode, 1, &args)?;
                let to = args[0].as_address()?;
                self.calls.push(self.counter + 1);
                self.counter = to;
            }
            Return => {
                check_arity(opcode, 0, &args)?;
                // An empty call stack returns to past the end of
                // memory, halting the machine.
                self.counter = self.calls.pop().unwrap_or_else(|| self.memory.len());
            }

            Push => {
                for value in args {
                    self.stack.push(value);
                }
                self.counter += 1;
            }
            Pop => {
                // The last destination receives the top of the stack.
                for into in args.iter().rev() {
                    let address = into.as_address()?;
                    let value = self.pop(opcode)?;
                    self.write(address, value)?;
                }
                self.counter += 1;
            }
            Drop => {
                check_arity(opcode, 0, &args)?;
                self.pop(opcode)?;
                self.counter += 1;
            }
            Dup => {
                check_arity(opcode, 0, &args)?;
                let top = self
                    .stack
                    .last()
                    .cloned()
                    .ok_or(RuntimeError::StackUnderflow { opcode })?;
                self.stack.push(top);
                self.counter += 1;
            }
            Over => {
                check_arity(opcode, 0, &args)?;
                if self.stack.len() < 2 {
                    return Err(RuntimeError::StackUnderflow { opcode });
                }
                let value = self.stack[self.stack.len() - 2].clone();
                self.stack.push(value);
                self.counter += 1;
            }
            Swap => {
                check_arity(opcode, 0, &args)?;
                let len = self.stack.len();
                if len < 2 {
                    return Err(RuntimeError::StackUnderflow { opcode });
                }
                self.stack.swap(len - 1, len - 2);
                self.counter += 1;
            }

            Neg => self.unary(opcode, neg, args)?,
            Inv => self.unary(opcode, inv, args)?,
            Not => self.unary(opcode, not, args)?,
            Cast => self.unary(opcode, value::cast, args)?,

            Add => self.binary(opcode, add, args)?,
            Sub => self.binary(opcode, sub, args)?,
            Mul => self.binary(opcode, mul, args)?,
            Div => self.binary(opcode, div, args)?,
            Mod => self.binary(opcode, rem, args)?,
            Or => self.binary(opcode, bit_or, args)?,
            And => self.binary(opcode, bit_and, args)?,
            Xor => self.binary(opcode, bit_xor, args)?,
            Left => self.binary(opcode, shift_left, args)?,
            Right => self.binary(opcode, shift_right, args)?,
            Cat => self.binary(opcode, cat, args)?,

            Comp => self.comparison(opcode, comp, args)?,
            Compn => self.comparison(opcode, compn, args)?,
            // TEST and EQUIV produce values through the binary path
            // rather than setting the flag.
            Test => self.binary(opcode, bit_and, args)?,
            Equiv => self.binary(opcode, equiv, args)?,

            Moves => {
                check_arity(opcode, 2, &args)?;
                self.store_flagged(args[0].clone(), &args[1])?;
            }
            Negs => self.unary_flagged(opcode, neg, &args)?,
            Invs => self.unary_flagged(opcode, inv, &args)?,
            Nots => self.unary_flagged(opcode, not, &args)?,
            Casts => self.unary_flagged(opcode, value::cast, &args)?,
            Adds => self.binary_flagged(opcode, add, &args)?,
            Subs => self.binary_flagged(opcode, sub, &args)?,
            Muls => self.binary_flagged(opcode, mul, &args)?,
            Divs => self.binary_flagged(opcode, div, &args)?,
            Mods => self.binary_flagged(opcode, rem, &args)?,
            Ors => self.binary_flagged(opcode, bit_or, &args)?,
            Ands => self.binary_flagged(opcode, bit_and, &args)?,
            Xors => self.binary_flagged(opcode, bit_xor, &args)?,
            Lefts => self.binary_flagged(opcode, shift_left, &args)?,
            Rights => self.binary_flagged(opcode, shift_right, &args)?,
            Cats => self.binary_flagged(opcode, cat, &args)?,
        }

        Ok(())
    }

    /// Dispatch for the arity polymorphic value-producing binary
    /// opcodes.
    ///
    /// With no arguments the operands come off the stack and the
    /// result is pushed back. With two, the first operand is combined
    /// into the cell addressed by the second. With three, the result
    /// of the first two is written to the cell addressed by the third.
    fn binary<F>(&mut self, opcode: OpCode, op: F, args: Vec<Value>) -> Result<(), RuntimeError>
    where
        F: Fn(&Value, &Value) -> Result<Value, RuntimeError>,
    {
        match args.len() {
            0 => {
                let op2 = self.pop(opcode)?;
                let op1 = self.pop(opcode)?;
                let value = op(&op1, &op2)?;
                self.stack.push(value);
            }
            2 => {
                let address = args[1].as_address()?;
                let current = self.read(address);
                let value = op(&current, &args[0])?;
                self.write(address, value)?;
            }
            3 => {
                let address = args[2].as_address()?;
                let value = op(&args[0], &args[1])?;
                self.write(address, value)?;
            }
            received => {
                return Err(RuntimeError::BadArity {
                    opcode,
                    accepts: "0, 2 or 3",
                    received,
                })
            }
        }

        self.counter += 1;

        Ok(())
    }

    /// Dispatch for the arity polymorphic unary opcodes: stack form,
    /// in-place form, or separate source and destination.
    fn unary<F>(&mut self, opcode: OpCode, op: F, args: Vec<Value>) -> Result<(), RuntimeError>
    where
        F: Fn(&Value) -> Result<Value, RuntimeError>,
    {
        match args.len() {
            0 => {
                let op1 = self.pop(opcode)?;
                let value = op(&op1)?;
                self.stack.push(value);
            }
            1 => {
                let address = args[0].as_address()?;
                let current = self.read(address);
                let value = op(&current)?;
                self.write(address, value)?;
            }
            2 => {
                let address = args[1].as_address()?;
                let value = op(&args[0])?;
                self.write(address, value)?;
            }
            received => {
                return Err(RuntimeError::BadArity {
                    opcode,
                    accepts: "0, 1 or 2",
                    received,
                })
            }
        }

        self.counter += 1;

        Ok(())
    }

    /// Dispatch for the flag-setting comparisons: operands come either
    /// off the stack or as the two arguments.
    fn comparison<F>(
        &mut self,
        opcode: OpCode,
        op: F,
        args: Vec<Value>,
    ) -> Result<(), RuntimeError>
    where
        F: Fn(&Value, &Value) -> Result<Ordering, RuntimeError>,
    {
        match args.len() {
            0 => {
                let op2 = self.pop(opcode)?;
                let op1 = self.pop(opcode)?;
                self.flag = Some(op(&op1, &op2)?);
            }
            2 => {
                self.flag = Some(op(&args[0], &args[1])?);
            }
            received => {
                return Err(RuntimeError::BadArity {
                    opcode,
                    accepts: "0 or 2",
                    received,
                })
            }
        }

        self.counter += 1;

        Ok(())
    }

    /// MOVE that also compares the written value against the zero
    /// identity of its type and sets the flag.
    fn store_flagged(&mut self, value: Value, into: &Value) -> Result<(), RuntimeError> {
        let address = into.as_address()?;
        let flag = value.zero_cmp()?;
        self.write(address, value)?;
        self.flag = Some(flag);
        self.counter += 1;

        Ok(())
    }

    fn unary_flagged<F>(
        &mut self,
        opcode: OpCode,
        op: F,
        args: &[Value],
    ) -> Result<(), RuntimeError>
    where
        F: Fn(&Value) -> Result<Value, RuntimeError>,
    {
        check_arity(opcode, 2, args)?;
        let value = op(&args[0])?;
        self.store_flagged(value, &args[1])
    }

    fn binary_flagged<F>(
        &mut self,
        opcode: OpCode,
        op: F,
        args: &[Value],
    ) -> Result<(), RuntimeError>
    where
        F: Fn(&Value, &Value) -> Result<Value, RuntimeError>,
    {
        check_arity(opcode, 3, args)?;
        let value = op(&args[0], &args[1])?;
        self.store_flagged(value, &args[2])
    }
}

fn check_arity(opcode: OpCode, expected: usize, args: &[Value]) -> Result<(), RuntimeError> {
    if args.len() == expected {
        return Ok(());
    }

    let accepts = match expected {
        0 => "0",
        1 => "1",
        2 => "2",
        _ => "3",
    };

    Err(RuntimeError::BadArity {
        opcode,
        accepts,
        received: args.len(),
    })
}

fn arith(a: &Value, b: &Value, op: fn(f64, f64) -> f64) -> Result<Value, RuntimeError> {
    Ok(Value::Number(op(a.as_number()?, b.as_number()?)))
}

/// Bitwise operations truncate their operands to 64-bit integers and
/// return to floats afterwards.
fn bitwise(a: &Value, b: &Value, op: fn(i64, i64) -> i64) -> Result<Value, RuntimeError> {
    Ok(Value::Number(
        op(a.as_number()? as i64, b.as_number()? as i64) as f64,
    ))
}

fn add(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    arith(a, b, |a, b| a + b)
}

fn sub(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    arith(a, b, |a, b| a - b)
}

fn mul(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    arith(a, b, |a, b| a * b)
}

fn div(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    arith(a, b, |a, b| a / b)
}

fn rem(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    arith(a, b, |a, b| a % b)
}

fn bit_or(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    bitwise(a, b, |a, b| a | b)
}

fn bit_and(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    bitwise(a, b, |a, b| a & b)
}

fn bit_xor(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    bitwise(a, b, |a, b| a ^ b)
}

fn shift_left(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    bitwise(a, b, |a, b| a.wrapping_shl(b as u32))
}

fn shift_right(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    bitwise(a, b, |a, b| a.wrapping_shr(b as u32))
}

fn cat(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::Text(format!("{}{}", a.plain(), b.plain())))
}

fn neg(a: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::Number(-a.as_number()?))
}

fn inv(a: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::Number(!(a.as_number()? as i64) as f64))
}

fn not(a: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::Number(if a.truthy() { 0.0 } else { 1.0 }))
}

fn comp(a: &Value, b: &Value) -> Result<Ordering, RuntimeError> {
    value::compare(a, b)
}

/// Compare negated: the flag becomes the sign of `a + b`.
fn compn(a: &Value, b: &Value) -> Result<Ordering, RuntimeError> {
    let a = a.as_number()?;
    let b = b.as_number()?;

    Ok(a.partial_cmp(&-b).unwrap_or(Ordering::Equal))
}

/// 1 if the operands are strictly ordered, 0 if they compare equal.
fn equiv(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    Ok(Value::Number(match value::compare(a, b)? {
        Ordering::Equal => 0.0,
        _ => 1.0,
    }))
}
