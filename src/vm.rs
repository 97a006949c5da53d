//! Functions for executing saflang programs.
use std::collections::{BTreeMap, VecDeque};

use thiserror::Error;
use tracing::{debug, trace};

use crate::ops::{Op, Program, StackId};

#[cfg(test)]
mod tests;

/// A step tracer which does not track anything.
///
/// This is the best choice if you only care about the output of the program.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoStats {}

impl Tracer for NoStats {
    #[inline(always)]
    fn instruction(&mut self, _ip: usize, _op: Op, _stacks: &Stacks) {}
}

/// A hook which is called after every executed instruction.
///
/// `ip` is the index of the instruction that was just executed, `stacks` is the state
/// of the machine after it.
pub trait Tracer {
    fn instruction(&mut self, ip: usize, op: Op, stacks: &Stacks);
}

/// Emits a `trace` level event with the machine state after every instruction.
#[derive(Default, Debug, Clone, Copy)]
pub struct LogTracer {}

impl Tracer for LogTracer {
    fn instruction(&mut self, ip: usize, op: Op, stacks: &Stacks) {
        trace!(
            ip,
            op = %op,
            primary = ?stacks.get(StackId::Primary),
            secondary = ?stacks.get(StackId::Secondary),
            "step"
        );
    }
}

/// Counts how many times each kind of instruction has been executed.
#[derive(Default, Debug, Clone)]
pub struct OpHistogram {
    pub counts: BTreeMap<&'static str, u64>,
}

impl Tracer for OpHistogram {
    fn instruction(&mut self, _ip: usize, op: Op, _stacks: &Stacks) {
        *self.counts.entry(op.name()).or_default() += 1;
    }
}

/// The two stacks of the machine.
///
/// The back of each deque is the top of the stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stacks {
    stacks: [VecDeque<i64>; 2],
}

impl Stacks {
    pub fn get(&self, stack: StackId) -> &VecDeque<i64> {
        &self.stacks[stack.index()]
    }

    fn get_mut(&mut self, stack: StackId) -> &mut VecDeque<i64> {
        &mut self.stacks[stack.index()]
    }

    /// Removes the top value, an empty stack gives 0.
    fn pop_or_zero(&mut self, stack: StackId) -> i64 {
        self.get_mut(stack).pop_back().unwrap_or(0)
    }

    fn push(&mut self, stack: StackId, value: i64) {
        self.get_mut(stack).push_back(value);
    }
}

/// The internal state of the VM.
#[derive(Clone, Debug)]
struct State<'a, TTracer: Tracer> {
    pub stacks: Stacks,
    pub input: &'a [i64],
    pub input_read: usize,
    pub output: String,
    pub instructions_run: u64,
    pub ip: usize,
    pub tracer: TTracer,
}

/// An error that can occur during the execution of a saflang instruction.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationError {
    /// A character print of a negative value. Values which are not Unicode scalar values
    /// (surrogates, anything above `0x10FFFF`) cannot be put into the output either and
    /// fail the same way.
    #[error("ASCII range error: {value} is not a printable character code")]
    AsciiRange { value: i64 },
    #[error("Input exceeded: there are no more values to read")]
    InputExhausted,
    #[error("Integer overflow")]
    IntegerOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    None,
    SetInstructionPointer(usize),
    /// Stops the program successfully.
    Halt,
}

impl<'a, TTracer: Tracer> State<'a, TTracer> {
    fn new(input: &'a [i64], tracer: TTracer) -> Self {
        State {
            stacks: Stacks::default(),
            input,
            input_read: 0,
            output: String::new(),
            instructions_run: 0,
            ip: 0,
            tracer,
        }
    }

    fn read_input(&mut self) -> Result<i64, OperationError> {
        let value = self.input.get(self.input_read).copied().ok_or(OperationError::InputExhausted)?;
        self.input_read += 1;
        Ok(value)
    }

    fn apply(&mut self, op: Op) -> Result<Effect, OperationError> {
        match op {
            Op::Push { value, stack } => self.stacks.push(stack, value),
            Op::Add(stack) => {
                let a = self.stacks.pop_or_zero(stack);
                let b = self.stacks.pop_or_zero(stack);
                self.stacks.push(stack, a.checked_add(b).ok_or(OperationError::IntegerOverflow)?);
            }
            Op::Negate(stack) => {
                let a = self.stacks.pop_or_zero(stack);
                self.stacks.push(stack, a.checked_neg().ok_or(OperationError::IntegerOverflow)?);
            }
            Op::DuplicateAcross(stack) => {
                let top = self.stacks.get(stack).back().copied().unwrap_or(0);
                self.stacks.push(stack.other(), top);
            }
            Op::Clear(stack) => self.stacks.get_mut(stack).clear(),
            Op::PrintChar => {
                let value = self.stacks.pop_or_zero(StackId::Primary);
                let c = u32::try_from(value)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(OperationError::AsciiRange { value })?;
                self.output.push(c);
            }
            Op::PrintInt => {
                let value = self.stacks.pop_or_zero(StackId::Primary);
                self.output.push_str(&value.to_string());
            }
            Op::ReadInt => {
                let value = self.read_input()?;
                self.stacks.push(StackId::Secondary, value);
            }
            Op::Swap(stack) => {
                let stack = self.stacks.get_mut(stack);
                let len = stack.len();
                if len < 2 {
                    return Ok(Effect::Halt);
                }
                stack.swap(len - 1, len - 2);
            }
            Op::RotateToTop(stack) => {
                let stack = self.stacks.get_mut(stack);
                match stack.pop_front() {
                    Some(bottom) => stack.push_back(bottom),
                    None => return Ok(Effect::Halt),
                }
            }
            Op::JumpIfNotPositive { target } => {
                if self.stacks.pop_or_zero(StackId::Primary) <= 0 {
                    return Ok(Effect::SetInstructionPointer(target + 1));
                }
            }
            Op::JumpIfPositive { target } => {
                if self.stacks.pop_or_zero(StackId::Primary) > 0 {
                    return Ok(Effect::SetInstructionPointer(target + 1));
                }
            }
        }

        Ok(Effect::None)
    }
}

/// Options for the saflang virtual machine.
#[derive(Debug, Clone)]
pub struct VMOptions<'a> {
    /// Values available to [`Op::ReadInt`], read from the front.
    input: &'a [i64],
    /// The maximum number of instructions to run. If the program has not stopped
    /// by then, it fails with [`RunError::ExecutionTimeout`].
    ///
    /// Set to [`u64::MAX`] to disable this limit.
    max_op_count: u64,
}

impl<'a> VMOptions<'a> {
    /// Create a new set of VM options.
    ///
    /// There is no default instruction limit: a saflang program can loop forever,
    /// so the caller has to decide how long it may run.
    pub fn new(input: &'a [i64], max_op_count: u64) -> Self {
        Self { input, max_op_count }
    }
}

/// An error that happened while running a saflang program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    /// A specific instruction failed.
    #[error("Instruction {index} ({instruction}) failed (instruction counter {instruction_counter}): {error}")]
    InstructionFailed {
        /// The instruction which failed.
        instruction: Op,
        /// The 0-based index of this instruction in the program.
        index: usize,
        /// The number of instructions which have been run before this one.
        instruction_counter: u64,
        /// The specific error within the instruction.
        error: OperationError,
    },
    /// The program executed more instructions than the limit specified within [`VMOptions`].
    #[error("The program ran for too long ({instruction_counter} instructions had been run).")]
    ExecutionTimeout {
        /// The number of instructions which have been run.
        instruction_counter: u64,
    },
}

impl RunError {
    /// The instruction-level error, if this is not a timeout.
    pub fn operation_error(&self) -> Option<&OperationError> {
        match self {
            RunError::InstructionFailed { error, .. } => Some(error),
            RunError::ExecutionTimeout { .. } => None,
        }
    }
}

/// The successful result of running a saflang program.
///
/// A program which stopped early because of a `Swap` or `RotateToTop` on a too small stack
/// gives the same kind of result as one which ran past its last instruction.
#[derive(Debug, Clone)]
pub struct RunResult<T: Tracer> {
    /// Everything the program printed.
    pub output: String,
    /// The stacks after the program has finished.
    pub stacks: Stacks,
    /// The number of instructions which have been run.
    pub instruction_counter: u64,
    /// The step tracer.
    pub tracer: T,
}

impl<'a, T: Tracer> From<State<'a, T>> for RunResult<T> {
    fn from(s: State<'a, T>) -> Self {
        RunResult {
            output: s.output,
            stacks: s.stacks,
            instruction_counter: s.instructions_run,
            tracer: s.tracer,
        }
    }
}

/// Run a saflang program with the given options.
///
/// # Example
/// ```
/// use saflang::parser::parse;
/// use saflang::vm::{run, VMOptions};
///
/// let program = parse("?k~").unwrap();
/// let result = run(&program, VMOptions::new(&[5], 1_000)).unwrap();
/// assert_eq!(result.output, "5");
/// ```
pub fn run(program: &Program, options: VMOptions) -> Result<RunResult<NoStats>, RunError> {
    run_with_stats::<NoStats>(program, options, NoStats::default())
}

/// Run a saflang program with the given options and a step tracer.
/// If you do not need to observe the steps, use the [`run`] function instead.
pub fn run_with_stats<T: Tracer>(
    program: &Program,
    options: VMOptions,
    tracer: T,
) -> Result<RunResult<T>, RunError> {
    let mut s: State<T> = State::new(options.input, tracer);
    run_state(&mut s, program.ops(), &options)?;
    debug!(
        instructions = s.instructions_run,
        output_len = s.output.len(),
        "program finished"
    );
    Ok(s.into())
}

/// Run a program on the given input and return what it printed.
pub fn execute(program: &Program, input: &[i64], max_op_count: u64) -> Result<String, RunError> {
    run(program, VMOptions::new(input, max_op_count)).map(|result| result.output)
}

fn run_state<T: Tracer>(s: &mut State<'_, T>, ops: &[Op], options: &VMOptions) -> Result<(), RunError> {
    while let Some(&op) = ops.get(s.ip) {
        if s.instructions_run >= options.max_op_count {
            return Err(RunError::ExecutionTimeout { instruction_counter: s.instructions_run });
        }

        let ip = s.ip;
        let instruction_counter = s.instructions_run;
        let effect = s.apply(op).map_err(|error| RunError::InstructionFailed {
            instruction: op,
            index: ip,
            instruction_counter,
            error,
        })?;
        s.instructions_run += 1;
        s.tracer.instruction(ip, op, &s.stacks);

        match effect {
            Effect::None => s.ip += 1,
            Effect::SetInstructionPointer(new_ip) => s.ip = new_ip,
            Effect::Halt => {
                debug!(ip, instruction = %op, "stack too small, stopping early");
                break;
            }
        }
    }

    Ok(())
}
