use crate::ops::StackId::{Primary, Secondary};
use crate::parser::parse;
use crate::vm::RunError::InstructionFailed;
use super::*;

const OP_LIMIT: u64 = 100_000;

fn run_ops(ops: &[Op], input: &[i64]) -> Result<RunResult<NoStats>, RunError> {
    let program = Program::try_from_ops(ops.to_vec()).unwrap();
    super::run(&program, VMOptions::new(input, OP_LIMIT))
}

fn stacks_after(ops: &[Op]) -> (Vec<i64>, Vec<i64>) {
    let result = run_ops(ops, &[]).unwrap();
    (
        result.stacks.get(Primary).iter().copied().collect(),
        result.stacks.get(Secondary).iter().copied().collect(),
    )
}

fn primary_after(ops: &[Op]) -> Vec<i64> {
    stacks_after(ops).0
}

fn output_of(ops: &[Op]) -> String {
    run_ops(ops, &[]).unwrap().output
}

fn op_error(ops: &[Op], input: &[i64]) -> Option<OperationError> {
    run_ops(ops, input).err().and_then(|e| e.operation_error().cloned())
}

fn run_source(source: &str, input: &[i64]) -> Result<String, RunError> {
    execute(&parse(source).unwrap(), input, OP_LIMIT)
}

fn push(value: i64) -> Op {
    Op::Push { value, stack: Primary }
}

fn push_secondary(value: i64) -> Op {
    Op::Push { value, stack: Secondary }
}

#[test]
fn test_empty() {
    assert_eq!(run_source("", &[]), Ok(String::new()));
    assert_eq!(run_source("only a comment", &[1, 2]), Ok(String::new()));
}

#[test]
fn test_scenarios() {
    assert_eq!(run_source("SAAA~", &[]), Ok("3".to_string()));
    assert_eq!(run_source("?k~", &[5]), Ok("5".to_string()));
    assert_eq!(run_source("S[~]~", &[]), Ok("0".to_string()));
    assert_eq!(run_source("SA[F~]", &[]), Ok("0".to_string()));
    assert_eq!(
        run_source("SAF!", &[]),
        Err(InstructionFailed {
            instruction: Op::PrintChar,
            index: 2,
            instruction_counter: 2,
            error: OperationError::AsciiRange { value: -1 },
        })
    );
    assert_eq!(
        run_source("??", &[]),
        Err(InstructionFailed {
            instruction: Op::ReadInt,
            index: 0,
            instruction_counter: 0,
            error: OperationError::InputExhausted,
        })
    );
}

#[test]
fn test_push() {
    assert_eq!(stacks_after(&[push(5), push_secondary(2), push(0)]), (vec![5, 0], vec![2]));
}

#[test]
fn test_add() {
    assert_eq!(primary_after(&[push(3), push(4), Op::Add(Primary)]), [7]);
    assert_eq!(primary_after(&[push(1), push(3), push(4), Op::Add(Primary)]), [1, 7]);
    // Missing operands are zeros.
    assert_eq!(primary_after(&[push(3), Op::Add(Primary)]), [3]);
    assert_eq!(primary_after(&[Op::Add(Primary)]), [0]);
    assert_eq!(
        stacks_after(&[push(1), push_secondary(2), push_secondary(5), Op::Add(Secondary)]),
        (vec![1], vec![7])
    );

    assert_eq!(op_error(&[push(i64::MAX), push(1), Op::Add(Primary)], &[]), Some(OperationError::IntegerOverflow));
}

#[test]
fn test_add_from_source() {
    // The lowercase `a` ends the literal, adds on the secondary stack, then `A` adds 2 + 0.
    assert_eq!(run_source("SAAaA~", &[]), Ok("2".to_string()));
    // A secondary push in between lets the following `A` be an addition.
    assert_eq!(run_source("SAA SAAAA sA~", &[]), Ok("6".to_string()));
}

#[test]
fn test_negate() {
    assert_eq!(primary_after(&[push(3), Op::Negate(Primary)]), [-3]);
    assert_eq!(primary_after(&[push(3), Op::Negate(Primary), Op::Negate(Primary)]), [3]);
    assert_eq!(primary_after(&[Op::Negate(Primary)]), [0]);
    assert_eq!(stacks_after(&[push_secondary(8), Op::Negate(Secondary)]), (vec![], vec![-8]));

    // -i64::MAX - 1 is i64::MIN, which has no positive counterpart.
    let min = [push(i64::MAX), Op::Negate(Primary), push(1), Op::Negate(Primary), Op::Add(Primary)];
    assert_eq!(primary_after(&min), [i64::MIN]);
    let negate_min: Vec<Op> = min.iter().copied().chain([Op::Negate(Primary)]).collect();
    assert_eq!(op_error(&negate_min, &[]), Some(OperationError::IntegerOverflow));
}

#[test]
fn test_duplicate_across() {
    // The value stays on the source stack.
    assert_eq!(stacks_after(&[push(7), Op::DuplicateAcross(Primary)]), (vec![7], vec![7]));
    assert_eq!(
        stacks_after(&[push_secondary(1), push_secondary(2), Op::DuplicateAcross(Secondary)]),
        (vec![2], vec![1, 2])
    );
    assert_eq!(stacks_after(&[Op::DuplicateAcross(Secondary)]), (vec![0], vec![]));
}

#[test]
fn test_clear() {
    assert_eq!(
        stacks_after(&[push(1), push(2), push_secondary(9), Op::Clear(Primary)]),
        (vec![], vec![9])
    );
    assert_eq!(stacks_after(&[Op::Clear(Secondary)]), (vec![], vec![]));
}

#[test]
fn test_print_char() {
    assert_eq!(output_of(&[push(72), Op::PrintChar, push(105), Op::PrintChar]), "Hi");
    assert_eq!(output_of(&[push(0x1F600), Op::PrintChar]), "😀");
    // An empty stack prints the character 0.
    assert_eq!(output_of(&[Op::PrintChar]), "\0");

    assert_eq!(op_error(&[push(5), Op::Negate(Primary), Op::PrintChar], &[]), Some(OperationError::AsciiRange { value: -5 }));
    assert_eq!(op_error(&[push(0xD800), Op::PrintChar], &[]), Some(OperationError::AsciiRange { value: 0xD800 }));
    assert_eq!(op_error(&[push(0x110000), Op::PrintChar], &[]), Some(OperationError::AsciiRange { value: 0x110000 }));
    assert_eq!(
        op_error(&[push(i64::MAX), Op::PrintChar], &[]),
        Some(OperationError::AsciiRange { value: i64::MAX })
    );
}

#[test]
fn test_print_int() {
    assert_eq!(output_of(&[push(12), Op::Negate(Primary), Op::PrintInt]), "-12");
    // No separators between printed values.
    assert_eq!(output_of(&[push(23), push(1), Op::PrintInt, Op::PrintInt]), "123");
    assert_eq!(output_of(&[Op::PrintInt, Op::PrintInt]), "00");
    // Only the primary stack is printed.
    assert_eq!(output_of(&[push_secondary(4), Op::PrintInt]), "0");
}

#[test]
fn test_read_int() {
    let result = run_ops(&[Op::ReadInt, Op::ReadInt], &[4, -9, 3]).unwrap();
    assert_eq!(result.stacks.get(Secondary), &[4, -9]);
    assert!(result.stacks.get(Primary).is_empty());

    assert_eq!(op_error(&[Op::ReadInt, Op::ReadInt], &[4]), Some(OperationError::InputExhausted));
}

#[test]
fn test_swap() {
    assert_eq!(primary_after(&[push(1), push(2), push(3), push(4), Op::Swap(Primary)]), [1, 2, 4, 3]);
    assert_eq!(primary_after(&[push(1), push(2), Op::Swap(Primary), Op::Swap(Primary)]), [1, 2]);
    assert_eq!(
        stacks_after(&[push_secondary(1), push_secondary(2), Op::Swap(Secondary)]),
        (vec![], vec![2, 1])
    );
}

#[test]
fn test_swap_halts_on_small_stack() {
    assert_eq!(output_of(&[push(1), Op::Swap(Primary), Op::PrintInt]), "");
    assert_eq!(output_of(&[push(5), Op::PrintInt, Op::Swap(Primary), push(1), Op::PrintInt]), "5");
    // Only the addressed stack matters.
    assert_eq!(output_of(&[push(1), push(2), Op::Swap(Secondary), Op::PrintInt]), "");

    let result = run_ops(&[push(1), Op::Swap(Primary), Op::PrintInt], &[]).unwrap();
    assert_eq!(result.instruction_counter, 2);
    assert_eq!(result.stacks.get(Primary), &[1]);
}

#[test]
fn test_rotate_to_top() {
    assert_eq!(primary_after(&[push(1), push(2), push(3), Op::RotateToTop(Primary)]), [2, 3, 1]);
    assert_eq!(primary_after(&[push(1), Op::RotateToTop(Primary)]), [1]);
    assert_eq!(
        stacks_after(&[push_secondary(1), push_secondary(2), Op::RotateToTop(Secondary)]),
        (vec![], vec![2, 1])
    );
}

#[test]
fn test_rotate_halts_on_empty_stack() {
    assert_eq!(output_of(&[push_secondary(4), Op::RotateToTop(Primary), Op::PrintInt]), "");
    assert_eq!(run_source("SAAA~ # ~", &[]), Ok("3".to_string()));
}

#[test]
fn test_loop_skipped() {
    assert_eq!(run_source("S[SAAA~]", &[]), Ok(String::new()));
    assert_eq!(run_source("[SAAA~]SA~", &[]), Ok("1".to_string()));
    // Negative values skip the loop too.
    assert_eq!(run_source("SAF[SAAA~]", &[]), Ok(String::new()));
}

#[test]
fn test_countdown_loop() {
    // The counter lives on the secondary stack, `k` copies it to the primary stack
    // before each test.
    let program = parse("saaa k [ k~ sa f a k ]").unwrap();
    let result = super::run(&program, VMOptions::new(&[], OP_LIMIT)).unwrap();
    assert_eq!(result.output, "321");
    // The opening test runs once, the body with the closing test three times.
    assert_eq!(result.instruction_counter, 3 + 3 * 7);
    assert_eq!(result.stacks.get(Secondary), &[0]);
    assert!(result.stacks.get(Primary).is_empty());
}

#[test]
fn test_read_loop() {
    // Prints input values until a non-positive one is read.
    let source = "?k [ k~ ?k ]";
    assert_eq!(run_source(source, &[3, 1, 4, 0, 5]), Ok("314".to_string()));
    assert_eq!(
        run_source(source, &[3, 1]).map_err(|e| e.operation_error().cloned()),
        Err(Some(OperationError::InputExhausted))
    );
}

#[test]
fn test_timeout() {
    let program = parse("SA[SA]").unwrap();
    assert_eq!(
        execute(&program, &[], 100),
        Err(RunError::ExecutionTimeout { instruction_counter: 100 })
    );

    let program = parse("SAAA~").unwrap();
    assert_eq!(execute(&program, &[], 2), Ok("3".to_string()));
    assert_eq!(execute(&program, &[], 1), Err(RunError::ExecutionTimeout { instruction_counter: 1 }));
    assert_eq!(execute(&parse("").unwrap(), &[], 0), Ok(String::new()));
}

#[test]
fn test_deterministic() {
    let program = parse("?k [ k~ SAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA! ?k ] #").unwrap();
    let input = [2, 7, 1, -1];
    let first = execute(&program, &input, OP_LIMIT);
    assert_eq!(first, Ok("2 7 1 ".to_string()));
    for _ in 0..3 {
        assert_eq!(execute(&program, &input, OP_LIMIT), first);
    }
}

#[derive(Default)]
struct StepRecorder {
    steps: Vec<(usize, Op, Vec<i64>)>,
}

impl Tracer for StepRecorder {
    fn instruction(&mut self, ip: usize, op: Op, stacks: &Stacks) {
        self.steps.push((ip, op, stacks.get(Primary).iter().copied().collect()));
    }
}

#[test]
fn test_tracer() {
    let program = parse("S[~]~").unwrap();
    let result = run_with_stats(&program, VMOptions::new(&[], OP_LIMIT), StepRecorder::default()).unwrap();
    assert_eq!(
        result.tracer.steps,
        [
            (0, push(0), vec![0]),
            (1, Op::JumpIfNotPositive { target: 3 }, vec![]),
            (4, Op::PrintInt, vec![]),
        ]
    );
}

#[test]
fn test_histogram() {
    let program = parse("saaa k [ k~ sa f a k ]").unwrap();
    let result = run_with_stats(&program, VMOptions::new(&[], OP_LIMIT), OpHistogram::default()).unwrap();
    let counts = &result.tracer.counts;
    assert_eq!(counts.get("loopstart"), Some(&1));
    assert_eq!(counts.get("loopend"), Some(&3));
    assert_eq!(counts.get("printint"), Some(&3));
    assert_eq!(counts.get("duplicate"), Some(&7));
    assert_eq!(counts.values().sum::<u64>(), result.instruction_counter);
}

#[test]
fn test_error_message() {
    let err = run_source("SAF!", &[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Instruction 2 (!) failed (instruction counter 2): ASCII range error: -1 is not a printable character code"
    );
}
