use arbitrary::Arbitrary;
use saflang::{parser::parse, vm::{self, RunError}};

/// Source characters worth generating: every instruction, some filler and whitespace.
pub const ALLOWED_CHARS: &[char] = &[
    'S', 's', 'A', 'a', 'F', 'f', 'K', 'k', 'C', 'c',
    '!', '~', '?', '*', '/', '@', '#', '[', ']',
    ' ', '\n', 'x', 'Z',
];

pub const OP_LIMIT: u64 = 20_000;

pub struct ArbitraryChar(pub char);

impl<'a> Arbitrary<'a> for ArbitraryChar {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let idx = u.choose_index(ALLOWED_CHARS.len())?;
        Ok(ArbitraryChar(ALLOWED_CHARS[idx]))
    }
}

/// Parses and runs the source twice, checking that nothing panics and that
/// the results do not depend on anything but the program and its input.
pub fn verify_repro(source: &str, input: Vec<i64>) {
    let Ok(program) = parse(source) else { return };

    for (i, op) in program.ops().iter().enumerate() {
        if let Some(target) = op.jump_target() {
            assert_eq!(program.ops()[target].jump_target(), Some(i), "Unmatched jump in {source:?}");
        }
    }
    assert_eq!(parse(&program.to_string()).as_ref(), Ok(&program), "Program does not reparse: {source:?}");

    let first = vm::execute(&program, &input, OP_LIMIT);
    let second = vm::execute(&program, &input, OP_LIMIT);
    assert_eq!(first, second, "Nondeterministic run. Source: {source:?}, Input: {input:?}");

    if let Err(RunError::ExecutionTimeout { instruction_counter }) = first {
        assert_eq!(instruction_counter, OP_LIMIT);
    }
}
