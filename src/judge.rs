//! Checks a program against a problem's test cases.
use tracing::debug;

use crate::ops::Program;
use crate::parser::{self, ParserError};
use crate::vm::{self, RunError};

/// One test case: the program must print exactly `expected_output` when given `input`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub input: Vec<i64>,
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: Vec<i64>, expected_output: impl Into<String>) -> Self {
        TestCase { input, expected_output: expected_output.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Accepted,
    /// The program finished, but printed something else.
    WrongAnswer { actual: String },
    /// The program failed or hit the instruction limit.
    RuntimeError(RunError),
}

impl CaseOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CaseOutcome::Accepted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeReport {
    /// Outcomes in the order of the test cases.
    pub outcomes: Vec<CaseOutcome>,
}

impl JudgeReport {
    /// The program solves the problem only if every case is accepted.
    pub fn all_accepted(&self) -> bool {
        self.outcomes.iter().all(CaseOutcome::is_accepted)
    }

    pub fn accepted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }
}

/// Runs one case on a fresh machine. Outputs are compared exactly, whitespace included.
pub fn judge_case(program: &Program, case: &TestCase, max_op_count: u64) -> CaseOutcome {
    match vm::execute(program, &case.input, max_op_count) {
        Ok(output) if output == case.expected_output => CaseOutcome::Accepted,
        Ok(actual) => CaseOutcome::WrongAnswer { actual },
        Err(error) => CaseOutcome::RuntimeError(error),
    }
}

/// Parses the source once and runs it on every case.
///
/// A source which does not parse fails the whole submission.
pub fn judge(source: &str, cases: &[TestCase], max_op_count: u64) -> Result<JudgeReport, ParserError> {
    let program = parser::parse(source)?;
    let outcomes: Vec<CaseOutcome> = cases
        .iter()
        .enumerate()
        .map(|(i, case)| {
            let outcome = judge_case(&program, case, max_op_count);
            debug!(case = i, accepted = outcome.is_accepted(), "judged test case");
            outcome
        })
        .collect();
    Ok(JudgeReport { outcomes })
}
