//! # saflang
//! A tiny two-stack esoteric language used for judged programming exercises.
//!
//! ## The language
//! Programs are written with a handful of characters; everything else is a comment.
//! Letters pick one of two stacks by their case: uppercase letters work with the
//! primary stack, lowercase letters with the secondary one.
//!
//! | Source | Instruction |
//! |---|---|
//! | `S` / `s` | push the number of following `A` / `a` characters |
//! | `A` / `a` | add the two top values |
//! | `F` / `f` | negate the top value |
//! | `K` / `k` | copy the top value to the other stack |
//! | `C` / `c` | clear the stack |
//! | `!` / `~` | print the top of the primary stack as a character / a number |
//! | `?` | read a number from the input onto the secondary stack |
//! | `*` / `/` | swap the two top values of the primary / secondary stack |
//! | `@` / `#` | move the bottom value of the primary / secondary stack to the top |
//! | `[` ... `]` | loop while the top of the primary stack is positive |
//!
//! Popping from an empty stack gives 0, except for swaps and rotations, which stop the
//! program instead.
//!
//! ## Example
//! ```
//! let output = saflang::run_source("?k~", &[5], 1_000).unwrap();
//! assert_eq!(output, "5");
//! ```
pub mod config;
pub mod judge;
pub mod ops;
pub mod parser;
pub mod vm;

use thiserror::Error;

use crate::parser::ParserError;
use crate::vm::RunError;

/// Anything that can go wrong when running source code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParserError),
    #[error(transparent)]
    Run(#[from] RunError),
}

/// Parse the source code and run it on the given input, returning the printed output.
pub fn run_source(source: &str, input: &[i64], max_op_count: u64) -> Result<String, Error> {
    let program = parser::parse(source)?;
    Ok(vm::execute(&program, input, max_op_count)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_source() {
        assert_eq!(run_source("SAAA~", &[], 100), Ok("3".to_string()));
        assert_eq!(
            run_source("[", &[], 100),
            Err(Error::Parse(ParserError::UnmatchedOpenBracket { position: 0 }))
        );
        assert!(matches!(
            run_source("??", &[1], 100),
            Err(Error::Run(RunError::InstructionFailed { .. }))
        ));
    }
}
