//! Turns saflang source code into a [`Program`].
//!
//! Only a fixed set of characters means anything; every other character is ignored,
//! so comments can be written freely between instructions.
use thiserror::Error;
use tracing::debug;

use crate::ops::{Op, Program, StackId};


#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("Invalid close bracket at position {position}: there is no `[` to match it.")]
    UnmatchedCloseBracket { position: usize },
    #[error("Invalid open bracket at position {position}: it is never closed.")]
    UnmatchedOpenBracket { position: usize },
}

/// Characters which end the literal of a push instruction.
/// The `A` of the other case also ends it, see [`ends_push_literal`].
const INSTRUCTION_CHARS: &str = "SsFfKkCc!~?*/@#[]";

fn ends_push_literal(c: char, stack: StackId) -> bool {
    INSTRUCTION_CHARS.contains(c)
        || match stack {
            StackId::Primary => c == 'a',
            StackId::Secondary => c == 'A',
        }
}

fn is_push_increment(c: char, stack: StackId) -> bool {
    match stack {
        StackId::Primary => c == 'A',
        StackId::Secondary => c == 'a',
    }
}

/// Parses a whole program. Any bracket mismatch fails the whole parse.
pub fn parse(source: &str) -> Result<Program, ParserError> {
    let mut ops: Vec<Op> = Vec::new();
    // (index of the `[` instruction, position in the source)
    let mut open_brackets: Vec<(usize, usize)> = Vec::new();
    let mut chars = source.chars().enumerate().peekable();

    while let Some((position, c)) = chars.next() {
        let stack = StackId::from_case(c);
        match c {
            'S' | 's' => {
                let mut value: i64 = 0;
                while let Some(&(_, next)) = chars.peek() {
                    if ends_push_literal(next, stack) {
                        break;
                    }
                    if is_push_increment(next, stack) {
                        value += 1;
                    }
                    chars.next();
                }
                ops.push(Op::Push { value, stack });
            }
            'A' | 'a' => ops.push(Op::Add(stack)),
            'F' | 'f' => ops.push(Op::Negate(stack)),
            'K' | 'k' => ops.push(Op::DuplicateAcross(stack)),
            'C' | 'c' => ops.push(Op::Clear(stack)),
            '!' => ops.push(Op::PrintChar),
            '~' => ops.push(Op::PrintInt),
            '?' => ops.push(Op::ReadInt),
            '*' => ops.push(Op::Swap(StackId::Primary)),
            '/' => ops.push(Op::Swap(StackId::Secondary)),
            '@' => ops.push(Op::RotateToTop(StackId::Primary)),
            '#' => ops.push(Op::RotateToTop(StackId::Secondary)),
            '[' => {
                open_brackets.push((ops.len(), position));
                // Patched once the matching `]` is found.
                ops.push(Op::JumpIfNotPositive { target: usize::MAX });
            }
            ']' => {
                let (open_index, _) = open_brackets
                    .pop()
                    .ok_or(ParserError::UnmatchedCloseBracket { position })?;
                let close_index = ops.len();
                ops[open_index] = Op::JumpIfNotPositive { target: close_index };
                ops.push(Op::JumpIfPositive { target: open_index });
            }
            _ => (),
        }
    }

    if let Some(&(_, position)) = open_brackets.last() {
        return Err(ParserError::UnmatchedOpenBracket { position });
    }

    debug!(instructions = ops.len(), "parsed program");
    Ok(Program::from_resolved(ops))
}
