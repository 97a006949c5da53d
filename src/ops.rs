//! The saflang instruction set.
use std::fmt;

/// One of the two integer stacks of the machine.
///
/// In source code, the stack is selected by the case of the instruction letter:
/// uppercase letters address [`StackId::Primary`], lowercase letters address
/// [`StackId::Secondary`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StackId {
    Primary = 0,
    Secondary = 1,
}

impl StackId {
    /// Selects the stack by the case of a source character.
    /// Anything that is not lowercase (including non-letters) selects the primary stack.
    pub fn from_case(c: char) -> Self {
        if c.is_lowercase() {
            StackId::Secondary
        } else {
            StackId::Primary
        }
    }

    pub fn other(self) -> Self {
        match self {
            StackId::Primary => StackId::Secondary,
            StackId::Secondary => StackId::Primary,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Writes `c` in the case that selects this stack.
    fn letter(self, c: char) -> char {
        match self {
            StackId::Primary => c.to_ascii_uppercase(),
            StackId::Secondary => c.to_ascii_lowercase(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Op {
    /// `S`/`s` followed by a number of matching-case `A`s.
    Push { value: i64, stack: StackId },
    Add(StackId),
    Negate(StackId),
    /// Copies the top of the stack onto the other stack.
    DuplicateAcross(StackId),
    Clear(StackId),
    PrintChar,
    PrintInt,
    ReadInt,
    Swap(StackId),
    /// Moves the bottom element of the stack to the top.
    RotateToTop(StackId),
    /// `[`, `target` is the index of the matching `]`.
    JumpIfNotPositive { target: usize },
    /// `]`, `target` is the index of the matching `[`.
    JumpIfPositive { target: usize },
}

impl Op {
    /// Short lowercase name of the instruction kind, independent of its operands.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Push { .. } => "push",
            Op::Add(_) => "add",
            Op::Negate(_) => "negate",
            Op::DuplicateAcross(_) => "duplicate",
            Op::Clear(_) => "clear",
            Op::PrintChar => "printchar",
            Op::PrintInt => "printint",
            Op::ReadInt => "readint",
            Op::Swap(_) => "swap",
            Op::RotateToTop(_) => "rotate",
            Op::JumpIfNotPositive { .. } => "loopstart",
            Op::JumpIfPositive { .. } => "loopend",
        }
    }

    pub fn jump_target(&self) -> Option<usize> {
        match *self {
            Op::JumpIfNotPositive { target } | Op::JumpIfPositive { target } => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    /// Formats the instruction as saflang source code.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Op::Push { value, stack } => {
                write!(f, "{}", stack.letter('s'))?;
                // Negative values cannot be written as a literal.
                for _ in 0..value.max(0) {
                    write!(f, "{}", stack.letter('a'))?;
                }
                Ok(())
            }
            Op::Add(stack) => write!(f, "{}", stack.letter('a')),
            Op::Negate(stack) => write!(f, "{}", stack.letter('f')),
            Op::DuplicateAcross(stack) => write!(f, "{}", stack.letter('k')),
            Op::Clear(stack) => write!(f, "{}", stack.letter('c')),
            Op::PrintChar => write!(f, "!"),
            Op::PrintInt => write!(f, "~"),
            Op::ReadInt => write!(f, "?"),
            Op::Swap(StackId::Primary) => write!(f, "*"),
            Op::Swap(StackId::Secondary) => write!(f, "/"),
            Op::RotateToTop(StackId::Primary) => write!(f, "@"),
            Op::RotateToTop(StackId::Secondary) => write!(f, "#"),
            Op::JumpIfNotPositive { .. } => write!(f, "["),
            Op::JumpIfPositive { .. } => write!(f, "]"),
        }
    }
}

/// A parsed saflang program with all loop targets resolved.
///
/// Every jump target is an index into the same program, pointing at the matching bracket.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Program {
    ops: Vec<Op>,
}

impl Program {
    /// Only the parser creates programs through this, targets are already matched.
    pub(crate) fn from_resolved(ops: Vec<Op>) -> Self {
        Program { ops }
    }

    /// Builds a program from instructions created elsewhere.
    ///
    /// Returns `None` unless the brackets are properly nested and every `[` and `]` points
    /// at its partner, or if a push has a negative value, which no source can express.
    pub fn try_from_ops(ops: Vec<Op>) -> Option<Self> {
        let mut open_brackets: Vec<usize> = Vec::new();
        for (i, op) in ops.iter().enumerate() {
            match *op {
                Op::Push { value, .. } if value < 0 => return None,
                Op::JumpIfNotPositive { .. } => open_brackets.push(i),
                Op::JumpIfPositive { target } => {
                    if open_brackets.pop() != Some(target)
                        || ops[target] != (Op::JumpIfNotPositive { target: i })
                    {
                        return None;
                    }
                }
                _ => (),
            }
        }
        open_brackets.is_empty().then_some(Program { ops })
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.ops {
            write!(f, "{op}")?;
        }
        Ok(())
    }
}
