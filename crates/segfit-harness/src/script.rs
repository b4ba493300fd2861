//! Allocation trace scripts.
//!
//! A script is a line-oriented sequence of allocator operations against
//! numbered slots:
//!
//! ```text
//! # comment
//! a <slot> <size>    allocate <size> bytes into <slot>
//! r <slot> <size>    resize <slot> to <size> bytes
//! f <slot>           free <slot>
//! ```
//!
//! Slots are arbitrary small integers chosen by the script author; a slot
//! holds at most one live allocation at a time.

use thiserror::Error;

/// One scripted allocator operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOp {
    /// Allocate `size` bytes into `slot`.
    Alloc { slot: usize, size: usize },
    /// Resize the allocation in `slot` to `size` bytes.
    Resize { slot: usize, size: usize },
    /// Free the allocation in `slot`.
    Free { slot: usize },
}

/// A script parse failure, with the 1-based source line.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("line {line}: unknown operation {op:?}")]
    UnknownOp { line: usize, op: String },
    #[error("line {line}: expected {expected} operands")]
    Malformed { line: usize, expected: usize },
    #[error("line {line}: bad number")]
    BadNumber {
        line: usize,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// A parsed allocation trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub ops: Vec<ScriptOp>,
}

impl Script {
    /// Parses the script text format. Blank lines and `#` comments are
    /// skipped.
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut ops = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut fields = trimmed.split_whitespace();
            let op = fields.next().unwrap_or_default();
            let operands: Vec<&str> = fields.collect();
            let number = |field: &str| {
                field
                    .parse::<usize>()
                    .map_err(|source| ScriptError::BadNumber { line, source })
            };
            let parsed = match op {
                "a" | "r" => {
                    let [slot, size] = operands[..] else {
                        return Err(ScriptError::Malformed { line, expected: 2 });
                    };
                    let slot = number(slot)?;
                    let size = number(size)?;
                    if op == "a" {
                        ScriptOp::Alloc { slot, size }
                    } else {
                        ScriptOp::Resize { slot, size }
                    }
                }
                "f" => {
                    let [slot] = operands[..] else {
                        return Err(ScriptError::Malformed { line, expected: 1 });
                    };
                    ScriptOp::Free { slot: number(slot)? }
                }
                other => {
                    return Err(ScriptError::UnknownOp {
                        line,
                        op: other.to_string(),
                    });
                }
            };
            ops.push(parsed);
        }
        Ok(Self { ops })
    }

    /// Renders the script back into its text format.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for op in &self.ops {
            match op {
                ScriptOp::Alloc { slot, size } => out.push_str(&format!("a {slot} {size}\n")),
                ScriptOp::Resize { slot, size } => out.push_str(&format!("r {slot} {size}\n")),
                ScriptOp::Free { slot } => out.push_str(&format!("f {slot}\n")),
            }
        }
        out
    }

    /// Generates a deterministic pseudo-random trace of `ops` operations.
    ///
    /// The same `seed` always produces the same script. Allocation sizes
    /// span several size classes; roughly a third of operations free a live
    /// slot and a sixth resize one.
    pub fn generate(ops: usize, seed: u64) -> Self {
        fn lcg(state: &mut u64) -> u64 {
            *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            *state
        }

        const SLOTS: usize = 64;
        let mut state = seed;
        let mut live = [false; SLOTS];
        let mut out = Vec::with_capacity(ops);
        for _ in 0..ops {
            let r = lcg(&mut state);
            let slot = (r >> 32) as usize % SLOTS;
            let size = (((r >> 8) as usize) % 8192).max(1);
            let op = match r % 6 {
                0 | 1 if live[slot] => ScriptOp::Free { slot },
                2 if live[slot] => ScriptOp::Resize { slot, size },
                _ if !live[slot] => ScriptOp::Alloc { slot, size },
                _ => ScriptOp::Free { slot },
            };
            match op {
                ScriptOp::Alloc { slot, .. } => live[slot] = true,
                ScriptOp::Free { slot } => live[slot] = false,
                ScriptOp::Resize { .. } => {}
            }
            out.push(op);
        }
        Self { ops: out }
    }
}
