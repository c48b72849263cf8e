//! Execution of recovered plans
//!
//! Both paths run a straight-line program: an instruction pointer walks the
//! plan once, each step mutating the working sequence in place. There is no
//! branching; `CipherDispatch` steps are rejected rather than guessed at.

use crate::error::CipherError;
use crate::js::classify::CanonicalOperation;
use crate::js::patterns::{PatternSet, ScriptPatterns};
use crate::platform::plan::{
    OperandToken, ThrottlingProgram, ThrottlingStep, TransformMap, TransformPlan,
    INPUT_PLACEHOLDER,
};
use crate::Result;
use std::fmt;
use tracing::trace;

/// Arena slot holding the operand array
const OPERANDS: usize = 0;
/// Arena slot holding the caller's input sequence
const INPUT: usize = 1;

/// Runtime value of a throttling operand.
///
/// Sequences are referenced by arena slot, so the operand array can hold a
/// handle to itself without owning a copy.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Integer(i64),
    Text(String),
    Operation(CanonicalOperation),
    Sequence(usize),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Operation(op) => write!(f, "<{}>", op),
            Value::Sequence(OPERANDS) => f.write_str("<operand array>"),
            Value::Sequence(_) => f.write_str("<input>"),
        }
    }
}

/// Executes signature and throttling plans
#[derive(Debug, Clone)]
pub struct Interpreter {
    transform_call: PatternSet,
}

impl Interpreter {
    /// Create a new interpreter
    pub fn new() -> Result<Self> {
        Ok(Self {
            transform_call: ScriptPatterns::transform_calls()?,
        })
    }

    /// Apply every statement of `plan` to the characters of `ciphered`
    pub fn decipher_signature(
        &self,
        ciphered: &str,
        plan: &TransformPlan,
        map: &TransformMap,
    ) -> Result<String> {
        let mut working: Vec<char> = ciphered.chars().collect();

        for statement in &plan.statements {
            let (name, arg) = self.parse_call(statement)?;
            let op = map
                .get(name)
                .copied()
                .ok_or_else(|| CipherError::UnknownOperation(name.to_string()))?;

            match op {
                CanonicalOperation::Reverse => working.reverse(),
                CanonicalOperation::Splice => {
                    let count = arg.min(working.len());
                    working.drain(..count);
                }
                CanonicalOperation::Swap => {
                    if working.is_empty() {
                        return Err(CipherError::InvalidOperand(format!(
                            "{} on empty signature",
                            op
                        )));
                    }
                    let index = arg % working.len();
                    working.swap(0, index);
                }
                other => {
                    return Err(CipherError::Unsupported(format!(
                        "{} in signature transform {}",
                        other, name
                    )))
                }
            }
            trace!("Applied {}({}) -> {} chars", op, arg, working.len());
        }

        Ok(working.into_iter().collect())
    }

    /// Split a statement such as `DE.kT(a,31)` into its transform name and argument
    fn parse_call<'a>(&self, statement: &'a str) -> Result<(&'a str, usize)> {
        let caps = self
            .transform_call
            .first_captures(statement)
            .map_err(|_| CipherError::UnknownOperation(statement.to_string()))?;
        let name = caps
            .name("name")
            .map(|m| m.as_str())
            .ok_or_else(|| CipherError::UnknownOperation(statement.to_string()))?;
        let arg = match caps.name("arg") {
            Some(m) => m.as_str().parse::<usize>().map_err(|e| {
                CipherError::InvalidOperand(format!("{} in {}", e, statement))
            })?,
            None => 0,
        };
        Ok((name, arg))
    }

    /// Run a throttling program over the characters of `input`
    pub fn decipher_throttling(&self, input: &str, program: &ThrottlingProgram) -> Result<String> {
        let operands: Vec<Value> = program
            .operands
            .iter()
            .map(|token| match token {
                OperandToken::Integer(v) => Value::Integer(*v),
                OperandToken::Text(s) if s == INPUT_PLACEHOLDER => Value::Sequence(INPUT),
                OperandToken::Text(s) => Value::Text(s.clone()),
                OperandToken::Operation(op) => Value::Operation(*op),
                OperandToken::SelfArray => Value::Sequence(OPERANDS),
            })
            .collect();
        let working: Vec<Value> = input.chars().map(|c| Value::Text(c.to_string())).collect();
        let mut arena = vec![operands, working];

        for (pc, step) in program.plan.iter().enumerate() {
            execute_step(&mut arena, step)?;
            trace!("Step {} {:?} -> {} tokens", pc, step, arena[INPUT].len());
        }

        join(&arena[INPUT])
    }
}

fn operand(arena: &[Vec<Value>], index: usize) -> Result<Value> {
    arena[OPERANDS].get(index).cloned().ok_or_else(|| {
        CipherError::InvalidOperand(format!(
            "operand index {} out of range ({} operands)",
            index,
            arena[OPERANDS].len()
        ))
    })
}

fn execute_step(arena: &mut [Vec<Value>], step: &ThrottlingStep) -> Result<()> {
    let op = match operand(arena, step.operation)? {
        Value::Operation(op) => op,
        other => {
            return Err(CipherError::NotCallable {
                index: step.operation,
                value: other.to_string(),
            })
        }
    };
    let target = match operand(arena, step.first)? {
        Value::Sequence(id) => id,
        other => {
            return Err(CipherError::InvalidOperand(format!(
                "{} target {} is not a sequence",
                op, other
            )))
        }
    };
    let arg = step.second.map(|i| operand(arena, i)).transpose()?;

    let sequence = &mut arena[target];
    match op {
        CanonicalOperation::Reverse => sequence.reverse(),
        CanonicalOperation::Push => sequence.push(required(op, arg)?),
        CanonicalOperation::Unshift | CanonicalOperation::Prepend => {
            let n = normalized_index(op, sequence.len(), arg)?;
            sequence.rotate_right(n);
        }
        CanonicalOperation::Swap => {
            let n = normalized_index(op, sequence.len(), arg)?;
            sequence.swap(0, n);
        }
        CanonicalOperation::NestedSplice => {
            let n = normalized_index(op, sequence.len(), arg)?;
            let first = sequence[0].clone();
            let moved = std::mem::replace(&mut sequence[n], first);
            sequence[0] = moved;
        }
        CanonicalOperation::Splice => {
            let n = normalized_index(op, sequence.len(), arg)?;
            sequence.remove(n);
        }
        CanonicalOperation::CipherDispatch => {
            return Err(CipherError::Unsupported(
                "switch-based cipher dispatch in throttling plan".to_string(),
            ))
        }
    }

    Ok(())
}

fn required(op: CanonicalOperation, arg: Option<Value>) -> Result<Value> {
    arg.ok_or_else(|| CipherError::InvalidOperand(format!("{} needs a second argument", op)))
}

/// `((e % len) + len) % len`, the index normalisation used by the throttling operations
fn normalized_index(op: CanonicalOperation, len: usize, arg: Option<Value>) -> Result<usize> {
    let e = match required(op, arg)? {
        Value::Integer(e) => e,
        other => {
            return Err(CipherError::InvalidOperand(format!(
                "{} expects an integer, got {}",
                op, other
            )))
        }
    };
    if len == 0 {
        return Err(CipherError::InvalidOperand(format!(
            "{} on empty sequence",
            op
        )));
    }
    let len = len as i64;
    Ok(e.rem_euclid(len) as usize)
}

fn join(sequence: &[Value]) -> Result<String> {
    let mut out = String::with_capacity(sequence.len());
    for value in sequence {
        match value {
            Value::Text(s) => out.push_str(s),
            Value::Integer(v) => out.push_str(&v.to_string()),
            other => {
                return Err(CipherError::Unsupported(format!(
                    "cannot join {} into throttling result",
                    other
                )))
            }
        }
    }
    Ok(out)
}
