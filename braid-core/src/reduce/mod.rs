
use std::fmt;
use std::time::Duration;

use crate::clause::Fault;
use crate::exec::{DownReason, Outcome};
use crate::value::{match_value, Env, Pattern, Value};
use crate::Error;

// One fallback-handler arm: pattern over the failure value, optional
// guard over the pattern's captures, body producing the final value
pub struct Arm {
    pattern: Pattern,
    guard: Option<Box<dyn Fn(&Env) -> bool>>,
    body: Box<dyn Fn(&Env) -> Value>
}

impl Arm {
    pub fn new<B>(pattern: Pattern, body: B) -> Arm
            where B: Fn(&Env) -> Value + 'static {
        Arm { pattern, guard: None, body: Box::new(body) }
    }

    pub fn guarded<G, B>(pattern: Pattern, guard: G, body: B) -> Arm
            where G: Fn(&Env) -> bool + 'static,
                  B: Fn(&Env) -> Value + 'static {
        Arm { pattern, guard: Some(Box::new(guard)), body: Box::new(body) }
    }

    fn try_eval(&self, value: &Value) -> Option<Value> {
        let env = match_value(&self.pattern, value)?;
        if let Some(guard) = &self.guard {
            if !guard(&env) {
                return None;
            }
        }
        Some((self.body)(&env))
    }
}

impl fmt::Debug for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arm")
            .field("pattern", &self.pattern)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

// The user-visible failure taxonomy. Exactly one per evaluation.
#[derive(Debug)]
pub enum EvalError {
    // a fault re-raised with its original payload
    Raised(Fault),
    // fallback arms were supplied and none matched the failure value
    Clause(Value),
    TimedOut(Duration),
    Down(DownReason),
    Internal(Error)
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use EvalError::*;
        match self {
            Raised(fault) => write!(f, "raised: {}", fault),
            Clause(value) => write!(f, "no fallback clause matched: {}", value),
            TimedOut(d) => write!(f, "evaluation timed out after {:?}", d),
            Down(reason) => write!(f, "{}", reason),
            Internal(e) => write!(f, "internal error: {:?}", e)
        }
    }
}

impl std::error::Error for EvalError {}

impl From<Error> for EvalError {
    fn from(e: Error) -> Self {
        EvalError::Internal(e)
    }
}

// The shape a timeout exposes to fallback arms
pub fn timeout_reason(timeout: Duration) -> Value {
    Value::tuple([Value::atom("timeout"), Value::Int(timeout.as_millis() as i64)])
}

// Turns a scheduler outcome into the evaluation's final value.
//
// Without a fallback block a failing match value simply passes
// through. With one, the first matching arm wins; a NoMatch value no
// arm covers is the distinct clause error. Faults and timeouts may be
// caught by an arm matching their shape, but fall through with their
// identity intact; a dead unit is always fatal.
pub fn reduce<B>(outcome: Outcome, body: B, arms: Option<&[Arm]>) -> Result<Value, EvalError>
        where B: FnOnce(&Env) -> Value {
    match outcome {
        Outcome::Success(env) => Ok(body(&env)),
        Outcome::NoMatch(value) => match arms {
            None => Ok(value),
            Some(arms) => match first_match(arms, &value) {
                Some(result) => Ok(result),
                None => Err(EvalError::Clause(value))
            }
        },
        Outcome::Raised(fault) => {
            if let Some(arms) = arms {
                if let Some(result) = first_match(arms, fault.value()) {
                    return Ok(result);
                }
            }
            Err(EvalError::Raised(fault))
        },
        Outcome::TimedOut(timeout) => {
            if let Some(arms) = arms {
                if let Some(result) = first_match(arms, &timeout_reason(timeout)) {
                    return Ok(result);
                }
            }
            Err(EvalError::TimedOut(timeout))
        },
        Outcome::Down(reason) => Err(EvalError::Down(reason))
    }
}

fn first_match(arms: &[Arm], value: &Value) -> Option<Value> {
    arms.iter().find_map(|arm| arm.try_eval(value))
}
