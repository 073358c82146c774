use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures_lite::future::BoxedLocal;

use crate::value::{Env, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseAction {
    // right-hand value must match the clause pattern; a mismatch is a
    // recoverable condition routed to the reducer
    MatchOrFail,
    // irrefutable binding (or a bare expression); can raise, never no-match
    PlainAssign
}

// Payload of a raise. Carried through the pipeline untouched so the
// caller sees the original fault, not a wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault(Value);

impl Fault {
    pub fn new(value: Value) -> Fault {
        Fault(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// What one compute unit reports back. Expected no-match outcomes are
// data, not raises; Raised is reserved for actual faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseEval {
    Matched(Env),
    NotMatched(Value),
    Raised(Fault)
}

pub trait Compute {
    fn call(&self, env: Env) -> BoxedLocal<ClauseEval>;
}

impl<F> Compute for F
        where F: Fn(Env) -> BoxedLocal<ClauseEval> {
    fn call(&self, env: Env) -> BoxedLocal<ClauseEval> {
        (self)(env)
    }
}

// Wraps a synchronous closure as a compute unit. The closure runs
// inside the unit's own task, not on the coordinating loop, so a
// panicking compute is a dead unit rather than a dead evaluation.
pub fn compute<F>(f: F) -> Rc<dyn Compute>
        where F: Fn(Env) -> ClauseEval + Clone + 'static {
    struct Sync<F>(F);
    impl<F> Compute for Sync<F>
            where F: Fn(Env) -> ClauseEval + Clone + 'static {
        fn call(&self, env: Env) -> BoxedLocal<ClauseEval> {
            let f = self.0.clone();
            Box::pin(async move { f(env) })
        }
    }
    Rc::new(Sync(f))
}

pub fn compute_async<F, Fut>(f: F) -> Rc<dyn Compute>
        where F: Fn(Env) -> Fut + 'static,
              Fut: Future<Output=ClauseEval> + 'static {
    struct Async<F>(F);
    impl<F, Fut> Compute for Async<F>
            where F: Fn(Env) -> Fut,
                  Fut: Future<Output=ClauseEval> + 'static {
        fn call(&self, env: Env) -> BoxedLocal<ClauseEval> {
            Box::pin((self.0)(env))
        }
    }
    Rc::new(Async(f))
}

// One clause as supplied by the caller: the syntax-level transform has
// already extracted which names the right-hand side reads and which the
// pattern binds. Names used but never defined by an earlier clause are
// free variables of the enclosing scope; the compute closes over those
// itself and the resolver prunes them.
#[derive(Clone)]
pub struct ClauseDesc {
    pub action: ClauseAction,
    pub uses: HashSet<String>,
    pub defines: HashSet<String>,
    pub compute: Rc<dyn Compute>
}

impl ClauseDesc {
    pub fn match_or_fail(uses: &[&str], defines: &[&str], compute: Rc<dyn Compute>) -> ClauseDesc {
        ClauseDesc {
            action: ClauseAction::MatchOrFail,
            uses: names(uses),
            defines: names(defines),
            compute
        }
    }

    pub fn assign(uses: &[&str], defines: &[&str], compute: Rc<dyn Compute>) -> ClauseDesc {
        ClauseDesc {
            action: ClauseAction::PlainAssign,
            uses: names(uses),
            defines: names(defines),
            compute
        }
    }
}

impl fmt::Debug for ClauseDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClauseDesc")
            .field("action", &self.action)
            .field("uses", &self.uses)
            .field("defines", &self.defines)
            .finish()
    }
}

fn names(ss: &[&str]) -> HashSet<String> {
    ss.iter().map(|s| s.to_string()).collect()
}
