pub mod util;
pub mod value;
pub mod clause;
pub mod resolve;
pub mod exec;
pub mod reduce;

pub use util::error::{Error, ErrorKind};
pub use value::{match_value, Env, Pattern, Value};
pub use clause::{compute, compute_async, ClauseAction, ClauseDesc, ClauseEval, Compute, Fault};
pub use resolve::{resolve, Plan};
pub use exec::{Machine, Outcome, DEFAULT_TIMEOUT};
pub use reduce::{reduce, timeout_reason, Arm, EvalError};

use std::time::Duration;

// One evaluation of the construct: resolve the clause list, drive it
// concurrently, reduce the outcome against the continuation and the
// optional fallback block.
pub struct Braid {
    clauses: Vec<ClauseDesc>,
    arms: Option<Vec<Arm>>,
    timeout: Duration
}

impl Braid {
    pub fn new(clauses: Vec<ClauseDesc>) -> Braid {
        Braid { clauses, arms: None, timeout: DEFAULT_TIMEOUT }
    }

    pub fn arms(mut self, arms: Vec<Arm>) -> Braid {
        self.arms = Some(arms);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Braid {
        self.timeout = timeout;
        self
    }

    pub async fn run_async<B>(&self, body: B) -> Result<Value, EvalError>
            where B: FnOnce(&Env) -> Value {
        let plan = resolve(&self.clauses);
        let outcome = Machine::with_timeout(self.timeout).run(&plan).await?;
        reduce(outcome, body, self.arms.as_deref())
    }

    pub fn run<B>(&self, body: B) -> Result<Value, EvalError>
            where B: FnOnce(&Env) -> Value {
        smol::block_on(self.run_async(body))
    }
}
