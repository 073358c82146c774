pub mod queue;

#[cfg(test)]
mod test;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_lite::future::FutureExt;
use pretty::{BoxAllocator, BoxDoc};
use slab::Slab;
use smol::{LocalExecutor, Task, Timer};

use crate::clause::{ClauseAction, ClauseEval, Fault};
use crate::resolve::{print, ClauseId, Plan};
use crate::value::{Env, Value};
use crate::{Error, ErrorKind};

use queue::{ExecItem, ExecQueue, Slots};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

// Why an execution unit died without reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownReason {
    pub clause: ClauseId,
    pub reason: String
}

impl fmt::Display for DownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clause #{} down: {}", self.clause, self.reason)
    }
}

// Terminal classification of one evaluation. Exactly one is produced;
// whichever failure lands first wins and everything else is aborted.
#[derive(Debug)]
pub enum Outcome {
    Success(Env),
    NoMatch(Value),
    Raised(Fault),
    TimedOut(Duration),
    Down(DownReason)
}

// In-flight task handles, so an abort can drop (cancel) every
// outstanding unit without waiting for acknowledgment
struct Inflight {
    tasks: RefCell<Slab<Task<()>>>,
    task_map: RefCell<HashMap<ClauseId, usize>>
}

impl Inflight {
    fn new() -> Self {
        Self {
            tasks: RefCell::new(Slab::new()),
            task_map: RefCell::new(HashMap::new())
        }
    }

    fn insert(&self, id: ClauseId, task: Task<()>) {
        let key = self.tasks.borrow_mut().insert(task);
        self.task_map.borrow_mut().insert(id, key);
    }

    // Late and duplicate reports land here after an abort; ignored
    fn remove(&self, id: ClauseId) {
        if let Some(key) = self.task_map.borrow_mut().remove(&id) {
            self.tasks.borrow_mut().try_remove(key);
        }
    }

    fn abort_all(&self) {
        self.task_map.borrow_mut().clear();
        // dropping a task cancels it
        self.tasks.borrow_mut().clear();
    }
}

pub struct Machine {
    timeout: Duration
}

impl Machine {
    pub fn new() -> Self {
        Self { timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // Drives one plan to an Outcome. Err is reserved for clause
    // contract violations; every expected failure mode is an Outcome.
    pub async fn run(&self, plan: &Plan) -> Result<Outcome, Error> {
        if plan.is_empty() {
            return Ok(Outcome::Success(Env::new()));
        }

        let queue = ExecQueue::new();
        let slots = Slots::new(plan.slot_count());
        let inflight = Inflight::new();

        {
            let plan_doc: BoxDoc<'_, ()> = print::pretty_plan(plan, &BoxAllocator).into_doc();
            log::trace!(target: "exec", "evaluating:\n{}", plan_doc.pretty(80));
        }

        for id in plan.roots() {
            queue.push(*id);
        }

        // the executor has to drop before the queue and the slot table
        let ex = LocalExecutor::new();
        let res = ex.run(self.drive(plan, &ex, &queue, &slots, &inflight))
            .or(async {
                Timer::after(self.timeout).await;
                log::debug!(target: "exec", "deadline of {:?} elapsed", self.timeout);
                Ok(Outcome::TimedOut(self.timeout))
            })
            .await;
        // best-effort stop signal to everything still outstanding;
        // whatever they would have reported is discarded with the queue
        inflight.abort_all();
        res
    }

    async fn drive<'t>(&self, plan: &Plan, ex: &LocalExecutor<'t>, queue: &'t ExecQueue,
                       slots: &Slots, inflight: &Inflight) -> Result<Outcome, Error> {
        let mut completed = 0;
        loop {
            match queue.next().await {
                ExecItem::Launch(id) => {
                    let clause = plan.clause(id);
                    let env = slots.env_for(clause)?;
                    log::trace!(target: "exec", "launching clause #{}", id);
                    let fut = clause.compute().call(env);
                    let task = ex.spawn(async move {
                        match AssertUnwindSafe(fut).catch_unwind().await {
                            Ok(eval) => queue.notify_done(id, eval),
                            Err(payload) => queue.notify_down(id, panic_message(payload))
                        }
                    });
                    inflight.insert(id, task);
                },
                ExecItem::Done(id, eval) => {
                    inflight.remove(id);
                    let clause = plan.clause(id);
                    match eval {
                        ClauseEval::Matched(vars) => {
                            log::trace!(target: "exec", "clause #{} matched", id);
                            slots.bind(clause, vars)?;
                            queue.complete(clause.dest(), plan);
                            completed += 1;
                            if completed == plan.len() {
                                return Ok(Outcome::Success(slots.exports(plan)?));
                            }
                        },
                        ClauseEval::NotMatched(value) => {
                            if clause.action() == ClauseAction::PlainAssign {
                                return Err(Error::new_const(ErrorKind::BadEval,
                                    "plain assignment reported a match failure"));
                            }
                            log::debug!(target: "exec", "clause #{} did not match: {}", id, value);
                            return Ok(Outcome::NoMatch(value));
                        },
                        ClauseEval::Raised(fault) => {
                            log::debug!(target: "exec", "clause #{} raised: {}", id, fault);
                            return Ok(Outcome::Raised(fault));
                        }
                    }
                },
                ExecItem::Down(id, reason) => {
                    log::debug!(target: "exec", "clause #{} went down: {}", id, reason);
                    return Ok(Outcome::Down(DownReason { clause: id, reason }));
                }
            }
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
