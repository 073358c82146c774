use std::cell::RefCell;
use std::collections::HashMap;

use deadqueue::unlimited::Queue;

use crate::clause::ClauseEval;
use crate::resolve::{Clause, ClauseId, DepCount, Dest, Plan};
use crate::value::{Env, Value};
use crate::{Error, ErrorKind};

pub enum ExecItem {
    Launch(ClauseId),
    Done(ClauseId, ClauseEval),
    // the unit died without reporting a result
    Down(ClauseId, String)
}

// An ExecQueue manages the execution of one evaluation by tracking
// dependencies. It is shared between the coordinating loop and every
// in-flight clause unit.
pub struct ExecQueue {
    // clauses that are ready to launch, plus completion reports
    queue: Queue<ExecItem>,
    // map from clause to number of dependencies left to be satisfied
    waiting: RefCell<HashMap<ClauseId, DepCount>>
}

impl ExecQueue {
    pub fn new() -> Self {
        Self {
            queue: Queue::new(),
            waiting: RefCell::new(HashMap::new())
        }
    }

    pub fn push(&self, id: ClauseId) {
        self.queue.push(ExecItem::Launch(id))
    }

    pub async fn next(&self) -> ExecItem {
        self.queue.pop().await
    }

    pub fn notify_done(&self, id: ClauseId, eval: ClauseEval) {
        self.queue.push(ExecItem::Done(id, eval))
    }

    pub fn notify_down(&self, id: ClauseId, reason: String) {
        self.queue.push(ExecItem::Down(id, reason))
    }

    // Completes a clause, notifying each dependent that one of its
    // dependencies has landed
    pub fn complete(&self, dest: &Dest, plan: &Plan) {
        for user in &dest.uses {
            self.dep_complete_for(*user, plan);
        }
    }

    // Releases the clause into the queue once its count reaches zero.
    // The first notification reads the full dependency count off the
    // plan; there is no count to maintain for clauses nothing has
    // completed toward yet.
    fn dep_complete_for(&self, id: ClauseId, plan: &Plan) {
        let mut waiting = self.waiting.borrow_mut();
        match waiting.get_mut(&id) {
            Some(left) => {
                *left = *left - 1;
                log::trace!(target: "exec", "{} requirements left for #{}", *left, id);
                if *left == 0 {
                    waiting.remove(&id);
                    self.queue.push(ExecItem::Launch(id));
                }
            },
            None => {
                let deps = plan.clause(id).num_deps();
                log::trace!(target: "exec", "populating {} requirements for #{}", deps, id);
                if deps > 1 {
                    waiting.insert(id, deps - 1);
                } else {
                    self.queue.push(ExecItem::Launch(id));
                }
            }
        }
    }
}

// The bindings table. Append-only, each slot written exactly once, and
// only ever by the coordinating loop; units get cloned snapshots.
pub struct Slots {
    values: RefCell<Vec<Option<Value>>>
}

impl Slots {
    pub fn new(count: usize) -> Self {
        Self { values: RefCell::new(vec![None; count]) }
    }

    // Merges a Matched report into the table. Names the compute bound
    // beyond the declared slots are working bindings local to the
    // clause (guard temporaries) and are dropped here.
    pub fn bind(&self, clause: &Clause, mut vars: Env) -> Result<(), Error> {
        let mut values = self.values.borrow_mut();
        for def in &clause.dest().slots {
            let value = vars.remove(&def.name).ok_or_else(|| Error::with_kind(
                ErrorKind::BadBinding,
                format!("clause #{} did not bind {}", clause.id(), def.name)))?;
            let slot = &mut values[def.slot as usize];
            if slot.is_some() {
                return Err(Error::new_const(ErrorKind::BadBinding, "slot bound twice"));
            }
            *slot = Some(value);
        }
        Ok(())
    }

    // Snapshot of a clause's dependencies, taken at launch time
    pub fn env_for(&self, clause: &Clause) -> Result<Env, Error> {
        let values = self.values.borrow();
        let mut env = Env::new();
        for dep in clause.deps() {
            let value = values[dep.slot as usize].clone().ok_or(Error::new_const(
                ErrorKind::Internal, "dependency slot not bound at launch"))?;
            env.insert(dep.name.clone(), value);
        }
        Ok(env)
    }

    // Projects the final version of every surviving name; internal
    // versions never leave the table
    pub fn exports(&self, plan: &Plan) -> Result<Env, Error> {
        let values = self.values.borrow();
        let mut env = Env::new();
        for (name, slot) in plan.exports() {
            let value = values[*slot as usize].clone().ok_or(Error::new_const(
                ErrorKind::Internal, "exported slot not bound"))?;
            env.insert(name.clone(), value);
        }
        Ok(env)
    }
}
