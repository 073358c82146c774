pub mod print;


use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::clause::{ClauseAction, ClauseDesc, Compute};

pub type ClauseId = u32;
pub type SlotId = u32;
pub type DepCount = u32;

// A dependency edge: the slot to read and the name the compute expects
// to find it under in its env snapshot.
#[derive(Debug, Clone)]
pub struct SlotUse {
    pub slot: SlotId,
    pub name: String
}

#[derive(Debug, Clone)]
pub struct SlotDef {
    pub slot: SlotId,
    pub name: String
}

// Where a clause's results go: the slots it fills and the later clauses
// waiting on them, one entry per edge.
#[derive(Debug, Clone)]
pub struct Dest {
    pub slots: Vec<SlotDef>,
    pub uses: Vec<ClauseId>
}

pub struct Clause {
    id: ClauseId,
    action: ClauseAction,
    deps: Vec<SlotUse>,
    dest: Dest,
    compute: Rc<dyn Compute>
}

impl Clause {
    pub fn id(&self) -> ClauseId {
        self.id
    }

    pub fn action(&self) -> ClauseAction {
        self.action
    }

    pub fn deps(&self) -> &[SlotUse] {
        &self.deps
    }

    pub fn dest(&self) -> &Dest {
        &self.dest
    }

    pub fn compute(&self) -> &Rc<dyn Compute> {
        &self.compute
    }

    pub fn num_deps(&self) -> DepCount {
        self.deps.len() as DepCount
    }
}

impl fmt::Debug for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clause")
            .field("id", &self.id)
            .field("action", &self.action)
            .field("deps", &self.deps)
            .field("dest", &self.dest)
            .finish()
    }
}

// The resolved, immutable input to the scheduler. Slot numbering is
// dense and every definition gets a fresh slot, so produces-sets are
// disjoint even under rebinding. exports maps each surviving source
// name to its last version's slot; earlier versions stay internal.
#[derive(Debug)]
pub struct Plan {
    clauses: Vec<Clause>,
    slot_count: usize,
    roots: Vec<ClauseId>,
    exports: Vec<(String, SlotId)>
}

impl Plan {
    pub fn clause(&self, id: ClauseId) -> &Clause {
        &self.clauses[id as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item=&Clause> {
        self.clauses.iter()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn roots(&self) -> &[ClauseId] {
        &self.roots
    }

    pub fn exports(&self) -> &[(String, SlotId)] {
        &self.exports
    }
}

// Single in-order pass. Dependency edges can only point from an earlier
// clause to a later one, so declaration order is already a topological
// order and acyclicity needs no checking.
pub fn resolve(descs: &[ClauseDesc]) -> Plan {
    let mut current: HashMap<String, (SlotId, ClauseId)> = HashMap::new();
    let mut clauses: Vec<Clause> = Vec::with_capacity(descs.len());
    let mut edges: Vec<(ClauseId, ClauseId)> = Vec::new();
    let mut next_slot: SlotId = 0;

    for (i, desc) in descs.iter().enumerate() {
        let id = i as ClauseId;

        // sorted iteration keeps slot numbering and edge order stable
        // across runs of the same clause list
        let mut used: Vec<&String> = desc.uses.iter().collect();
        used.sort();
        let mut deps = Vec::new();
        for name in used {
            match current.get(name) {
                Some(&(slot, producer)) => {
                    deps.push(SlotUse { slot, name: name.clone() });
                    edges.push((producer, id));
                },
                // no earlier definer: a free variable of the enclosing
                // scope, resolved by the compute's own closure
                None => log::trace!(target: "resolve",
                    "clause #{}: pruning external {}", id, name)
            }
        }

        let mut defined: Vec<&String> = desc.defines.iter().collect();
        defined.sort();
        let mut slots = Vec::new();
        for name in defined {
            let slot = next_slot;
            next_slot += 1;
            // rebinding shadows the previous version from here on; a
            // clause that uses a name it also defines reads the old one
            current.insert(name.clone(), (slot, id));
            slots.push(SlotDef { slot, name: name.clone() });
        }

        clauses.push(Clause {
            id,
            action: desc.action,
            deps,
            dest: Dest { slots, uses: Vec::new() },
            compute: desc.compute.clone()
        });
    }

    for (producer, user) in edges {
        clauses[producer as usize].dest.uses.push(user);
    }

    let roots = clauses.iter()
        .filter(|c| c.deps.is_empty())
        .map(|c| c.id)
        .collect();
    let mut exports: Vec<(String, SlotId)> = current.into_iter()
        .map(|(name, (slot, _))| (name, slot))
        .collect();
    exports.sort();

    Plan { clauses, slot_count: next_slot as usize, roots, exports }
}
