use pretty::{DocAllocator, DocBuilder};

use super::{Clause, Plan};

pub fn pretty_plan<'a, D, A>(plan: &Plan, a: &'a D) -> DocBuilder<'a, D, A>
        where A: 'a, D: ?Sized + DocAllocator<'a, A> {
    let clauses = plan.iter().map(
        |c| pretty_clause(c, a).append(a.line_())
    );
    let roots = plan.roots().iter().map(
        |r| a.text(format!("#{}", r))
    );
    let exports = plan.exports().iter().map(
        |(name, slot)| a.text(format!("{}=${}", name, slot))
    );
    a.text("Plan {").append(a.line_())
     .append(a.intersperse(clauses, ""))
     .append("roots: ").append(a.intersperse(roots, ", ")).append(a.line_())
     .append("exports: ").append(a.intersperse(exports, ", ")).append(a.line_())
     .append("}")
}

fn pretty_clause<'a, D, A>(clause: &Clause, a: &'a D) -> DocBuilder<'a, D, A>
        where A: 'a, D: ?Sized + DocAllocator<'a, A> {
    let deps = clause.deps().iter().map(
        |d| a.text(format!("{}=${}", d.name, d.slot))
    );
    let slots = clause.dest().slots.iter().map(
        |s| a.text(format!("{}=${}", s.name, s.slot))
    );
    let uses = clause.dest().uses.iter().map(
        |u| a.text(format!("#{}", u))
    );
    a.text(format!("#{}: {:?}(", clause.id(), clause.action()))
     .append(a.intersperse(deps, ", "))
     .append(") -> (")
     .append(a.intersperse(slots, ", "))
     .append(") used by ")
     .append(a.intersperse(uses, ", "))
}
