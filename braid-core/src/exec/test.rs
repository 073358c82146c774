use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use smol::Timer;

use super::{Machine, Outcome};
use crate::clause::{compute, compute_async, ClauseDesc, ClauseEval};
use crate::resolve::resolve;
use crate::value::{Env, Value};
use crate::ErrorKind;

fn bound(name: &str, value: Value) -> ClauseEval {
    ClauseEval::Matched(Env::from([(name.to_string(), value)]))
}

fn int(env: &Env, name: &str) -> i64 {
    match &env[name] {
        Value::Int(i) => *i,
        other => panic!("expected int for {}, got {}", name, other)
    }
}

// binds `name` to its own delay after sleeping for it
fn delayed(name: &'static str, ms: u64, deps: &[&str]) -> ClauseDesc {
    ClauseDesc::match_or_fail(deps, &[name], compute_async(move |_| async move {
        Timer::after(Duration::from_millis(ms)).await;
        bound(name, Value::Int(ms as i64))
    }))
}

fn run(clauses: &[ClauseDesc]) -> Outcome {
    let plan = resolve(clauses);
    smol::block_on(Machine::new().run(&plan)).unwrap()
}

fn success(outcome: Outcome) -> Env {
    match outcome {
        Outcome::Success(env) => env,
        other => panic!("expected success, got {:?}", other)
    }
}

#[test_log::test]
fn test_empty() {
    assert!(success(run(&[])).is_empty());
}

#[test_log::test]
fn test_dependent_values_flow() {
    let clauses = [
        ClauseDesc::match_or_fail(&[], &["a"], compute(|_| bound("a", Value::Int(4)))),
        ClauseDesc::match_or_fail(&["a"], &["b"],
            compute(|env| bound("b", Value::Int(int(&env, "a") + 1))))
    ];
    let env = success(run(&clauses));
    assert_eq!(env["a"], Value::Int(4));
    assert_eq!(env["b"], Value::Int(5));
}

// Wall-clock tracks the longest dependency chain, not the sum of all
// clause delays. The graph below has a 20+40+20 = 80ms critical path
// against a 180ms flat sum.
#[test_log::test]
fn test_critical_path_timing() {
    let clauses = [
        delayed("a", 20, &[]),
        delayed("b", 20, &["a"]),
        delayed("c", 40, &["a"]),
        delayed("d", 40, &["a"]),
        delayed("e", 20, &["b"]),
        delayed("f", 20, &["c", "d", "e"]),
        delayed("g", 20, &[])
    ];
    let start = Instant::now();
    let env = success(run(&clauses));
    let elapsed = start.elapsed();

    assert_eq!(env.len(), 7);
    assert!(elapsed >= Duration::from_millis(78), "finished early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(150), "no parallelism: {:?}", elapsed);
}

// A clause never launches before its dependencies land, so a failure
// upstream means downstream units are never spawned at all
#[test_log::test]
fn test_short_circuit_skips_dependents() {
    let launched = Rc::new(Cell::new(false));
    let seen = launched.clone();
    let clauses = [
        ClauseDesc::match_or_fail(&[], &["a"], compute(|_| bound("a", Value::Int(1)))),
        ClauseDesc::match_or_fail(&[], &["b"], compute(|_| bound("b", Value::Int(2)))),
        ClauseDesc::match_or_fail(&[], &["c"], compute_async(|_| async {
            Timer::after(Duration::from_millis(10)).await;
            ClauseEval::NotMatched(Value::atom("error"))
        })),
        ClauseDesc::match_or_fail(&["c"], &["d"], compute(move |_| {
            seen.set(true);
            bound("d", Value::Int(4))
        }))
    ];
    match run(&clauses) {
        Outcome::NoMatch(value) => assert_eq!(value, Value::atom("error")),
        other => panic!("expected no-match, got {:?}", other)
    }
    assert!(!launched.get());
}

// First failure wins; the slow sibling is cancelled mid-flight and its
// side effects never happen
#[test_log::test]
fn test_failure_cancels_outstanding() {
    let finished = Rc::new(Cell::new(false));
    let flag = finished.clone();
    let clauses = [
        ClauseDesc::match_or_fail(&[], &["slow"], compute_async(move |_| {
            let flag = flag.clone();
            async move {
                Timer::after(Duration::from_millis(300)).await;
                flag.set(true);
                bound("slow", Value::Int(1))
            }
        })),
        ClauseDesc::match_or_fail(&[], &["fast"], compute_async(|_| async {
            Timer::after(Duration::from_millis(10)).await;
            ClauseEval::NotMatched(Value::atom("nope"))
        }))
    ];
    let start = Instant::now();
    match run(&clauses) {
        Outcome::NoMatch(value) => assert_eq!(value, Value::atom("nope")),
        other => panic!("expected no-match, got {:?}", other)
    }
    assert!(start.elapsed() < Duration::from_millis(200));
    assert!(!finished.get());
}

#[test_log::test]
fn test_timeout() {
    let clauses = [
        delayed("a", 10, &[]),
        delayed("b", 500, &["a"])
    ];
    let plan = resolve(&clauses);
    let machine = Machine::with_timeout(Duration::from_millis(50));
    let start = Instant::now();
    match smol::block_on(machine.run(&plan)).unwrap() {
        Outcome::TimedOut(d) => assert_eq!(d, Duration::from_millis(50)),
        other => panic!("expected timeout, got {:?}", other)
    }
    assert!(start.elapsed() < Duration::from_millis(300));
}

#[test_log::test]
fn test_panicking_unit_goes_down() {
    let clauses = [
        ClauseDesc::match_or_fail(&[], &["a"], compute(|_| panic!("compute blew up")))
    ];
    match run(&clauses) {
        Outcome::Down(reason) => {
            assert_eq!(reason.clause, 0);
            assert!(reason.reason.contains("compute blew up"));
        },
        other => panic!("expected down, got {:?}", other)
    }
}

// Textual order of unrelated clauses does not affect the result
#[test_log::test]
fn test_order_independence() {
    let group = |swap: bool| {
        let x = ClauseDesc::match_or_fail(&[], &["x"],
            compute(|_| bound("x", Value::Int(1))));
        let y = ClauseDesc::match_or_fail(&["x"], &["y"],
            compute(|env| bound("y", Value::Int(int(&env, "x") * 2))));
        let z = delayed("z", 10, &[]);
        if swap { vec![z, x, y] } else { vec![x, y, z] }
    };
    assert_eq!(success(run(&group(false))), success(run(&group(true))));
}

// Rebinding: intermediate readers see the version in effect at their
// declaration point, and only the last version is exported under the
// original name. No internal versioned name leaks out.
#[test_log::test]
fn test_rebinding_exports_final_version() {
    let clauses = [
        ClauseDesc::match_or_fail(&[], &["a"], compute(|_| bound("a", Value::Int(1)))),
        ClauseDesc::match_or_fail(&["a"], &["b"],
            compute(|env| bound("b", Value::Int(int(&env, "a") + 1)))),
        ClauseDesc::match_or_fail(&["a"], &["a"],
            compute(|env| bound("a", Value::Int(int(&env, "a") * 10))))
    ];
    let env = success(run(&clauses));
    assert_eq!(env.len(), 2);
    assert_eq!(env["a"], Value::Int(10));
    assert_eq!(env["b"], Value::Int(2));
}

#[test_log::test]
fn test_bare_expression_still_runs() {
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    let clauses = [
        ClauseDesc::assign(&[], &[], compute(move |_| {
            flag.set(true);
            ClauseEval::Matched(Env::new())
        }))
    ];
    assert!(success(run(&clauses)).is_empty());
    assert!(ran.get());
}

#[test_log::test]
fn test_plain_assign_cannot_fail_to_match() {
    let clauses = [
        ClauseDesc::assign(&[], &["a"], compute(|_| ClauseEval::NotMatched(Value::Unit)))
    ];
    let plan = resolve(&clauses);
    let err = smol::block_on(Machine::new().run(&plan)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadEval);
}

#[test_log::test]
fn test_missing_declared_binding_is_an_error() {
    let clauses = [
        ClauseDesc::match_or_fail(&[], &["a"], compute(|_| ClauseEval::Matched(Env::new())))
    ];
    let plan = resolve(&clauses);
    let err = smol::block_on(Machine::new().run(&plan)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadBinding);
}
