pub mod pattern;


pub use pattern::{match_value, Pattern};

use ordered_float::OrderedFloat;
use std::collections::HashMap;
use std::fmt;

// One evaluation's view of some bound names. Always passed by value:
// clause units receive a snapshot of their dependencies at launch time
// and never observe later writes.
pub type Env = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Atom(String),
    String(String),
    Tuple(Vec<Value>),
    List(Vec<Value>)
}

impl Value {
    pub fn atom<S: Into<String>>(s: S) -> Value {
        Value::Atom(s.into())
    }

    pub fn string<S: Into<String>>(s: S) -> Value {
        Value::String(s.into())
    }

    pub fn float(f: f64) -> Value {
        Value::Float(OrderedFloat(f))
    }

    pub fn tuple<I: IntoIterator<Item=Value>>(items: I) -> Value {
        Value::Tuple(items.into_iter().collect())
    }

    pub fn list<I: IntoIterator<Item=Value>>(items: I) -> Value {
        Value::List(items.into_iter().collect())
    }

    // the conventional tagged-tuple shapes
    pub fn ok(v: Value) -> Value {
        Value::tuple([Value::atom("ok"), v])
    }

    pub fn error(v: Value) -> Value {
        Value::tuple([Value::atom("error"), v])
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Value::*;
        match self {
            Unit => write!(f, "()"),
            Bool(b) => write!(f, "{}", b),
            Int(i) => write!(f, "{}", i),
            Float(x) => write!(f, "{}", x),
            Atom(a) => write!(f, ":{}", a),
            String(s) => write!(f, "\"{}\"", s),
            Tuple(items) => write_seq(f, "{", items, "}"),
            List(items) => write_seq(f, "[", items, "]")
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 { write!(f, ", ")? }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}
