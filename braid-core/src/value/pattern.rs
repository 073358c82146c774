use super::{Env, Value};

// Structural patterns for fallback-handler arms. Tag matches a tuple
// whose first element is the given atom, the usual {:error, reason}
// shape. Guards are not part of the pattern; they run over the
// captured bindings on the arm that owns them.
#[derive(Debug, Clone)]
pub enum Pattern {
    Wildcard,
    Bind(String),
    Literal(Value),
    Tuple(Vec<Pattern>),
    List(Vec<Pattern>),
    Tag(String, Vec<Pattern>)
}

impl Pattern {
    pub fn bind<S: Into<String>>(name: S) -> Pattern {
        Pattern::Bind(name.into())
    }

    pub fn atom<S: Into<String>>(name: S) -> Pattern {
        Pattern::Literal(Value::atom(name))
    }

    pub fn tag<S: Into<String>, I: IntoIterator<Item=Pattern>>(name: S, args: I) -> Pattern {
        Pattern::Tag(name.into(), args.into_iter().collect())
    }
}

// Returns the captured bindings on a match, None otherwise.
pub fn match_value(pattern: &Pattern, value: &Value) -> Option<Env> {
    let mut env = Env::new();
    if match_into(pattern, value, &mut env) {
        Some(env)
    } else {
        None
    }
}

fn match_into(pattern: &Pattern, value: &Value, env: &mut Env) -> bool {
    use Pattern::*;
    match pattern {
        Wildcard => true,
        Bind(name) => {
            env.insert(name.clone(), value.clone());
            true
        },
        Literal(l) => l == value,
        Tuple(patterns) => match value {
            Value::Tuple(items) => match_all(patterns, items, env),
            _ => false
        },
        List(patterns) => match value {
            Value::List(items) => match_all(patterns, items, env),
            _ => false
        },
        Tag(tag, patterns) => match value {
            Value::Tuple(items) => {
                match items.split_first() {
                    Some((Value::Atom(head), rest)) =>
                        head == tag && match_all(patterns, rest, env),
                    _ => false
                }
            },
            _ => false
        }
    }
}

fn match_all(patterns: &[Pattern], items: &[Value], env: &mut Env) -> bool {
    patterns.len() == items.len() &&
        patterns.iter().zip(items).all(|(p, v)| match_into(p, v, env))
}
