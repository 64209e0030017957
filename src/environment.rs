//! Typed global variables (`p_environment.json`, §6) plus the
//! `$var`-substitution the event handler applies when it re-evaluates a
//! trigger's `raw_arg_json` at firing time (§3: "arguments are re-parsed and
//! expression-evaluated each time the trigger fires").

use std::collections::HashMap;

use serde_json::Value;

use crate::random::Random;
use crate::tstamp::Tstamp;

#[derive(Debug, Clone, PartialEq)]
pub enum EnvValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Tstamp(Tstamp),
}

impl EnvValue {
    pub fn to_json(&self) -> Value {
        match self {
            EnvValue::Bool(b) => Value::Bool(*b),
            EnvValue::Int(i) => Value::from(*i),
            EnvValue::Float(f) => Value::from(*f),
            EnvValue::Tstamp(t) => Value::from(vec![t.beats, t.rem as i64]),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Environment {
    vars: HashMap<String, EnvValue>,
}

impl Environment {
    pub fn new() -> Self {
        Environment { vars: HashMap::new() }
    }

    pub fn set(&mut self, name: &str, value: EnvValue) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&EnvValue> {
        self.vars.get(name)
    }

    /// Walks a parsed argument value and replaces any `{"$var": name}`
    /// marker with the current value of that global, and any
    /// `{"$random": [lo, hi]}` marker with a draw from `rng`. Applied right
    /// before a trigger fires, matching the "re-evaluated each firing"
    /// requirement rather than at load time.
    pub fn evaluate(&self, arg: &Value, rng: &mut Random) -> Value {
        match arg {
            Value::Object(map) if map.len() == 1 => {
                if let Some(Value::String(name)) = map.get("$var") {
                    return self.get(name).map(EnvValue::to_json).unwrap_or(Value::Null);
                }
                if let Some(Value::Array(bounds)) = map.get("$random") {
                    if let [Value::Number(lo), Value::Number(hi)] = bounds.as_slice() {
                        let lo = lo.as_f64().unwrap_or(0.0);
                        let hi = hi.as_f64().unwrap_or(1.0);
                        return Value::from(rng.next_range(lo, hi));
                    }
                }
                Value::Object(map.clone())
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.evaluate(v, rng)).collect())
            }
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_named_variable() {
        let mut env = Environment::new();
        env.set("cutoff", EnvValue::Float(1200.0));
        let mut rng = Random::new(1);
        let arg: Value = serde_json::json!({"$var": "cutoff"});
        assert_eq!(env.evaluate(&arg, &mut rng), Value::from(1200.0));
    }

    #[test]
    fn random_marker_is_reproducible_given_same_seed() {
        let env = Environment::new();
        let mut a = Random::new(5);
        let mut b = Random::new(5);
        let arg: Value = serde_json::json!({"$random": [0.0, 1.0]});
        assert_eq!(env.evaluate(&arg, &mut a), env.evaluate(&arg, &mut b));
    }

    #[test]
    fn passes_through_plain_values() {
        let env = Environment::new();
        let mut rng = Random::new(1);
        let arg = Value::from(42);
        assert_eq!(env.evaluate(&arg, &mut rng), Value::from(42));
    }
}
