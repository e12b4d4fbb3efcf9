//! Query conditions serialized into Parse's `where` parameter.
//!
//! Each constraint names a field, a comparison and a JSON value. Constraints
//! on the same field merge into one operator object, so
//! `score > 10` and `score < 20` become `{"score":{"$gt":10,"$lt":20}}`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Comparison applied to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    ContainedIn,
    NotContainedIn,
    Exists,
}

impl Condition {
    /// Parse operator key. `EqualTo` has none: it serializes as a bare value.
    pub fn operator(self) -> Option<&'static str> {
        match self {
            Condition::EqualTo => None,
            Condition::NotEqualTo => Some("$ne"),
            Condition::LessThan => Some("$lt"),
            Condition::LessThanOrEqualTo => Some("$lte"),
            Condition::GreaterThan => Some("$gt"),
            Condition::GreaterThanOrEqualTo => Some("$gte"),
            Condition::ContainedIn => Some("$in"),
            Condition::NotContainedIn => Some("$nin"),
            Condition::Exists => Some("$exists"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub field: String,
    pub condition: Condition,
    pub value: Value,
}

/// A set of constraints plus the relational fields to expand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    constraints: Vec<Constraint>,
    include: Vec<String>,
}

enum Clause {
    Equals(Value),
    Operators(Map<String, Value>),
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constraint(mut self, field: &str, condition: Condition, value: impl Into<Value>) -> Self {
        self.constraints.push(Constraint {
            field: field.to_string(),
            condition,
            value: value.into(),
        });
        self
    }

    pub fn equal_to(self, field: &str, value: impl Into<Value>) -> Self {
        self.constraint(field, Condition::EqualTo, value)
    }

    pub fn include(mut self, field: &str) -> Self {
        self.include.push(field.to_string());
        self
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn includes(&self) -> &[String] {
        &self.include
    }

    /// The JSON object sent as `where`, or `None` when there are no constraints.
    pub fn where_clause(&self) -> Option<Map<String, Value>> {
        if self.constraints.is_empty() {
            return None;
        }

        let mut clauses: BTreeMap<&str, Clause> = BTreeMap::new();
        for c in &self.constraints {
            match c.condition.operator() {
                None => {
                    clauses.insert(&c.field, Clause::Equals(c.value.clone()));
                }
                Some(op) => {
                    let slot = clauses
                        .entry(&c.field)
                        .or_insert_with(|| Clause::Operators(Map::new()));
                    match slot {
                        Clause::Operators(ops) => {
                            ops.insert(op.to_string(), c.value.clone());
                        }
                        other => {
                            let mut ops = Map::new();
                            ops.insert(op.to_string(), c.value.clone());
                            *other = Clause::Operators(ops);
                        }
                    }
                }
            }
        }

        Some(
            clauses
                .into_iter()
                .map(|(field, clause)| {
                    let value = match clause {
                        Clause::Equals(v) => v,
                        Clause::Operators(ops) => Value::Object(ops),
                    };
                    (field.to_string(), value)
                })
                .collect(),
        )
    }
}
