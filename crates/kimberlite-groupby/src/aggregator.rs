//! Aggregate functions and their running reducers.

use std::cmp::Ordering;

use crate::error::{GroupByError, Result};
use crate::value::Value;

/// An aggregate function usable inside a group-by block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Min,
    Max,
    Sum,
    Avg,
}

impl AggregateFunction {
    /// Looks up an aggregate function by its query-language name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
        }
    }
}

/// Returns true if `name` is a known aggregate function.
pub fn is_aggregate_function(name: &str) -> bool {
    AggregateFunction::from_name(name).is_some()
}

/// Running state for one aggregate function over a sequence of values.
#[derive(Debug, Clone)]
pub struct Aggregator {
    func: AggregateFunction,
    result: Option<Value>,
    count: u64,
}

impl Aggregator {
    pub fn new(func: AggregateFunction) -> Self {
        Self {
            func,
            result: None,
            count: 0,
        }
    }

    pub fn function(&self) -> AggregateFunction {
        self.func
    }

    /// Feeds one value into the reducer.
    ///
    /// `sum` and `avg` only accept numeric values.
    pub fn apply(&mut self, value: Value) -> Result<()> {
        let next = match self.func {
            AggregateFunction::Min => pick(self.result.take(), value, Ordering::Less),
            AggregateFunction::Max => pick(self.result.take(), value, Ordering::Greater),
            AggregateFunction::Sum | AggregateFunction::Avg => {
                add_values(self.result.as_ref(), &value, self.func)?
            }
        };
        self.result = Some(next);
        self.count += 1;
        Ok(())
    }

    /// Returns the final value, or `None` if nothing was applied.
    pub fn value(&self) -> Option<Value> {
        let result = self.result.as_ref()?;
        match self.func {
            AggregateFunction::Avg => divide_value(result, self.count),
            _ => Some(result.clone()),
        }
    }
}

/// Keeps `current` unless `incoming` compares as `wanted` against it.
///
/// Incomparable values leave the current value in place.
fn pick(current: Option<Value>, incoming: Value, wanted: Ordering) -> Value {
    match current {
        None => incoming,
        Some(cur) => match incoming.compare(&cur) {
            Some(ord) if ord == wanted => incoming,
            _ => cur,
        },
    }
}

/// Adds two values for SUM and AVG aggregates.
fn add_values(a: Option<&Value>, b: &Value, func: AggregateFunction) -> Result<Value> {
    let Some(a_val) = a else {
        return match b {
            Value::Int(_) | Value::Float(_) => Ok(b.clone()),
            _ => Err(GroupByError::TypeMismatch {
                expected: format!("numeric value for {}", func.name()),
                actual: b.to_string(),
            }),
        };
    };

    match (a_val, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_add(*y)
            .map(Value::Int)
            .ok_or_else(|| GroupByError::ArithmeticOverflow(func.name().to_string())),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(*x as f64 + y)),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(x + *y as f64)),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x + y)),
        _ => Err(GroupByError::TypeMismatch {
            expected: format!("numeric value for {}", func.name()),
            actual: b.to_string(),
        }),
    }
}

/// Divides a sum by a count for AVG aggregates.
fn divide_value(val: &Value, count: u64) -> Option<Value> {
    if count == 0 {
        return None;
    }
    match val {
        Value::Int(x) => Some(Value::Float(*x as f64 / count as f64)),
        Value::Float(x) => Some(Value::Float(x / count as f64)),
        _ => None,
    }
}
