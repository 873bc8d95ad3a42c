//! Column conditions used by range queries.
//!
//! [`ColumnConditions`] is keyed by field name in a `BTreeMap`, so two equal
//! condition sets always iterate (and therefore serialize) in the same order.
//! [`canonicalize`] additionally orders the conditions attached to each field.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Equal to.
    Eq,
    /// Strictly less than.
    Lt,
    /// Less than or equal to.
    LtOrEq,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal to.
    GtOrEq,
}

/// A single constraint on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Comparison operator.
    pub op: Operator,
    /// Value compared against.
    pub value: FieldValue,
}

impl Condition {
    /// Creates a new condition.
    pub fn new(op: Operator, value: impl Into<FieldValue>) -> Self {
        Self {
            op,
            value: value.into(),
        }
    }

    /// Checks whether `candidate` satisfies this condition.
    ///
    /// Values of a different type than the condition value never match.
    pub fn matches(&self, candidate: &FieldValue) -> bool {
        if !candidate.same_type(&self.value) {
            return false;
        }
        let Some(ordering) = candidate.partial_cmp(&self.value) else {
            return false;
        };
        match self.op {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Lt => ordering == Ordering::Less,
            Operator::LtOrEq => ordering != Ordering::Greater,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::GtOrEq => ordering != Ordering::Less,
        }
    }
}

/// Conditions per column name.
pub type ColumnConditions = BTreeMap<String, Vec<Condition>>;

/// Returns a copy of `conditions` with each column's list sorted by operator,
/// then by value.
///
/// Equivalent condition sets produce identical results, which makes the
/// output suitable for deriving cache keys.
pub fn canonicalize(conditions: &ColumnConditions) -> ColumnConditions {
    conditions
        .iter()
        .map(|(field, list)| {
            let mut list = list.clone();
            list.sort_by(|a, b| a.op.cmp(&b.op).then_with(|| a.value.total_cmp(&b.value)));
            (field.clone(), list)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_compare_same_type_only() {
        let cond = Condition::new(Operator::GtOrEq, 10i64);
        assert!(cond.matches(&FieldValue::Int64(10)));
        assert!(cond.matches(&FieldValue::Int64(11)));
        assert!(!cond.matches(&FieldValue::Int64(9)));
        assert!(!cond.matches(&FieldValue::Int32(11)));
    }

    #[test]
    fn strict_bounds() {
        assert!(Condition::new(Operator::Lt, "b").matches(&"a".into()));
        assert!(!Condition::new(Operator::Lt, "b").matches(&"b".into()));
        assert!(Condition::new(Operator::Gt, 1.5).matches(&2.0.into()));
        assert!(Condition::new(Operator::Eq, true).matches(&true.into()));
    }

    #[test]
    fn canonicalize_orders_within_field() {
        let mut a = ColumnConditions::new();
        a.insert(
            "ts".into(),
            vec![
                Condition::new(Operator::Lt, 20i64),
                Condition::new(Operator::Gt, 10i64),
            ],
        );
        let mut b = ColumnConditions::new();
        b.insert(
            "ts".into(),
            vec![
                Condition::new(Operator::Gt, 10i64),
                Condition::new(Operator::Lt, 20i64),
            ],
        );
        assert_ne!(a, b);
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn canonicalize_places_nan_consistently() {
        let conditions = |values: [f64; 3]| {
            let mut set = ColumnConditions::new();
            set.insert(
                "score".into(),
                values
                    .into_iter()
                    .map(|v| Condition::new(Operator::Gt, v))
                    .collect(),
            );
            canonicalize(&set)
        };
        let a = conditions([f64::NAN, 1.0, -2.5]);
        let b = conditions([1.0, -2.5, f64::NAN]);
        // NaN never compares equal, so compare the rendered form.
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
        assert!(matches!(a["score"][0].value, FieldValue::Double(v) if v == -2.5));
    }

    #[test]
    fn total_cmp_orders_across_variants() {
        assert_eq!(
            FieldValue::Int32(100).total_cmp(&FieldValue::Int64(1)),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::Double(f64::NAN).total_cmp(&FieldValue::Double(f64::NAN)),
            Ordering::Equal
        );
    }
}
