//! The filter compiler
//!
//! Turns `field__operator=value` query entries into typed predicates. The
//! operator vocabulary is fixed and closed: the only SQL shapes a filter can
//! produce are the ones listed on [`Operator`], so user input can never
//! smuggle arbitrary fragments into a query.
//!
//! A compiled [`Filter`] renders to a parenthesized, parameterized SQL
//! fragment for relational backends, and evaluates directly against JSON
//! rows for the in-memory backend. Both interpretations share the same
//! semantics.

use crate::core::field::parse_datetime;
use serde_json::Value;
use std::cmp::Ordering;

/// The fixed operator vocabulary, in the order error messages cite it
pub const OPERATOR_NAMES: [&str; 12] = [
    "gt",
    "gte",
    "lt",
    "lte",
    "ne",
    "eq",
    "between",
    "notBetween",
    "in",
    "notIn",
    "like",
    "notLike",
];

/// The message returned for any operator outside the vocabulary
pub const OPERATOR_MESSAGE: &str =
    "Operator must be gt, gte, lt, lte, ne, eq, between, notBetween, in, notIn, like or notLike";

/// A filter operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    NotBetween,
    In,
    NotIn,
    Like,
    NotLike,
}

impl Operator {
    /// Parse an operator name. Returns `None` for anything outside the
    /// vocabulary; callers surface [`OPERATOR_MESSAGE`].
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Operator::Eq),
            "ne" => Some(Operator::Ne),
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "between" => Some(Operator::Between),
            "notBetween" => Some(Operator::NotBetween),
            "in" => Some(Operator::In),
            "notIn" => Some(Operator::NotIn),
            "like" => Some(Operator::Like),
            "notLike" => Some(Operator::NotLike),
            _ => None,
        }
    }

    /// The SQL spelling of this operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Between => "between",
            Operator::NotBetween => "not between",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Like => "like",
            Operator::NotLike => "not like",
        }
    }

    /// gt/gte/lt/lte
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte
        )
    }

    /// between/notBetween
    pub fn is_range(&self) -> bool {
        matches!(self, Operator::Between | Operator::NotBetween)
    }

    /// in/notIn
    pub fn is_set(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// like/notLike
    pub fn is_pattern(&self) -> bool {
        matches!(self, Operator::Like | Operator::NotLike)
    }
}

/// Split a raw filter key into `(field, operator)`.
///
/// The operator defaults to `eq` when the key carries no `__` suffix.
/// Segments past the second are ignored.
pub fn split_filter_key(key: &str) -> Result<(&str, Operator), String> {
    let mut parts = key.split("__");
    let field = parts.next().unwrap_or_default();
    let operator = match parts.next() {
        Some(name) => Operator::parse(name).ok_or_else(|| OPERATOR_MESSAGE.to_string())?,
        None => Operator::Eq,
    };
    Ok((field, operator))
}

/// One compiled `(field, operator, value)` predicate
///
/// The value has already been validated and coerced to the field's declared
/// type by the schema validator; range and set operators carry arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Render this predicate as a parameterized SQL fragment plus its binds.
    ///
    /// Shapes are fixed:
    /// - `field between ? and ?` / `field not between ? and ?`
    /// - `field in(?)` / `field not in(?)` with an array bind
    /// - `field is true` / `field is not false` for boolean eq/ne literals
    /// - `field like ?` binding `%value%`
    /// - `field <op> ?` otherwise
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        match self.operator {
            Operator::Between | Operator::NotBetween => {
                let (lo, hi) = self.bounds();
                (
                    format!("{} {} ? and ?", self.field, self.operator.as_sql()),
                    vec![lo, hi],
                )
            }
            Operator::In | Operator::NotIn => (
                format!("{} {}(?)", self.field, self.operator.as_sql()),
                vec![self.value.clone()],
            ),
            Operator::Eq | Operator::Ne if self.value.is_boolean() => {
                let verb = if self.operator == Operator::Eq {
                    "is"
                } else {
                    "is not"
                };
                (format!("{} {} {}", self.field, verb, self.value), vec![])
            }
            Operator::Like | Operator::NotLike => {
                let needle = self.value.as_str().unwrap_or_default();
                (
                    format!("{} {} ?", self.field, self.operator.as_sql()),
                    vec![Value::String(format!("%{}%", needle))],
                )
            }
            _ => (
                format!("{} {} ?", self.field, self.operator.as_sql()),
                vec![self.value.clone()],
            ),
        }
    }

    /// Evaluate this predicate against a JSON row, with the same semantics
    /// the SQL shapes have (including null behaving as SQL null).
    pub fn matches(&self, row: &serde_json::Map<String, Value>) -> bool {
        let actual = row.get(self.field.as_str()).unwrap_or(&Value::Null);
        match self.operator {
            Operator::Eq => match &self.value {
                // `field is true`: null does not qualify
                Value::Bool(b) => actual == &Value::Bool(*b),
                expected => !actual.is_null() && values_equal(actual, expected),
            },
            Operator::Ne => match &self.value {
                // `field is not true`: null qualifies
                Value::Bool(b) => actual != &Value::Bool(*b),
                expected => !actual.is_null() && !values_equal(actual, expected),
            },
            Operator::Gt => matches!(compare_values(actual, &self.value), Some(Ordering::Greater)),
            Operator::Gte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt => matches!(compare_values(actual, &self.value), Some(Ordering::Less)),
            Operator::Lte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Between => self.within_bounds(actual).unwrap_or(false),
            Operator::NotBetween => self.within_bounds(actual).map(|b| !b).unwrap_or(false),
            Operator::In => self.in_set(actual),
            Operator::NotIn => !actual.is_null() && !self.in_set(actual),
            Operator::Like => self.like(actual).unwrap_or(false),
            Operator::NotLike => self.like(actual).map(|b| !b).unwrap_or(false),
        }
    }

    fn bounds(&self) -> (Value, Value) {
        let arr = self.value.as_array();
        let lo = arr
            .and_then(|a| a.first())
            .cloned()
            .unwrap_or(Value::Null);
        let hi = arr.and_then(|a| a.get(1)).cloned().unwrap_or(Value::Null);
        (lo, hi)
    }

    fn within_bounds(&self, actual: &Value) -> Option<bool> {
        let (lo, hi) = self.bounds();
        let after_lo = compare_values(actual, &lo)?;
        let before_hi = compare_values(actual, &hi)?;
        Some(after_lo != Ordering::Less && before_hi != Ordering::Greater)
    }

    fn in_set(&self, actual: &Value) -> bool {
        if actual.is_null() {
            return false;
        }
        self.value
            .as_array()
            .map(|a| a.iter().any(|v| values_equal(actual, v)))
            .unwrap_or(false)
    }

    // `like '%v%'`: substring match, case-insensitive per the usual SQL
    // collation. None when either side is not a string.
    fn like(&self, actual: &Value) -> Option<bool> {
        let haystack = actual.as_str()?;
        let needle = self.value.as_str()?;
        Some(
            haystack
                .to_lowercase()
                .contains(needle.to_lowercase().as_str()),
        )
    }
}

/// An ordered conjunction of filters
///
/// All supplied triples AND together — contradictory filters legitimately
/// select zero rows rather than erroring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet(pub Vec<Filter>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Filter) {
        self.0.push(filter);
    }

    pub fn extend(&mut self, other: FilterSet) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.0.iter()
    }

    /// Render the conjunction as a single parenthesized SQL fragment
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut fragments = Vec::with_capacity(self.0.len());
        let mut binds = Vec::new();
        for filter in &self.0 {
            let (fragment, mut b) = filter.to_sql();
            fragments.push(format!("({})", fragment));
            binds.append(&mut b);
        }
        (fragments.join(" and "), binds)
    }

    /// Evaluate the conjunction against a JSON row
    pub fn matches(&self, row: &serde_json::Map<String, Value>) -> bool {
        self.0.iter().all(|f| f.matches(row))
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Type-aware equality: numbers compare numerically, everything else
/// structurally.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Ordering used by gt/gte/lt/lte and between: numbers numerically, strings
/// as dates when both parse as dates, otherwise lexicographically. `None`
/// for incomparable pairs (which, like SQL null, never match).
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Some(x.as_f64()?.total_cmp(&y.as_f64()?)),
        (Value::String(x), Value::String(y)) => match (parse_datetime(x), parse_datetime(y)) {
            (Some(dx), Some(dy)) => Some(dx.cmp(&dy)),
            _ => Some(x.cmp(y)),
        },
        _ => None,
    }
}
