//! Dynamic filter-schema rewriting
//!
//! The declared schema for a field describes single values. Which value
//! shape a filter actually needs depends on the operator: range operators
//! take a 2-tuple, set operators an array. Rather than mutating a shared
//! schema tree per request, the expected shape is computed fresh as a pure
//! function of the immutable field schema and the operator.

use crate::core::field::{FieldSchema, FieldType};
use crate::core::filter::{Filter, FilterSet, Operator, split_filter_key};
use indexmap::IndexMap;
use serde_json::Value;

/// The value shape a filter expects after operator rewriting
#[derive(Debug, Clone, Copy)]
pub enum ValueSchema<'a> {
    /// A single value of the field's type
    Scalar(&'a FieldSchema),
    /// Exactly two values of the field's type (between/notBetween)
    Pair(&'a FieldSchema),
    /// Any number of values of the field's type (in/notIn)
    Many(&'a FieldSchema),
}

/// Decide the legal value shape for `operator` applied to a field of the
/// given schema, enforcing the operator/type compatibility rules.
pub fn filter_value_schema(
    schema: &FieldSchema,
    operator: Operator,
) -> Result<ValueSchema<'_>, String> {
    let field_type = schema.field_type();

    if operator.is_ordering() {
        if matches!(field_type, FieldType::Boolean | FieldType::String) {
            return Err(
                "Operators gt, gte, lt and lte cannot be applied to boolean or string fields"
                    .to_string(),
            );
        }
        return Ok(ValueSchema::Scalar(schema));
    }

    if operator.is_range() {
        if matches!(field_type, FieldType::Boolean | FieldType::String) {
            return Err(
                "Operators between and notBetween cannot be applied to boolean or string fields"
                    .to_string(),
            );
        }
        return Ok(ValueSchema::Pair(schema));
    }

    if operator.is_set() {
        if field_type == FieldType::Boolean {
            return Err(
                "Operators in and notIn cannot be applied to boolean fields".to_string(),
            );
        }
        return Ok(ValueSchema::Many(schema));
    }

    if operator.is_pattern() {
        if matches!(
            field_type,
            FieldType::Boolean | FieldType::Date | FieldType::Number
        ) {
            return Err(
                "Operators like and notLike cannot be applied to boolean, date or number fields"
                    .to_string(),
            );
        }
        return Ok(ValueSchema::Scalar(schema));
    }

    // eq / ne work on every field type
    Ok(ValueSchema::Scalar(schema))
}

/// Validate and coerce a raw filter value against its rewritten shape
pub fn check_filter_value(
    value_schema: ValueSchema<'_>,
    field: &str,
    raw: &Value,
) -> Result<Value, String> {
    match value_schema {
        ValueSchema::Scalar(schema) => schema.check(field, raw),
        ValueSchema::Pair(schema) => {
            let items = raw
                .as_array()
                .ok_or_else(|| format!("\"{}\" must be an array", field))?;
            if items.len() != 2 {
                return Err(format!("\"{}\" must contain 2 items", field));
            }
            check_items(schema, field, items)
        }
        ValueSchema::Many(schema) => {
            let items = raw
                .as_array()
                .ok_or_else(|| format!("\"{}\" must be an array", field))?;
            check_items(schema, field, items)
        }
    }
}

fn check_items(schema: &FieldSchema, field: &str, items: &[Value]) -> Result<Value, String> {
    let mut normalized = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        normalized.push(schema.check(&format!("{}[{}]", field, i), item)?);
    }
    Ok(Value::Array(normalized))
}

/// Compile a raw `filters` object into a [`FilterSet`].
///
/// Per entry: the operator suffix is validated against the fixed vocabulary
/// (hard error), the field's declared schema drives the compatibility rules
/// and value rewriting (hard errors), and unknown field names are silently
/// dropped.
pub fn validate_filters(
    filterable: &IndexMap<String, FieldSchema>,
    raw: &serde_json::Map<String, Value>,
) -> Result<FilterSet, String> {
    let mut filters = FilterSet::new();
    for (key, value) in raw {
        let (field, operator) = split_filter_key(key)?;
        let Some(schema) = filterable.get(field) else {
            continue;
        };
        let value_schema = filter_value_schema(schema, operator)?;
        let normalized = check_filter_value(value_schema, field, value)?;
        filters.push(Filter::new(field, operator, normalized));
    }
    Ok(filters)
}
