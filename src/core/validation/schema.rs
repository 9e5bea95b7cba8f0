//! Declarative request-part schemas
//!
//! [`ObjectSchema`] validates flat objects (params and bodies):
//! unknown keys are forbidden, required fields enforced, values coerced per
//! their [`FieldSchema`]. [`QuerySchema`] validates and normalizes the query
//! part, including the dynamic `filters`/`sort` handling that cannot be
//! expressed statically.
//!
//! Validation never mutates its input: every pass works on the raw values
//! by reference and produces a fresh normalized output, so a failed request
//! observes no partial rewriting.

use crate::core::field::FieldSchema;
use crate::core::filter::FilterSet;
use crate::core::query::{Page, Sort};
use crate::core::validation::filters::validate_filters;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Schema for a flat object request part (params or body)
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: IndexMap<String, FieldSchema>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, schema: FieldSchema) -> Self {
        self.fields.insert(name.to_string(), schema);
        self
    }

    pub fn fields(&self) -> &IndexMap<String, FieldSchema> {
        &self.fields
    }

    /// Validate an object value against this schema.
    ///
    /// Returns the normalized object; the first violated rule aborts with
    /// its message.
    pub fn validate(&self, value: &Value) -> Result<Map<String, Value>, String> {
        let empty = Map::new();
        let object = match value {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err("value must be of type object".to_string()),
        };

        for key in object.keys() {
            if !self.fields.contains_key(key) {
                return Err(format!("\"{}\" is not allowed", key));
            }
        }

        let mut normalized = Map::new();
        for (name, schema) in &self.fields {
            match object.get(name) {
                Some(raw) if !raw.is_null() => {
                    normalized.insert(name.clone(), schema.check(name, raw)?);
                }
                _ => {
                    if schema.is_required() {
                        return Err(format!("\"{}\" is required", name));
                    }
                }
            }
        }
        Ok(normalized)
    }
}

/// The normalized output of query validation
#[derive(Debug, Clone, Default)]
pub struct ValidatedQuery {
    pub filters: FilterSet,
    pub sort: Sort,
    pub page: Option<Page>,
    pub includes: Vec<String>,
}

/// Schema for the query request part
///
/// Parts left `None` are disallowed entirely — supplying them trips the
/// unknown-key check, exactly like any other stray parameter.
#[derive(Debug, Clone, Default)]
pub struct QuerySchema {
    filterable: Option<IndexMap<String, FieldSchema>>,
    sortable: Option<Vec<String>>,
    includes: Option<Vec<String>>,
    paginated: bool,
}

impl QuerySchema {
    /// The list-action shape: filters, sort and includes (pagination off)
    pub fn list(
        filterable: IndexMap<String, FieldSchema>,
        sortable: Vec<String>,
        includes: Vec<String>,
    ) -> Self {
        Self {
            filterable: Some(filterable),
            sortable: Some(sortable),
            includes: Some(includes),
            paginated: false,
        }
    }

    /// The show-action shape: only includes
    pub fn includes_only(includes: Vec<String>) -> Self {
        Self {
            filterable: None,
            sortable: None,
            includes: Some(includes),
            paginated: false,
        }
    }

    /// Additionally accept `page` and `pageSize`
    pub fn paginated(mut self) -> Self {
        self.paginated = true;
        self
    }

    /// Validate and normalize a raw query object.
    ///
    /// Processing order matters: the `sort` marker is
    /// stripped and the `filters` entries are operator- and type-checked
    /// first (hard errors), then the structural pass enforces unknown-key,
    /// enum and pagination rules on the rewritten working copy.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedQuery, String> {
        let empty = Map::new();
        let object = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err("query must be of type object".to_string()),
        };

        // Phase 1: strip the sort direction marker so `field` and `-field`
        // validate against the same allowed list. The signed raw value is
        // what the direction is recovered from.
        let mut sort = None;
        if let Some(raw_sort) = object.get("sort") {
            let raw_sort = raw_sort
                .as_str()
                .ok_or_else(|| "\"sort\" must be a string".to_string())?;
            sort = Some(Sort::parse(raw_sort));
        }

        // Phase 2: dynamic filter compilation (operator vocabulary and
        // type-compatibility are hard errors here).
        let mut filters = FilterSet::new();
        if let Some(raw_filters) = object.get("filters") {
            let raw_filters = raw_filters
                .as_object()
                .ok_or_else(|| "\"filters\" must be of type object".to_string())?;
            if let Some(filterable) = &self.filterable {
                filters = validate_filters(filterable, raw_filters)?;
            }
        }

        // Phase 3: structural validation of the working copy.
        for key in object.keys() {
            if !self.allows_key(key) {
                return Err(format!("\"{}\" is not allowed", key));
            }
        }

        if let (Some(sort), Some(sortable)) = (&sort, &self.sortable) {
            if !sortable.iter().any(|s| s == &sort.field) {
                return Err(format!(
                    "\"sort\" must be one of [{}]",
                    sortable.join(", ")
                ));
            }
        }

        let mut page = None;
        if self.paginated {
            let rule = FieldSchema::number().integer().positive();
            let mut paging = Page::default();
            if let Some(raw_page) = object.get("page") {
                paging.page = rule
                    .check("page", raw_page)?
                    .as_u64()
                    .unwrap_or(paging.page);
            }
            if let Some(raw_size) = object.get("pageSize") {
                paging.page_size = rule
                    .check("pageSize", raw_size)?
                    .as_u64()
                    .unwrap_or(paging.page_size);
            }
            page = Some(paging);
        }

        let mut includes = Vec::new();
        if let Some(raw_includes) = object.get("includes") {
            let allowed = self.includes.as_deref().unwrap_or_default();
            let items = raw_includes
                .as_array()
                .ok_or_else(|| "\"includes\" must be an array".to_string())?;
            let rule = FieldSchema::string().one_of(
                &allowed.iter().map(String::as_str).collect::<Vec<_>>(),
            );
            for (i, item) in items.iter().enumerate() {
                let checked = rule.check(&format!("includes[{}]", i), item)?;
                if let Value::String(name) = checked {
                    includes.push(name);
                }
            }
        }

        Ok(ValidatedQuery {
            filters,
            sort: sort.unwrap_or_default(),
            page,
            includes,
        })
    }

    fn allows_key(&self, key: &str) -> bool {
        match key {
            "filters" => self.filterable.is_some(),
            "sort" => self.sortable.is_some(),
            "includes" => self.includes.is_some(),
            "page" | "pageSize" => self.paginated,
            _ => false,
        }
    }
}
