//! In-memory implementation of the Store trait for testing and development
//!
//! Tables are declared up front, mirroring what migrations would declare in
//! a relational backend: auto-incremented integer primary keys, automatic
//! timestamps, unique constraints and foreign keys with cascade rules.
//! Uses RwLock for thread-safe access.

use crate::core::filter::{FilterSet, values_equal};
use crate::core::query::{Page, Sort};
use crate::core::resource::{Relation, RelationKind};
use crate::storage::{Row, Store, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// What happens to referencing rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete referencing rows too
    Cascade,
    /// Leave referencing rows in place
    NoAction,
}

/// A foreign-key declaration on a table
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: String,
    pub references: String,
    pub on_delete: OnDelete,
}

/// Declarative table schema, the in-memory analogue of a migration
#[derive(Debug, Clone)]
pub struct TableDef {
    name: String,
    timestamps: bool,
    unique: Vec<Vec<String>>,
    foreign_keys: Vec<ForeignKey>,
}

impl TableDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            timestamps: true,
            unique: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Pivot tables carry no timestamps
    pub fn pivot(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Declare a single- or multi-column unique constraint
    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.unique
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn foreign_key(mut self, column: &str, references: &str, on_delete: OnDelete) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.to_string(),
            references: references.to_string(),
            on_delete,
        });
        self
    }
}

struct Table {
    def: TableDef,
    next_id: i64,
    rows: BTreeMap<i64, Row>,
}

struct Inner {
    tables: IndexMap<String, Table>,
}

/// In-memory store backed by declared tables
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder { tables: Vec::new() }
    }
}

/// Builder declaring the store's tables
pub struct InMemoryStoreBuilder {
    tables: Vec<TableDef>,
}

impl InMemoryStoreBuilder {
    pub fn table(mut self, def: TableDef) -> Self {
        self.tables.push(def);
        self
    }

    pub fn build(self) -> InMemoryStore {
        let tables = self
            .tables
            .into_iter()
            .map(|def| {
                (
                    def.name.clone(),
                    Table {
                        def,
                        next_id: 1,
                        rows: BTreeMap::new(),
                    },
                )
            })
            .collect();
        InMemoryStore {
            inner: Arc::new(RwLock::new(Inner { tables })),
        }
    }
}

impl Inner {
    fn table(&self, name: &str) -> Result<&Table, StoreError> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, StoreError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))
    }

    fn filtered(&self, name: &str, filters: &FilterSet) -> Result<Vec<Row>, StoreError> {
        Ok(self
            .table(name)?
            .rows
            .values()
            .filter(|row| filters.matches(row))
            .cloned()
            .collect())
    }

    fn check_unique(
        &self,
        name: &str,
        values: &Row,
        exclude_id: Option<i64>,
    ) -> Result<(), StoreError> {
        let table = self.table(name)?;
        for group in &table.def.unique {
            let candidate: Vec<(&String, &Value)> = group
                .iter()
                .filter_map(|col| values.get(col).map(|v| (col, v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if candidate.len() != group.len() {
                continue;
            }
            let conflict = table.rows.values().any(|row| {
                row_id(row) != exclude_id
                    && candidate.iter().all(|&(col, v)| {
                        values_equal(row.get(col.as_str()).unwrap_or(&Value::Null), v)
                    })
            });
            if conflict {
                return Err(StoreError::UniqueViolation {
                    table: name.to_string(),
                    fields: group.join(", "),
                });
            }
        }
        Ok(())
    }

    // Deletes a row and walks declared cascades with a worklist, so a
    // user → articles → contents/pivots chain resolves in one pass.
    fn delete_row(&mut self, name: &str, id: i64) -> Result<(), StoreError> {
        let mut worklist = vec![(name.to_string(), id)];
        while let Some((table_name, id)) = worklist.pop() {
            self.table_mut(&table_name)?.rows.remove(&id);
            let mut children: Vec<(String, i64)> = Vec::new();
            for table in self.tables.values() {
                for fk in &table.def.foreign_keys {
                    if fk.references != table_name || fk.on_delete != OnDelete::Cascade {
                        continue;
                    }
                    for row in table.rows.values() {
                        let matches = row
                            .get(&fk.column)
                            .and_then(Value::as_i64)
                            .is_some_and(|v| v == id);
                        if matches {
                            if let Some(child_id) = row_id(row) {
                                children.push((table.def.name.clone(), child_id));
                            }
                        }
                    }
                }
            }
            worklist.extend(children);
        }
        Ok(())
    }
}

impl InMemoryStore {
    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn fetch_page(
        &self,
        table: &str,
        filters: &FilterSet,
        sort: &Sort,
        page: Page,
    ) -> Result<(Vec<Row>, u64), StoreError> {
        let inner = self.read()?;
        let mut rows = inner.filtered(table, filters)?;
        let row_count = rows.len() as u64;
        sort_rows(&mut rows, sort);
        let rows = rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .collect();
        Ok((rows, row_count))
    }

    async fn fetch_all(
        &self,
        table: &str,
        filters: &FilterSet,
        sort: &Sort,
    ) -> Result<Vec<Row>, StoreError> {
        let inner = self.read()?;
        let mut rows = inner.filtered(table, filters)?;
        sort_rows(&mut rows, sort);
        Ok(rows)
    }

    async fn fetch_by_id(
        &self,
        table: &str,
        id: i64,
        filters: &FilterSet,
    ) -> Result<Option<Row>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .table(table)?
            .rows
            .get(&id)
            .filter(|row| filters.matches(row))
            .cloned())
    }

    async fn find_where(&self, table: &str, conditions: &Row) -> Result<Option<Row>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .table(table)?
            .rows
            .values()
            .find(|row| {
                conditions
                    .iter()
                    .all(|(col, v)| values_equal(row.get(col).unwrap_or(&Value::Null), v))
            })
            .cloned())
    }

    async fn insert(&self, table: &str, mut values: Row) -> Result<Row, StoreError> {
        let mut inner = self.write()?;
        inner.check_unique(table, &values, None)?;
        let t = inner.table_mut(table)?;

        let id = match values.get("id").and_then(Value::as_i64) {
            Some(explicit) => {
                t.next_id = t.next_id.max(explicit + 1);
                explicit
            }
            None => {
                let id = t.next_id;
                t.next_id += 1;
                id
            }
        };
        values.insert("id".to_string(), Value::from(id));

        if t.def.timestamps {
            let now = Utc::now().to_rfc3339();
            values
                .entry("created_at".to_string())
                .or_insert_with(|| Value::String(now.clone()));
            values
                .entry("updated_at".to_string())
                .or_insert_with(|| Value::String(now));
        }

        t.rows.insert(id, values.clone());
        Ok(values)
    }

    async fn update(&self, table: &str, id: i64, changes: Row) -> Result<Row, StoreError> {
        let mut inner = self.write()?;

        let mut merged = inner
            .table(table)?
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::RowNotFound {
                table: table.to_string(),
                id,
            })?;
        for (key, value) in changes {
            if key == "id" {
                continue;
            }
            merged.insert(key, value);
        }

        inner.check_unique(table, &merged, Some(id))?;
        let t = inner.table_mut(table)?;
        if t.def.timestamps {
            merged.insert(
                "updated_at".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }
        t.rows.insert(id, merged.clone());
        Ok(merged)
    }

    async fn delete(&self, table: &str, id: i64) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.delete_row(table, id)
    }

    async fn load_relation(&self, row: &Row, relation: &Relation) -> Result<Value, StoreError> {
        let inner = self.read()?;
        let id = row_id(row).unwrap_or_default();

        match &relation.kind {
            RelationKind::BelongsTo { foreign_key } => {
                let target = inner.table(relation.table)?;
                let fk = row.get(*foreign_key).and_then(Value::as_i64);
                Ok(fk
                    .and_then(|fk| target.rows.get(&fk))
                    .map(|r| Value::Object(r.clone()))
                    .unwrap_or(Value::Null))
            }
            RelationKind::HasOne { foreign_key } => {
                let target = inner.table(relation.table)?;
                Ok(target
                    .rows
                    .values()
                    .find(|r| r.get(*foreign_key).and_then(Value::as_i64) == Some(id))
                    .map(|r| Value::Object(r.clone()))
                    .unwrap_or(Value::Null))
            }
            RelationKind::HasMany { foreign_key } => {
                let target = inner.table(relation.table)?;
                let rows: Vec<Value> = target
                    .rows
                    .values()
                    .filter(|r| r.get(*foreign_key).and_then(Value::as_i64) == Some(id))
                    .map(|r| Value::Object(r.clone()))
                    .collect();
                Ok(Value::Array(rows))
            }
            RelationKind::BelongsToMany {
                pivot_table,
                foreign_key,
                other_key,
            } => {
                let pivot = inner.table(pivot_table)?;
                let target = inner.table(relation.table)?;
                let mut rows = Vec::new();
                for pivot_row in pivot.rows.values() {
                    if pivot_row.get(*foreign_key).and_then(Value::as_i64) != Some(id) {
                        continue;
                    }
                    let Some(other_id) = pivot_row.get(*other_key).and_then(Value::as_i64) else {
                        continue;
                    };
                    if let Some(related) = target.rows.get(&other_id) {
                        let mut related = related.clone();
                        // Pivot bookkeeping columns ride along exactly as a
                        // SQL join would produce them; serialization strips
                        // them again.
                        related.insert(
                            format!("_pivot_{}", foreign_key),
                            Value::from(id),
                        );
                        related.insert(
                            format!("_pivot_{}", other_key),
                            Value::from(other_id),
                        );
                        rows.push(Value::Object(related));
                    }
                }
                Ok(Value::Array(rows))
            }
        }
    }

    async fn attach(
        &self,
        relation: &Relation,
        main_id: i64,
        related_id: i64,
    ) -> Result<(), StoreError> {
        let RelationKind::BelongsToMany {
            pivot_table,
            foreign_key,
            other_key,
        } = &relation.kind
        else {
            return Err(StoreError::NotManyToMany(relation.name.to_string()));
        };
        let mut inner = self.write()?;
        let t = inner.table_mut(pivot_table)?;
        let already = t.rows.values().any(|row| {
            row.get(*foreign_key).and_then(Value::as_i64) == Some(main_id)
                && row.get(*other_key).and_then(Value::as_i64) == Some(related_id)
        });
        if already {
            return Ok(());
        }
        let id = t.next_id;
        t.next_id += 1;
        let mut row = Row::new();
        row.insert("id".to_string(), Value::from(id));
        row.insert(foreign_key.to_string(), Value::from(main_id));
        row.insert(other_key.to_string(), Value::from(related_id));
        t.rows.insert(id, row);
        Ok(())
    }

    async fn detach(
        &self,
        relation: &Relation,
        main_id: i64,
        related_id: i64,
    ) -> Result<(), StoreError> {
        let RelationKind::BelongsToMany {
            pivot_table,
            foreign_key,
            other_key,
        } = &relation.kind
        else {
            return Err(StoreError::NotManyToMany(relation.name.to_string()));
        };
        let mut inner = self.write()?;
        let t = inner.table_mut(pivot_table)?;
        t.rows.retain(|_, row| {
            !(row.get(*foreign_key).and_then(Value::as_i64) == Some(main_id)
                && row.get(*other_key).and_then(Value::as_i64) == Some(related_id))
        });
        Ok(())
    }
}

fn row_id(row: &Row) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}

fn sort_rows(rows: &mut [Row], sort: &Sort) {
    rows.sort_by(|a, b| {
        let left = a.get(&sort.field).unwrap_or(&Value::Null);
        let right = b.get(&sort.field).unwrap_or(&Value::Null);
        let ordering = cmp_values(left, right);
        if sort.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

// Total order across the value types a column can hold; nulls sort first
// as in SQL ascending order.
fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => Ordering::Equal,
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
