//! Projection, filtering, ordering, dedup, and renaming (§4.2).

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{TabulateError, TabulateResult};
use crate::row::Row;
use crate::table::Table;
use crate::value::Value;

fn cmp_nulls_last(a: &Value, b: &Value, reverse: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.partial_cmp(b).unwrap_or(Ordering::Equal);
            if reverse { ord.reverse() } else { ord }
        }
    }
}

fn cmp_keys_nulls_last(a: &[Value], b: &[Value], reverse: bool) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = cmp_nulls_last(x, y, reverse);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl Table {
    /// Re-derives a row-name index for a subset/reordering of this table's
    /// rows, keyed by their original position. Returns `None` when this
    /// table has no row names.
    fn derive_row_names(&self, kept_indices: &[usize]) -> Option<Arc<IndexMap<String, usize>>> {
        let names = self.row_names.as_ref()?;
        let by_old_idx: HashMap<usize, &String> = names.iter().map(|(name, idx)| (*idx, name)).collect();
        let mut new_map = IndexMap::new();
        for (new_idx, old_idx) in kept_indices.iter().enumerate() {
            if let Some(name) = by_old_idx.get(old_idx) {
                new_map.insert((*name).clone(), new_idx);
            }
        }
        Some(Arc::new(new_map))
    }

    /// New table containing only the listed columns, in order.
    pub fn select(&self, names: &[&str]) -> TabulateResult<Table> {
        let mut indices = Vec::with_capacity(names.len());
        let mut types = Vec::with_capacity(names.len());
        for name in names {
            let idx = self
                .schema
                .index_of(name)
                .ok_or_else(|| TabulateError::MissingColumn((*name).to_string()))?;
            indices.push(idx);
            types.push(self.schema.data_type_at(idx).unwrap());
        }
        let rows: Vec<Vec<Value>> = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Table::from_typed_rows(
            names.iter().map(|s| s.to_string()).collect(),
            types,
            rows,
            None,
        )
    }

    /// Complement of [`Table::select`].
    pub fn exclude(&self, names: &[&str]) -> TabulateResult<Table> {
        let excluded: HashSet<&str> = names.iter().copied().collect();
        let kept: Vec<&str> = self
            .schema
            .names()
            .into_iter()
            .map(String::as_str)
            .filter(|n| !excluded.contains(n))
            .collect();
        self.select(&kept)
    }

    /// Keeps rows for which `pred(row)` is truthy. Order preserved.
    pub fn where_rows<F: Fn(&Row) -> bool>(&self, pred: F) -> Table {
        let kept_indices: Vec<usize> = (0..self.len()).filter(|&i| pred(&self.row(i).unwrap())).collect();
        let rows: Vec<Arc<[Value]>> = kept_indices.iter().map(|&i| self.rows[i].clone()).collect();
        let row_names = self.derive_row_names(&kept_indices);
        self.with_rows_and_names(rows, row_names)
    }

    /// Returns the first matching row, or `None`.
    pub fn find<F: Fn(&Row) -> bool>(&self, pred: F) -> Option<Row> {
        self.rows().find(pred)
    }

    /// Standard slice semantics over rows: `start`, `n` rows, taken every `step`.
    pub fn limit(&self, n: usize, start: usize, step: usize) -> Table {
        let step = step.max(1);
        let kept_indices: Vec<usize> = (start..self.len()).step_by(step).take(n).collect();
        let rows: Vec<Arc<[Value]>> = kept_indices.iter().map(|&i| self.rows[i].clone()).collect();
        let row_names = self.derive_row_names(&kept_indices);
        self.with_rows_and_names(rows, row_names)
    }

    /// Stable sort by a single column. Nulls sort last regardless of `reverse`.
    pub fn order_by_column(&self, name: &str, reverse: bool) -> TabulateResult<Table> {
        self.order_by_columns(&[name], reverse)
    }

    /// Stable sort by several columns in priority order.
    pub fn order_by_columns(&self, names: &[&str], reverse: bool) -> TabulateResult<Table> {
        let indices: Vec<usize> = names
            .iter()
            .map(|name| {
                self.schema
                    .index_of(name)
                    .ok_or_else(|| TabulateError::MissingColumn((*name).to_string()))
            })
            .collect::<TabulateResult<_>>()?;
        let mut ordered: Vec<usize> = (0..self.len()).collect();
        ordered.sort_by(|&a, &b| {
            let ka: Vec<Value> = indices.iter().map(|&i| self.rows[a][i].clone()).collect();
            let kb: Vec<Value> = indices.iter().map(|&i| self.rows[b][i].clone()).collect();
            cmp_keys_nulls_last(&ka, &kb, reverse)
        });
        let rows: Vec<Arc<[Value]>> = ordered.iter().map(|&i| self.rows[i].clone()).collect();
        let row_names = self.derive_row_names(&ordered);
        Ok(self.with_rows_and_names(rows, row_names))
    }

    /// Stable sort by an arbitrary row-function key. Nulls sort last.
    pub fn order_by_key<F: Fn(&Row) -> Value>(&self, key: F, reverse: bool) -> Table {
        let mut ordered: Vec<(usize, Value)> = (0..self.len())
            .map(|i| (i, key(&self.row(i).unwrap())))
            .collect();
        ordered.sort_by(|(_, a), (_, b)| cmp_nulls_last(a, b, reverse));
        let indices: Vec<usize> = ordered.iter().map(|(i, _)| *i).collect();
        let rows: Vec<Arc<[Value]>> = indices.iter().map(|&i| self.rows[i].clone()).collect();
        let row_names = self.derive_row_names(&indices);
        self.with_rows_and_names(rows, row_names)
    }

    /// Deduplicates by row identity, keeping the first occurrence.
    pub fn distinct(&self) -> Table {
        self.distinct_by_values(|row| row.values().cloned().collect())
    }

    /// Deduplicates by a single column, keeping the first occurrence.
    pub fn distinct_by_column(&self, name: &str) -> TabulateResult<Table> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| TabulateError::MissingColumn(name.to_string()))?;
        Ok(self.distinct_by_values(move |row| vec![row.get_index(idx).unwrap().clone()]))
    }

    /// Deduplicates by an arbitrary row-function key, keeping the first occurrence.
    pub fn distinct_by<F: Fn(&Row) -> Value>(&self, key: F) -> Table {
        self.distinct_by_values(move |row| vec![key(row)])
    }

    fn distinct_by_values<F: Fn(&Row) -> Vec<Value>>(&self, key: F) -> Table {
        let mut seen: HashSet<Vec<Value>> = HashSet::new();
        let mut kept_indices = Vec::new();
        for i in 0..self.len() {
            let row = self.row(i).unwrap();
            if seen.insert(key(&row)) {
                kept_indices.push(i);
            }
        }
        let rows: Vec<Arc<[Value]>> = kept_indices.iter().map(|&i| self.rows[i].clone()).collect();
        let row_names = self.derive_row_names(&kept_indices);
        self.with_rows_and_names(rows, row_names)
    }

    /// Renames axes. When `slug_columns`/`slug_rows` is true, the axis is
    /// slugified (lowercase ASCII, non-alphanumeric → `_`, collapsed and
    /// trimmed; duplicates disambiguated by numeric suffix).
    pub fn rename(
        &self,
        column_names: Option<Vec<String>>,
        row_names: Option<Vec<String>>,
        slug_columns: bool,
        slug_rows: bool,
    ) -> TabulateResult<Table> {
        let new_columns = match column_names {
            Some(names) => names,
            None if slug_columns => self.schema.names().into_iter().cloned().collect(),
            None => self.schema.names().into_iter().cloned().collect(),
        };
        let new_columns = if slug_columns {
            crate::slug::unique_slugs(&new_columns)
        } else {
            new_columns
        };
        let types = self.schema.types();
        let rows: Vec<Vec<Value>> = self.rows.iter().map(|r| r.to_vec()).collect();

        match row_names {
            Some(names) => {
                let names = if slug_rows { crate::slug::unique_slugs(&names) } else { names };
                Table::from_typed_rows(new_columns, types, rows, Some(names))
            }
            // Row count and order are unaffected by a column-only rename, so
            // carry the existing row-name index through unchanged.
            None => {
                let table = Table::from_typed_rows(new_columns, types, rows, None)?;
                Ok(Table {
                    schema: table.schema,
                    rows: table.rows,
                    row_names: self.row_names.clone(),
                })
            }
        }
    }

    /// Vertical concatenation. Columns unify by name; missing cells become
    /// null. Same column name across inputs must share a [`crate::DataType`].
    pub fn merge(tables: &[&Table]) -> TabulateResult<Table> {
        if tables.is_empty() {
            return Err(TabulateError::Schema("merge requires at least one table".into()));
        }
        let mut column_order: IndexMap<String, crate::value::DataType> = IndexMap::new();
        for table in tables {
            for name in table.schema.names() {
                let dtype = table.schema.data_type(name).unwrap();
                match column_order.get(name) {
                    Some(existing) if *existing != dtype => {
                        return Err(TabulateError::DataType {
                            column: name.clone(),
                            expected: existing.name(),
                            found: dtype.name(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        column_order.insert(name.clone(), dtype);
                    }
                }
            }
        }
        let names: Vec<String> = column_order.keys().cloned().collect();
        let types: Vec<crate::value::DataType> = column_order.values().copied().collect();
        let mut rows = Vec::new();
        for table in tables {
            for row in table.rows() {
                let cells: Vec<Value> = names
                    .iter()
                    .map(|name| row.get(name).cloned().unwrap_or(Value::Null))
                    .collect();
                rows.push(cells);
            }
        }
        Table::from_typed_rows(names, types, rows, None)
    }
}
