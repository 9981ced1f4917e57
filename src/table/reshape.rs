//! Wide/long reshaping operations (§4.5).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::aggregation::Aggregation;
use crate::computation::Computation;
use crate::error::{TabulateError, TabulateResult};
use crate::table::Table;
use crate::value::{DataType, Value};

type RowGenerator = Arc<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;

/// The non-key cells for a row inserted by `homogenize`: either a fixed
/// sequence, or a function of the missing key value.
#[derive(Clone)]
pub enum DefaultRow {
    Values(Vec<Value>),
    Generator(RowGenerator),
}

fn zero_identity(aggregation: &Aggregation) -> Value {
    match aggregation {
        Aggregation::Count { .. } | Aggregation::Sum { .. } => Value::Number(rust_decimal::Decimal::ZERO),
        _ => Value::Null,
    }
}

type RowGroups = IndexMap<Vec<Value>, Vec<Arc<[Value]>>>;

impl Table {
    fn group_rows_by(&self, names: &[&str]) -> TabulateResult<RowGroups> {
        for name in names {
            if self.schema.index_of(name).is_none() {
                return Err(TabulateError::MissingColumn((*name).to_string()));
            }
        }
        let mut groups: IndexMap<Vec<Value>, Vec<Arc<[Value]>>> = IndexMap::new();
        for (i, row_data) in self.rows.iter().enumerate() {
            let row = self.row(i).expect("index in bounds");
            let key: Vec<Value> = names.iter().map(|n| row.get(n).cloned().unwrap_or(Value::Null)).collect();
            groups.entry(key).or_default().push(row_data.clone());
        }
        Ok(groups)
    }

    /// Groups by `rows`; without `columns`, emits one aggregated row per
    /// group. With `columns`, further groups by the cross-product of their
    /// distinct values and emits one output column per combination.
    pub fn pivot(
        &self,
        rows: &[&str],
        columns: Option<&[&str]>,
        aggregation: Aggregation,
        computation: Option<Computation>,
    ) -> TabulateResult<Table> {
        let row_groups = self.group_rows_by(rows)?;
        let row_types: Vec<DataType> = rows
            .iter()
            .map(|n| self.schema.data_type(n).expect("checked by group_rows_by"))
            .collect();

        match columns {
            None => {
                let mut names_out: Vec<String> = rows.iter().map(|s| s.to_string()).collect();
                names_out.push("value".to_string());
                let mut types_out = row_types;
                let mut value_type = None;
                let mut out_rows = Vec::with_capacity(row_groups.len());
                for (key, row_arcs) in &row_groups {
                    let sub = self.with_rows(row_arcs.clone());
                    let result = aggregation.run(&sub)?;
                    let value = result.scalar().ok_or(TabulateError::UnsupportedAggregation {
                        method: "pivot requires an aggregation that returns a scalar",
                    })?;
                    if value_type.is_none() {
                        value_type = value.data_type();
                    }
                    let mut row = key.clone();
                    row.push(value);
                    out_rows.push(row);
                }
                types_out.push(value_type.unwrap_or(DataType::Text));
                let table = Table::from_typed_rows(names_out, types_out, out_rows, None)?;
                match computation {
                    Some(c) => table.compute(&[("value", c)], true),
                    None => Ok(table),
                }
            }
            Some(cols) => {
                let col_groups_all = self.group_rows_by(cols)?;
                let pivot_keys: Vec<Vec<Value>> = col_groups_all.keys().cloned().collect();
                let labels: Vec<String> = pivot_keys
                    .iter()
                    .map(|k| k.iter().map(|v| v.to_csv_string()).collect::<Vec<_>>().join("_"))
                    .collect();

                let mut names_out: Vec<String> = rows.iter().map(|s| s.to_string()).collect();
                names_out.extend(labels);
                let mut types_out = row_types;
                let mut col_types: Vec<Option<DataType>> = vec![None; pivot_keys.len()];
                let mut out_rows = Vec::with_capacity(row_groups.len());

                for (row_key, row_arcs) in &row_groups {
                    let sub = self.with_rows(row_arcs.clone());
                    let sub_col_groups = sub.group_rows_by(cols)?;
                    let mut row_out = row_key.clone();
                    for (i, pk) in pivot_keys.iter().enumerate() {
                        let value = match sub_col_groups.get(pk) {
                            Some(arcs) => {
                                let cell_table = self.with_rows(arcs.clone());
                                let result = aggregation.run(&cell_table)?;
                                result.scalar().ok_or(TabulateError::UnsupportedAggregation {
                                    method: "pivot requires an aggregation that returns a scalar",
                                })?
                            }
                            None => zero_identity(&aggregation),
                        };
                        if col_types[i].is_none() {
                            col_types[i] = value.data_type();
                        }
                        row_out.push(value);
                    }
                    out_rows.push(row_out);
                }
                for ct in col_types {
                    types_out.push(ct.unwrap_or(DataType::Text));
                }
                Table::from_typed_rows(names_out, types_out, out_rows, None)
            }
        }
    }

    /// Wide to long: emits `(key_cols.., property_column, value_column)` for
    /// each input row and each of `properties`.
    pub fn normalize(
        &self,
        key: &[&str],
        properties: &[&str],
        property_column: &str,
        value_column: &str,
    ) -> TabulateResult<Table> {
        let key_types: Vec<DataType> = key
            .iter()
            .map(|k| self.schema.data_type(k).ok_or_else(|| TabulateError::MissingColumn(k.to_string())))
            .collect::<TabulateResult<_>>()?;
        let prop_types: Vec<DataType> = properties
            .iter()
            .map(|p| self.schema.data_type(p).ok_or_else(|| TabulateError::MissingColumn(p.to_string())))
            .collect::<TabulateResult<_>>()?;
        let uniform_type = prop_types
            .first()
            .copied()
            .filter(|first| prop_types.iter().all(|t| t == first));
        let value_type = uniform_type.unwrap_or(DataType::Text);

        let mut names_out: Vec<String> = key.iter().map(|s| s.to_string()).collect();
        names_out.push(property_column.to_string());
        names_out.push(value_column.to_string());
        let mut types_out = key_types;
        types_out.push(DataType::Text);
        types_out.push(value_type);

        let mut rows_out = Vec::new();
        for row in self.rows() {
            let key_vals: Vec<Value> = key.iter().map(|k| row.get(k).cloned().unwrap_or(Value::Null)).collect();
            for p in properties {
                let raw = row.get(p).cloned().unwrap_or(Value::Null);
                let value = if value_type == DataType::Text && !matches!(raw, Value::Text(_) | Value::Null) {
                    Value::Text(raw.to_csv_string())
                } else {
                    raw
                };
                let mut out = key_vals.clone();
                out.push(Value::Text((*p).to_string()));
                out.push(value);
                rows_out.push(out);
            }
        }
        Table::from_typed_rows(names_out, types_out, rows_out, None)
    }

    /// Long to wide: inverse of `normalize`. Duplicate `(key, property)`
    /// pairs resolve to the last occurrence.
    pub fn denormalize(
        &self,
        key: &[&str],
        property_column: &str,
        value_column: &str,
        default_value: Option<Value>,
    ) -> TabulateResult<Table> {
        let key_types: Vec<DataType> = key
            .iter()
            .map(|k| self.schema.data_type(k).ok_or_else(|| TabulateError::MissingColumn(k.to_string())))
            .collect::<TabulateResult<_>>()?;
        self.require_data_type(property_column, DataType::Text, "Text")?;
        let default_value = default_value.unwrap_or(Value::Null);

        let mut prop_order: Vec<String> = Vec::new();
        let mut seen_props: HashSet<String> = HashSet::new();
        let mut groups: IndexMap<Vec<Value>, HashMap<String, Value>> = IndexMap::new();

        for row in self.rows() {
            let key_vals: Vec<Value> = key.iter().map(|k| row.get(k).cloned().unwrap_or(Value::Null)).collect();
            let prop = match row.get(property_column) {
                Some(Value::Text(p)) => p.clone(),
                _ => continue,
            };
            if seen_props.insert(prop.clone()) {
                prop_order.push(prop.clone());
            }
            let value = row.get(value_column).cloned().unwrap_or(Value::Null);
            groups.entry(key_vals).or_default().insert(prop, value);
        }

        let mut prop_types: Vec<Option<DataType>> = vec![None; prop_order.len()];
        for values_map in groups.values() {
            for (i, p) in prop_order.iter().enumerate() {
                if prop_types[i].is_none() {
                    if let Some(v) = values_map.get(p) {
                        prop_types[i] = v.data_type();
                    }
                }
            }
        }

        let mut names_out: Vec<String> = key.iter().map(|s| s.to_string()).collect();
        names_out.extend(prop_order.iter().cloned());
        let mut types_out = key_types;
        for t in &prop_types {
            types_out.push(t.unwrap_or(DataType::Text));
        }

        let mut rows_out = Vec::with_capacity(groups.len());
        for (key_vals, values_map) in &groups {
            let mut row = key_vals.clone();
            for p in &prop_order {
                row.push(values_map.get(p).cloned().unwrap_or_else(|| default_value.clone()));
            }
            rows_out.push(row);
        }
        Table::from_typed_rows(names_out, types_out, rows_out, None)
    }

    /// Inserts a row for every value in `expected_values` missing from `key`,
    /// built from `default_row`.
    pub fn homogenize(&self, key: &str, expected_values: &[Value], default_row: &DefaultRow) -> TabulateResult<Table> {
        let key_idx = self
            .schema
            .index_of(key)
            .ok_or_else(|| TabulateError::MissingColumn(key.to_string()))?;

        let mut present: HashSet<Value> = HashSet::new();
        for row in self.rows() {
            if let Some(v) = row.get(key) {
                present.insert(v.clone());
            }
        }

        let mut rows_out: Vec<Vec<Value>> = self.rows.iter().map(|r| r.to_vec()).collect();
        for expected in expected_values {
            if present.contains(expected) {
                continue;
            }
            let full = match default_row {
                DefaultRow::Values(vals) => {
                    let mut row = vec![Value::Null; self.schema.len()];
                    row[key_idx] = expected.clone();
                    let mut vi = 0;
                    for (i, cell) in row.iter_mut().enumerate() {
                        if i != key_idx {
                            *cell = vals.get(vi).cloned().unwrap_or(Value::Null);
                            vi += 1;
                        }
                    }
                    row
                }
                DefaultRow::Generator(f) => f(expected),
            };
            rows_out.push(full);
        }

        let names = self.schema.names().into_iter().cloned().collect();
        let types = self.schema.types();
        Table::from_typed_rows(names, types, rows_out, None)
    }
}
