//! [`Table`]: the central, immutable tabular value.

mod schema;
pub mod select;
pub mod join;
pub mod bins;
pub mod reshape;
pub mod compute;
pub mod aggregate;
pub mod group_by;

pub use schema::Schema;
pub use bins::BinSpec;
pub use join::JoinOptions;
pub use reshape::DefaultRow;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::column::Column;
use crate::error::{TabulateError, TabulateResult};
use crate::row::Row;
use crate::value::{CastOptions, DataType, Value};

/// An immutable tabular value: an ordered set of named, typed columns over
/// an ordered set of rows (§3). Every transformation method returns a new
/// `Table`; none mutate `self`.
#[derive(Clone)]
pub struct Table {
    pub(crate) schema: Arc<Schema>,
    pub(crate) rows: Arc<Vec<Arc<[Value]>>>,
    pub(crate) row_names: Option<Arc<IndexMap<String, usize>>>,
}

impl Table {
    /// Build a table from raw textual rows, casting every cell through its
    /// column's [`DataType`] (§4.2 construction). Rows shorter than the
    /// schema are right-padded with null; longer rows are truncated — both
    /// with a warning.
    pub fn from_raw_rows(
        column_names: Vec<String>,
        column_types: Vec<DataType>,
        raw_rows: Vec<Vec<String>>,
        row_names: Option<Vec<String>>,
        cast_options: &CastOptions,
    ) -> TabulateResult<Self> {
        let schema = Schema::new(column_names, column_types);
        let width = schema.len();
        let mut rows = Vec::with_capacity(raw_rows.len());
        for (row_idx, mut raw_row) in raw_rows.into_iter().enumerate() {
            if raw_row.len() < width {
                tracing::warn!(row = row_idx, "row shorter than schema, right-padded with null");
                raw_row.resize(width, String::new());
            } else if raw_row.len() > width {
                tracing::warn!(row = row_idx, "row longer than schema, truncated");
                raw_row.truncate(width);
            }
            let mut cells = Vec::with_capacity(width);
            for (col_idx, raw_cell) in raw_row.into_iter().enumerate() {
                let name = schema.name_at(col_idx).expect("col_idx in bounds");
                let data_type = schema.data_type_at(col_idx).expect("col_idx in bounds");
                cells.push(cast_options.cast(data_type, &raw_cell, row_idx, name)?);
            }
            rows.push(Arc::from(cells.into_boxed_slice()));
        }
        Self::assemble(schema, rows, row_names)
    }

    /// Build a table from already-typed rows (used internally by every
    /// transformation). Width mismatches are padded/truncated like
    /// `from_raw_rows`.
    pub fn from_typed_rows(
        column_names: Vec<String>,
        column_types: Vec<DataType>,
        rows: Vec<Vec<Value>>,
        row_names: Option<Vec<String>>,
    ) -> TabulateResult<Self> {
        let schema = Schema::new(column_names, column_types);
        let width = schema.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row.truncate(width);
                Arc::from(row.into_boxed_slice())
            })
            .collect();
        Self::assemble(schema, rows, row_names)
    }

    fn assemble(
        schema: Schema,
        rows: Vec<Arc<[Value]>>,
        row_names: Option<Vec<String>>,
    ) -> TabulateResult<Self> {
        let row_names = match row_names {
            Some(names) => Some(Arc::new(Self::build_row_name_index(names, rows.len())?)),
            None => None,
        };
        Ok(Self {
            schema: Arc::new(schema),
            rows: Arc::new(rows),
            row_names,
        })
    }

    fn build_row_name_index(
        names: Vec<String>,
        expected_len: usize,
    ) -> TabulateResult<IndexMap<String, usize>> {
        if names.len() != expected_len {
            return Err(TabulateError::Schema(format!(
                "row_names length {} does not match row count {}",
                names.len(),
                expected_len
            )));
        }
        let mut map = IndexMap::new();
        for (idx, name) in names.into_iter().enumerate() {
            if name.parse::<i64>().is_ok() {
                return Err(TabulateError::Schema(format!(
                    "row name {name:?} is integer-like; integers are reserved for positional access"
                )));
            }
            if map.insert(name.clone(), idx).is_some() {
                return Err(TabulateError::Schema(format!("duplicate row name {name:?}")));
            }
        }
        Ok(map)
    }

    /// Re-wrap a new set of rows under the same schema and no row names
    /// (most transformations discard row names unless they re-derive them).
    pub(crate) fn with_rows(&self, rows: Vec<Arc<[Value]>>) -> Self {
        Self {
            schema: self.schema.clone(),
            rows: Arc::new(rows),
            row_names: None,
        }
    }

    pub(crate) fn with_rows_and_names(
        &self,
        rows: Vec<Arc<[Value]>>,
        row_names: Option<Arc<IndexMap<String, usize>>>,
    ) -> Self {
        Self {
            schema: self.schema.clone(),
            rows: Arc::new(rows),
            row_names,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&String> {
        self.schema.names()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn has_row_names(&self) -> bool {
        self.row_names.is_some()
    }

    pub fn row(&self, index: usize) -> Option<Row> {
        self.rows.get(index).map(|data| Row {
            schema: self.schema.clone(),
            data: data.clone(),
        })
    }

    pub fn row_by_name(&self, name: &str) -> Option<Row> {
        let idx = *self.row_names.as_ref()?.get(name)?;
        self.row(idx)
    }

    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.len()).map(move |i| self.row(i).unwrap())
    }

    pub fn column(&self, name: &str) -> TabulateResult<Column> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| TabulateError::MissingColumn(name.to_string()))?;
        Ok(Column {
            schema: self.schema.clone(),
            rows: self.rows.clone(),
            row_names: self.row_names.clone(),
            index,
        })
    }

    /// Every column, in schema order.
    pub fn columns(&self) -> Vec<Column> {
        (0..self.schema.len())
            .map(|index| Column {
                schema: self.schema.clone(),
                rows: self.rows.clone(),
                row_names: self.row_names.clone(),
                index,
            })
            .collect()
    }

    pub(crate) fn require_data_type(
        &self,
        name: &str,
        expected: DataType,
        expected_label: &'static str,
    ) -> TabulateResult<()> {
        let found = self
            .schema
            .data_type(name)
            .ok_or_else(|| TabulateError::MissingColumn(name.to_string()))?;
        if found == expected {
            Ok(())
        } else {
            Err(TabulateError::DataType {
                column: name.to_string(),
                expected: expected_label,
                found: found.name(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn letters_table() -> Table {
        Table::from_raw_rows(
            vec!["letter".into(), "number".into()],
            vec![DataType::Text, DataType::Number],
            vec![
                vec!["a".into(), "1".into()],
                vec!["b".into(), "2".into()],
                vec!["c".into(), "".into()],
            ],
            None,
            &CastOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn construction_and_nulls() {
        let table = letters_table();
        assert_eq!(table.len(), 3);
        let numbers = table.column("number").unwrap();
        assert!(numbers.get(2).unwrap().is_null());
    }

    #[test]
    fn row_access() {
        let table = letters_table();
        let row = table.row(0).unwrap();
        assert_eq!(row.get("letter"), Some(&Value::Text("a".to_string())));
    }
}
