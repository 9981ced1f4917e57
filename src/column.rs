//! [`Column`]: an immutable view over one cell position across all rows.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::table::Schema;
use crate::value::{DataType, Value};

/// A typed, immutable view over a [`crate::Table`]'s rows restricted to one
/// cell position. Cells may be null. Exposes value access by integer
/// position and (if the parent has row names) by row name.
#[derive(Clone)]
pub struct Column {
    pub(crate) schema: Arc<Schema>,
    pub(crate) rows: Arc<Vec<Arc<[Value]>>>,
    pub(crate) row_names: Option<Arc<IndexMap<String, usize>>>,
    pub(crate) index: usize,
}

impl Column {
    pub fn name(&self) -> &str {
        self.schema.name_at(self.index).expect("column index in bounds")
    }

    pub fn data_type(&self) -> DataType {
        self.schema.data_type_at(self.index).expect("column index in bounds")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.rows.get(position).and_then(|row| row.get(self.index))
    }

    pub fn get_by_row_name(&self, name: &str) -> Option<&Value> {
        let names = self.row_names.as_ref()?;
        let position = *names.get(name)?;
        self.get(position)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[self.index])
    }

    pub fn non_null_values(&self) -> impl Iterator<Item = &Value> {
        self.values().filter(|v| !v.is_null())
    }

    pub fn has_nulls(&self) -> bool {
        self.values().any(|v| v.is_null())
    }
}

impl std::ops::Index<usize> for Column {
    type Output = Value;
    fn index(&self, position: usize) -> &Value {
        self.get(position).expect("row index out of bounds")
    }
}
