//! [`Row`]: an immutable, ordered view over one row of a [`crate::Table`].

use std::sync::Arc;

use crate::table::Schema;
use crate::value::{DataType, Value};

/// An ordered, immutable sequence of typed cells, keyed by column name and
/// integer index (§3). Rows are shared by reference across derived tables.
#[derive(Clone)]
pub struct Row {
    pub(crate) schema: Arc<Schema>,
    pub(crate) data: Arc<[Value]>,
}

impl Row {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let idx = self.schema.index_of(name)?;
        self.data.get(idx)
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.data.get(index)
    }

    pub fn data_type(&self, name: &str) -> Option<DataType> {
        self.schema.data_type(name)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.data.iter()
    }

    pub fn column_names(&self) -> Vec<&String> {
        self.schema.names()
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.data.iter().eq(other.data.iter())
    }
}
