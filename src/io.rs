//! External I/O seam (§6). This crate defines the traits an external reader
//! or writer plugs into; it does not ship CSV/JSON encoding bodies itself —
//! that stays out of scope per the non-goals in §1.

use crate::error::TabulateResult;
use crate::table::Table;
use crate::value::{CastOptions, DataType};

/// Raw rows plus the schema to cast them against — the shape an external
/// reader (CSV, JSON, a database cursor, ...) hands to [`Table::from_rows`].
pub trait RowSource {
    fn column_names(&self) -> Vec<String>;
    fn column_types(&self) -> Vec<DataType>;
    fn row_names(&self) -> Option<Vec<String>> {
        None
    }
    fn rows(&self) -> Vec<Vec<String>>;
}

/// Produces a [`Table`] from an external source.
pub trait TableReader {
    fn read(&self) -> TabulateResult<Table>;
}

/// Consumes a [`Table`] into an external sink.
pub trait TableWriter {
    fn write(&self, table: &Table) -> TabulateResult<()>;
}

impl Table {
    /// Builds a table from any [`RowSource`], casting every cell through its
    /// declared column type (§4.2 construction) — the constructor external
    /// readers use instead of hand-rolling `from_raw_rows` calls.
    pub fn from_rows<S: RowSource>(source: &S, cast_options: &CastOptions) -> TabulateResult<Table> {
        Table::from_raw_rows(
            source.column_names(),
            source.column_types(),
            source.rows(),
            source.row_names(),
            cast_options,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    struct VecSource {
        names: Vec<String>,
        types: Vec<DataType>,
        rows: Vec<Vec<String>>,
    }

    impl RowSource for VecSource {
        fn column_names(&self) -> Vec<String> {
            self.names.clone()
        }
        fn column_types(&self) -> Vec<DataType> {
            self.types.clone()
        }
        fn rows(&self) -> Vec<Vec<String>> {
            self.rows.clone()
        }
    }

    #[test]
    fn from_rows_casts_through_row_source() {
        let source = VecSource {
            names: vec!["name".to_string(), "age".to_string()],
            types: vec![DataType::Text, DataType::Number],
            rows: vec![
                vec!["Ada".to_string(), "36".to_string()],
                vec!["Grace".to_string(), "85".to_string()],
            ],
        };
        let table = Table::from_rows(&source, &CastOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.row(0).unwrap().get("name"), Some(&Value::Text("Ada".to_string())));
    }
}
