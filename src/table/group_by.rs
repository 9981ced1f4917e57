//! `Table::group_by` — partitioning rows into a [`TableSet`] (§4.4).

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{TabulateError, TabulateResult};
use crate::row::Row;
use crate::table::Table;
use crate::tableset::TableSet;
use crate::value::{DataType, Value};

impl Table {
    /// Groups by an existing column, keyed and typed by that column.
    pub fn group_by_column(&self, name: &str) -> TabulateResult<TableSet> {
        let data_type = self
            .schema
            .data_type(name)
            .ok_or_else(|| TabulateError::MissingColumn(name.to_string()))?;
        let name = name.to_string();
        Ok(self.group_by_key(|row| row.get(&name).cloned().unwrap_or(Value::Null), name.clone(), data_type))
    }

    /// Groups by an arbitrary row function; group keys are deduplicated
    /// while preserving first-seen order.
    pub fn group_by_key<F>(&self, key: F, key_name: impl Into<String>, key_type: DataType) -> TableSet
    where
        F: Fn(&Row) -> Value,
    {
        let mut groups: IndexMap<Value, Vec<Arc<[Value]>>> = IndexMap::new();
        for (i, row_data) in self.rows.iter().enumerate() {
            let row = self.row(i).expect("index in bounds");
            let k = key(&row);
            groups.entry(k).or_default().push(row_data.clone());
        }
        let tables: IndexMap<Value, Table> = groups
            .into_iter()
            .map(|(k, rows)| (k, self.with_rows(rows)))
            .collect();
        TableSet::new(key_name, key_type, tables)
    }
}

#[cfg(test)]
mod tests {
    use crate::value::{CastOptions, DataType, Value};
    use crate::table::Table;

    fn sample() -> Table {
        let rows = vec![
            vec!["a".to_string(), "1".to_string()],
            vec!["b".to_string(), "2".to_string()],
            vec!["a".to_string(), "3".to_string()],
        ];
        Table::from_raw_rows(
            vec!["group".to_string(), "value".to_string()],
            vec![DataType::Text, DataType::Number],
            rows,
            None,
            &CastOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn groups_preserve_first_seen_order() {
        let t = sample();
        let set = t.group_by_column("group").unwrap();
        let keys: Vec<&Value> = set.keys().collect();
        assert_eq!(keys, vec![&Value::Text("a".to_string()), &Value::Text("b".to_string())]);
        assert_eq!(set.len(), 2);
    }
}
