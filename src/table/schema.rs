//! Table schema: unique, ordered column names paired with [`DataType`]s.

use crate::mapped_sequence::MappedSequence;
use crate::value::DataType;

/// A non-empty, ordered sequence of unique column names paired with their
/// [`DataType`] (§3 invariant 1). Null/empty names are auto-assigned;
/// duplicates are disambiguated with a numeric suffix and a warning.
#[derive(Clone, Debug)]
pub struct Schema {
    columns: MappedSequence<String, DataType>,
}

impl Schema {
    pub fn new(names: Vec<String>, types: Vec<DataType>) -> Self {
        let names = disambiguate_names(assign_blank_names(names));
        Self {
            columns: names.into_iter().zip(types).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&String> {
        self.columns.keys().collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.index_of(&name.to_string())
    }

    pub fn name_at(&self, index: usize) -> Option<&String> {
        self.columns.key_at(index)
    }

    pub fn data_type(&self, name: &str) -> Option<DataType> {
        self.columns.get_by_key(&name.to_string()).copied()
    }

    pub fn data_type_at(&self, index: usize) -> Option<DataType> {
        self.columns.get_by_index(index).copied()
    }

    pub fn types(&self) -> Vec<DataType> {
        self.columns.values().copied().collect()
    }
}

/// a, b, ..., z, aa, ab, ... spreadsheet-style auto column names.
fn spreadsheet_name(mut n: usize) -> String {
    let mut s = Vec::new();
    loop {
        let rem = n % 26;
        s.push((b'a' + rem as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    s.iter().rev().collect()
}

fn assign_blank_names(names: Vec<String>) -> Vec<String> {
    let mut next_auto = 0usize;
    names
        .into_iter()
        .map(|name| {
            if name.trim().is_empty() {
                let auto = spreadsheet_name(next_auto);
                next_auto += 1;
                auto
            } else {
                name
            }
        })
        .collect()
}

fn disambiguate_names(names: Vec<String>) -> Vec<String> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    names
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            if *count == 0 {
                *count += 1;
                name
            } else {
                *count += 1;
                let suffixed = format!("{name}_{count}");
                tracing::warn!(original = %name, renamed = %suffixed, "duplicate column name disambiguated");
                suffixed
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_get_spreadsheet_labels() {
        let schema = Schema::new(
            vec!["".into(), "".into(), "given".into()],
            vec![DataType::Text, DataType::Text, DataType::Text],
        );
        assert_eq!(schema.names(), vec!["a", "b", "given"]);
    }

    #[test]
    fn duplicate_names_get_suffixed() {
        let schema = Schema::new(
            vec!["x".into(), "x".into(), "x".into()],
            vec![DataType::Text, DataType::Text, DataType::Text],
        );
        assert_eq!(schema.names(), vec!["x", "x_2", "x_3"]);
    }
}
