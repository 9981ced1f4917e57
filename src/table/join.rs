//! Equi-join and sequential join (§4.2.1).

use std::collections::{HashMap, HashSet};

use crate::error::{TabulateError, TabulateResult};
use crate::table::Table;
use crate::value::{DataType, Value};

/// Flags controlling [`Table::join`] and [`Table::join_sequential`].
#[derive(Clone, Debug, Default)]
pub struct JoinOptions {
    pub inner: bool,
    pub full_outer: bool,
    pub require_match: bool,
    /// Restrict which right-side (non-key) columns appear in the output.
    pub columns: Option<Vec<String>>,
}

fn key_repr(values: &[Value], coerce_to_text: &[bool]) -> Vec<Value> {
    values
        .iter()
        .zip(coerce_to_text)
        .map(|(v, &coerce)| {
            if coerce && !v.is_null() {
                Value::Text(v.to_csv_string())
            } else {
                v.clone()
            }
        })
        .collect()
}

/// Disambiguate `name` against `taken` by suffixing `2`, `3`, ...
fn disambiguate(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{name}{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

impl Table {
    /// Equi-join `self` (left) against `right`. `right_key` defaults to
    /// `left_key` when omitted. Keys are compared natively when both sides'
    /// key columns share a [`DataType`], else coerced to Text. Builds an
    /// index over the right side's keys for O(L + R) expected time.
    pub fn join(
        &self,
        right: &Table,
        left_key: &[&str],
        right_key: Option<&[&str]>,
        opts: &JoinOptions,
    ) -> TabulateResult<Table> {
        let right_key: Vec<&str> = right_key.map(|k| k.to_vec()).unwrap_or_else(|| left_key.to_vec());
        if left_key.len() != right_key.len() {
            return Err(TabulateError::Schema(
                "left_key and right_key must have equal length for multi-column joins".into(),
            ));
        }
        let left_idx: Vec<usize> = left_key
            .iter()
            .map(|n| self.schema.index_of(n).ok_or_else(|| TabulateError::MissingColumn((*n).to_string())))
            .collect::<TabulateResult<_>>()?;
        let right_idx: Vec<usize> = right_key
            .iter()
            .map(|n| right.schema.index_of(n).ok_or_else(|| TabulateError::MissingColumn((*n).to_string())))
            .collect::<TabulateResult<_>>()?;

        let coerce: Vec<bool> = left_idx
            .iter()
            .zip(&right_idx)
            .map(|(&l, &r)| {
                self.schema.data_type_at(l).unwrap() != right.schema.data_type_at(r).unwrap()
            })
            .collect();

        let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        for (ri, row) in right.rows.iter().enumerate() {
            let values: Vec<Value> = right_idx.iter().map(|&i| row[i].clone()).collect();
            index.entry(key_repr(&values, &coerce)).or_default().push(ri);
        }

        let right_key_set: HashSet<usize> = right_idx.iter().copied().collect();
        let right_output_idx: Vec<usize> = (0..right.schema.len())
            .filter(|i| !right_key_set.contains(i))
            .filter(|i| {
                opts.columns.as_ref().is_none_or(|cols| {
                    cols.iter().any(|c| right.schema.name_at(*i).unwrap() == c)
                })
            })
            .collect();

        let mut left_taken: HashSet<String> = self.schema.names().into_iter().cloned().collect();
        let mut right_names = Vec::with_capacity(right_output_idx.len());
        for &i in &right_output_idx {
            let name = right.schema.name_at(i).unwrap().clone();
            let final_name = disambiguate(&name, &left_taken);
            left_taken.insert(final_name.clone());
            right_names.push(final_name);
        }

        let mut out_names: Vec<String> = self.schema.names().into_iter().cloned().collect();
        out_names.extend(right_names);
        let mut out_types: Vec<DataType> = self.schema.types();
        out_types.extend(right_output_idx.iter().map(|&i| right.schema.data_type_at(i).unwrap()));

        let mut matched_right: HashSet<usize> = HashSet::new();
        let mut out_rows: Vec<Vec<Value>> = Vec::new();

        for (li, left_row) in self.rows.iter().enumerate() {
            let key_vals: Vec<Value> = left_idx.iter().map(|&i| left_row[i].clone()).collect();
            let key = key_repr(&key_vals, &coerce);
            let matches = index.get(&key);
            match matches {
                Some(ris) if !ris.is_empty() => {
                    for &ri in ris {
                        matched_right.insert(ri);
                        let mut cells: Vec<Value> = left_row.to_vec();
                        cells.extend(right_output_idx.iter().map(|&i| right.rows[ri][i].clone()));
                        out_rows.push(cells);
                    }
                }
                _ => {
                    if opts.require_match {
                        return Err(TabulateError::Join { row: li });
                    }
                    if !opts.inner {
                        let mut cells: Vec<Value> = left_row.to_vec();
                        cells.extend(right_output_idx.iter().map(|_| Value::Null));
                        out_rows.push(cells);
                    }
                }
            }
        }

        if opts.full_outer {
            for (ri, row) in right.rows.iter().enumerate() {
                if matched_right.contains(&ri) {
                    continue;
                }
                let mut cells: Vec<Value> = vec![Value::Null; self.schema.len()];
                cells.extend(right_output_idx.iter().map(|&i| row[i].clone()));
                out_rows.push(cells);
            }
        }

        Table::from_typed_rows(out_names, out_types, out_rows, None)
    }

    /// Sequential join: row N of `self` with row N of `right`, ignoring
    /// any key. `inner` truncates to the shorter side; left-outer (default)
    /// keeps every left row, nulling unmatched right cells; `full_outer`
    /// also appends trailing right rows beyond the left length.
    pub fn join_sequential(&self, right: &Table, opts: &JoinOptions) -> TabulateResult<Table> {
        let right_output_idx: Vec<usize> = (0..right.schema.len())
            .filter(|i| {
                opts.columns.as_ref().is_none_or(|cols| {
                    cols.iter().any(|c| right.schema.name_at(*i).unwrap() == c)
                })
            })
            .collect();
        let mut left_taken: HashSet<String> = self.schema.names().into_iter().cloned().collect();
        let mut right_names = Vec::new();
        for &i in &right_output_idx {
            let name = right.schema.name_at(i).unwrap().clone();
            let final_name = disambiguate(&name, &left_taken);
            left_taken.insert(final_name.clone());
            right_names.push(final_name);
        }
        let mut out_names: Vec<String> = self.schema.names().into_iter().cloned().collect();
        out_names.extend(right_names);
        let mut out_types: Vec<DataType> = self.schema.types();
        out_types.extend(right_output_idx.iter().map(|&i| right.schema.data_type_at(i).unwrap()));

        let left_len = self.len();
        let right_len = right.len();
        let rows_to_emit = if opts.inner {
            left_len.min(right_len)
        } else {
            left_len
        };

        let mut out_rows = Vec::new();
        for i in 0..rows_to_emit {
            if opts.require_match && i >= right_len {
                return Err(TabulateError::Join { row: i });
            }
            let mut cells: Vec<Value> = self.rows[i].to_vec();
            if i < right_len {
                cells.extend(right_output_idx.iter().map(|&c| right.rows[i][c].clone()));
            } else {
                cells.extend(right_output_idx.iter().map(|_| Value::Null));
            }
            out_rows.push(cells);
        }
        if opts.full_outer && right_len > left_len {
            for i in left_len..right_len {
                let mut cells: Vec<Value> = vec![Value::Null; self.schema.len()];
                cells.extend(right_output_idx.iter().map(|&c| right.rows[i][c].clone()));
                out_rows.push(cells);
            }
        }
        Table::from_typed_rows(out_names, out_types, out_rows, None)
    }
}

