//! `Table::compute` — row-wise derived columns (§4.3).

use crate::computation::Computation;
use crate::error::{TabulateError, TabulateResult};
use crate::table::Table;
use crate::value::{DataType, Value};

impl Table {
    /// Runs every `(output_name, Computation)` against the **original**
    /// table (computations do not see each other's outputs) and appends
    /// the results in order. With `replace = true`, an output name that
    /// matches an existing column replaces it in place; otherwise a name
    /// collision is an error.
    pub fn compute(&self, specs: &[(&str, Computation)], replace: bool) -> TabulateResult<Table> {
        let mut names: Vec<String> = self.schema.names().into_iter().cloned().collect();
        let mut types: Vec<DataType> = self.schema.types();
        let mut replacements: Vec<(usize, Vec<Value>)> = Vec::new();
        let mut appended: Vec<(String, DataType, Vec<Value>)> = Vec::new();

        for (name, computation) in specs {
            let values = computation.run(self)?;
            let output_type = computation.declared_type(self)?;
            match names.iter().position(|n| n == name) {
                Some(idx) if replace => {
                    types[idx] = output_type;
                    replacements.push((idx, values));
                }
                Some(_) => {
                    return Err(TabulateError::Schema(format!(
                        "compute output {name:?} collides with an existing column"
                    )));
                }
                None => {
                    appended.push(((*name).to_string(), output_type, values));
                }
            }
        }
        for (name, output_type, _) in &appended {
            names.push(name.clone());
            types.push(*output_type);
        }

        let mut rows: Vec<Vec<Value>> = self.rows.iter().map(|r| r.to_vec()).collect();
        for (idx, values) in &replacements {
            for (row, value) in rows.iter_mut().zip(values.iter()) {
                row[*idx] = value.clone();
            }
        }
        for (_, _, values) in &appended {
            for (row, value) in rows.iter_mut().zip(values.iter()) {
                row.push(value.clone());
            }
        }

        Table::from_typed_rows(names, types, rows, None)
    }
}
