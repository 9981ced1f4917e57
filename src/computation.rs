//! Row-wise column producers (§4.3).

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::aggregation::Aggregation;
use crate::error::{TabulateError, TabulateResult};
use crate::row::Row;
use crate::table::Table;
use crate::value::{DataType, Value};

type Comparer = Arc<dyn Fn(&Value, &Value) -> std::cmp::Ordering + Send + Sync>;

/// A polymorphic row-wise column producer. `validate` runs before any cells
/// are produced; `run` yields one value per row of the table it was
/// validated against.
#[derive(Clone)]
pub enum Computation {
    Formula {
        output_type: DataType,
        f: Arc<dyn Fn(&Row) -> Value + Send + Sync>,
        cast: bool,
    },
    Change {
        from: String,
        to: String,
    },
    Percent {
        column: String,
        denominator: Option<Decimal>,
    },
    PercentChange {
        from: String,
        to: String,
    },
    Rank {
        column: String,
        reverse: bool,
        comparer: Option<Comparer>,
    },
    PercentileRank {
        column: String,
    },
    Slug {
        columns: Vec<String>,
        ensure_unique: bool,
    },
}

fn numeric_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(d) => Some(*d),
        _ => None,
    }
}

fn require_number(table: &Table, name: &str) -> TabulateResult<()> {
    table.require_data_type(name, DataType::Number, "Number")
}

/// Coerces a Formula closure's output into its declared column type (§4.3).
fn cast_value(value: Value, output_type: DataType, row: usize) -> TabulateResult<Value> {
    if value.is_null() || value.data_type() == Some(output_type) {
        return Ok(value);
    }
    let text = value.to_csv_string();
    crate::value::CastOptions::default().cast(output_type, &text, row, "Formula")
}

impl Computation {
    pub fn validate(&self, table: &Table) -> TabulateResult<()> {
        match self {
            Computation::Formula { .. } => Ok(()),
            Computation::Change { from, to } => {
                let from_type = table
                    .schema()
                    .data_type(from)
                    .ok_or_else(|| TabulateError::MissingColumn(from.clone()))?;
                let to_type = table
                    .schema()
                    .data_type(to)
                    .ok_or_else(|| TabulateError::MissingColumn(to.clone()))?;
                if from_type != to_type {
                    return Err(TabulateError::DataType {
                        column: to.clone(),
                        expected: from_type.name(),
                        found: to_type.name(),
                    });
                }
                match from_type {
                    DataType::Number | DataType::Date | DataType::DateTime | DataType::TimeDelta => Ok(()),
                    other => Err(TabulateError::DataType {
                        column: from.clone(),
                        expected: "Number, Date, DateTime, or TimeDelta",
                        found: other.name(),
                    }),
                }
            }
            Computation::Percent { column, .. } => require_number(table, column),
            Computation::PercentChange { from, to } => {
                require_number(table, from)?;
                require_number(table, to)
            }
            Computation::Rank { column, comparer, .. } => match comparer {
                Some(_) => table.column(column).map(|_| ()),
                None => require_number(table, column),
            },
            Computation::PercentileRank { column } => require_number(table, column),
            Computation::Slug { columns, .. } => {
                for c in columns {
                    table.require_data_type(c, DataType::Text, "Text")?;
                }
                Ok(())
            }
        }
    }

    /// The [`DataType`] this computation's output column will carry.
    pub fn declared_type(&self, table: &Table) -> TabulateResult<DataType> {
        match self {
            Computation::Formula { output_type, .. } => Ok(*output_type),
            Computation::Change { from, .. } => {
                let from_type = table
                    .schema()
                    .data_type(from)
                    .ok_or_else(|| TabulateError::MissingColumn(from.clone()))?;
                Ok(match from_type {
                    DataType::Number => DataType::Number,
                    DataType::Date | DataType::DateTime | DataType::TimeDelta => DataType::TimeDelta,
                    other => other,
                })
            }
            Computation::Percent { .. }
            | Computation::PercentChange { .. }
            | Computation::Rank { .. }
            | Computation::PercentileRank { .. } => Ok(DataType::Number),
            Computation::Slug { .. } => Ok(DataType::Text),
        }
    }

    pub fn run(&self, table: &Table) -> TabulateResult<Vec<Value>> {
        self.validate(table)?;
        match self {
            Computation::Formula { f, output_type, cast } => {
                let values: Vec<Value> = table.rows().map(|row| f(&row)).collect();
                if !cast {
                    return Ok(values);
                }
                values
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| cast_value(v, *output_type, i))
                    .collect::<TabulateResult<Vec<Value>>>()
            }
            Computation::Change { from, to } => {
                Ok(table
                    .rows()
                    .map(|row| match (row.get(from), row.get(to)) {
                        (Some(a), Some(b)) if !a.is_null() && !b.is_null() => subtract(a, b),
                        _ => Value::Null,
                    })
                    .collect())
            }
            Computation::Percent { column, denominator } => {
                let denom = match denominator {
                    Some(d) => *d,
                    None => {
                        let agg = Aggregation::Sum { column: column.clone() };
                        match agg.run(table)?.scalar() {
                            Some(Value::Number(d)) => d,
                            _ => Decimal::ZERO,
                        }
                    }
                };
                Ok(table
                    .rows()
                    .map(|row| match row.get(column) {
                        Some(Value::Number(v)) if denom != Decimal::ZERO => {
                            Value::Number(*v / denom * Decimal::from(100))
                        }
                        _ => Value::Null,
                    })
                    .collect())
            }
            Computation::PercentChange { from, to } => Ok(table
                .rows()
                .map(|row| match (row.get(from), row.get(to)) {
                    (Some(Value::Number(a)), Some(Value::Number(b))) if *a != Decimal::ZERO => {
                        Value::Number((*b - *a) / *a * Decimal::from(100))
                    }
                    _ => Value::Null,
                })
                .collect()),
            Computation::Rank { column, reverse, comparer } => {
                let col = table.column(column)?;
                let mut indexed: Vec<(usize, Value)> = col
                    .values()
                    .enumerate()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(i, v)| (i, v.clone()))
                    .collect();
                let tied = |a: &Value, b: &Value| -> bool {
                    match comparer {
                        Some(cmp) => cmp(a, b) == std::cmp::Ordering::Equal,
                        None => a == b,
                    }
                };
                indexed.sort_by(|a, b| {
                    let ord = match comparer {
                        Some(cmp) => cmp(&a.1, &b.1),
                        None => {
                            let oa = numeric_of(&a.1).unwrap_or_default();
                            let ob = numeric_of(&b.1).unwrap_or_default();
                            oa.cmp(&ob)
                        }
                    };
                    if *reverse { ord.reverse() } else { ord }
                });
                let mut ranks = vec![Value::Null; table.len()];
                let mut rank = 1usize;
                let mut i = 0;
                while i < indexed.len() {
                    let mut j = i;
                    while j + 1 < indexed.len() && tied(&indexed[j + 1].1, &indexed[i].1) {
                        j += 1;
                    }
                    for (row_idx, _) in &indexed[i..=j] {
                        ranks[*row_idx] = Value::Number(Decimal::from(rank));
                    }
                    rank += j - i + 1;
                    i = j + 1;
                }
                Ok(ranks)
            }
            Computation::PercentileRank { column } => {
                let col = table.column(column)?;
                let mut sorted: Vec<Decimal> = col.non_null_values().filter_map(numeric_of).collect();
                sorted.sort();
                let n = sorted.len();
                Ok(col
                    .values()
                    .map(|v| match numeric_of(v) {
                        Some(d) if n > 0 => {
                            let below = sorted.iter().filter(|&&s| s < d).count();
                            Value::Number(Decimal::from(below) / Decimal::from(n) * Decimal::from(100))
                        }
                        _ => Value::Null,
                    })
                    .collect())
            }
            Computation::Slug { columns, ensure_unique } => {
                let merged: Vec<String> = table
                    .rows()
                    .map(|row| {
                        columns
                            .iter()
                            .map(|c| match row.get(c) {
                                Some(Value::Text(s)) => s.clone(),
                                _ => String::new(),
                            })
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect();
                let slugs = if *ensure_unique {
                    crate::slug::unique_slugs(&merged)
                } else {
                    merged.iter().map(|s| crate::slug::slugify(s)).collect()
                };
                Ok(slugs.into_iter().map(Value::Text).collect())
            }
        }
    }
}

fn subtract(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Value::Number(*y - *x),
        (Value::Date(x), Value::Date(y)) => {
            Value::TimeDelta(crate::value::TimeDelta((*y - *x).num_milliseconds()))
        }
        (Value::DateTime(x), Value::DateTime(y)) => {
            Value::TimeDelta(crate::value::TimeDelta((y.naive() - x.naive()).num_milliseconds()))
        }
        (Value::TimeDelta(x), Value::TimeDelta(y)) => Value::TimeDelta(crate::value::TimeDelta(y.0 - x.0)),
        _ => Value::Null,
    }
}
