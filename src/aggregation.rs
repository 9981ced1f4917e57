//! Column-reducers producing one value per column per table (§4.4).

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::MathematicalOps;

use crate::column::Column;
use crate::error::{TabulateError, TabulateResult};
use crate::table::Table;
use crate::value::{DataType, Value};

/// The result of running an [`Aggregation`]: either a single scalar, or an
/// ordered percentile/quartile/quintile/decile series with a `locate` method.
#[derive(Clone, Debug)]
pub enum AggregateResult {
    Scalar(Value),
    Series(PercentileSeries),
}

impl AggregateResult {
    pub fn scalar(self) -> Option<Value> {
        match self {
            AggregateResult::Scalar(v) => Some(v),
            AggregateResult::Series(_) => None,
        }
    }
}

/// Boundary values for a percentile-family aggregation, ascending. `n`
/// boundaries partition the column into `n + 1` bins.
#[derive(Clone, Debug, PartialEq)]
pub struct PercentileSeries {
    pub edges: Vec<Decimal>,
}

impl PercentileSeries {
    /// 1-based bin index `v` falls into.
    pub fn locate(&self, v: Decimal) -> usize {
        let mut bin = 1;
        for edge in &self.edges {
            if v > *edge {
                bin += 1;
            } else {
                break;
            }
        }
        bin
    }

    pub fn get(&self, k: usize) -> Option<Decimal> {
        self.edges.get(k.checked_sub(1)?).copied()
    }
}

/// A column-reducer. Each variant validates against a table's schema before
/// running, and produces one [`AggregateResult`] per table.
#[derive(Clone)]
pub enum Aggregation {
    Summary {
        column: String,
        f: Arc<dyn Fn(&Column) -> Value + Send + Sync>,
    },
    HasNulls {
        column: String,
    },
    Any {
        column: String,
        test: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    },
    All {
        column: String,
        test: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    },
    Count {
        column: Option<String>,
        value: Option<Value>,
    },
    Min {
        column: String,
    },
    Max {
        column: String,
    },
    MaxLength {
        column: String,
    },
    MaxPrecision {
        column: String,
    },
    Sum {
        column: String,
    },
    Mean {
        column: String,
    },
    Median {
        column: String,
    },
    Mode {
        column: String,
    },
    Variance {
        column: String,
    },
    PopulationVariance {
        column: String,
    },
    StDev {
        column: String,
    },
    PopulationStDev {
        column: String,
    },
    Mad {
        column: String,
    },
    Iqr {
        column: String,
    },
    Percentiles {
        column: String,
    },
    Quartiles {
        column: String,
    },
    Quintiles {
        column: String,
    },
    Deciles {
        column: String,
    },
}

/// Min/Max accept any orderable scalar type (§4.4).
fn min_max_column(table: &Table, name: &str) -> TabulateResult<Column> {
    let column = table.column(name)?;
    match column.data_type() {
        DataType::Number | DataType::Date | DataType::DateTime | DataType::TimeDelta => Ok(column),
        other => Err(TabulateError::DataType {
            column: name.to_string(),
            expected: "Number, Date, DateTime, or TimeDelta",
            found: other.name(),
        }),
    }
}

/// Sum/Mean/Median accept Number or TimeDelta (§4.4).
fn summable_column(table: &Table, name: &str) -> TabulateResult<Column> {
    let column = table.column(name)?;
    match column.data_type() {
        DataType::Number | DataType::TimeDelta => Ok(column),
        other => Err(TabulateError::DataType {
            column: name.to_string(),
            expected: "Number or TimeDelta",
            found: other.name(),
        }),
    }
}

/// The purely-statistical aggregations (Mode/Variance/.../Deciles) are
/// Number-only.
fn numeric_column(table: &Table, name: &str) -> TabulateResult<Column> {
    table.require_data_type(name, DataType::Number, "Number")?;
    table.column(name)
}

/// Min/Max extreme over any orderable `Value` variant, nulls excluded.
/// Works directly off `Value`'s same-variant `PartialOrd` rather than the
/// Decimal-only `decimal_of`/`wrap_like` path, so it handles Date/DateTime
/// columns as well as Number/TimeDelta.
fn extreme_of(column: &Column, want_max: bool) -> Value {
    let mut best: Option<&Value> = None;
    for v in column.non_null_values() {
        best = Some(match best {
            None => v,
            Some(current) => match v.partial_cmp(current) {
                Some(std::cmp::Ordering::Greater) if want_max => v,
                Some(std::cmp::Ordering::Less) if !want_max => v,
                _ => current,
            },
        });
    }
    best.cloned().unwrap_or(Value::Null)
}

fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(d) => Some(*d),
        Value::TimeDelta(td) => Decimal::from_i64(td.0),
        _ => None,
    }
}

fn wrap_like(data_type: DataType, d: Decimal) -> Value {
    match data_type {
        DataType::TimeDelta => Value::TimeDelta(crate::value::TimeDelta(
            d.to_i64().unwrap_or_default(),
        )),
        _ => Value::Number(d),
    }
}

fn sorted_non_null(column: &Column) -> (Vec<Decimal>, bool) {
    let had_nulls = column.has_nulls();
    let mut values: Vec<Decimal> = column.non_null_values().filter_map(decimal_of).collect();
    values.sort();
    (values, had_nulls)
}

fn warn_if_nulls(column: &str, had_nulls: bool, name: &str) {
    if had_nulls {
        tracing::warn!(column, aggregation = name, "excluding null values from calculation");
    }
}

fn mean_of(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    Some(sum / Decimal::from(values.len()))
}

fn median_of(sorted: &[Decimal]) -> Option<Decimal> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / Decimal::from(2))
    }
}

fn percentile_of(sorted: &[Decimal], fraction: Decimal) -> Option<Decimal> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    if n == 1 {
        return Some(sorted[0]);
    }
    let rank = fraction * Decimal::from(n - 1);
    let lo = rank.floor();
    let hi = rank.ceil();
    let lo_idx = lo.to_usize().unwrap_or(0).min(n - 1);
    let hi_idx = hi.to_usize().unwrap_or(0).min(n - 1);
    if lo_idx == hi_idx {
        return Some(sorted[lo_idx]);
    }
    let frac = rank - lo;
    Some(sorted[lo_idx] + (sorted[hi_idx] - sorted[lo_idx]) * frac)
}

fn percentile_series(sorted: &[Decimal], marks: &[i32]) -> PercentileSeries {
    let edges = marks
        .iter()
        .filter_map(|m| percentile_of(sorted, Decimal::from(*m) / Decimal::from(100)))
        .collect();
    PercentileSeries { edges }
}

fn variance_of(values: &[Decimal], sample: bool) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    if sample && n < 2 {
        return None;
    }
    let mean = mean_of(values)?;
    let sum_sq: Decimal = values.iter().map(|v| (*v - mean) * (*v - mean)).sum();
    let denom = if sample { n - 1 } else { n };
    Some(sum_sq / Decimal::from(denom))
}

fn decimal_sqrt(d: Decimal) -> Option<Decimal> {
    d.sqrt()
}

fn mad_of(sorted: &[Decimal]) -> Option<Decimal> {
    let median = median_of(sorted)?;
    let mut deviations: Vec<Decimal> = sorted.iter().map(|v| (*v - median).abs()).collect();
    deviations.sort();
    median_of(&deviations)
}

impl Aggregation {
    pub fn validate(&self, table: &Table) -> TabulateResult<()> {
        match self {
            Aggregation::Min { column } | Aggregation::Max { column } => {
                min_max_column(table, column)?;
                Ok(())
            }
            Aggregation::Sum { column } | Aggregation::Mean { column } | Aggregation::Median { column } => {
                summable_column(table, column)?;
                Ok(())
            }
            Aggregation::Mode { column }
            | Aggregation::Variance { column }
            | Aggregation::PopulationVariance { column }
            | Aggregation::StDev { column }
            | Aggregation::PopulationStDev { column }
            | Aggregation::Mad { column }
            | Aggregation::Iqr { column }
            | Aggregation::Percentiles { column }
            | Aggregation::Quartiles { column }
            | Aggregation::Quintiles { column }
            | Aggregation::Deciles { column } => {
                numeric_column(table, column)?;
                Ok(())
            }
            Aggregation::MaxLength { column } => {
                table.require_data_type(column, DataType::Text, "Text")
            }
            Aggregation::MaxPrecision { column } => {
                table.require_data_type(column, DataType::Number, "Number")
            }
            Aggregation::HasNulls { column }
            | Aggregation::Any { column, .. }
            | Aggregation::All { column, .. }
            | Aggregation::Summary { column, .. } => {
                table.column(column).map(|_| ())
            }
            Aggregation::Count { column, .. } => match column {
                Some(c) => table.column(c).map(|_| ()),
                None => Ok(()),
            },
        }
    }

    pub fn run(&self, table: &Table) -> TabulateResult<AggregateResult> {
        self.validate(table)?;
        let scalar = |v: Value| AggregateResult::Scalar(v);
        match self {
            Aggregation::Summary { column, f } => {
                let col = table.column(column)?;
                Ok(scalar(f(&col)))
            }
            Aggregation::HasNulls { column } => {
                let col = table.column(column)?;
                Ok(scalar(Value::Boolean(col.has_nulls())))
            }
            Aggregation::Any { column, test } => {
                let col = table.column(column)?;
                let result = col.values().any(|v| test(v));
                Ok(scalar(Value::Boolean(result)))
            }
            Aggregation::All { column, test } => {
                let col = table.column(column)?;
                let result = col.values().all(|v| test(v));
                Ok(scalar(Value::Boolean(result)))
            }
            Aggregation::Count { column, value } => match column {
                None => Ok(scalar(Value::Number(Decimal::from(table.len())))),
                Some(name) => {
                    let col = table.column(name)?;
                    let count = match value {
                        Some(target) => col.values().filter(|v| *v == target).count(),
                        None => col.values().filter(|v| v.is_null()).count(),
                    };
                    Ok(scalar(Value::Number(Decimal::from(count))))
                }
            },
            Aggregation::Min { column } => {
                let col = min_max_column(table, column)?;
                Ok(scalar(extreme_of(&col, false)))
            }
            Aggregation::Max { column } => {
                let col = min_max_column(table, column)?;
                Ok(scalar(extreme_of(&col, true)))
            }
            Aggregation::MaxLength { column } => {
                let col = table.column(column)?;
                let max = col
                    .non_null_values()
                    .filter_map(|v| match v {
                        Value::Text(s) => Some(s.chars().count()),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(0);
                Ok(scalar(Value::Number(Decimal::from(max))))
            }
            Aggregation::MaxPrecision { column } => {
                let col = table.column(column)?;
                let max = col
                    .non_null_values()
                    .filter_map(|v| match v {
                        Value::Number(d) => Some(d.scale()),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(0);
                Ok(scalar(Value::Number(Decimal::from(max))))
            }
            Aggregation::Sum { column } => {
                let col = summable_column(table, column)?;
                let dtype = col.data_type();
                let (values, _) = sorted_non_null(&col);
                let sum: Decimal = values.iter().sum();
                Ok(scalar(wrap_like(dtype, sum)))
            }
            Aggregation::Mean { column } => {
                let col = summable_column(table, column)?;
                let dtype = col.data_type();
                let (values, had_nulls) = sorted_non_null(&col);
                warn_if_nulls(column, had_nulls, "Mean");
                Ok(scalar(mean_of(&values).map(|d| wrap_like(dtype, d)).unwrap_or(Value::Null)))
            }
            Aggregation::Median { column } => {
                let col = summable_column(table, column)?;
                let dtype = col.data_type();
                let (values, had_nulls) = sorted_non_null(&col);
                warn_if_nulls(column, had_nulls, "Median");
                Ok(scalar(median_of(&values).map(|d| wrap_like(dtype, d)).unwrap_or(Value::Null)))
            }
            Aggregation::Mode { column } => {
                let col = numeric_column(table, column)?;
                let dtype = col.data_type();
                let (values, had_nulls) = sorted_non_null(&col);
                warn_if_nulls(column, had_nulls, "Mode");
                if values.is_empty() {
                    return Ok(scalar(Value::Null));
                }
                let mut counts: std::collections::BTreeMap<Decimal, usize> = std::collections::BTreeMap::new();
                for v in &values {
                    *counts.entry(*v).or_insert(0) += 1;
                }
                let max_count = counts.values().copied().max().unwrap_or(0);
                // Smallest-value-wins tie-break: BTreeMap iterates ascending.
                let winner = counts.into_iter().find(|(_, c)| *c == max_count).map(|(v, _)| v);
                Ok(scalar(winner.map(|d| wrap_like(dtype, d)).unwrap_or(Value::Null)))
            }
            Aggregation::Variance { column } => {
                let col = numeric_column(table, column)?;
                let (values, had_nulls) = sorted_non_null(&col);
                warn_if_nulls(column, had_nulls, "Variance");
                Ok(scalar(variance_of(&values, true).map(Value::Number).unwrap_or(Value::Null)))
            }
            Aggregation::PopulationVariance { column } => {
                let col = numeric_column(table, column)?;
                let (values, had_nulls) = sorted_non_null(&col);
                warn_if_nulls(column, had_nulls, "PopulationVariance");
                Ok(scalar(variance_of(&values, false).map(Value::Number).unwrap_or(Value::Null)))
            }
            Aggregation::StDev { column } => {
                let col = numeric_column(table, column)?;
                let (values, had_nulls) = sorted_non_null(&col);
                warn_if_nulls(column, had_nulls, "StDev");
                Ok(scalar(
                    variance_of(&values, true)
                        .and_then(decimal_sqrt)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                ))
            }
            Aggregation::PopulationStDev { column } => {
                let col = numeric_column(table, column)?;
                let (values, had_nulls) = sorted_non_null(&col);
                warn_if_nulls(column, had_nulls, "PopulationStDev");
                Ok(scalar(
                    variance_of(&values, false)
                        .and_then(decimal_sqrt)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                ))
            }
            Aggregation::Mad { column } => {
                let col = numeric_column(table, column)?;
                let (values, had_nulls) = sorted_non_null(&col);
                warn_if_nulls(column, had_nulls, "MAD");
                Ok(scalar(mad_of(&values).map(Value::Number).unwrap_or(Value::Null)))
            }
            Aggregation::Iqr { column } => {
                let col = numeric_column(table, column)?;
                let (values, had_nulls) = sorted_non_null(&col);
                warn_if_nulls(column, had_nulls, "IQR");
                let q1 = percentile_of(&values, Decimal::new(25, 2));
                let q3 = percentile_of(&values, Decimal::new(75, 2));
                Ok(scalar(match (q1, q3) {
                    (Some(a), Some(b)) => Value::Number(b - a),
                    _ => Value::Null,
                }))
            }
            Aggregation::Percentiles { column } => {
                let col = numeric_column(table, column)?;
                let (values, _) = sorted_non_null(&col);
                Ok(AggregateResult::Series(percentile_series(&values, &(1..100).collect::<Vec<_>>())))
            }
            Aggregation::Quartiles { column } => {
                let col = numeric_column(table, column)?;
                let (values, _) = sorted_non_null(&col);
                Ok(AggregateResult::Series(percentile_series(&values, &[25, 50, 75])))
            }
            Aggregation::Quintiles { column } => {
                let col = numeric_column(table, column)?;
                let (values, _) = sorted_non_null(&col);
                Ok(AggregateResult::Series(percentile_series(&values, &[20, 40, 60, 80])))
            }
            Aggregation::Deciles { column } => {
                let col = numeric_column(table, column)?;
                let (values, _) = sorted_non_null(&col);
                Ok(AggregateResult::Series(percentile_series(&values, &[10, 20, 30, 40, 50, 60, 70, 80, 90])))
            }
        }
    }
}
