//! `Table::bins` — histogramming a numeric column (§4.2.2).

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::TabulateResult;
use crate::table::Table;
use crate::value::{DataType, Value};

/// The boundaries and labels of a bin split, as produced by `Table::bins`.
#[derive(Clone, Debug, PartialEq)]
pub struct BinSpec {
    pub start: Decimal,
    pub end: Decimal,
    pub count: usize,
    pub edges: Vec<Decimal>,
}

impl BinSpec {
    fn width(&self) -> Decimal {
        (self.end - self.start) / Decimal::from(self.count)
    }

    /// Half-open `[lo, hi)` label for bin `i` (0-based); the last bin is
    /// closed on both ends.
    pub fn label(&self, i: usize) -> String {
        let lo = self.edges[i];
        let hi = self.edges[i + 1];
        if i + 1 == self.count {
            format!("[{lo}, {hi}]")
        } else {
            format!("[{lo}, {hi})")
        }
    }

    /// Returns the 0-based bin index `v` falls into, or `None` if out of range.
    pub fn locate(&self, v: Decimal) -> Option<usize> {
        if v < self.start || v > self.end {
            return None;
        }
        let width = self.width();
        if width == Decimal::ZERO {
            return Some(0);
        }
        let mut idx = ((v - self.start) / width).to_i64().unwrap_or(0) as usize;
        if idx >= self.count {
            idx = self.count - 1;
        }
        while idx > 0 && v < self.edges[idx] {
            idx -= 1;
        }
        while idx + 1 < self.count && v >= self.edges[idx + 1] {
            idx += 1;
        }
        Some(idx)
    }
}

fn fractional_digits(d: Decimal) -> u32 {
    d.normalize().scale()
}

fn min_precision(values: &[Decimal]) -> u32 {
    values.iter().map(|v| fractional_digits(*v)).min().unwrap_or(0)
}

fn round_down(d: Decimal, scale: u32) -> Decimal {
    let factor = Decimal::from(10i64.pow(scale.min(18)));
    (d * factor).floor() / factor
}

fn round_up(d: Decimal, scale: u32) -> Decimal {
    let factor = Decimal::from(10i64.pow(scale.min(18)));
    (d * factor).ceil() / factor
}

impl Table {
    /// Splits `column` into `count` half-open bins over `[start, end]`,
    /// deriving missing boundaries from the column's observed range.
    /// Returns a two-column `(interval_label, Count)` table plus an
    /// `out_of_range` and a `null` category appended last.
    pub fn bins(
        &self,
        column: &str,
        count: usize,
        start: Option<Decimal>,
        end: Option<Decimal>,
    ) -> TabulateResult<Table> {
        let col = self.column(column)?;
        self.require_data_type(column, DataType::Number, "Number")?;

        let values: Vec<Decimal> = col
            .non_null_values()
            .filter_map(|v| match v {
                Value::Number(d) => Some(*d),
                _ => None,
            })
            .collect();
        let has_nulls = col.has_nulls();

        let scale = min_precision(&values);
        let observed_min = values.iter().copied().fold(None, |acc: Option<Decimal>, v| {
            Some(acc.map_or(v, |a| a.min(v)))
        });
        let observed_max = values.iter().copied().fold(None, |acc: Option<Decimal>, v| {
            Some(acc.map_or(v, |a| a.max(v)))
        });

        let (start, end) = match (start, end) {
            (Some(s), Some(e)) => (s, e),
            (Some(s), None) => (s, round_up(observed_max.unwrap_or(s), scale)),
            (None, Some(e)) => (round_down(observed_min.unwrap_or(e), scale), e),
            (None, None) => (
                round_down(observed_min.unwrap_or(Decimal::ZERO), scale),
                round_up(observed_max.unwrap_or(Decimal::ZERO), scale),
            ),
        };

        let count = count.max(1);
        let width = (end - start) / Decimal::from(count);
        let mut edges = Vec::with_capacity(count + 1);
        for i in 0..=count {
            edges.push(start + width * Decimal::from(i));
        }
        let spec = BinSpec { start, end, count, edges };

        let mut bucket_counts = vec![0i64; count];
        let mut out_of_range = 0i64;
        let mut null_count = 0i64;
        for v in col.values() {
            match v {
                Value::Null => null_count += 1,
                Value::Number(d) => match spec.locate(*d) {
                    Some(idx) => bucket_counts[idx] += 1,
                    None => out_of_range += 1,
                },
                _ => {}
            }
        }
        let _ = has_nulls;

        let mut rows: Vec<Vec<Value>> = Vec::with_capacity(count + 2);
        for (i, bucket_count) in bucket_counts.iter().enumerate() {
            rows.push(vec![Value::Text(spec.label(i)), Value::Number(Decimal::from(*bucket_count))]);
        }
        if out_of_range > 0 {
            rows.push(vec![Value::Text("out_of_range".to_string()), Value::Number(Decimal::from(out_of_range))]);
        }
        if null_count > 0 {
            rows.push(vec![Value::Text("null".to_string()), Value::Number(Decimal::from(null_count))]);
        }

        Table::from_typed_rows(
            vec!["interval".to_string(), "count".to_string()],
            vec![DataType::Text, DataType::Number],
            rows,
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{CastOptions, DataType};

    fn sample() -> Table {
        let rows = vec![
            vec!["1".to_string()],
            vec!["2".to_string()],
            vec!["3".to_string()],
            vec!["9".to_string()],
            vec!["".to_string()],
        ];
        Table::from_raw_rows(
            vec!["n".to_string()],
            vec![DataType::Number],
            rows,
            None,
            &CastOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn bins_counts_and_null_category() {
        let t = sample();
        let binned = t.bins("n", 2, Some(Decimal::from(1)), Some(Decimal::from(5))).unwrap();
        assert_eq!(binned.len(), 4); // two bins + out_of_range + null
        let total: i64 = binned
            .rows()
            .filter_map(|r| match r.get("count") {
                Some(Value::Number(d)) => d.to_i64(),
                _ => None,
            })
            .sum();
        assert_eq!(total, 5);
    }
}
