//! [`TableSet`]: an ordered, keyed collection of tables sharing a schema,
//! with support for nesting and element-wise ("proxy") operations (§4.4).

use indexmap::IndexMap;

use crate::aggregation::{AggregateResult, Aggregation};
use crate::computation::Computation;
use crate::error::{TabulateError, TabulateResult};
use crate::table::{JoinOptions, Table};
use crate::value::{DataType, Value};

/// A member of a [`TableSet`]: either a leaf table or a further nested set
/// (produced by grouping an already-grouped set).
#[derive(Clone)]
pub enum TableSetMember {
    Table(Table),
    Nested(TableSet),
}

/// An ordered mapping from a typed grouping key to a [`Table`] (or, when
/// nested, to another `TableSet`). All member tables share one schema.
#[derive(Clone)]
pub struct TableSet {
    key_name: String,
    key_type: DataType,
    members: IndexMap<Value, TableSetMember>,
}

/// The Table methods that are safe to proxy element-wise across a
/// `TableSet` because they return a `Table` of the same shape (§9's
/// `@allow_tableset_proxy` migration note: one registry drives both
/// dispatch, below, and this list, used for documentation/tests).
pub const PROXIED_METHODS: &[&str] = &[
    "select", "exclude", "where_rows", "limit", "order_by_column",
    "order_by_columns", "distinct", "distinct_by_column", "rename", "compute",
];

impl TableSet {
    pub fn new(key_name: impl Into<String>, key_type: DataType, members: IndexMap<Value, Table>) -> Self {
        Self {
            key_name: key_name.into(),
            key_type,
            members: members
                .into_iter()
                .map(|(k, v)| (k, TableSetMember::Table(v)))
                .collect(),
        }
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn key_type(&self) -> DataType {
        self.key_type
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.members.keys()
    }

    pub fn get(&self, key: &Value) -> Option<&TableSetMember> {
        self.members.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &TableSetMember)> {
        self.members.iter()
    }

    /// Subdivides each member, yielding a TableSet-of-TableSets.
    pub fn group_by_column(&self, name: &str) -> TabulateResult<TableSet> {
        let mut new_members = IndexMap::new();
        for (k, member) in &self.members {
            let nested = match member {
                TableSetMember::Table(t) => t.group_by_column(name)?,
                TableSetMember::Nested(ts) => ts.group_by_column(name)?,
            };
            new_members.insert(k.clone(), TableSetMember::Nested(nested));
        }
        Ok(TableSet {
            key_name: self.key_name.clone(),
            key_type: self.key_type,
            members: new_members,
        })
    }

    /// One row per group (or, for nested sets, recursively one row per leaf
    /// group with every ancestor key as a leading column). Aggregated
    /// outputs follow in declared order.
    pub fn aggregate(&self, specs: &[(&str, Aggregation)]) -> TabulateResult<Table> {
        let mut names: Vec<String> = vec![self.key_name.clone()];
        let mut types: Vec<DataType> = vec![self.key_type];
        let mut rows: Vec<Vec<Value>> = Vec::new();
        let mut schema_set = false;

        for (key, member) in &self.members {
            match member {
                TableSetMember::Table(t) => {
                    let agg = t.aggregate(specs)?;
                    if !schema_set {
                        for (name, result) in &agg {
                            names.push(name.clone());
                            types.push(scalar_type(result));
                        }
                        schema_set = true;
                    }
                    let mut row = vec![key.clone()];
                    for (_, result) in &agg {
                        row.push(result.clone().scalar().ok_or(TabulateError::UnsupportedAggregation {
                            method: "Percentiles-family aggregations are not valid inside TableSet::aggregate",
                        })?);
                    }
                    rows.push(row);
                }
                TableSetMember::Nested(nested) => {
                    let sub_table = nested.aggregate(specs)?;
                    if !schema_set {
                        names = std::iter::once(self.key_name.clone())
                            .chain(sub_table.schema().names().into_iter().cloned())
                            .collect();
                        types = std::iter::once(self.key_type)
                            .chain(sub_table.schema().types())
                            .collect();
                        schema_set = true;
                    }
                    for row in sub_table.rows() {
                        let mut full = vec![key.clone()];
                        full.extend(row.values().cloned());
                        rows.push(full);
                    }
                }
            }
        }
        Table::from_typed_rows(names, types, rows, None)
    }

    /// Aggregates each member per `specs`, keeping only those whose
    /// aggregated row satisfies `predicate`.
    pub fn having<F>(&self, specs: &[(&str, Aggregation)], predicate: F) -> TabulateResult<TableSet>
    where
        F: Fn(&IndexMap<String, AggregateResult>) -> bool + Copy,
    {
        let mut new_members = IndexMap::new();
        for (k, member) in &self.members {
            match member {
                TableSetMember::Table(t) => {
                    let agg = t.aggregate(specs)?;
                    if predicate(&agg) {
                        new_members.insert(k.clone(), member.clone());
                    }
                }
                TableSetMember::Nested(ts) => {
                    let filtered = ts.having(specs, predicate)?;
                    new_members.insert(k.clone(), TableSetMember::Nested(filtered));
                }
            }
        }
        Ok(TableSet {
            key_name: self.key_name.clone(),
            key_type: self.key_type,
            members: new_members,
        })
    }

    /// Vertical concatenation of every member table (reverse of `group_by`).
    pub fn merge(&self) -> TabulateResult<Table> {
        let mut tables = Vec::new();
        self.collect_tables(&mut tables);
        let refs: Vec<&Table> = tables.iter().collect();
        Table::merge(&refs)
    }

    fn collect_tables(&self, out: &mut Vec<Table>) {
        for member in self.members.values() {
            match member {
                TableSetMember::Table(t) => out.push(t.clone()),
                TableSetMember::Nested(ts) => ts.collect_tables(out),
            }
        }
    }

    fn map_tables<F>(&self, f: &F) -> TabulateResult<TableSet>
    where
        F: Fn(&Table) -> TabulateResult<Table>,
    {
        let mut new_members = IndexMap::new();
        for (k, member) in &self.members {
            let mapped = match member {
                TableSetMember::Table(t) => TableSetMember::Table(f(t)?),
                TableSetMember::Nested(ts) => TableSetMember::Nested(ts.map_tables(f)?),
            };
            new_members.insert(k.clone(), mapped);
        }
        Ok(TableSet {
            key_name: self.key_name.clone(),
            key_type: self.key_type,
            members: new_members,
        })
    }

    pub fn select(&self, names: &[&str]) -> TabulateResult<TableSet> {
        self.map_tables(&|t: &Table| t.select(names))
    }

    pub fn exclude(&self, names: &[&str]) -> TabulateResult<TableSet> {
        self.map_tables(&|t: &Table| t.exclude(names))
    }

    pub fn where_rows<F: Fn(&crate::row::Row) -> bool>(&self, pred: F) -> TabulateResult<TableSet> {
        self.map_tables(&|t: &Table| Ok(t.where_rows(&pred)))
    }

    pub fn limit(&self, n: usize, start: usize, step: usize) -> TabulateResult<TableSet> {
        self.map_tables(&|t: &Table| Ok(t.limit(n, start, step)))
    }

    pub fn order_by_column(&self, name: &str, reverse: bool) -> TabulateResult<TableSet> {
        self.map_tables(&|t: &Table| t.order_by_column(name, reverse))
    }

    pub fn order_by_columns(&self, names: &[&str], reverse: bool) -> TabulateResult<TableSet> {
        self.map_tables(&|t: &Table| t.order_by_columns(names, reverse))
    }

    pub fn distinct(&self) -> TabulateResult<TableSet> {
        self.map_tables(&|t: &Table| Ok(t.distinct()))
    }

    pub fn distinct_by_column(&self, name: &str) -> TabulateResult<TableSet> {
        self.map_tables(&|t: &Table| t.distinct_by_column(name))
    }

    pub fn rename(&self, column_names: Option<Vec<String>>, slug_columns: bool) -> TabulateResult<TableSet> {
        self.map_tables(&|t: &Table| t.rename(column_names.clone(), None, slug_columns, false))
    }

    pub fn compute(&self, specs: &[(&str, Computation)], replace: bool) -> TabulateResult<TableSet> {
        self.map_tables(&|t: &Table| t.compute(specs, replace))
    }

    /// Rejects an operation that would produce a non-`Table` (scalar,
    /// TableSet-shape-changing) result if called through the proxy.
    pub fn reject_unsupported(method: &'static str) -> TabulateError {
        TabulateError::UnsupportedAggregation { method }
    }

    #[allow(dead_code)]
    fn join_is_not_proxied(&self, _opts: &JoinOptions) {}
}

fn scalar_type(result: &AggregateResult) -> DataType {
    match result {
        AggregateResult::Scalar(v) => v.data_type().unwrap_or(DataType::Text),
        AggregateResult::Series(_) => DataType::Text,
    }
}
