//! `Table::aggregate` — applying one or more [`Aggregation`]s (§4.4).

use indexmap::IndexMap;

use crate::aggregation::{AggregateResult, Aggregation};
use crate::error::TabulateResult;
use crate::table::Table;

impl Table {
    /// Applies a single [`Aggregation`] over the whole table.
    pub fn aggregate_one(&self, aggregation: &Aggregation) -> TabulateResult<AggregateResult> {
        aggregation.run(self)
    }

    /// Applies several named [`Aggregation`]s, returning a name→value map in
    /// declared order.
    pub fn aggregate(
        &self,
        specs: &[(&str, Aggregation)],
    ) -> TabulateResult<IndexMap<String, AggregateResult>> {
        let mut out = IndexMap::new();
        for (name, aggregation) in specs {
            out.insert((*name).to_string(), aggregation.run(self)?);
        }
        Ok(out)
    }
}
