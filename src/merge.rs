use std::{collections::BTreeMap, fmt};

use crate::{
    decimal::{mean_scaled, Decimal},
    table::{Aggregate, AggregateTable},
};

/// Final per-station results, ordered by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Aggregation {
    stations: BTreeMap<String, Aggregate>,
}

impl Aggregation {
    /// Folds per-worker tables together by station name. The order of `tables` does not matter.
    pub fn merge(tables: impl IntoIterator<Item = AggregateTable>) -> Self {
        let stations = tables.into_iter().fold(
            BTreeMap::<String, Aggregate>::new(),
            |mut merged, table| {
                for (name, stats) in table.into_entries() {
                    merged
                        .entry(name)
                        .and_modify(|e| e.merge(&stats))
                        .or_insert(stats);
                }
                merged
            },
        );
        Self { stations }
    }

    pub fn get(&self, name: &str) -> Option<&Aggregate> {
        self.stations.get(name)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Aggregate)> {
        self.stations.iter().map(|(n, a)| (n.as_str(), a))
    }
}

/// Format: "{first=min/mean/max, second=min/mean/max, etc=min/mean/max}"
impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, stats)) in self.stations.iter().enumerate() {
            debug_assert!(stats.count > 0, "station `{name}` has no measurements");
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{name}={}/{}/{}",
                Decimal(stats.min as i64),
                Decimal(mean_scaled(stats.sum, stats.count)),
                Decimal(stats.max as i64)
            )?;
        }
        f.write_str("}")
    }
}
