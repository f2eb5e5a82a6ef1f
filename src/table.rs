use log::debug;
use rustc_hash::FxHashMap;

use crate::{
    decimal::Scaled,
    error::{Error, Result},
};

/// Running min/max/sum/count for one station.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aggregate {
    pub min: Scaled,
    pub max: Scaled,
    pub sum: i64,
    pub count: u64,
}

impl Default for Aggregate {
    fn default() -> Self {
        Self {
            min: Scaled::MAX,
            max: Scaled::MIN,
            sum: 0,
            count: 0,
        }
    }
}

impl Aggregate {
    #[inline]
    pub fn record(&mut self, measurement: Scaled) {
        self.count += 1;
        self.sum += measurement as i64;
        self.min = self.min.min(measurement);
        self.max = self.max.max(measurement);
    }

    pub fn merge(&mut self, other: &Aggregate) {
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

struct Station {
    name: String,
    stats: Aggregate,
}

/// Applied to a hash whose slot already belongs to a different name.
const REPROBE_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// A single worker's stations, keyed by the rolling hash of the name.
///
/// Names are only decoded into a `String` the first time their hash shows up. A hit is checked
/// against the stored name bytes; on a genuine collision the hash is perturbed and probed again,
/// so two names never share one aggregate.
pub struct AggregateTable {
    slots: FxHashMap<u64, u32>,
    stations: Vec<Station>,
}

impl Default for AggregateTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateTable {
    pub fn new() -> Self {
        let mut slots = FxHashMap::default();
        slots.reserve(4 * 128);
        Self {
            slots,
            stations: Vec::with_capacity(4 * 128),
        }
    }

    /// Returns the slot index for `name`, creating an empty aggregate on first sight.
    /// `line_offset` is only used to report an invalid name.
    #[inline]
    pub fn resolve(&mut self, hash: u64, name: &[u8], line_offset: u64) -> Result<usize> {
        let mut probe = hash;
        loop {
            match self.slots.get(&probe) {
                Some(&idx) if self.stations[idx as usize].name.as_bytes() == name => {
                    return Ok(idx as usize)
                }
                Some(&idx) => {
                    debug!(
                        "hash {probe:#x} shared by `{}` and a new name at offset {line_offset}",
                        self.stations[idx as usize].name
                    );
                    probe = probe.rotate_left(29) ^ REPROBE_SALT;
                }
                None => return self.insert(probe, name, line_offset),
            }
        }
    }

    #[cold]
    fn insert(&mut self, hash: u64, name: &[u8], line_offset: u64) -> Result<usize> {
        let name = std::str::from_utf8(name)
            .map_err(|_| Error::InvalidKey {
                offset: line_offset,
            })?
            .to_owned();
        let idx = self.stations.len();
        self.stations.push(Station {
            name,
            stats: Aggregate::default(),
        });
        self.slots.insert(hash, idx as u32);
        Ok(idx)
    }

    #[inline]
    pub fn stats_mut(&mut self, idx: usize) -> &mut Aggregate {
        &mut self.stations[idx].stats
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Aggregate)> {
        self.stations.iter().map(|s| (s.name.as_str(), &s.stats))
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, Aggregate)> {
        self.stations.into_iter().map(|s| (s.name, s.stats))
    }
}
