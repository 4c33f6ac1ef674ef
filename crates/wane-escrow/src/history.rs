//! Append-only point histories and the slope-change schedule.
//!
//! Histories are contiguous vectors searched with `partition_point`, so
//! lookups by time or by sequence number are O(log n).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wane_core::types::{Amount, Timestamp};

use crate::point::Point;

/// Points ordered by strictly increasing timestamp.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct PointHistory {
    points: Vec<Point>,
}

impl PointHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(origin: Point) -> Self {
        Self { points: vec![origin] }
    }

    /// Append `point`, replacing the tail when it carries the same timestamp.
    ///
    /// A replaced tail keeps its original `seq`, so every sequence position
    /// written at one timestamp resolves to the final state at that
    /// timestamp. Callers guarantee `point.ts >= latest().ts`.
    pub fn record(&mut self, mut point: Point) {
        debug_assert!(self.points.last().is_none_or(|last| last.ts <= point.ts));
        match self.points.last_mut() {
            Some(last) if last.ts == point.ts => {
                point.seq = last.seq;
                *last = point;
            }
            _ => self.points.push(point),
        }
    }

    pub fn latest(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn first(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Latest point with `ts <= t`.
    pub fn find_at_time(&self, t: Timestamp) -> Option<&Point> {
        let idx = self.points.partition_point(|p| p.ts <= t);
        idx.checked_sub(1).map(|i| &self.points[i])
    }

    /// Latest point written by a call with sequence `<= seq`.
    pub fn find_at_seq(&self, seq: u64) -> Option<&Point> {
        let idx = self.points.partition_point(|p| p.seq <= seq);
        idx.checked_sub(1).map(|i| &self.points[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }
}

/// Pending slope decrements keyed by bucket-aligned time.
///
/// Each entry is the total slope of locks (or votes) that reach zero at that
/// bucket. Entries are consumed when the global walk passes them.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct SlopeSchedule {
    changes: BTreeMap<Timestamp, Amount>,
}

impl SlopeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, t: Timestamp) -> Amount {
        self.changes.get(&t).copied().unwrap_or(0)
    }

    pub fn add(&mut self, t: Timestamp, slope: Amount) {
        if slope == 0 {
            return;
        }
        let entry = self.changes.entry(t).or_default();
        *entry = entry.saturating_add(slope);
    }

    /// Remove `slope` previously added at `t`. Drops the entry at zero.
    pub fn cancel(&mut self, t: Timestamp, slope: Amount) {
        if let Some(entry) = self.changes.get_mut(&t) {
            *entry = entry.saturating_sub(slope);
            if *entry == 0 {
                self.changes.remove(&t);
            }
        }
    }

    /// Consume the entry at `t`.
    pub fn take(&mut self, t: Timestamp) -> Amount {
        self.changes.remove(&t).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
