//! Bucket-indexed weight histories.
//!
//! Gauge weights live on the weekly bucket grid rather than continuous time:
//! a [`DecayingWeight`] holds one `(bias, slope)` point per bucket and drains
//! its own slope-change schedule as it is caught up; a [`LevelWeight`] is a
//! step function whose value only changes when an admin sets it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wane_core::constants::WEEK;
use wane_core::types::{Amount, Timestamp, bucket_floor};

/// Sorted `(bucket, value)` pairs with binary-search access.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct BucketSeries<T> {
    entries: Vec<(Timestamp, T)>,
}

impl<T> Default for BucketSeries<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Copy + Default> BucketSeries<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value recorded exactly at `bucket`, or the default.
    pub fn get(&self, bucket: Timestamp) -> T {
        self.entries
            .binary_search_by_key(&bucket, |(b, _)| *b)
            .map_or_else(|_| T::default(), |i| self.entries[i].1)
    }

    /// Most recent value recorded at or before `t`.
    pub fn at_or_before(&self, t: Timestamp) -> Option<(Timestamp, T)> {
        let idx = self.entries.partition_point(|(b, _)| *b <= t);
        idx.checked_sub(1).map(|i| self.entries[i])
    }

    pub fn set(&mut self, bucket: Timestamp, value: T) {
        match self.entries.binary_search_by_key(&bucket, |(b, _)| *b) {
            Ok(i) => self.entries[i].1 = value,
            Err(i) => self.entries.insert(i, (bucket, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Weight line on the bucket grid.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, bincode::Encode,
    bincode::Decode,
)]
pub struct WeightPoint {
    pub bias: Amount,
    pub slope: Amount,
}

impl WeightPoint {
    /// Advance one bucket: decay the bias, then drop slope that ends at the
    /// new bucket. A bias that would cross zero clears the whole point.
    fn step(self, ending_slope: Amount) -> Self {
        let d_bias = self.slope.saturating_mul(WEEK as Amount);
        if self.bias > d_bias {
            Self { bias: self.bias - d_bias, slope: self.slope.saturating_sub(ending_slope) }
        } else {
            Self::default()
        }
    }
}

/// A decaying weight with its own slope-change schedule.
///
/// `cursor` is the latest bucket with a materialised point; it is always
/// the first bucket strictly after the last catch-up time.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct DecayingWeight {
    points: BucketSeries<WeightPoint>,
    cursor: Timestamp,
    changes: BTreeMap<Timestamp, Amount>,
}

impl DecayingWeight {
    /// Start tracking at bucket `start` with zero weight.
    pub fn new(start: Timestamp) -> Self {
        Self { points: BucketSeries::new(), cursor: bucket_floor(start), changes: BTreeMap::new() }
    }

    pub fn cursor(&self) -> Timestamp {
        self.cursor
    }

    /// Materialise one point per bucket up to the first bucket after `now`
    /// and return it.
    pub fn catch_up(&mut self, now: Timestamp) -> WeightPoint {
        let mut t = self.cursor;
        let mut pt = self.points.get(t);
        while t <= now {
            t += WEEK;
            pt = pt.step(self.changes.get(&t).copied().unwrap_or(0));
            self.points.set(t, pt);
        }
        self.cursor = t;
        pt
    }

    /// Weight at the bucket containing `t`, projected forward without
    /// writing when `t` lies beyond the cursor.
    pub fn value_at(&self, t: Timestamp) -> WeightPoint {
        let bucket = bucket_floor(t);
        if bucket <= self.cursor {
            return self.points.get(bucket);
        }
        let mut at = self.cursor;
        let mut pt = self.points.get(at);
        while at < bucket {
            at += WEEK;
            pt = pt.step(self.changes.get(&at).copied().unwrap_or(0));
            if pt == WeightPoint::default() {
                break;
            }
        }
        pt
    }

    /// Overwrite the point at `bucket` (which must be the cursor).
    pub fn set_point(&mut self, bucket: Timestamp, point: WeightPoint) {
        debug_assert_eq!(bucket, self.cursor);
        self.points.set(bucket, point);
    }

    pub fn scheduled_change(&self, t: Timestamp) -> Amount {
        self.changes.get(&t).copied().unwrap_or(0)
    }

    pub fn schedule(&mut self, t: Timestamp, slope: Amount) {
        if slope == 0 {
            return;
        }
        let entry = self.changes.entry(t).or_default();
        *entry = entry.saturating_add(slope);
    }

    pub fn cancel(&mut self, t: Timestamp, slope: Amount) {
        if let Some(entry) = self.changes.get_mut(&t) {
            *entry = entry.saturating_sub(slope);
            if *entry == 0 {
                self.changes.remove(&t);
            }
        }
    }
}

/// A non-decaying weight that changes only when set.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct LevelWeight {
    levels: BucketSeries<Amount>,
}

impl LevelWeight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight in force from `bucket` onwards.
    pub fn set(&mut self, bucket: Timestamp, weight: Amount) {
        self.levels.set(bucket, weight);
    }

    pub fn value_at(&self, t: Timestamp) -> Amount {
        self.levels.at_or_before(bucket_floor(t)).map_or(0, |(_, w)| w)
    }
}
