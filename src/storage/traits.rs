// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Storage collaborator traits
//!
//! The engine never decodes blocks itself. A [`CandidateSource`] yields
//! decoded traces for a time range; an optional [`StorageIndex`] narrows
//! the candidates using the conditions extracted from a query.

use std::fmt;
use std::sync::Arc;

use crate::core::Result;
use crate::executor::FetchConditions;
use crate::model::{Trace, TraceId};

/// Half-open `[start, end)` window in unix nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    pub start: u64,
    pub end: u64,
}

impl TimeRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// The unbounded range
    pub fn all() -> Self {
        Self {
            start: 0,
            end: u64::MAX,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start == 0 && self.end == u64::MAX
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Nanoseconds covered
    pub fn width(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// True when a trace spanning `[start, end]` overlaps this range
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        start < self.end && end >= self.start
    }

    /// Intersection with another range
    pub fn clamp(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        }
    }

    /// Smallest range covering both
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Split into at most `shards` adjacent windows, newest first
    ///
    /// Windows never get narrower than one nanosecond, so short ranges
    /// yield fewer windows.
    pub fn split_newest_first(&self, shards: usize) -> Vec<TimeRange> {
        if self.is_empty() {
            return Vec::new();
        }
        let shards = (shards.max(1) as u64).min(self.width());
        let step = self.width() / shards;
        let mut windows = Vec::with_capacity(shards as usize);
        let mut end = self.end;
        for i in 0..shards {
            let start = if i + 1 == shards {
                self.start
            } else {
                end - step
            };
            windows.push(TimeRange { start, end });
            end = start;
        }
        windows
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Lazy sequence of decoded traces; per-item errors do not end the stream
pub type TraceStream<'a> = Box<dyn Iterator<Item = Result<Arc<Trace>>> + Send + 'a>;

/// Something that can enumerate candidate traces (a block, a shard, a file)
pub trait CandidateSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Stream traces overlapping `range`, restricted to `ids` when given
    ///
    /// An error here means the source could not be opened at all.
    fn scan(&self, range: TimeRange, ids: Option<&[TraceId]>) -> Result<TraceStream<'_>>;

    /// Time span covered by the source's traces, when known
    fn time_bounds(&self) -> Option<TimeRange> {
        None
    }
}

/// Index that turns fetch conditions into candidate trace ids
///
/// The returned set must be a superset of the traces that can match.
pub trait StorageIndex: Send + Sync {
    fn candidates(&self, conditions: &FetchConditions, range: TimeRange) -> Result<Vec<TraceId>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_newest_first() {
        let windows = TimeRange::new(0, 100).split_newest_first(4);
        assert_eq!(
            windows,
            vec![
                TimeRange::new(75, 100),
                TimeRange::new(50, 75),
                TimeRange::new(25, 50),
                TimeRange::new(0, 25),
            ]
        );
    }

    #[test]
    fn test_split_uneven_and_short() {
        let windows = TimeRange::new(0, 10).split_newest_first(3);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], TimeRange::new(7, 10));
        assert_eq!(windows[2], TimeRange::new(0, 4));

        assert_eq!(TimeRange::new(5, 7).split_newest_first(200).len(), 2);
        assert!(TimeRange::new(5, 5).split_newest_first(10).is_empty());
    }

    #[test]
    fn test_overlaps_and_clamp() {
        let range = TimeRange::new(10, 20);
        assert!(range.overlaps(5, 10));
        assert!(range.overlaps(19, 30));
        assert!(!range.overlaps(20, 30));
        assert!(!range.overlaps(0, 9));
        assert_eq!(
            TimeRange::all().clamp(&range),
            TimeRange::new(10, 20)
        );
        assert!(TimeRange::all().is_unbounded());
        assert_eq!(range.union(&TimeRange::new(30, 40)), TimeRange::new(10, 40));
    }
}
