//! Byte-range coverage of applied chunks.

use std::collections::BTreeMap;

/// Disjoint, merged set of `[start, end)` ranges written so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    /// start -> end, non-overlapping and non-adjacent.
    ranges: BTreeMap<u64, u64>,
    covered: u64,
}

impl Coverage {
    /// Creates empty coverage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `[start, end)` as written.
    pub fn insert(&mut self, start: u64, end: u64) {
        if start >= end {
            return;
        }
        let mut start = start;
        let mut end = end;

        // merge with a range that begins before `start` and reaches it
        let previous = self
            .ranges
            .range(..=start)
            .next_back()
            .map(|(&s, &e)| (s, e));
        if let Some((s, e)) = previous {
            if e >= start {
                start = s;
                end = end.max(e);
                self.ranges.remove(&s);
                self.covered -= e - s;
            }
        }

        // absorb every range that begins inside the new one
        loop {
            let next = self.ranges.range(start..=end).next().map(|(&s, &e)| (s, e));
            let Some((s, e)) = next else {
                break;
            };
            end = end.max(e);
            self.ranges.remove(&s);
            self.covered -= e - s;
        }

        self.ranges.insert(start, end);
        self.covered += end - start;
    }

    /// Returns the number of distinct bytes written.
    #[must_use]
    pub fn covered(&self) -> u64 {
        self.covered
    }

    /// Returns the end of the furthest range written.
    #[must_use]
    pub fn high_watermark(&self) -> u64 {
        self.ranges.values().next_back().copied().unwrap_or(0)
    }

    /// Returns true once `[0, size)` is fully written.
    #[must_use]
    pub fn is_complete(&self, size: u64) -> bool {
        if size == 0 {
            return true;
        }
        self.ranges.len() == 1 && self.ranges.get(&0).is_some_and(|&end| end >= size)
    }

    /// Returns the number of disjoint ranges.
    #[must_use]
    pub fn fragments(&self) -> usize {
        self.ranges.len()
    }
}
