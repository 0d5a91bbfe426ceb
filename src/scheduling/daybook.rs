// src/scheduling/daybook.rs
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{SchedulingError, TimeRange};

/// Booked ranges of one shop on one date, sorted by start and disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<TimeRange>", try_from = "Vec<TimeRange>")]
pub struct DayBook {
    ranges: Vec<TimeRange>,
}

impl DayBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[TimeRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn has_overlap(&self, candidate: &TimeRange) -> bool {
        self.ranges.iter().any(|existing| candidate.overlaps(existing))
    }

    /// Inserts `candidate`, keeping the book sorted.
    ///
    /// The caller is expected to have checked [`DayBook::has_overlap`]; if it
    /// did not and no gap fits the candidate, the book is left unchanged and
    /// `SlotTaken` is returned.
    pub fn insert(&mut self, candidate: TimeRange) -> Result<(), SchedulingError> {
        if self.ranges.is_empty() {
            self.ranges.push(candidate);
            return Ok(());
        }

        if let Some(idx) = self
            .ranges
            .iter()
            .position(|existing| existing.start > candidate.end)
        {
            let fits_after_previous = idx == 0 || self.ranges[idx - 1].end < candidate.start;
            if fits_after_previous {
                self.ranges.insert(idx, candidate);
                return Ok(());
            }
        } else if let Some(last) = self.ranges.last() {
            if last.end < candidate.start {
                self.ranges.push(candidate);
                return Ok(());
            }
        }

        Err(SchedulingError::SlotTaken(candidate.to_string()))
    }

    /// Overlap check followed by insert.
    pub fn book(&mut self, candidate: TimeRange) -> Result<(), SchedulingError> {
        if self.has_overlap(&candidate) {
            return Err(SchedulingError::SlotTaken(candidate.to_string()));
        }
        self.insert(candidate)
    }

    /// Removes the entry equal to `exact`.
    pub fn remove(&mut self, exact: &TimeRange) -> Result<(), SchedulingError> {
        let idx = self
            .ranges
            .iter()
            .position(|existing| existing == exact)
            .ok_or_else(|| SchedulingError::NotFound(exact.to_string()))?;
        self.ranges.remove(idx);
        Ok(())
    }
}

impl From<DayBook> for Vec<TimeRange> {
    fn from(book: DayBook) -> Self {
        book.ranges
    }
}

/// Loading stored ranges re-checks ordering and disjointness.
impl TryFrom<Vec<TimeRange>> for DayBook {
    type Error = SchedulingError;

    fn try_from(ranges: Vec<TimeRange>) -> Result<Self, Self::Error> {
        if let Some(pair) = ranges.windows(2).find(|pair| pair[0].end >= pair[1].start) {
            return Err(SchedulingError::InvalidRange(format!(
                "busy time {} must end before {} starts",
                pair[0], pair[1]
            )));
        }
        Ok(Self { ranges })
    }
}

/// Per-date busy ranges of a shop, serialized as the shop's `busyTime`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShopSchedule {
    days: BTreeMap<NaiveDate, DayBook>,
}

impl ShopSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// The book for `date`; unseen dates give an empty book.
    pub fn day(&self, date: NaiveDate) -> DayBook {
        self.days.get(&date).cloned().unwrap_or_default()
    }

    pub fn set_day(&mut self, date: NaiveDate, day: DayBook) {
        if day.is_empty() {
            self.days.remove(&date);
        } else {
            self.days.insert(date, day);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
