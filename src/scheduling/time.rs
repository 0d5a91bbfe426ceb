// src/scheduling/time.rs
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::SchedulingError;

lazy_static! {
    static ref TIME_FORMAT: Regex = Regex::new(r"^(0?[1-9]|1[0-2]):([0-5][0-9]) (AM|PM)$")
        .expect("time format regex is valid");
}

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Wall-clock time within one day, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Some(Self(hour * 60 + minute))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Parses `hh:mm AM/PM`. 12 AM is midnight, 12 PM is noon.
    pub fn parse(text: &str) -> Result<Self, SchedulingError> {
        let caps = TIME_FORMAT
            .captures(text)
            .ok_or_else(|| SchedulingError::InvalidTimeFormat(text.to_string()))?;

        // The regex guarantees both groups are short digit runs.
        let mut hour: u16 = caps[1]
            .parse()
            .map_err(|_| SchedulingError::InvalidTimeFormat(text.to_string()))?;
        let minute: u16 = caps[2]
            .parse()
            .map_err(|_| SchedulingError::InvalidTimeFormat(text.to_string()))?;

        match &caps[3] {
            "PM" if hour != 12 => hour += 12,
            "AM" if hour == 12 => hour = 0,
            _ => {}
        }

        Ok(Self(hour * 60 + minute))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hour = self.0 / 60;
        let minute = self.0 % 60;
        let (display_hour, suffix) = match hour {
            0 => (12, "AM"),
            1..=11 => (hour, "AM"),
            12 => (12, "PM"),
            _ => (hour - 12, "PM"),
        };
        write!(f, "{display_hour:02}:{minute:02} {suffix}")
    }
}

impl FromStr for TimeOfDay {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}

/// A booked span `start..=end` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, SchedulingError> {
        if start >= end {
            return Err(SchedulingError::InvalidRange(format!(
                "start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, SchedulingError> {
        Self::new(TimeOfDay::parse(start)?, TimeOfDay::parse(end)?)
    }

    /// Boundaries are inclusive: ranges that merely touch still overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// Checks the range sits inside the shop's opening hours.
    pub fn validate_within(&self, open: TimeOfDay, close: TimeOfDay) -> Result<(), SchedulingError> {
        if self.start >= self.end {
            return Err(SchedulingError::InvalidRange(format!(
                "start {} must be before end {}",
                self.start, self.end
            )));
        }
        if self.start < open || self.end > close {
            return Err(SchedulingError::InvalidRange(format!(
                "{self} is outside opening hours {open} - {close}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

impl FromStr for TimeRange {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(" - ")
            .ok_or_else(|| SchedulingError::InvalidTimeFormat(s.to_string()))?;
        Self::parse(start, end)
    }
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Validates `start`/`end` against the shop's hours in one step.
pub fn validate_range(
    start: TimeOfDay,
    end: TimeOfDay,
    shop_open: TimeOfDay,
    shop_close: TimeOfDay,
) -> Result<TimeRange, SchedulingError> {
    let range = TimeRange::new(start, end)?;
    range.validate_within(shop_open, shop_close)?;
    Ok(range)
}
