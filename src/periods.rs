use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

const SECONDS_PER_MINUTE: u32 = 60;
const SECONDS_PER_DAY: u32 = 24 * 60 * 60;
const MINUTES_PER_DAY: u32 = 24 * 60;

/// A long pause in the teaching day (lunch, recess) during which no period runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MajorBreak {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl MajorBreak {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }
}

/// Per-teacher layout of the teaching day. Durations are in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherDayConfig {
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub period_duration: u32,
    pub inter_period_break: u32,
    #[serde(default)]
    pub major_breaks: Vec<MajorBreak>,
}

/// One numbered period of a teaching day. Never persisted, always derived
/// from a [`TeacherDayConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSlot {
    pub number: u32,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl PeriodSlot {
    /// Both bounds are inclusive.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayConfigError {
    EmptyDay {
        start: NaiveTime,
        end: NaiveTime,
    },
    ZeroPeriodDuration,
    DurationTooLong {
        field: &'static str,
        minutes: u32,
    },
    InvertedBreak {
        index: usize,
    },
    BreakOutsideDay {
        index: usize,
    },
    BreaksOutOfOrder {
        index: usize,
    },
}

impl fmt::Display for DayConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayConfigError::EmptyDay { start, end } => write!(
                f,
                "day start {start} must be before day end {end}"
            ),
            DayConfigError::ZeroPeriodDuration => {
                write!(f, "period duration must be at least one minute")
            }
            DayConfigError::DurationTooLong { field, minutes } => {
                write!(f, "{field} of {minutes} minutes must be shorter than a day")
            }
            DayConfigError::InvertedBreak { index } => {
                write!(f, "major break #{index} ends before it starts")
            }
            DayConfigError::BreakOutsideDay { index } => {
                write!(f, "major break #{index} lies outside the teaching day")
            }
            DayConfigError::BreaksOutOfOrder { index } => write!(
                f,
                "major break #{index} overlaps or precedes the break before it"
            ),
        }
    }
}

impl std::error::Error for DayConfigError {}

impl TeacherDayConfig {
    pub fn new(
        day_start: NaiveTime,
        day_end: NaiveTime,
        period_duration: u32,
        inter_period_break: u32,
    ) -> Self {
        Self {
            day_start,
            day_end,
            period_duration,
            inter_period_break,
            major_breaks: Vec::new(),
        }
    }

    pub fn with_break(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.major_breaks.push(MajorBreak::new(start, end));
        self
    }

    pub fn validate(&self) -> Result<(), DayConfigError> {
        if self.day_start >= self.day_end {
            return Err(DayConfigError::EmptyDay {
                start: self.day_start,
                end: self.day_end,
            });
        }
        if self.period_duration == 0 {
            return Err(DayConfigError::ZeroPeriodDuration);
        }
        if self.period_duration >= MINUTES_PER_DAY {
            return Err(DayConfigError::DurationTooLong {
                field: "period duration",
                minutes: self.period_duration,
            });
        }
        if self.inter_period_break >= MINUTES_PER_DAY {
            return Err(DayConfigError::DurationTooLong {
                field: "inter-period break",
                minutes: self.inter_period_break,
            });
        }
        let mut previous: Option<&MajorBreak> = None;
        for (index, major) in self.major_breaks.iter().enumerate() {
            if major.start >= major.end {
                return Err(DayConfigError::InvertedBreak { index });
            }
            if major.start < self.day_start || major.end > self.day_end {
                return Err(DayConfigError::BreakOutsideDay { index });
            }
            if let Some(prev) = previous {
                if major.start < prev.end {
                    return Err(DayConfigError::BreaksOutOfOrder { index });
                }
            }
            previous = Some(major);
        }
        Ok(())
    }
}

fn seconds_of(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight()
}

fn time_of(seconds: u32) -> Option<NaiveTime> {
    if seconds >= SECONDS_PER_DAY {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}

/// Lays out the periods of a teaching day.
///
/// A period that would run into the next major break is shortened so that it
/// ends when the break starts, and the following period begins when the break
/// ends. The last period may run past `day_end`; building stops once a period
/// would start at or after it. An invalid configuration yields an empty grid.
pub fn build_periods(config: &TeacherDayConfig) -> Vec<PeriodSlot> {
    if let Err(err) = config.validate() {
        tracing::warn!(%err, "invalid teacher day configuration, no periods built");
        return Vec::new();
    }

    let day_end = seconds_of(config.day_end);
    let period = config.period_duration * SECONDS_PER_MINUTE;
    let gap = config.inter_period_break * SECONDS_PER_MINUTE;
    let breaks: Vec<(u32, u32)> = config
        .major_breaks
        .iter()
        .map(|major| (seconds_of(major.start), seconds_of(major.end)))
        .collect();

    let mut slots = Vec::new();
    let mut next_break = 0;
    let mut cursor = seconds_of(config.day_start);

    while cursor < day_end {
        while breaks
            .get(next_break)
            .is_some_and(|&(_, break_end)| break_end <= cursor)
        {
            next_break += 1;
        }

        // Landing on or inside a break never produces a zero-length slot.
        if let Some(&(break_start, break_end)) = breaks.get(next_break) {
            if break_start <= cursor {
                cursor = break_end;
                next_break += 1;
                continue;
            }
        }

        let Some(mut end) = cursor.checked_add(period) else {
            break;
        };
        let Some(mut next_cursor) = end.checked_add(gap) else {
            break;
        };
        if let Some(&(break_start, break_end)) = breaks.get(next_break) {
            if end >= break_start {
                end = break_start;
                next_cursor = break_end;
                next_break += 1;
            }
        }

        let (Some(start_time), Some(end_time)) = (time_of(cursor), time_of(end)) else {
            tracing::debug!("period grid reached midnight, truncating");
            break;
        };
        slots.push(PeriodSlot {
            number: slots.len() as u32 + 1,
            start: start_time,
            end: end_time,
        });
        cursor = next_cursor;
    }

    slots
}
