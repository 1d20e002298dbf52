use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named, inclusive span of non-instructional days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationRange {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl VacationRange {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start_date,
            end_date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Returns false on weekends and on any day covered by a vacation range.
pub fn is_instructional_day(date: NaiveDate, vacation_ranges: &[VacationRange]) -> bool {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    !vacation_ranges.iter().any(|range| range.contains(date))
}

/// A teacher's school calendar: fixed Saturday/Sunday weekend plus vacations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchoolCalendar {
    vacations: Vec<VacationRange>,
}

impl SchoolCalendar {
    pub fn new(vacations: Vec<VacationRange>) -> Self {
        Self { vacations }
    }

    pub fn vacations(&self) -> &[VacationRange] {
        &self.vacations
    }

    pub fn add_vacation(&mut self, range: VacationRange) {
        self.vacations.push(range);
    }

    pub fn is_instructional(&self, date: NaiveDate) -> bool {
        is_instructional_day(date, &self.vacations)
    }

    /// The vacation covering `date`, if any.
    pub fn vacation_on(&self, date: NaiveDate) -> Option<&VacationRange> {
        self.vacations.iter().find(|range| range.contains(date))
    }

    /// Instructional days strictly after `from`, at most `horizon_days` ahead,
    /// in increasing order. Dates past the end of the calendar are dropped.
    pub fn instructional_days_ahead(&self, from: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
        (1..=u64::from(horizon_days))
            .map_while(|offset| from.checked_add_days(Days::new(offset)))
            .filter(|date| self.is_instructional(*date))
            .collect()
    }

    /// Weekdays blocked by vacations within `[start, end]`, deduplicated.
    pub fn vacation_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut seen = HashSet::new();
        let mut days = Vec::new();
        for range in &self.vacations {
            let mut current = range.start_date.max(start);
            let last = range.end_date.min(end);
            while current <= last {
                if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun)
                    && seen.insert(current)
                {
                    days.push(current);
                }
                match current.succ_opt() {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }
        days.sort();
        days
    }
}
