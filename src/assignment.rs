use crate::activity::ActivityRef;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

pub type TeacherId = i64;

pub const SCHOOL_WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

pub fn is_school_weekday(weekday: Weekday) -> bool {
    weekday.num_days_from_monday() < 5
}

/// Maps the 0-based Monday-first index used by flat formats (0 = Mon .. 4 = Fri).
pub fn school_weekday_from_index(index: u8) -> Option<Weekday> {
    SCHOOL_WEEKDAYS.get(usize::from(index)).copied()
}

pub fn school_weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_monday() as u8
}

/// Recurring activity for one (weekday, period) of a teacher's week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAssignment {
    pub teacher_id: TeacherId,
    pub weekday: Weekday,
    pub period: u32,
    pub activity: ActivityRef,
    #[serde(default)]
    pub merged_with_previous: bool,
    #[serde(default)]
    pub merged_with_next: bool,
}

impl WeeklyAssignment {
    pub fn new(
        teacher_id: TeacherId,
        weekday: Weekday,
        period: u32,
        activity: ActivityRef,
    ) -> Self {
        Self {
            teacher_id,
            weekday,
            period,
            activity,
            merged_with_previous: false,
            merged_with_next: false,
        }
    }
}

/// Date-specific entry replacing the weekly assignment for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyOverride {
    pub teacher_id: TeacherId,
    pub date: NaiveDate,
    pub period: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DailyOverride {
    pub fn lesson(
        teacher_id: TeacherId,
        date: NaiveDate,
        period: u32,
        activity: ActivityRef,
    ) -> Self {
        Self {
            teacher_id,
            date,
            period,
            activity: Some(activity),
            title: None,
            description: None,
        }
    }

    pub fn freeform(
        teacher_id: TeacherId,
        date: NaiveDate,
        period: u32,
        title: impl Into<String>,
    ) -> Self {
        Self {
            teacher_id,
            date,
            period,
            activity: None,
            title: Some(title.into()),
            description: None,
        }
    }

    /// Title of an entry that carries no activity, e.g. "Staff meeting".
    pub fn freeform_title(&self) -> Option<&str> {
        if self.activity.is_some() {
            return None;
        }
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }

    /// Whether this entry hides the weekly assignment of the same slot.
    /// A blank override (no activity, no title) does not.
    pub fn shadows_template(&self) -> bool {
        self.activity.is_some() || self.freeform_title().is_some()
    }
}
