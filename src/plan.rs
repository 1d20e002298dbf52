use crate::activity::ActivityRef;
use crate::assignment::{DailyOverride, TeacherId, WeeklyAssignment, is_school_weekday};
use crate::store::{StoreResult, TimetableStore};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which day a slot lookup refers to: a concrete date (overrides apply) or a
/// bare weekday of the recurring template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanAnchor {
    Weekday(Weekday),
    Date(NaiveDate),
}

impl SpanAnchor {
    pub fn weekday(&self) -> Weekday {
        match self {
            SpanAnchor::Weekday(weekday) => *weekday,
            SpanAnchor::Date(date) => date.weekday(),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            SpanAnchor::Weekday(_) => None,
            SpanAnchor::Date(date) => Some(*date),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonSource {
    WeeklyTemplate,
    DailyOverride,
}

/// Outcome of looking up one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEntry {
    Lesson {
        activity: ActivityRef,
        source: LessonSource,
    },
    /// An override with a freeform title and no activity. Not a lesson.
    NonLesson { title: String },
    Empty,
}

/// Per-period access to the two assignment sources of one day.
pub trait SlotSource {
    fn weekly(&self, period: u32) -> StoreResult<Option<WeeklyAssignment>>;
    fn daily(&self, period: u32) -> StoreResult<Option<DailyOverride>>;
}

/// Resolves a period: the daily override first, the weekly template second.
pub fn lookup_slot<S: SlotSource + ?Sized>(source: &S, period: u32) -> StoreResult<SlotEntry> {
    if let Some(entry) = source.daily(period)? {
        if let Some(activity) = entry.activity {
            return Ok(SlotEntry::Lesson {
                activity,
                source: LessonSource::DailyOverride,
            });
        }
        if let Some(title) = entry.freeform_title() {
            return Ok(SlotEntry::NonLesson {
                title: title.to_string(),
            });
        }
    }
    Ok(match source.weekly(period)? {
        Some(assignment) => SlotEntry::Lesson {
            activity: assignment.activity,
            source: LessonSource::WeeklyTemplate,
        },
        None => SlotEntry::Empty,
    })
}

/// Reads slots straight from a store, one indexed read per lookup.
pub struct StoreDay<'a, S: TimetableStore + ?Sized> {
    store: &'a S,
    teacher: TeacherId,
    anchor: SpanAnchor,
}

impl<'a, S: TimetableStore + ?Sized> StoreDay<'a, S> {
    pub fn new(store: &'a S, teacher: TeacherId, anchor: SpanAnchor) -> Self {
        Self {
            store,
            teacher,
            anchor,
        }
    }
}

impl<S: TimetableStore + ?Sized> SlotSource for StoreDay<'_, S> {
    fn weekly(&self, period: u32) -> StoreResult<Option<WeeklyAssignment>> {
        let weekday = self.anchor.weekday();
        if !is_school_weekday(weekday) {
            return Ok(None);
        }
        self.store.weekly_assignment(self.teacher, weekday, period)
    }

    fn daily(&self, period: u32) -> StoreResult<Option<DailyOverride>> {
        match self.anchor.date() {
            Some(date) => self.store.daily_override(self.teacher, date, period),
            None => Ok(None),
        }
    }
}

/// An in-memory copy of one day's assignments, used to preview merge edits
/// before they are committed.
#[derive(Debug, Clone, PartialEq)]
pub struct DayPlan {
    pub teacher: TeacherId,
    pub anchor: SpanAnchor,
    pub(crate) weekly: BTreeMap<u32, WeeklyAssignment>,
    pub(crate) overrides: BTreeMap<u32, DailyOverride>,
}

impl DayPlan {
    pub fn load<S: TimetableStore + ?Sized>(
        store: &S,
        teacher: TeacherId,
        anchor: SpanAnchor,
    ) -> StoreResult<Self> {
        let weekday = anchor.weekday();
        let weekly = if is_school_weekday(weekday) {
            store.weekly_assignments(teacher, weekday)?
        } else {
            Vec::new()
        };
        let overrides = match anchor.date() {
            Some(date) => store.daily_overrides(teacher, date)?,
            None => Vec::new(),
        };
        Ok(Self::from_parts(teacher, anchor, weekly, overrides))
    }

    pub fn from_parts(
        teacher: TeacherId,
        anchor: SpanAnchor,
        weekly: Vec<WeeklyAssignment>,
        overrides: Vec<DailyOverride>,
    ) -> Self {
        Self {
            teacher,
            anchor,
            weekly: weekly.into_iter().map(|row| (row.period, row)).collect(),
            overrides: overrides
                .into_iter()
                .map(|entry| (entry.period, entry))
                .collect(),
        }
    }

    pub fn weekly_assignments(&self) -> impl Iterator<Item = &WeeklyAssignment> {
        self.weekly.values()
    }
}

impl SlotSource for DayPlan {
    fn weekly(&self, period: u32) -> StoreResult<Option<WeeklyAssignment>> {
        Ok(self.weekly.get(&period).cloned())
    }

    fn daily(&self, period: u32) -> StoreResult<Option<DailyOverride>> {
        Ok(self.overrides.get(&period).cloned())
    }
}
