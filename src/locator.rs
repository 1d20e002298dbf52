use crate::activity::ActivityRef;
use crate::assignment::TeacherId;
use crate::calendar::SchoolCalendar;
use crate::clock::{Clock, now_in_timezone};
use crate::merge::{merge_block_start, merge_span};
use crate::periods::{PeriodSlot, build_periods};
use crate::plan::{LessonSource, SlotEntry, SlotSource, SpanAnchor, StoreDay, lookup_slot};
use crate::store::{StoreResult, TimetableStore};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of days after today searched for the next lesson.
pub const LOOKAHEAD_DAYS: u32 = 14;

/// How future days are scanned. Both strategies return the lesson of the
/// earliest day, regardless of which read finishes first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookahead {
    #[default]
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLesson {
    pub teacher_id: TeacherId,
    pub activity: ActivityRef,
    pub source: LessonSource,
    pub date: NaiveDate,
    pub start_period: u32,
    pub end_period: u32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_merged: bool,
    pub is_current: bool,
}

pub struct LessonLocator<'a, S: TimetableStore + ?Sized> {
    store: &'a S,
    lookahead: Lookahead,
    default_timezone: Tz,
}

impl<'a, S: TimetableStore + ?Sized> LessonLocator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            lookahead: Lookahead::default(),
            default_timezone: Tz::UTC,
        }
    }

    pub fn with_lookahead(mut self, lookahead: Lookahead) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn with_default_timezone(mut self, timezone: Tz) -> Self {
        self.default_timezone = timezone;
        self
    }

    pub fn teacher_timezone(&self, teacher: TeacherId) -> StoreResult<Tz> {
        Ok(self
            .store
            .teacher_timezone(teacher)?
            .unwrap_or(self.default_timezone))
    }

    /// Production entry point: reads the clock once, converts it into the
    /// teacher's timezone and locates the current or next lesson.
    pub fn locate_now(
        &self,
        teacher: TeacherId,
        clock: &dyn Clock,
    ) -> StoreResult<Option<ResolvedLesson>> {
        let timezone = self.teacher_timezone(teacher)?;
        let now = now_in_timezone(clock, timezone);
        self.locate(teacher, now)
    }

    /// Finds the lesson in progress at `now` (teacher-local), or else the
    /// nearest upcoming one today, or else the first lesson on one of the
    /// next [`LOOKAHEAD_DAYS`] instructional days. A missing or invalid day
    /// configuration means no lesson, not an error.
    pub fn locate(
        &self,
        teacher: TeacherId,
        now: NaiveDateTime,
    ) -> StoreResult<Option<ResolvedLesson>> {
        let Some(config) = self.store.day_config(teacher)? else {
            tracing::debug!(teacher, "no day configuration, no lesson located");
            return Ok(None);
        };
        let grid = build_periods(&config);
        if grid.is_empty() {
            tracing::debug!(teacher, "empty period grid, no lesson located");
            return Ok(None);
        }

        let today = now.date();
        let time = now.time();
        let day = StoreDay::new(self.store, teacher, SpanAnchor::Date(today));

        for slot in grid.iter().filter(|slot| slot.contains(time)) {
            if let Some(lesson) = self.block_lesson(teacher, &day, today, &grid, slot, true)? {
                return Ok(Some(self.found(lesson)));
            }
        }

        for slot in grid.iter().filter(|slot| slot.start > time) {
            if let Some(lesson) = self.block_lesson(teacher, &day, today, &grid, slot, false)? {
                return Ok(Some(self.found(lesson)));
            }
        }

        let calendar = SchoolCalendar::new(self.store.vacation_ranges(teacher)?);
        let candidates = calendar.instructional_days_ahead(today, LOOKAHEAD_DAYS);
        let upcoming = match self.lookahead {
            Lookahead::Sequential => {
                let mut found = None;
                for date in candidates {
                    if let Some(lesson) = self.first_lesson_on(teacher, date, &grid)? {
                        found = Some(lesson);
                        break;
                    }
                }
                found
            }
            Lookahead::Parallel => candidates
                .par_iter()
                .map(|&date| self.first_lesson_on(teacher, date, &grid))
                .find_first(|result| !matches!(result, Ok(None)))
                .transpose()?
                .flatten(),
        };

        match upcoming {
            Some(lesson) => Ok(Some(self.found(lesson))),
            None => {
                tracing::debug!(teacher, %today, "no lesson within the lookahead horizon");
                Ok(None)
            }
        }
    }

    fn found(&self, lesson: ResolvedLesson) -> ResolvedLesson {
        tracing::info!(
            teacher = lesson.teacher_id,
            date = %lesson.date,
            start_period = lesson.start_period,
            end_period = lesson.end_period,
            is_current = lesson.is_current,
            "lesson located"
        );
        lesson
    }

    fn first_lesson_on(
        &self,
        teacher: TeacherId,
        date: NaiveDate,
        grid: &[PeriodSlot],
    ) -> StoreResult<Option<ResolvedLesson>> {
        let day = StoreDay::new(self.store, teacher, SpanAnchor::Date(date));
        for slot in grid {
            if let Some(lesson) = self.lesson_at(teacher, &day, date, grid, slot, false)? {
                return Ok(Some(lesson));
            }
        }
        Ok(None)
    }

    /// Resolves `slot` as part of the block it belongs to. A block that
    /// started in an earlier period is already running, including during the
    /// short break between two of its periods.
    fn block_lesson<D: SlotSource + ?Sized>(
        &self,
        teacher: TeacherId,
        day: &D,
        date: NaiveDate,
        grid: &[PeriodSlot],
        slot: &PeriodSlot,
        is_current: bool,
    ) -> StoreResult<Option<ResolvedLesson>> {
        let start = merge_block_start(day, slot.number)?;
        match grid.iter().find(|candidate| candidate.number == start) {
            Some(first) if start < slot.number => {
                self.lesson_at(teacher, day, date, grid, first, true)
            }
            _ => self.lesson_at(teacher, day, date, grid, slot, is_current),
        }
    }

    fn lesson_at<D: SlotSource + ?Sized>(
        &self,
        teacher: TeacherId,
        day: &D,
        date: NaiveDate,
        grid: &[PeriodSlot],
        slot: &PeriodSlot,
        is_current: bool,
    ) -> StoreResult<Option<ResolvedLesson>> {
        let (activity, source) = match lookup_slot(day, slot.number)? {
            SlotEntry::Lesson { activity, source } => (activity, source),
            SlotEntry::NonLesson { title } => {
                tracing::debug!(
                    teacher,
                    %date,
                    period = slot.number,
                    %title,
                    "skipping non-lesson entry"
                );
                return Ok(None);
            }
            SlotEntry::Empty => return Ok(None),
        };

        let span = merge_span(day, slot.number)?;
        let end_slot = grid
            .iter()
            .rev()
            .find(|candidate| candidate.number <= span.end_period)
            .filter(|candidate| candidate.number >= slot.number)
            .unwrap_or(slot);
        if end_slot.number < span.end_period {
            tracing::debug!(
                teacher,
                %date,
                period = slot.number,
                merged_until = span.end_period,
                "merged block runs past the last period, clamping"
            );
        }

        Ok(Some(ResolvedLesson {
            teacher_id: teacher,
            activity,
            source,
            date,
            start_period: slot.number,
            end_period: end_slot.number,
            start_time: slot.start,
            end_time: end_slot.end,
            is_merged: end_slot.number > slot.number,
            is_current,
        }))
    }
}
