use super::{StoreResult, TimetableStore, TimetableWriter, ensure_teacher};
use crate::activity::{ActivityDisplay, ActivityRef};
use crate::assignment::{DailyOverride, TeacherId, WeeklyAssignment};
use crate::calendar::VacationRange;
use crate::periods::TeacherDayConfig;
use crate::validation;
use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};

type WeeklyKey = (TeacherId, u32, u32);
type OverrideKey = (TeacherId, NaiveDate, u32);

#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub(crate) configs: BTreeMap<TeacherId, TeacherDayConfig>,
    pub(crate) timezones: BTreeMap<TeacherId, Tz>,
    pub(crate) weekly: BTreeMap<WeeklyKey, WeeklyAssignment>,
    pub(crate) overrides: BTreeMap<OverrideKey, DailyOverride>,
    pub(crate) vacations: BTreeMap<TeacherId, Vec<VacationRange>>,
    pub(crate) activities: HashMap<ActivityRef, ActivityDisplay>,
}

fn weekly_key(teacher: TeacherId, weekday: Weekday, period: u32) -> WeeklyKey {
    (teacher, weekday.num_days_from_monday(), period)
}

impl Tables {
    fn weekday_rows(&self, teacher: TeacherId, weekday: Weekday) -> Vec<WeeklyAssignment> {
        let day = weekday.num_days_from_monday();
        self.weekly
            .range((teacher, day, 0)..=(teacher, day, u32::MAX))
            .map(|(_, assignment)| assignment.clone())
            .collect()
    }

    pub(crate) fn teacher_ids(&self) -> BTreeSet<TeacherId> {
        let mut ids: BTreeSet<TeacherId> = self.configs.keys().copied().collect();
        ids.extend(self.timezones.keys().copied());
        ids.extend(self.weekly.keys().map(|(teacher, _, _)| *teacher));
        ids.extend(self.overrides.keys().map(|(teacher, _, _)| *teacher));
        ids.extend(self.vacations.keys().copied());
        ids
    }
}

/// Map-backed store for tests, the CLI and snapshot-seeded servers.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read_tables<R>(&self, reader: impl FnOnce(&Tables) -> R) -> R {
        reader(&*self.tables.read())
    }
}

impl TimetableStore for InMemoryStore {
    fn day_config(&self, teacher: TeacherId) -> StoreResult<Option<TeacherDayConfig>> {
        Ok(self.tables.read().configs.get(&teacher).cloned())
    }

    fn teacher_timezone(&self, teacher: TeacherId) -> StoreResult<Option<Tz>> {
        Ok(self.tables.read().timezones.get(&teacher).copied())
    }

    fn weekly_assignment(
        &self,
        teacher: TeacherId,
        weekday: Weekday,
        period: u32,
    ) -> StoreResult<Option<WeeklyAssignment>> {
        Ok(self
            .tables
            .read()
            .weekly
            .get(&weekly_key(teacher, weekday, period))
            .cloned())
    }

    fn weekly_assignments(
        &self,
        teacher: TeacherId,
        weekday: Weekday,
    ) -> StoreResult<Vec<WeeklyAssignment>> {
        Ok(self.tables.read().weekday_rows(teacher, weekday))
    }

    fn daily_override(
        &self,
        teacher: TeacherId,
        date: NaiveDate,
        period: u32,
    ) -> StoreResult<Option<DailyOverride>> {
        Ok(self
            .tables
            .read()
            .overrides
            .get(&(teacher, date, period))
            .cloned())
    }

    fn daily_overrides(
        &self,
        teacher: TeacherId,
        date: NaiveDate,
    ) -> StoreResult<Vec<DailyOverride>> {
        Ok(self
            .tables
            .read()
            .overrides
            .range((teacher, date, 0)..=(teacher, date, u32::MAX))
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    fn vacation_ranges(&self, teacher: TeacherId) -> StoreResult<Vec<VacationRange>> {
        Ok(self
            .tables
            .read()
            .vacations
            .get(&teacher)
            .cloned()
            .unwrap_or_default())
    }

    fn activity_display(&self, activity: &ActivityRef) -> StoreResult<Option<ActivityDisplay>> {
        Ok(self.tables.read().activities.get(activity).cloned())
    }
}

impl TimetableWriter for InMemoryStore {
    fn put_day_config(&self, teacher: TeacherId, config: &TeacherDayConfig) -> StoreResult<()> {
        self.tables.write().configs.insert(teacher, config.clone());
        Ok(())
    }

    fn put_teacher_timezone(&self, teacher: TeacherId, timezone: Tz) -> StoreResult<()> {
        self.tables.write().timezones.insert(teacher, timezone);
        Ok(())
    }

    fn upsert_weekly_assignments(&self, assignments: &[WeeklyAssignment]) -> StoreResult<()> {
        let mut tables = self.tables.write();

        let mut touched: BTreeMap<(TeacherId, u32), BTreeMap<u32, WeeklyAssignment>> =
            BTreeMap::new();
        for assignment in assignments {
            validation::validate_weekly_assignment(assignment)?;
            let day = touched
                .entry((
                    assignment.teacher_id,
                    assignment.weekday.num_days_from_monday(),
                ))
                .or_insert_with(|| {
                    tables
                        .weekday_rows(assignment.teacher_id, assignment.weekday)
                        .into_iter()
                        .map(|row| (row.period, row))
                        .collect()
                });
            day.insert(assignment.period, assignment.clone());
        }

        let merged: Vec<WeeklyAssignment> = touched
            .values()
            .flat_map(|day| day.values().cloned())
            .collect();
        validation::validate_weekly_template(&merged)?;

        for assignment in assignments {
            tables.weekly.insert(
                weekly_key(assignment.teacher_id, assignment.weekday, assignment.period),
                assignment.clone(),
            );
        }
        Ok(())
    }

    fn replace_weekly_template(
        &self,
        teacher: TeacherId,
        assignments: &[WeeklyAssignment],
    ) -> StoreResult<()> {
        ensure_teacher(teacher, assignments)?;
        validation::validate_weekly_template(assignments)?;
        let mut tables = self.tables.write();
        tables.weekly.retain(|(owner, _, _), _| *owner != teacher);
        for assignment in assignments {
            tables.weekly.insert(
                weekly_key(teacher, assignment.weekday, assignment.period),
                assignment.clone(),
            );
        }
        Ok(())
    }

    fn upsert_daily_override(&self, entry: &DailyOverride) -> StoreResult<()> {
        validation::validate_daily_override(entry)?;
        self.tables
            .write()
            .overrides
            .insert((entry.teacher_id, entry.date, entry.period), entry.clone());
        Ok(())
    }

    fn remove_daily_override(
        &self,
        teacher: TeacherId,
        date: NaiveDate,
        period: u32,
    ) -> StoreResult<bool> {
        Ok(self
            .tables
            .write()
            .overrides
            .remove(&(teacher, date, period))
            .is_some())
    }

    fn add_vacation_range(&self, teacher: TeacherId, range: &VacationRange) -> StoreResult<()> {
        validation::validate_vacation_range(range)?;
        self.tables
            .write()
            .vacations
            .entry(teacher)
            .or_default()
            .push(range.clone());
        Ok(())
    }

    fn put_activity_display(
        &self,
        activity: &ActivityRef,
        display: &ActivityDisplay,
    ) -> StoreResult<()> {
        self.tables
            .write()
            .activities
            .insert(activity.clone(), display.clone());
        Ok(())
    }
}
