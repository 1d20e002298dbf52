use super::memory::InMemoryStore;
use super::{StoreError, StoreResult, TimetableStore, TimetableWriter, ensure_teacher};
use crate::activity::{ActivityDisplay, ActivityRef};
use crate::assignment::{
    DailyOverride, SCHOOL_WEEKDAYS, TeacherId, WeeklyAssignment, school_weekday_from_index,
    school_weekday_index,
};
use crate::calendar::VacationRange;
use crate::periods::TeacherDayConfig;
use crate::validation;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Everything the engine knows about one teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherTimetable {
    pub teacher_id: TeacherId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<Tz>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_config: Option<TeacherDayConfig>,
    #[serde(default)]
    pub weekly: Vec<WeeklyAssignment>,
    #[serde(default)]
    pub overrides: Vec<DailyOverride>,
    #[serde(default)]
    pub vacations: Vec<VacationRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub activity: ActivityRef,
    pub display: ActivityDisplay,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimetableSnapshot {
    #[serde(default)]
    pub teachers: Vec<TeacherTimetable>,
    #[serde(default)]
    pub activities: Vec<ActivityEntry>,
}

impl TimetableSnapshot {
    pub fn validate(&self) -> StoreResult<()> {
        for teacher in &self.teachers {
            ensure_teacher(teacher.teacher_id, &teacher.weekly)?;
            validation::validate_weekly_template(&teacher.weekly)?;
            if let Some(other) = teacher
                .overrides
                .iter()
                .find(|entry| entry.teacher_id != teacher.teacher_id)
            {
                return Err(StoreError::InvalidData(format!(
                    "daily override for teacher {} found in timetable of teacher {}",
                    other.teacher_id, teacher.teacher_id
                )));
            }
            validation::validate_daily_overrides(&teacher.overrides)?;
            for range in &teacher.vacations {
                validation::validate_vacation_range(range)?;
            }
        }
        Ok(())
    }

    /// Writes the snapshot through any writer. The snapshot is validated
    /// first, so a rejected snapshot writes nothing.
    pub fn apply_to<W: TimetableWriter + ?Sized>(&self, writer: &W) -> StoreResult<()> {
        self.validate()?;
        for teacher in &self.teachers {
            let id = teacher.teacher_id;
            if let Some(config) = &teacher.day_config {
                writer.put_day_config(id, config)?;
            }
            if let Some(timezone) = teacher.timezone {
                writer.put_teacher_timezone(id, timezone)?;
            }
            writer.replace_weekly_template(id, &teacher.weekly)?;
            for entry in &teacher.overrides {
                writer.upsert_daily_override(entry)?;
            }
            for range in &teacher.vacations {
                writer.add_vacation_range(id, range)?;
            }
        }
        for entry in &self.activities {
            writer.put_activity_display(&entry.activity, &entry.display)?;
        }
        Ok(())
    }
}

impl InMemoryStore {
    pub fn from_snapshot(snapshot: &TimetableSnapshot) -> StoreResult<Self> {
        let store = Self::new();
        snapshot.apply_to(&store)?;
        Ok(store)
    }

    pub fn snapshot(&self) -> TimetableSnapshot {
        self.read_tables(|tables| {
            let teachers = tables
                .teacher_ids()
                .into_iter()
                .map(|id| TeacherTimetable {
                    teacher_id: id,
                    timezone: tables.timezones.get(&id).copied(),
                    day_config: tables.configs.get(&id).cloned(),
                    weekly: tables
                        .weekly
                        .iter()
                        .filter(|((owner, _, _), _)| *owner == id)
                        .map(|(_, row)| row.clone())
                        .collect(),
                    overrides: tables
                        .overrides
                        .iter()
                        .filter(|((owner, _, _), _)| *owner == id)
                        .map(|(_, entry)| entry.clone())
                        .collect(),
                    vacations: tables.vacations.get(&id).cloned().unwrap_or_default(),
                })
                .collect();
            let mut activities: Vec<ActivityEntry> = tables
                .activities
                .iter()
                .map(|(activity, display)| ActivityEntry {
                    activity: activity.clone(),
                    display: display.clone(),
                })
                .collect();
            activities.sort_by(|a, b| a.activity.cmp(&b.activity));
            TimetableSnapshot {
                teachers,
                activities,
            }
        })
    }
}

pub fn save_snapshot_to_json<P: AsRef<Path>>(
    snapshot: &TimetableSnapshot,
    path: P,
) -> StoreResult<()> {
    snapshot.validate()?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

pub fn load_snapshot_from_json<P: AsRef<Path>>(path: P) -> StoreResult<TimetableSnapshot> {
    let file = File::open(path)?;
    let snapshot: TimetableSnapshot = serde_json::from_reader(file)?;
    snapshot.validate()?;
    Ok(snapshot)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WeeklyCsvRecord {
    weekday: u8,
    period: u32,
    classroom_id: Option<i64>,
    mixed_group_id: Option<i64>,
    custom_task_title: Option<String>,
    #[serde(default)]
    merged_with_previous: bool,
    #[serde(default)]
    merged_with_next: bool,
}

impl From<&WeeklyAssignment> for WeeklyCsvRecord {
    fn from(assignment: &WeeklyAssignment) -> Self {
        let (classroom_id, mixed_group_id, custom_task_title) = assignment.activity.to_parts();
        Self {
            weekday: school_weekday_index(assignment.weekday),
            period: assignment.period,
            classroom_id,
            mixed_group_id,
            custom_task_title,
            merged_with_previous: assignment.merged_with_previous,
            merged_with_next: assignment.merged_with_next,
        }
    }
}

impl WeeklyCsvRecord {
    fn into_assignment(self, teacher: TeacherId, line: usize) -> StoreResult<WeeklyAssignment> {
        let weekday = school_weekday_from_index(self.weekday).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "row {line}: weekday {} is outside 0 (Mon) .. 4 (Fri)",
                self.weekday
            ))
        })?;
        let activity =
            ActivityRef::from_parts(self.classroom_id, self.mixed_group_id, self.custom_task_title)
                .map_err(|msg| StoreError::InvalidData(format!("row {line}: {msg}")))?
                .ok_or_else(|| {
                    StoreError::InvalidData(format!(
                        "row {line}: weekly assignment has no activity"
                    ))
                })?;
        Ok(WeeklyAssignment {
            teacher_id: teacher,
            weekday,
            period: self.period,
            activity,
            merged_with_previous: self.merged_with_previous,
            merged_with_next: self.merged_with_next,
        })
    }
}

/// Exports one teacher's weekly template, Monday P1 first.
pub fn save_weekly_template_to_csv<S, P>(store: &S, teacher: TeacherId, path: P) -> StoreResult<()>
where
    S: TimetableStore + ?Sized,
    P: AsRef<Path>,
{
    let mut writer = csv::Writer::from_path(path)?;
    for weekday in SCHOOL_WEEKDAYS {
        for assignment in store.weekly_assignments(teacher, weekday)? {
            writer.serialize(WeeklyCsvRecord::from(&assignment))?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn load_weekly_template_from_csv<P: AsRef<Path>>(
    path: P,
    teacher: TeacherId,
) -> StoreResult<Vec<WeeklyAssignment>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut assignments = Vec::new();
    for (idx, record) in reader.deserialize::<WeeklyCsvRecord>().enumerate() {
        assignments.push(record?.into_assignment(teacher, idx + 1)?);
    }
    validation::validate_weekly_template(&assignments)?;
    Ok(assignments)
}
