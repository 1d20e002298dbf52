use crate::activity::{ActivityDisplay, ActivityRef};
use crate::assignment::{DailyOverride, TeacherId, WeeklyAssignment};
use crate::calendar::VacationRange;
use crate::periods::TeacherDayConfig;
use crate::validation::AssignmentValidationError;
use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;
use serde_json::Error as SerdeJsonError;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum StoreError {
    Serialization(SerdeJsonError),
    Io(io::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    InvalidData(String),
    NotFound,
    /// The backing store could not serve the read. Not retried here.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Serialization(err) => write!(f, "serialization error: {err}"),
            StoreError::Io(err) => write!(f, "io error: {err}"),
            #[cfg(feature = "sqlite")]
            StoreError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            StoreError::Csv(err) => write!(f, "csv error: {err}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            StoreError::NotFound => write!(f, "no timetable stored"),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<SerdeJsonError> for StoreError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<io::Error> for StoreError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<csv::Error> for StoreError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<AssignmentValidationError> for StoreError {
    fn from(value: AssignmentValidationError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read side of the timetable data the engine consumes. Every method is an
/// indexed read; implementations must not cache across calls.
pub trait TimetableStore: Send + Sync {
    fn day_config(&self, teacher: TeacherId) -> StoreResult<Option<TeacherDayConfig>>;

    fn teacher_timezone(&self, teacher: TeacherId) -> StoreResult<Option<Tz>>;

    fn weekly_assignment(
        &self,
        teacher: TeacherId,
        weekday: Weekday,
        period: u32,
    ) -> StoreResult<Option<WeeklyAssignment>>;

    /// All assignments of one weekday, ordered by period.
    fn weekly_assignments(
        &self,
        teacher: TeacherId,
        weekday: Weekday,
    ) -> StoreResult<Vec<WeeklyAssignment>>;

    fn daily_override(
        &self,
        teacher: TeacherId,
        date: NaiveDate,
        period: u32,
    ) -> StoreResult<Option<DailyOverride>>;

    /// All overrides of one date, ordered by period.
    fn daily_overrides(&self, teacher: TeacherId, date: NaiveDate)
    -> StoreResult<Vec<DailyOverride>>;

    fn vacation_ranges(&self, teacher: TeacherId) -> StoreResult<Vec<VacationRange>>;

    fn activity_display(&self, activity: &ActivityRef) -> StoreResult<Option<ActivityDisplay>>;
}

/// Write side used by imports, the CLI and merge edits. Each call is one
/// transactional write.
pub trait TimetableWriter {
    fn put_day_config(&self, teacher: TeacherId, config: &TeacherDayConfig) -> StoreResult<()>;

    fn put_teacher_timezone(&self, teacher: TeacherId, timezone: Tz) -> StoreResult<()>;

    /// Inserts or replaces the given rows. The affected weekdays must still
    /// satisfy merge-flag symmetry afterwards, otherwise nothing is written.
    fn upsert_weekly_assignments(&self, assignments: &[WeeklyAssignment]) -> StoreResult<()>;

    /// Replaces a teacher's whole weekly template.
    fn replace_weekly_template(
        &self,
        teacher: TeacherId,
        assignments: &[WeeklyAssignment],
    ) -> StoreResult<()>;

    fn upsert_daily_override(&self, entry: &DailyOverride) -> StoreResult<()>;

    fn remove_daily_override(
        &self,
        teacher: TeacherId,
        date: NaiveDate,
        period: u32,
    ) -> StoreResult<bool>;

    fn add_vacation_range(&self, teacher: TeacherId, range: &VacationRange) -> StoreResult<()>;

    fn put_activity_display(
        &self,
        activity: &ActivityRef,
        display: &ActivityDisplay,
    ) -> StoreResult<()>;
}

pub(crate) fn ensure_teacher(
    teacher: TeacherId,
    assignments: &[WeeklyAssignment],
) -> StoreResult<()> {
    if let Some(other) = assignments.iter().find(|a| a.teacher_id != teacher) {
        return Err(StoreError::InvalidData(format!(
            "weekly assignment for teacher {} found in template of teacher {teacher}",
            other.teacher_id
        )));
    }
    Ok(())
}

pub(crate) fn parse_timezone(name: &str) -> StoreResult<Tz> {
    name.parse::<Tz>()
        .map_err(|err| StoreError::InvalidData(format!("unknown timezone '{name}': {err}")))
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    TeacherTimetable, TimetableSnapshot, load_snapshot_from_json, load_weekly_template_from_csv,
    save_snapshot_to_json, save_weekly_template_to_csv,
};
pub use memory::InMemoryStore;
