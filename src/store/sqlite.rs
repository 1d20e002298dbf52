use super::{
    StoreError, StoreResult, TimetableStore, TimetableWriter, ensure_teacher, parse_timezone,
};
use crate::activity::{ActivityDisplay, ActivityRef};
use crate::assignment::{
    DailyOverride, TeacherId, WeeklyAssignment, school_weekday_from_index, school_weekday_index,
};
use crate::calendar::VacationRange;
use crate::periods::TeacherDayConfig;
use crate::validation;
use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use std::collections::BTreeSet;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> StoreResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> StoreResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> StoreResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS teacher_profiles (
                teacher_id INTEGER PRIMARY KEY,
                day_config_json TEXT,
                timezone TEXT
            );
            CREATE TABLE IF NOT EXISTS weekly_assignments (
                teacher_id INTEGER NOT NULL,
                weekday INTEGER NOT NULL CHECK (weekday BETWEEN 0 AND 4),
                period INTEGER NOT NULL CHECK (period >= 1),
                classroom_id INTEGER,
                mixed_group_id INTEGER,
                custom_task_title TEXT,
                merged_with_previous INTEGER NOT NULL DEFAULT 0,
                merged_with_next INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (teacher_id, weekday, period)
            );
            CREATE TABLE IF NOT EXISTS daily_overrides (
                teacher_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                period INTEGER NOT NULL CHECK (period >= 1),
                classroom_id INTEGER,
                mixed_group_id INTEGER,
                custom_task_title TEXT,
                title TEXT,
                description TEXT,
                PRIMARY KEY (teacher_id, date, period)
            );
            CREATE TABLE IF NOT EXISTS vacation_ranges (
                id INTEGER PRIMARY KEY,
                teacher_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS vacation_ranges_teacher ON vacation_ranges (teacher_id);
            CREATE TABLE IF NOT EXISTS activity_displays (
                activity_key TEXT PRIMARY KEY,
                display_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn weekly_from_row(row: &Row<'_>) -> rusqlite::Result<WeeklyRow> {
        Ok(WeeklyRow {
            teacher_id: row.get(0)?,
            weekday: row.get(1)?,
            period: row.get(2)?,
            classroom_id: row.get(3)?,
            mixed_group_id: row.get(4)?,
            custom_task_title: row.get(5)?,
            merged_with_previous: row.get(6)?,
            merged_with_next: row.get(7)?,
        })
    }

    fn override_from_row(row: &Row<'_>) -> rusqlite::Result<OverrideRow> {
        Ok(OverrideRow {
            teacher_id: row.get(0)?,
            date: row.get(1)?,
            period: row.get(2)?,
            classroom_id: row.get(3)?,
            mixed_group_id: row.get(4)?,
            custom_task_title: row.get(5)?,
            title: row.get(6)?,
            description: row.get(7)?,
        })
    }

    fn day_rows(
        connection: &Connection,
        teacher: TeacherId,
        weekday: Weekday,
    ) -> StoreResult<Vec<WeeklyAssignment>> {
        let mut stmt = connection.prepare(
            "SELECT teacher_id, weekday, period, classroom_id, mixed_group_id, custom_task_title,
                    merged_with_previous, merged_with_next
             FROM weekly_assignments WHERE teacher_id = ?1 AND weekday = ?2 ORDER BY period ASC",
        )?;
        let rows = stmt.query_map(
            params![teacher, school_weekday_index(weekday)],
            Self::weekly_from_row,
        )?;
        let mut assignments = Vec::new();
        for row in rows {
            assignments.push(row?.into_assignment()?);
        }
        Ok(assignments)
    }

    fn insert_weekly(tx: &Transaction<'_>, assignment: &WeeklyAssignment) -> StoreResult<()> {
        let (classroom_id, mixed_group_id, custom_task_title) = assignment.activity.to_parts();
        tx.execute(
            "INSERT OR REPLACE INTO weekly_assignments
                (teacher_id, weekday, period, classroom_id, mixed_group_id, custom_task_title,
                 merged_with_previous, merged_with_next)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                assignment.teacher_id,
                school_weekday_index(assignment.weekday),
                assignment.period,
                classroom_id,
                mixed_group_id,
                custom_task_title,
                assignment.merged_with_previous,
                assignment.merged_with_next,
            ],
        )?;
        Ok(())
    }

    fn upsert_profile_column(
        &self,
        teacher: TeacherId,
        column: &str,
        value: &str,
    ) -> StoreResult<()> {
        let conn = self.connection.lock();
        conn.execute(
            &format!(
                "INSERT INTO teacher_profiles (teacher_id, {column}) VALUES (?1, ?2)
                 ON CONFLICT(teacher_id) DO UPDATE SET {column} = excluded.{column}"
            ),
            params![teacher, value],
        )?;
        Ok(())
    }
}

struct WeeklyRow {
    teacher_id: TeacherId,
    weekday: u8,
    period: u32,
    classroom_id: Option<i64>,
    mixed_group_id: Option<i64>,
    custom_task_title: Option<String>,
    merged_with_previous: bool,
    merged_with_next: bool,
}

impl WeeklyRow {
    fn into_assignment(self) -> StoreResult<WeeklyAssignment> {
        let weekday = school_weekday_from_index(self.weekday).ok_or_else(|| {
            StoreError::InvalidData(format!("stored weekday {} out of range", self.weekday))
        })?;
        let activity =
            ActivityRef::from_parts(self.classroom_id, self.mixed_group_id, self.custom_task_title)
                .map_err(StoreError::InvalidData)?
                .ok_or_else(|| {
                    StoreError::InvalidData(format!(
                        "weekly assignment teacher {} {weekday} P{} has no activity",
                        self.teacher_id, self.period
                    ))
                })?;
        Ok(WeeklyAssignment {
            teacher_id: self.teacher_id,
            weekday,
            period: self.period,
            activity,
            merged_with_previous: self.merged_with_previous,
            merged_with_next: self.merged_with_next,
        })
    }
}

struct OverrideRow {
    teacher_id: TeacherId,
    date: String,
    period: u32,
    classroom_id: Option<i64>,
    mixed_group_id: Option<i64>,
    custom_task_title: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

impl OverrideRow {
    fn into_override(self) -> StoreResult<DailyOverride> {
        let activity =
            ActivityRef::from_parts(self.classroom_id, self.mixed_group_id, self.custom_task_title)
                .map_err(StoreError::InvalidData)?;
        Ok(DailyOverride {
            teacher_id: self.teacher_id,
            date: parse_date(&self.date)?,
            period: self.period,
            activity,
            title: self.title,
            description: self.description,
        })
    }
}

fn parse_date(raw: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|err| StoreError::InvalidData(format!("invalid stored date '{raw}': {err}")))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

impl TimetableStore for SqliteStore {
    fn day_config(&self, teacher: TeacherId) -> StoreResult<Option<TeacherDayConfig>> {
        let conn = self.connection.lock();
        let json: Option<Option<String>> = conn
            .query_row(
                "SELECT day_config_json FROM teacher_profiles WHERE teacher_id = ?1",
                params![teacher],
                |row| row.get(0),
            )
            .optional()?;
        match json.flatten() {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn teacher_timezone(&self, teacher: TeacherId) -> StoreResult<Option<Tz>> {
        let conn = self.connection.lock();
        let name: Option<Option<String>> = conn
            .query_row(
                "SELECT timezone FROM teacher_profiles WHERE teacher_id = ?1",
                params![teacher],
                |row| row.get(0),
            )
            .optional()?;
        name.flatten().map(|name| parse_timezone(&name)).transpose()
    }

    fn weekly_assignment(
        &self,
        teacher: TeacherId,
        weekday: Weekday,
        period: u32,
    ) -> StoreResult<Option<WeeklyAssignment>> {
        let conn = self.connection.lock();
        let row = conn
            .query_row(
                "SELECT teacher_id, weekday, period, classroom_id, mixed_group_id, custom_task_title,
                        merged_with_previous, merged_with_next
                 FROM weekly_assignments WHERE teacher_id = ?1 AND weekday = ?2 AND period = ?3",
                params![teacher, school_weekday_index(weekday), period],
                Self::weekly_from_row,
            )
            .optional()?;
        row.map(WeeklyRow::into_assignment).transpose()
    }

    fn weekly_assignments(
        &self,
        teacher: TeacherId,
        weekday: Weekday,
    ) -> StoreResult<Vec<WeeklyAssignment>> {
        let conn = self.connection.lock();
        Self::day_rows(&conn, teacher, weekday)
    }

    fn daily_override(
        &self,
        teacher: TeacherId,
        date: NaiveDate,
        period: u32,
    ) -> StoreResult<Option<DailyOverride>> {
        let conn = self.connection.lock();
        let row = conn
            .query_row(
                "SELECT teacher_id, date, period, classroom_id, mixed_group_id, custom_task_title,
                        title, description
                 FROM daily_overrides WHERE teacher_id = ?1 AND date = ?2 AND period = ?3",
                params![teacher, format_date(date), period],
                Self::override_from_row,
            )
            .optional()?;
        row.map(OverrideRow::into_override).transpose()
    }

    fn daily_overrides(
        &self,
        teacher: TeacherId,
        date: NaiveDate,
    ) -> StoreResult<Vec<DailyOverride>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(
            "SELECT teacher_id, date, period, classroom_id, mixed_group_id, custom_task_title,
                    title, description
             FROM daily_overrides WHERE teacher_id = ?1 AND date = ?2 ORDER BY period ASC",
        )?;
        let rows = stmt.query_map(params![teacher, format_date(date)], Self::override_from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_override()?);
        }
        Ok(entries)
    }

    fn vacation_ranges(&self, teacher: TeacherId) -> StoreResult<Vec<VacationRange>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(
            "SELECT name, start_date, end_date FROM vacation_ranges
             WHERE teacher_id = ?1 ORDER BY start_date ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![teacher], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut ranges = Vec::new();
        for row in rows {
            let (name, start, end) = row?;
            ranges.push(VacationRange::new(name, parse_date(&start)?, parse_date(&end)?));
        }
        Ok(ranges)
    }

    fn activity_display(&self, activity: &ActivityRef) -> StoreResult<Option<ActivityDisplay>> {
        let conn = self.connection.lock();
        let json: Option<String> = conn
            .query_row(
                "SELECT display_json FROM activity_displays WHERE activity_key = ?1",
                params![activity.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

impl TimetableWriter for SqliteStore {
    fn put_day_config(&self, teacher: TeacherId, config: &TeacherDayConfig) -> StoreResult<()> {
        let json = serde_json::to_string(config)?;
        self.upsert_profile_column(teacher, "day_config_json", &json)
    }

    fn put_teacher_timezone(&self, teacher: TeacherId, timezone: Tz) -> StoreResult<()> {
        self.upsert_profile_column(teacher, "timezone", timezone.name())
    }

    fn upsert_weekly_assignments(&self, assignments: &[WeeklyAssignment]) -> StoreResult<()> {
        for assignment in assignments {
            validation::validate_weekly_assignment(assignment)?;
        }
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        let mut touched = BTreeSet::new();
        for assignment in assignments {
            Self::insert_weekly(&tx, assignment)?;
            touched.insert((
                assignment.teacher_id,
                school_weekday_index(assignment.weekday),
            ));
        }
        let mut resulting = Vec::new();
        for (teacher, weekday_index) in touched {
            if let Some(weekday) = school_weekday_from_index(weekday_index) {
                resulting.extend(Self::day_rows(&tx, teacher, weekday)?);
            }
        }
        // Dropping the transaction without commit rolls the rows back.
        validation::validate_weekly_template(&resulting)?;
        tx.commit()?;
        Ok(())
    }

    fn replace_weekly_template(
        &self,
        teacher: TeacherId,
        assignments: &[WeeklyAssignment],
    ) -> StoreResult<()> {
        ensure_teacher(teacher, assignments)?;
        validation::validate_weekly_template(assignments)?;
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM weekly_assignments WHERE teacher_id = ?1",
            params![teacher],
        )?;
        for assignment in assignments {
            Self::insert_weekly(&tx, assignment)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn upsert_daily_override(&self, entry: &DailyOverride) -> StoreResult<()> {
        validation::validate_daily_override(entry)?;
        let (classroom_id, mixed_group_id, custom_task_title) = match &entry.activity {
            Some(activity) => activity.to_parts(),
            None => (None, None, None),
        };
        let conn = self.connection.lock();
        conn.execute(
            "INSERT OR REPLACE INTO daily_overrides
                (teacher_id, date, period, classroom_id, mixed_group_id, custom_task_title,
                 title, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.teacher_id,
                format_date(entry.date),
                entry.period,
                classroom_id,
                mixed_group_id,
                custom_task_title,
                entry.title,
                entry.description,
            ],
        )?;
        Ok(())
    }

    fn remove_daily_override(
        &self,
        teacher: TeacherId,
        date: NaiveDate,
        period: u32,
    ) -> StoreResult<bool> {
        let conn = self.connection.lock();
        let removed = conn.execute(
            "DELETE FROM daily_overrides WHERE teacher_id = ?1 AND date = ?2 AND period = ?3",
            params![teacher, format_date(date), period],
        )?;
        Ok(removed > 0)
    }

    fn add_vacation_range(&self, teacher: TeacherId, range: &VacationRange) -> StoreResult<()> {
        validation::validate_vacation_range(range)?;
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO vacation_ranges (teacher_id, name, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                teacher,
                range.name,
                format_date(range.start_date),
                format_date(range.end_date)
            ],
        )?;
        Ok(())
    }

    fn put_activity_display(
        &self,
        activity: &ActivityRef,
        display: &ActivityDisplay,
    ) -> StoreResult<()> {
        let json = serde_json::to_string(display)?;
        let conn = self.connection.lock();
        conn.execute(
            "INSERT OR REPLACE INTO activity_displays (activity_key, display_json) VALUES (?1, ?2)",
            params![activity.to_string(), json],
        )?;
        Ok(())
    }
}
