use crate::activity::ActivityRef;
use crate::assignment::{DailyOverride, TeacherId, WeeklyAssignment, is_school_weekday};
use crate::calendar::VacationRange;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Debug, Clone)]
pub struct AssignmentValidationError {
    message: String,
}

impl AssignmentValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for AssignmentValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AssignmentValidationError {}

fn validate_activity(activity: &ActivityRef, slot: &str) -> Result<(), AssignmentValidationError> {
    if let ActivityRef::CustomTask(title) = activity {
        if title.trim().is_empty() {
            return Err(AssignmentValidationError::new(format!(
                "{slot} has a custom task with an empty title"
            )));
        }
    }
    Ok(())
}

pub fn validate_weekly_assignment(
    assignment: &WeeklyAssignment,
) -> Result<(), AssignmentValidationError> {
    let slot = format!(
        "weekly assignment teacher {} {} P{}",
        assignment.teacher_id, assignment.weekday, assignment.period
    );
    if !is_school_weekday(assignment.weekday) {
        return Err(AssignmentValidationError::new(format!(
            "{slot} is not on a school weekday (Mon-Fri)"
        )));
    }
    if assignment.period == 0 {
        return Err(AssignmentValidationError::new(format!(
            "{slot} uses period 0, periods are numbered from 1"
        )));
    }
    if assignment.period == 1 && assignment.merged_with_previous {
        return Err(AssignmentValidationError::new(format!(
            "{slot} cannot merge with a previous period"
        )));
    }
    validate_activity(&assignment.activity, &slot)
}

/// Validates a set of weekly assignments as a whole: every row individually,
/// uniqueness per (teacher, weekday, period), and merge-flag symmetry
/// (`merged_with_next` at p holds exactly when `merged_with_previous` holds
/// at p + 1).
pub fn validate_weekly_template(
    assignments: &[WeeklyAssignment],
) -> Result<(), AssignmentValidationError> {
    let mut days: BTreeMap<(TeacherId, u32), BTreeMap<u32, &WeeklyAssignment>> = BTreeMap::new();
    for assignment in assignments {
        validate_weekly_assignment(assignment)?;
        let day = days
            .entry((
                assignment.teacher_id,
                assignment.weekday.num_days_from_monday(),
            ))
            .or_default();
        if day.insert(assignment.period, assignment).is_some() {
            return Err(AssignmentValidationError::new(format!(
                "duplicate weekly assignment for teacher {} {} P{}",
                assignment.teacher_id, assignment.weekday, assignment.period
            )));
        }
    }

    for ((teacher_id, _), day) in &days {
        for (&period, assignment) in day {
            let next_merges_back = period
                .checked_add(1)
                .and_then(|next| day.get(&next))
                .is_some_and(|next| next.merged_with_previous);
            if assignment.merged_with_next != next_merges_back {
                return Err(AssignmentValidationError::new(format!(
                    "teacher {} {} P{} merge flags are not symmetric with the following period",
                    teacher_id, assignment.weekday, period
                )));
            }
            if assignment.merged_with_previous {
                let previous_merges_forward = period
                    .checked_sub(1)
                    .and_then(|prev| day.get(&prev))
                    .is_some_and(|prev| prev.merged_with_next);
                if !previous_merges_forward {
                    return Err(AssignmentValidationError::new(format!(
                        "teacher {} {} P{} is merged with a previous period that does not merge forward",
                        teacher_id, assignment.weekday, period
                    )));
                }
            }
        }
    }
    Ok(())
}

pub fn validate_daily_override(entry: &DailyOverride) -> Result<(), AssignmentValidationError> {
    let slot = format!(
        "daily override teacher {} {} P{}",
        entry.teacher_id, entry.date, entry.period
    );
    if entry.period == 0 {
        return Err(AssignmentValidationError::new(format!(
            "{slot} uses period 0, periods are numbered from 1"
        )));
    }
    if let Some(activity) = &entry.activity {
        validate_activity(activity, &slot)?;
    }
    Ok(())
}

pub fn validate_daily_overrides(
    entries: &[DailyOverride],
) -> Result<(), AssignmentValidationError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        validate_daily_override(entry)?;
        if !seen.insert((entry.teacher_id, entry.date, entry.period)) {
            return Err(AssignmentValidationError::new(format!(
                "duplicate daily override for teacher {} {} P{}",
                entry.teacher_id, entry.date, entry.period
            )));
        }
    }
    Ok(())
}

pub fn validate_vacation_range(range: &VacationRange) -> Result<(), AssignmentValidationError> {
    if range.start_date > range.end_date {
        return Err(AssignmentValidationError::new(format!(
            "vacation '{}' starts on {} after it ends on {}",
            range.name, range.start_date, range.end_date
        )));
    }
    Ok(())
}
