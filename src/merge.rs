use crate::activity::ActivityRef;
use crate::assignment::{TeacherId, WeeklyAssignment};
use crate::plan::{DayPlan, SlotSource, SpanAnchor, StoreDay};
use crate::store::{StoreError, StoreResult, TimetableStore, TimetableWriter};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Consecutive periods fused into one block, `start_period..=end_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSpan {
    pub start_period: u32,
    pub end_period: u32,
    pub is_merged: bool,
}

impl MergeSpan {
    pub fn single(period: u32) -> Self {
        Self {
            start_period: period,
            end_period: period,
            is_merged: false,
        }
    }

    fn through(start_period: u32, end_period: u32) -> Self {
        Self {
            start_period,
            end_period,
            is_merged: end_period > start_period,
        }
    }
}

fn overridden<S: SlotSource + ?Sized>(source: &S, period: u32) -> StoreResult<bool> {
    Ok(source
        .daily(period)?
        .is_some_and(|entry| entry.shadows_template()))
}

/// Determines how far the block starting at `start` extends.
///
/// Explicit weekly merge flags win whenever the start slot is served by the
/// weekly template and carries `merged_with_next`. Otherwise a lesson coming
/// from a daily override extends over following overrides with an identical
/// activity. A daily override at a later period always ends a flagged chain.
pub fn merge_span<S: SlotSource + ?Sized>(source: &S, start: u32) -> StoreResult<MergeSpan> {
    let start_override = source.daily(start)?;
    let start_shadowed = start_override
        .as_ref()
        .is_some_and(|entry| entry.shadows_template());

    if !start_shadowed {
        if let Some(assignment) = source.weekly(start)? {
            if assignment.merged_with_next {
                return walk_merge_flags(source, start);
            }
        }
    }

    if let Some(activity) = start_override.and_then(|entry| entry.activity) {
        return walk_equivalent_overrides(source, start, &activity);
    }

    Ok(MergeSpan::single(start))
}

fn walk_merge_flags<S: SlotSource + ?Sized>(source: &S, start: u32) -> StoreResult<MergeSpan> {
    let mut end = start;
    while let Some(next) = end.checked_add(1) {
        let continues = match source.weekly(next)? {
            Some(assignment) => assignment.merged_with_previous && !overridden(source, next)?,
            None => false,
        };
        if !continues {
            break;
        }
        end = next;
    }
    if end == start {
        tracing::warn!(
            period = start,
            "merge flag points to a period that does not merge back, treating as unmerged"
        );
    }
    Ok(MergeSpan::through(start, end))
}

fn walk_equivalent_overrides<S: SlotSource + ?Sized>(
    source: &S,
    start: u32,
    activity: &ActivityRef,
) -> StoreResult<MergeSpan> {
    let mut end = start;
    while let Some(next) = end.checked_add(1) {
        let same = source
            .daily(next)?
            .is_some_and(|entry| entry.activity.as_ref() == Some(activity));
        if !same {
            break;
        }
        end = next;
    }
    Ok(MergeSpan::through(start, end))
}

/// Finds the first period of the block that `period` belongs to.
///
/// Walks back while the previous period's own span reaches into the block,
/// so a period in the middle of a flagged chain or of an identical-override
/// chain resolves to the period the chain starts at.
pub fn merge_block_start<S: SlotSource + ?Sized>(source: &S, period: u32) -> StoreResult<u32> {
    let mut start = period;
    while let Some(previous) = start.checked_sub(1).filter(|&previous| previous >= 1) {
        if !may_continue_from(source, previous, start)? {
            break;
        }
        if merge_span(source, previous)?.end_period < start {
            break;
        }
        start = previous;
    }
    Ok(start)
}

fn may_continue_from<S: SlotSource + ?Sized>(
    source: &S,
    previous: u32,
    period: u32,
) -> StoreResult<bool> {
    let current = source.daily(period)?;
    if let Some(activity) = current.as_ref().and_then(|entry| entry.activity.as_ref()) {
        return Ok(source
            .daily(previous)?
            .is_some_and(|entry| entry.activity.as_ref() == Some(activity)));
    }
    if current.is_some_and(|entry| entry.shadows_template()) {
        return Ok(false);
    }
    Ok(source
        .weekly(period)?
        .is_some_and(|assignment| assignment.merged_with_previous))
}

/// Resolves the merge span of a period straight from the store.
pub fn resolve_merge_span<S: TimetableStore + ?Sized>(
    store: &S,
    teacher: TeacherId,
    anchor: SpanAnchor,
    start_period: u32,
) -> StoreResult<MergeSpan> {
    merge_span(&StoreDay::new(store, teacher, anchor), start_period)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    Merge,
    Separate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeEditError {
    MissingAssignment { period: u32 },
    ActivityMismatch { period: u32, next: u32 },
    NotMerged { period: u32 },
    AlreadyMerged { period: u32 },
}

impl fmt::Display for MergeEditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeEditError::MissingAssignment { period } => {
                write!(f, "no weekly assignment at P{period}")
            }
            MergeEditError::ActivityMismatch { period, next } => write!(
                f,
                "P{period} and P{next} hold different activities and cannot be merged"
            ),
            MergeEditError::NotMerged { period } => {
                write!(f, "P{period} is not merged with the following period")
            }
            MergeEditError::AlreadyMerged { period } => {
                write!(f, "P{period} is already merged with the following period")
            }
        }
    }
}

impl std::error::Error for MergeEditError {}

impl DayPlan {
    /// Fuses `period` with `period + 1`, setting both flags together.
    /// Returns the rows that changed.
    pub fn merge_with_next(
        &mut self,
        period: u32,
    ) -> Result<Vec<WeeklyAssignment>, MergeEditError> {
        let next = period
            .checked_add(1)
            .ok_or(MergeEditError::MissingAssignment { period })?;
        let first = self
            .weekly
            .get(&period)
            .ok_or(MergeEditError::MissingAssignment { period })?;
        let second = self
            .weekly
            .get(&next)
            .ok_or(MergeEditError::MissingAssignment { period: next })?;
        if first.merged_with_next {
            return Err(MergeEditError::AlreadyMerged { period });
        }
        if first.activity != second.activity {
            return Err(MergeEditError::ActivityMismatch { period, next });
        }

        let mut changed = Vec::with_capacity(2);
        if let Some(first) = self.weekly.get_mut(&period) {
            first.merged_with_next = true;
            changed.push(first.clone());
        }
        if let Some(second) = self.weekly.get_mut(&next) {
            second.merged_with_previous = true;
            changed.push(second.clone());
        }
        Ok(changed)
    }

    /// Splits `period` from `period + 1`, clearing both flags together.
    /// Returns the rows that changed.
    pub fn separate_from_next(
        &mut self,
        period: u32,
    ) -> Result<Vec<WeeklyAssignment>, MergeEditError> {
        let first = self
            .weekly
            .get_mut(&period)
            .ok_or(MergeEditError::MissingAssignment { period })?;
        if !first.merged_with_next {
            return Err(MergeEditError::NotMerged { period });
        }
        first.merged_with_next = false;
        let mut changed = vec![first.clone()];
        if let Some(second) = period
            .checked_add(1)
            .and_then(|next| self.weekly.get_mut(&next))
        {
            second.merged_with_previous = false;
            changed.push(second.clone());
        }
        Ok(changed)
    }

    pub fn apply(
        &mut self,
        action: MergeAction,
        period: u32,
    ) -> Result<Vec<WeeklyAssignment>, MergeEditError> {
        match action {
            MergeAction::Merge => self.merge_with_next(period),
            MergeAction::Separate => self.separate_from_next(period),
        }
    }

    pub fn merge_span(&self, start_period: u32) -> StoreResult<MergeSpan> {
        merge_span(self, start_period)
    }
}

/// Applies a merge edit to a weekday of the stored template and commits the
/// changed rows in one write. Returns the span starting at `period` afterwards.
pub fn commit_merge_edit<S>(
    store: &S,
    teacher: TeacherId,
    weekday: Weekday,
    period: u32,
    action: MergeAction,
) -> StoreResult<MergeSpan>
where
    S: TimetableStore + TimetableWriter + ?Sized,
{
    let mut plan = DayPlan::load(store, teacher, SpanAnchor::Weekday(weekday))?;
    let changed = plan
        .apply(action, period)
        .map_err(|err| StoreError::InvalidData(err.to_string()))?;
    store.upsert_weekly_assignments(&changed)?;
    tracing::info!(teacher, %weekday, period, ?action, "merge edit committed");
    plan.merge_span(period)
}
