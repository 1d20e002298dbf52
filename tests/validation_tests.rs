use chrono::{NaiveDate, Weekday};
use timetable::validation::{
    validate_daily_override, validate_daily_overrides, validate_vacation_range,
    validate_weekly_assignment, validate_weekly_template,
};
use timetable::{
    ActivityRef, DailyOverride, InMemoryStore, StoreError, TimetableWriter, VacationRange,
    WeeklyAssignment,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn row(weekday: Weekday, period: u32) -> WeeklyAssignment {
    WeeklyAssignment::new(1, weekday, period, ActivityRef::Classroom(10))
}

#[test]
fn weekend_assignment_is_invalid() {
    let err = validate_weekly_assignment(&row(Weekday::Sat, 1)).unwrap_err();
    assert!(err.to_string().contains("school weekday"));
}

#[test]
fn period_zero_is_invalid() {
    assert!(validate_weekly_assignment(&row(Weekday::Mon, 0)).is_err());
    let entry = DailyOverride::lesson(1, d(2025, 1, 6), 0, ActivityRef::Classroom(1));
    assert!(validate_daily_override(&entry).is_err());
}

#[test]
fn first_period_cannot_merge_backwards() {
    let mut first = row(Weekday::Mon, 1);
    first.merged_with_previous = true;
    assert!(validate_weekly_assignment(&first).is_err());
}

#[test]
fn blank_custom_task_title_is_invalid() {
    let assignment =
        WeeklyAssignment::new(1, Weekday::Tue, 2, ActivityRef::CustomTask("  ".into()));
    assert!(validate_weekly_assignment(&assignment).is_err());
}

#[test]
fn template_requires_unique_slots() {
    let err = validate_weekly_template(&[row(Weekday::Mon, 1), row(Weekday::Mon, 1)]).unwrap_err();
    assert!(err.to_string().contains("duplicate"));
    // The same period on another teacher is fine
    let mut other = row(Weekday::Mon, 1);
    other.teacher_id = 2;
    assert!(validate_weekly_template(&[row(Weekday::Mon, 1), other]).is_ok());
}

#[test]
fn template_requires_symmetric_flags_both_ways() {
    let mut forward = row(Weekday::Wed, 2);
    forward.merged_with_next = true;
    assert!(validate_weekly_template(&[forward.clone(), row(Weekday::Wed, 3)]).is_err());

    let mut backward = row(Weekday::Wed, 3);
    backward.merged_with_previous = true;
    assert!(validate_weekly_template(&[row(Weekday::Wed, 2), backward.clone()]).is_err());
    // Backward flag with no row before it at all
    assert!(validate_weekly_template(std::slice::from_ref(&backward)).is_err());

    assert!(validate_weekly_template(&[forward, backward]).is_ok());
}

#[test]
fn flags_on_different_weekdays_do_not_pair() {
    let mut monday = row(Weekday::Mon, 2);
    monday.merged_with_next = true;
    let mut tuesday = row(Weekday::Tue, 3);
    tuesday.merged_with_previous = true;
    assert!(validate_weekly_template(&[monday, tuesday]).is_err());
}

#[test]
fn overrides_must_be_unique_per_slot() {
    let date = d(2025, 1, 9);
    let entries = [
        DailyOverride::lesson(1, date, 3, ActivityRef::MixedGroup(2)),
        DailyOverride::freeform(1, date, 3, "Assembly"),
    ];
    assert!(validate_daily_overrides(&entries).is_err());
    assert!(validate_daily_overrides(&entries[..1]).is_ok());
}

#[test]
fn inverted_vacation_is_invalid() {
    let range = VacationRange::new("Backwards", d(2025, 3, 10), d(2025, 3, 1));
    assert!(validate_vacation_range(&range).is_err());
    let range = VacationRange::new("One day", d(2025, 3, 10), d(2025, 3, 10));
    assert!(validate_vacation_range(&range).is_ok());
}

#[test]
fn highest_period_number_has_no_following_period() {
    assert!(validate_weekly_template(&[row(Weekday::Mon, u32::MAX)]).is_ok());

    let mut last = row(Weekday::Mon, u32::MAX);
    last.merged_with_next = true;
    let err = validate_weekly_template(&[last.clone()]).unwrap_err();
    assert!(err.to_string().contains("not symmetric"));

    let store = InMemoryStore::new();
    assert!(matches!(
        store.upsert_weekly_assignments(&[last]),
        Err(StoreError::InvalidData(_))
    ));
}
