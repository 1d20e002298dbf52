use chrono::{Datelike, NaiveDate, Weekday};
use timetable::{SchoolCalendar, VacationRange, is_instructional_day};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn winter_break() -> VacationRange {
    // Monday to Friday
    VacationRange::new("Winter break", d(2025, 2, 17), d(2025, 2, 21))
}

#[test]
fn weekends_are_never_instructional() {
    // 2025-01-11 is a Saturday, 2025-01-12 a Sunday
    assert!(!is_instructional_day(d(2025, 1, 11), &[]));
    assert!(!is_instructional_day(d(2025, 1, 12), &[]));
    assert!(is_instructional_day(d(2025, 1, 13), &[]));
}

#[test]
fn vacation_bounds_are_inclusive() {
    let ranges = [winter_break()];
    assert!(is_instructional_day(d(2025, 2, 14), &ranges));
    assert!(!is_instructional_day(d(2025, 2, 17), &ranges));
    assert!(!is_instructional_day(d(2025, 2, 19), &ranges));
    assert!(!is_instructional_day(d(2025, 2, 21), &ranges));
    assert!(is_instructional_day(d(2025, 2, 24), &ranges));
}

#[test]
fn single_day_vacation_blocks_only_that_day() {
    let ranges = [VacationRange::new("Teacher training", d(2025, 3, 5), d(2025, 3, 5))];
    assert!(is_instructional_day(d(2025, 3, 4), &ranges));
    assert!(!is_instructional_day(d(2025, 3, 5), &ranges));
    assert!(is_instructional_day(d(2025, 3, 6), &ranges));
}

#[test]
fn calendar_reports_the_blocking_vacation() {
    let mut calendar = SchoolCalendar::default();
    calendar.add_vacation(winter_break());
    calendar.add_vacation(VacationRange::new("Easter", d(2025, 4, 14), d(2025, 4, 25)));

    assert_eq!(
        calendar.vacation_on(d(2025, 4, 16)).map(|range| range.name.as_str()),
        Some("Easter")
    );
    assert!(calendar.vacation_on(d(2025, 3, 3)).is_none());
    assert_eq!(calendar.vacations().len(), 2);
}

#[test]
fn days_ahead_skip_weekends_and_vacations() {
    let calendar = SchoolCalendar::new(vec![winter_break()]);
    // Friday before the break
    let days = calendar.instructional_days_ahead(d(2025, 2, 14), 14);
    assert_eq!(days.first(), Some(&d(2025, 2, 24)));
    assert_eq!(days.last(), Some(&d(2025, 2, 28)));
    assert_eq!(days.len(), 5);
    assert!(
        days.iter()
            .all(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
    );
}

#[test]
fn days_ahead_exclude_the_starting_day() {
    let calendar = SchoolCalendar::default();
    let monday = d(2025, 1, 6);
    let days = calendar.instructional_days_ahead(monday, 14);
    assert_eq!(days[0], d(2025, 1, 7));
    assert!(!days.contains(&monday));
    assert_eq!(days.len(), 10);
}

#[test]
fn horizon_can_be_fully_blocked() {
    let calendar = SchoolCalendar::new(vec![VacationRange::new(
        "Summer",
        d(2025, 7, 1),
        d(2025, 8, 31),
    )]);
    assert!(calendar.instructional_days_ahead(d(2025, 7, 4), 14).is_empty());
}

#[test]
fn vacation_days_in_range_are_deduplicated_weekdays() {
    let calendar = SchoolCalendar::new(vec![
        winter_break(),
        VacationRange::new("Overlap", d(2025, 2, 20), d(2025, 2, 25)),
    ]);
    let days = calendar.vacation_days_in_range(d(2025, 2, 1), d(2025, 2, 28));
    assert_eq!(
        days,
        vec![
            d(2025, 2, 17),
            d(2025, 2, 18),
            d(2025, 2, 19),
            d(2025, 2, 20),
            d(2025, 2, 21),
            d(2025, 2, 24),
            d(2025, 2, 25),
        ]
    );
}
