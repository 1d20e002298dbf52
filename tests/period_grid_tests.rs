use chrono::NaiveTime;
use timetable::{DayConfigError, PeriodSlot, TeacherDayConfig, build_periods};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn spans(slots: &[PeriodSlot]) -> Vec<(u32, NaiveTime, NaiveTime)> {
    slots
        .iter()
        .map(|slot| (slot.number, slot.start, slot.end))
        .collect()
}

fn assert_well_formed(config: &TeacherDayConfig, slots: &[PeriodSlot]) {
    for (idx, slot) in slots.iter().enumerate() {
        assert_eq!(slot.number, idx as u32 + 1, "periods are numbered from 1");
        assert!(slot.start < slot.end, "P{} is empty", slot.number);
        assert!(slot.start >= config.day_start);
        assert!(slot.start < config.day_end);
    }
    for pair in slots.windows(2) {
        assert!(
            pair[0].end <= pair[1].start,
            "P{} overlaps P{}",
            pair[0].number,
            pair[1].number
        );
    }
}

#[test]
fn plain_morning_yields_five_periods() {
    let config = TeacherDayConfig::new(t(8, 0), t(12, 0), 45, 5);
    let slots = build_periods(&config);
    assert_eq!(
        spans(&slots),
        vec![
            (1, t(8, 0), t(8, 45)),
            (2, t(8, 50), t(9, 35)),
            (3, t(9, 40), t(10, 25)),
            (4, t(10, 30), t(11, 15)),
            (5, t(11, 20), t(12, 5)),
        ]
    );
}

#[test]
fn major_break_shortens_the_straddling_period() {
    let config = TeacherDayConfig::new(t(8, 0), t(12, 0), 45, 5).with_break(t(10, 0), t(10, 20));
    let slots = build_periods(&config);
    assert_eq!(slots[2].start, t(9, 40));
    assert_eq!(slots[2].end, t(10, 0));
    assert_eq!(slots[3].start, t(10, 20));
    assert_eq!(
        spans(&slots),
        vec![
            (1, t(8, 0), t(8, 45)),
            (2, t(8, 50), t(9, 35)),
            (3, t(9, 40), t(10, 0)),
            (4, t(10, 20), t(11, 5)),
            (5, t(11, 10), t(11, 55)),
        ]
    );
}

#[test]
fn break_on_period_boundary_emits_no_empty_slot() {
    // P2 would start at 08:50, exactly where the break begins
    let config = TeacherDayConfig::new(t(8, 0), t(11, 0), 45, 5).with_break(t(8, 50), t(9, 10));
    let slots = build_periods(&config);
    assert_eq!(slots[0].end, t(8, 45));
    assert_eq!(slots[1].start, t(9, 10));
    assert_well_formed(&config, &slots);
}

#[test]
fn period_ending_exactly_at_break_is_kept_whole() {
    let config = TeacherDayConfig::new(t(8, 0), t(11, 0), 45, 5).with_break(t(8, 45), t(9, 0));
    let slots = build_periods(&config);
    assert_eq!(slots[0].end, t(8, 45));
    assert_eq!(slots[1].start, t(9, 0));
}

#[test]
fn several_breaks_are_consumed_in_order() {
    let config = TeacherDayConfig::new(t(8, 0), t(15, 0), 45, 5)
        .with_break(t(9, 30), t(9, 50))
        .with_break(t(12, 0), t(12, 45));
    let slots = build_periods(&config);
    assert_well_formed(&config, &slots);
    assert!(slots.iter().any(|slot| slot.end == t(9, 30)));
    assert!(slots.iter().any(|slot| slot.start == t(9, 50)));
    assert!(slots.iter().any(|slot| slot.end == t(12, 0)));
    assert!(slots.iter().any(|slot| slot.start == t(12, 45)));
    assert!(
        slots
            .iter()
            .all(|slot| !(slot.start < t(12, 45) && slot.end > t(12, 0)))
    );
}

#[test]
fn inverted_day_builds_an_empty_grid() {
    let config = TeacherDayConfig::new(t(12, 0), t(8, 0), 45, 5);
    assert!(matches!(config.validate(), Err(DayConfigError::EmptyDay { .. })));
    assert!(build_periods(&config).is_empty());
}

#[test]
fn zero_period_duration_builds_an_empty_grid() {
    let config = TeacherDayConfig::new(t(8, 0), t(12, 0), 0, 5);
    assert_eq!(config.validate(), Err(DayConfigError::ZeroPeriodDuration));
    assert!(build_periods(&config).is_empty());
}

#[test]
fn day_long_durations_build_an_empty_grid() {
    let period = TeacherDayConfig::new(t(8, 0), t(12, 0), 80_000_000, 5);
    assert!(matches!(
        period.validate(),
        Err(DayConfigError::DurationTooLong { minutes: 80_000_000, .. })
    ));
    assert!(build_periods(&period).is_empty());

    let gap = TeacherDayConfig::new(t(8, 0), t(12, 0), 45, 80_000_000);
    assert!(gap.validate().is_err());
    assert!(build_periods(&gap).is_empty());

    // One minute short of a day is still a valid, single-period grid
    let longest = TeacherDayConfig::new(t(0, 0), t(23, 0), 24 * 60 - 1, 24 * 60 - 1);
    assert!(longest.validate().is_ok());
    assert_eq!(build_periods(&longest).len(), 1);
}

#[test]
fn breaks_out_of_order_are_rejected() {
    let config = TeacherDayConfig::new(t(8, 0), t(14, 0), 45, 5)
        .with_break(t(12, 0), t(12, 30))
        .with_break(t(10, 0), t(10, 20));
    assert!(config.validate().is_err());
    assert!(build_periods(&config).is_empty());
}

#[test]
fn grids_are_well_formed_across_configurations() {
    for period in [20, 30, 45, 50, 60, 90] {
        for gap in [0, 5, 10, 15] {
            for (start, end) in [(t(7, 30), t(13, 0)), (t(8, 0), t(16, 30)), (t(9, 15), t(10, 0))] {
                let plain = TeacherDayConfig::new(start, end, period, gap);
                assert_well_formed(&plain, &build_periods(&plain));

                let with_break = plain.clone().with_break(t(10, 0), t(10, 20));
                if with_break.validate().is_ok() {
                    assert_well_formed(&with_break, &build_periods(&with_break));
                }
            }
        }
    }
}

#[test]
fn grid_is_recomputed_from_the_current_config() {
    let mut config = TeacherDayConfig::new(t(8, 0), t(12, 0), 45, 5);
    assert_eq!(build_periods(&config).len(), 5);
    config.period_duration = 55;
    let slots = build_periods(&config);
    assert_eq!(slots.len(), 4);
    assert_eq!(slots[0].end, t(8, 55));
}

#[test]
fn slot_contains_both_edges() {
    let slots = build_periods(&TeacherDayConfig::new(t(8, 0), t(12, 0), 45, 5));
    let second = slots[1];
    assert!(second.contains(t(8, 50)));
    assert!(second.contains(t(9, 35)));
    assert!(!second.contains(t(8, 49)));
    assert!(!second.contains(t(9, 36)));
}
