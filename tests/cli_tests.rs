#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use tempfile::NamedTempFile;

const SETUP: &str =
    "config 08:00 12:00 45 5\nassign mon 2 classroom:12\nassign mon 3 classroom:12\n";

#[allow(deprecated)]
fn run_cli(script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.write_stdin(script.to_string()).assert()
}

#[test]
fn cli_prints_the_period_grid() {
    run_cli("config 08:00 12:00 45 5\nperiods\nquit\n")
        .success()
        .stdout(str_contains("Day configured with 5 periods."))
        .stdout(str_contains("P1 08:00-08:45"))
        .stdout(str_contains("P5 11:20-12:05"));
}

#[test]
fn cli_break_shortens_a_period() {
    run_cli("config 08:00 12:00 45 5\nbreak 10:00 10:20\nperiods\nquit\n")
        .success()
        .stdout(str_contains("P3 09:40-10:00"))
        .stdout(str_contains("P4 10:20-11:05"));
}

#[test]
fn cli_locates_current_and_next_lessons() {
    let script = format!("{SETUP}locate 2025-01-06T08:55\nlocate 2025-01-06T10:30\nquit\n");
    run_cli(&script)
        .success()
        .stdout(str_contains("Current lesson: classroom:12 on Mon 2025-01-06 P2 (08:50-09:35)"))
        .stdout(str_contains("Next lesson: classroom:12 on Mon 2025-01-13 P2 (08:50-09:35)"));
}

#[test]
fn cli_merge_and_separate() {
    let script = format!(
        "{SETUP}merge mon 2\nspan mon 2\nlocate 2025-01-06T08:55\nseparate mon 2\nspan mon 2\nquit\n"
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Merged Mon P2-P3."))
        .stdout(str_contains("Span: P2-P3 (merged)"))
        .stdout(str_contains("P2-P3 (08:50-10:25)"))
        .stdout(str_contains("Separated Mon P2."))
        .stdout(str_contains("Span: P2-P2"));
}

#[test]
fn cli_reports_merge_conflicts() {
    run_cli("assign mon 1 classroom:1\nassign mon 2 group:2\nmerge mon 1\nquit\n")
        .success()
        .stdout(str_contains("hold different activities"));
}

#[test]
fn cli_vacation_moves_the_next_lesson() {
    let script = format!(
        "{SETUP}vacation 2025-01-13 2025-01-17 Winter break\nvacations\nlocate 2025-01-06T10:30\nquit\n"
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Vacation 'Winter break' added."))
        .stdout(str_contains("Winter break 2025-01-13..2025-01-17 (5 school days)"))
        .stdout(str_contains("Next lesson: classroom:12 on Mon 2025-01-20"));
}

#[test]
fn cli_override_and_clear() {
    let script = format!(
        "{SETUP}override 2025-01-06 2 - Staff meeting\nlocate 2025-01-06T08:55\nclear 2025-01-06 2\nlocate 2025-01-06T08:55\nquit\n"
    );
    let assert = run_cli(&script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("Override set for 2025-01-06 P2."));
    assert!(output.contains("Next lesson: classroom:12 on Mon 2025-01-06 P3"));
    let after_clear = output
        .split("Override removed for 2025-01-06 P2.")
        .last()
        .unwrap_or_default();
    assert!(
        after_clear.contains("Current lesson: classroom:12 on Mon 2025-01-06 P2"),
        "template should apply again after clearing:\n{after_clear}"
    );
}

#[test]
fn cli_save_and_load_json_round_trip() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().to_string();
    let script = format!(
        "{SETUP}save {path}\nassign tue 1 task:Temp\nload {path}\nweek tue\nweek mon\nquit\n"
    );
    let assert = run_cli(&script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("Timetable loaded from"));
    let after_reload = output
        .split("Timetable loaded from")
        .last()
        .unwrap_or_default();
    assert!(
        after_reload.contains("No weekly assignments."),
        "temporary assignment should be gone after reload:\n{after_reload}"
    );
    assert!(after_reload.contains("P2 classroom:12"));
}

#[test]
fn cli_exports_and_imports_weekly_csv() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().to_string();
    let script = format!(
        "{SETUP}merge mon 2\nexport-week {path}\nteacher 2\nimport-week {path}\nweek mon\nquit\n"
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Weekly template exported to"))
        .stdout(str_contains("Active teacher: 2."))
        .stdout(str_contains("Imported 2 weekly assignments from"))
        .stdout(str_contains("P2 classroom:12 merged>"))
        .stdout(str_contains("P3 classroom:12 <merged"));
}

#[test]
fn cli_reports_usage_and_bad_input() {
    run_cli("assign mon\nlocate tomorrow\nconfig 12:00 08:00 45 5\nfrobnicate\nquit\n")
        .success()
        .stdout(str_contains("Usage: assign <weekday> <period> <activity>"))
        .stdout(str_contains("Error: invalid time 'tomorrow'"))
        .stdout(str_contains("Error: day start 12:00:00 must be before day end 08:00:00"))
        .stdout(str_contains("Unknown command. Type 'help'."));
}

#[test]
fn cli_without_configuration_finds_nothing() {
    run_cli("assign mon 1 classroom:1\nlocate 2025-01-06T07:00\nperiods\nquit\n")
        .success()
        .stdout(str_contains("No lesson found within the lookahead horizon."))
        .stdout(str_contains("No day configuration for teacher 1."));
}
