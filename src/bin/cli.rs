use std::fmt;
use std::io::{self, Write};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use chrono_tz::Tz;
use timetable::{
    ActivityRef, DailyOverride, InMemoryStore, LessonLocator, MergeAction, ResolvedLesson,
    SchoolCalendar, SpanAnchor, StoreError, SystemClock, TeacherDayConfig, TeacherId,
    TimetableStore, TimetableWriter, VacationRange, WeeklyAssignment, build_periods,
    commit_merge_edit, load_snapshot_from_json, load_weekly_template_from_csv, resolve_merge_span,
    save_snapshot_to_json, save_weekly_template_to_csv,
};
use timetable::assignment::is_school_weekday;
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        "Commands:\n  help                                    Show this help\n  load <file.json>                        Load a timetable snapshot\n  save <file.json>                        Save the timetable snapshot\n  teacher <id>                            Switch the active teacher\n  tz <Area/City>                          Set the teacher's timezone\n  config <HH:MM> <HH:MM> <period_min> <break_min>\n                                          Set the teaching day\n  break <HH:MM> <HH:MM>                   Add a major break to the day\n  periods                                 Show the period grid\n  assign <weekday> <period> <activity>    Set a weekly slot (classroom:12, group:3, task:Title)\n  week <weekday>                          Show a weekday of the template\n  override <date> <period> <activity|-> [title...]\n                                          Set a dated entry (- for a non-lesson)\n  clear <date> <period>                   Remove a dated entry\n  vacation <start> <end> <name...>        Add a vacation range\n  vacations                               List vacation ranges\n  locate [YYYY-MM-DDTHH:MM]               Current or next lesson\n  span <weekday|date> <period>            Merged block starting at a period\n  merge <weekday> <period>                Merge a period with the next one\n  separate <weekday> <period>             Split a period from the next one\n  import-week <file.csv>                  Replace the weekly template from CSV\n  export-week <file.csv>                  Export the weekly template to CSV\n  quit|exit                               Exit"
    );
}

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Invalid(String),
    Store(StoreError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(usage) => write!(f, "Usage: {usage}"),
            CliError::Invalid(msg) => write!(f, "Error: {msg}"),
            CliError::Store(err) => write!(f, "Error: {err}"),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        CliError::Store(value)
    }
}

type CliResult = Result<(), CliError>;

fn parse_time(raw: &str) -> Result<NaiveTime, CliError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| CliError::Invalid(format!("invalid time '{raw}' (HH:MM)")))
}

fn parse_date(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| CliError::Invalid(format!("invalid date '{raw}' (YYYY-MM-DD)")))
}

fn parse_weekday(raw: &str) -> Result<Weekday, CliError> {
    let weekday: Weekday = raw
        .parse()
        .map_err(|_| CliError::Invalid(format!("unknown weekday '{raw}'")))?;
    if !is_school_weekday(weekday) {
        return Err(CliError::Invalid(format!("{weekday} is not a school day")));
    }
    Ok(weekday)
}

fn parse_number<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, CliError> {
    raw.parse()
        .map_err(|_| CliError::Invalid(format!("invalid {what} '{raw}'")))
}

fn parse_activity(raw: &str) -> Result<ActivityRef, CliError> {
    raw.parse().map_err(CliError::Invalid)
}

fn describe(lesson: &ResolvedLesson) -> String {
    let periods = if lesson.is_merged {
        format!("P{}-P{}", lesson.start_period, lesson.end_period)
    } else {
        format!("P{}", lesson.start_period)
    };
    format!(
        "{} on {} {} ({}-{})",
        lesson.activity,
        lesson.date.format("%a %Y-%m-%d"),
        periods,
        lesson.start_time.format("%H:%M"),
        lesson.end_time.format("%H:%M"),
    )
}

struct Session {
    store: InMemoryStore,
    teacher: TeacherId,
}

impl Session {
    fn run(&mut self, cmd: &str, args: &[&str]) -> CliResult {
        match cmd {
            "load" => {
                let [path] = args else {
                    return Err(CliError::Usage("load <file.json>"));
                };
                let snapshot = load_snapshot_from_json(path)?;
                self.store = InMemoryStore::from_snapshot(&snapshot)?;
                println!("Timetable loaded from {path}.");
            }
            "save" => {
                let [path] = args else {
                    return Err(CliError::Usage("save <file.json>"));
                };
                save_snapshot_to_json(&self.store.snapshot(), path)?;
                println!("Timetable saved to {path}.");
            }
            "teacher" => {
                let [id] = args else {
                    return Err(CliError::Usage("teacher <id>"));
                };
                self.teacher = parse_number(id, "teacher id")?;
                println!("Active teacher: {}.", self.teacher);
            }
            "tz" => {
                let [name] = args else {
                    return Err(CliError::Usage("tz <Area/City>"));
                };
                let timezone: Tz = name
                    .parse()
                    .map_err(|_| CliError::Invalid(format!("unknown timezone '{name}'")))?;
                self.store.put_teacher_timezone(self.teacher, timezone)?;
                println!("Timezone set to {timezone}.");
            }
            "config" => {
                let [start, end, period, gap] = args else {
                    return Err(CliError::Usage(
                        "config <HH:MM> <HH:MM> <period_min> <break_min>",
                    ));
                };
                let mut config = TeacherDayConfig::new(
                    parse_time(start)?,
                    parse_time(end)?,
                    parse_number(period, "period length")?,
                    parse_number(gap, "break length")?,
                );
                if let Some(existing) = self.store.day_config(self.teacher)? {
                    config.major_breaks = existing.major_breaks;
                }
                config
                    .validate()
                    .map_err(|err| CliError::Invalid(err.to_string()))?;
                self.store.put_day_config(self.teacher, &config)?;
                println!("Day configured with {} periods.", build_periods(&config).len());
            }
            "break" => {
                let [start, end] = args else {
                    return Err(CliError::Usage("break <HH:MM> <HH:MM>"));
                };
                let config = self
                    .store
                    .day_config(self.teacher)?
                    .ok_or_else(|| CliError::Invalid("configure the day first".into()))?
                    .with_break(parse_time(start)?, parse_time(end)?);
                config
                    .validate()
                    .map_err(|err| CliError::Invalid(err.to_string()))?;
                self.store.put_day_config(self.teacher, &config)?;
                println!("Break added, {} periods.", build_periods(&config).len());
            }
            "periods" => {
                let Some(config) = self.store.day_config(self.teacher)? else {
                    println!("No day configuration for teacher {}.", self.teacher);
                    return Ok(());
                };
                for slot in build_periods(&config) {
                    println!(
                        "P{} {}-{}",
                        slot.number,
                        slot.start.format("%H:%M"),
                        slot.end.format("%H:%M")
                    );
                }
            }
            "assign" => {
                let [weekday, period, activity] = args else {
                    return Err(CliError::Usage("assign <weekday> <period> <activity>"));
                };
                let assignment = WeeklyAssignment::new(
                    self.teacher,
                    parse_weekday(weekday)?,
                    parse_number(period, "period")?,
                    parse_activity(activity)?,
                );
                self.store.upsert_weekly_assignments(&[assignment])?;
                println!("Assigned {activity} to {weekday} P{period}.");
            }
            "week" => {
                let [weekday] = args else {
                    return Err(CliError::Usage("week <weekday>"));
                };
                let rows = self
                    .store
                    .weekly_assignments(self.teacher, parse_weekday(weekday)?)?;
                if rows.is_empty() {
                    println!("No weekly assignments.");
                }
                for row in rows {
                    let marker = match (row.merged_with_previous, row.merged_with_next) {
                        (true, true) => " <merged>",
                        (true, false) => " <merged",
                        (false, true) => " merged>",
                        (false, false) => "",
                    };
                    println!("P{} {}{marker}", row.period, row.activity);
                }
            }
            "override" => {
                let [date, period, activity, title @ ..] = args else {
                    return Err(CliError::Usage(
                        "override <date> <period> <activity|-> [title...]",
                    ));
                };
                let date = parse_date(date)?;
                let period: u32 = parse_number(period, "period")?;
                let title = (!title.is_empty()).then(|| title.join(" "));
                let entry = match (*activity, title) {
                    ("-", Some(title)) => {
                        DailyOverride::freeform(self.teacher, date, period, title)
                    }
                    ("-", None) => {
                        return Err(CliError::Invalid("a non-lesson entry needs a title".into()));
                    }
                    (activity, title) => {
                        let activity = parse_activity(activity)?;
                        DailyOverride {
                            title,
                            ..DailyOverride::lesson(self.teacher, date, period, activity)
                        }
                    }
                };
                self.store.upsert_daily_override(&entry)?;
                println!("Override set for {date} P{period}.");
            }
            "clear" => {
                let [date, period] = args else {
                    return Err(CliError::Usage("clear <date> <period>"));
                };
                let date = parse_date(date)?;
                let period: u32 = parse_number(period, "period")?;
                if self.store.remove_daily_override(self.teacher, date, period)? {
                    println!("Override removed for {date} P{period}.");
                } else {
                    println!("No override for {date} P{period}.");
                }
            }
            "vacation" => {
                let [start, end, name @ ..] = args else {
                    return Err(CliError::Usage("vacation <start> <end> <name...>"));
                };
                if name.is_empty() {
                    return Err(CliError::Usage("vacation <start> <end> <name...>"));
                }
                let range =
                    VacationRange::new(name.join(" "), parse_date(start)?, parse_date(end)?);
                self.store.add_vacation_range(self.teacher, &range)?;
                println!("Vacation '{}' added.", range.name);
            }
            "vacations" => {
                let calendar = SchoolCalendar::new(self.store.vacation_ranges(self.teacher)?);
                if calendar.vacations().is_empty() {
                    println!("No vacations.");
                }
                for range in calendar.vacations() {
                    let days = calendar
                        .vacation_days_in_range(range.start_date, range.end_date)
                        .len();
                    println!(
                        "{} {}..{} ({days} school days)",
                        range.name, range.start_date, range.end_date
                    );
                }
            }
            "locate" => {
                let locator = LessonLocator::new(&self.store);
                let lesson = match args {
                    [] => locator.locate_now(self.teacher, &SystemClock)?,
                    [raw] => {
                        let now = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
                            .map_err(|_| {
                                CliError::Invalid(format!(
                                    "invalid time '{raw}' (YYYY-MM-DDTHH:MM)"
                                ))
                            })?;
                        locator.locate(self.teacher, now)?
                    }
                    _ => return Err(CliError::Usage("locate [YYYY-MM-DDTHH:MM]")),
                };
                match lesson {
                    Some(lesson) if lesson.is_current => {
                        println!("Current lesson: {}", describe(&lesson))
                    }
                    Some(lesson) => println!("Next lesson: {}", describe(&lesson)),
                    None => println!("No lesson found within the lookahead horizon."),
                }
            }
            "span" => {
                let [day, period] = args else {
                    return Err(CliError::Usage("span <weekday|date> <period>"));
                };
                let anchor = match parse_date(day) {
                    Ok(date) => SpanAnchor::Date(date),
                    Err(_) => SpanAnchor::Weekday(parse_weekday(day)?),
                };
                let span = resolve_merge_span(
                    &self.store,
                    self.teacher,
                    anchor,
                    parse_number(period, "period")?,
                )?;
                let suffix = if span.is_merged { " (merged)" } else { "" };
                println!("Span: P{}-P{}{suffix}", span.start_period, span.end_period);
            }
            "merge" | "separate" => {
                let [weekday, period] = args else {
                    return Err(CliError::Usage(if cmd == "merge" {
                        "merge <weekday> <period>"
                    } else {
                        "separate <weekday> <period>"
                    }));
                };
                let action = if cmd == "merge" {
                    MergeAction::Merge
                } else {
                    MergeAction::Separate
                };
                let weekday = parse_weekday(weekday)?;
                let period: u32 = parse_number(period, "period")?;
                let span = commit_merge_edit(&self.store, self.teacher, weekday, period, action)?;
                match action {
                    MergeAction::Merge => println!(
                        "Merged {weekday} P{}-P{}.",
                        span.start_period, span.end_period
                    ),
                    MergeAction::Separate => println!("Separated {weekday} P{period}."),
                }
            }
            "import-week" => {
                let [path] = args else {
                    return Err(CliError::Usage("import-week <file.csv>"));
                };
                let assignments = load_weekly_template_from_csv(path, self.teacher)?;
                self.store
                    .replace_weekly_template(self.teacher, &assignments)?;
                println!(
                    "Imported {} weekly assignments from {path}.",
                    assignments.len()
                );
            }
            "export-week" => {
                let [path] = args else {
                    return Err(CliError::Usage("export-week <file.csv>"));
                };
                save_weekly_template_to_csv(&self.store, self.teacher, path)?;
                println!("Weekly template exported to {path}.");
            }
            _ => println!("Unknown command. Type 'help'."),
        }
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut session = Session {
        store: InMemoryStore::new(),
        teacher: 1,
    };

    println!("Timetable (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            _ => {
                if let Err(err) = session.run(cmd, &args) {
                    println!("{err}");
                }
            }
        }
    }
}
