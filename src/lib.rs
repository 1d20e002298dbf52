pub mod activity;
pub mod assignment;
pub mod calendar;
pub mod clock;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod locator;
pub mod merge;
pub mod periods;
pub mod plan;
pub mod settings;
pub mod store;
pub mod validation;

pub use activity::{ActivityDisplay, ActivityRef};
pub use assignment::{DailyOverride, TeacherId, WeeklyAssignment};
pub use calendar::{SchoolCalendar, VacationRange, is_instructional_day};
pub use clock::{Clock, FixedClock, SystemClock, now_in_timezone};
pub use locator::{LOOKAHEAD_DAYS, LessonLocator, Lookahead, ResolvedLesson};
pub use merge::{
    MergeAction, MergeEditError, MergeSpan, commit_merge_edit, merge_block_start,
    resolve_merge_span,
};
pub use periods::{DayConfigError, MajorBreak, PeriodSlot, TeacherDayConfig, build_periods};
pub use plan::{DayPlan, LessonSource, SlotEntry, SpanAnchor};
pub use settings::{Settings, SettingsError};
#[cfg(feature = "sqlite")]
pub use store::sqlite::SqliteStore;
pub use store::{
    InMemoryStore, StoreError, StoreResult, TimetableSnapshot, TimetableStore, TimetableWriter,
    load_snapshot_from_json, load_weekly_template_from_csv, save_snapshot_to_json,
    save_weekly_template_to_csv,
};
