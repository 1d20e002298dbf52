use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    ActivityDisplay, ActivityRef, Clock, DayPlan, LessonLocator, Lookahead, MergeAction,
    MergeSpan, PeriodSlot, ResolvedLesson, Settings, SpanAnchor, StoreError, SystemClock,
    TeacherId, TimetableStore, assignment::is_school_weekday, build_periods,
    clock::parse_local_instant, now_in_timezone, resolve_merge_span,
};

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn TimetableStore>,
    clock: Arc<dyn Clock>,
    default_timezone: Tz,
    lookahead: Lookahead,
}

impl AppState {
    pub fn new(store: Arc<dyn TimetableStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            default_timezone: Tz::UTC,
            lookahead: Lookahead::Sequential,
        }
    }

    pub fn from_settings(store: Arc<dyn TimetableStore>, settings: &Settings) -> Self {
        Self::new(store)
            .with_default_timezone(settings.default_timezone)
            .with_lookahead(settings.lookahead)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_default_timezone(mut self, timezone: Tz) -> Self {
        self.default_timezone = timezone;
        self
    }

    pub fn with_lookahead(mut self, lookahead: Lookahead) -> Self {
        self.lookahead = lookahead;
        self
    }

    fn locator(&self) -> LessonLocator<'_, dyn TimetableStore> {
        LessonLocator::new(self.store.as_ref())
            .with_default_timezone(self.default_timezone)
            .with_lookahead(self.lookahead)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(message) => ApiError::Unavailable(message),
            StoreError::NotFound => ApiError::NotFound(value.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Unavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", message)
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        if status.is_server_error() {
            tracing::error!(%status, %message, "request failed");
        }
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/lesson/current-or-next", get(current_or_next_lesson))
        .route("/teachers/:id/periods", get(teacher_periods))
        .route("/teachers/:id/merge-span", get(merge_span))
        .route("/teachers/:id/merge-preview", post(merge_preview))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "timetable HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct LessonQuery {
    #[serde(rename = "teacherId")]
    teacher_id: TeacherId,
    now: Option<String>,
}

#[derive(Debug, Serialize)]
struct ActivityBody {
    #[serde(rename = "ref")]
    reference: ActivityRef,
    #[serde(flatten)]
    display: Option<ActivityDisplay>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LessonBody {
    activity: ActivityBody,
    date: NaiveDate,
    start_period: u32,
    end_period: u32,
    start_time: String,
    end_time: String,
    is_current: bool,
    is_merged: bool,
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

impl LessonBody {
    fn new(lesson: ResolvedLesson, display: Option<ActivityDisplay>) -> Self {
        Self {
            activity: ActivityBody {
                reference: lesson.activity,
                display,
            },
            date: lesson.date,
            start_period: lesson.start_period,
            end_period: lesson.end_period,
            start_time: format_time(lesson.start_time),
            end_time: format_time(lesson.end_time),
            is_current: lesson.is_current,
            is_merged: lesson.is_merged,
        }
    }
}

async fn current_or_next_lesson(
    State(state): State<AppState>,
    Query(query): Query<LessonQuery>,
) -> Result<Response, ApiError> {
    let locator = state.locator();
    let timezone = locator.teacher_timezone(query.teacher_id)?;
    let now = match query.now.as_deref() {
        Some(raw) => parse_local_instant(raw, timezone)
            .ok_or_else(|| ApiError::invalid(format!("cannot parse now '{raw}'")))?,
        None => now_in_timezone(state.clock.as_ref(), timezone),
    };
    let Some(lesson) = locator.locate(query.teacher_id, now)? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    let display = state.store.activity_display(&lesson.activity)?;
    Ok(Json(LessonBody::new(lesson, display)).into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PeriodBody {
    number: u32,
    start: String,
    end: String,
}

impl From<&PeriodSlot> for PeriodBody {
    fn from(slot: &PeriodSlot) -> Self {
        Self {
            number: slot.number,
            start: format_time(slot.start),
            end: format_time(slot.end),
        }
    }
}

async fn teacher_periods(
    State(state): State<AppState>,
    Path(teacher_id): Path<TeacherId>,
) -> Result<Response, ApiError> {
    let config = state.store.day_config(teacher_id)?.ok_or_else(|| {
        ApiError::not_found(format!("teacher {teacher_id} has no day configuration"))
    })?;
    let periods: Vec<PeriodBody> = build_periods(&config).iter().map(PeriodBody::from).collect();
    Ok(Json(json!({ "teacherId": teacher_id, "periods": periods })).into_response())
}

#[derive(Debug, Deserialize)]
struct SpanQuery {
    period: u32,
    date: Option<NaiveDate>,
    weekday: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpanBody {
    start_period: u32,
    end_period: u32,
    is_merged: bool,
}

impl From<MergeSpan> for SpanBody {
    fn from(span: MergeSpan) -> Self {
        Self {
            start_period: span.start_period,
            end_period: span.end_period,
            is_merged: span.is_merged,
        }
    }
}

fn parse_school_weekday(raw: &str) -> Result<Weekday, ApiError> {
    let weekday: Weekday = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::invalid(format!("unknown weekday '{raw}'")))?;
    if !is_school_weekday(weekday) {
        return Err(ApiError::invalid(format!("{weekday} is not a school weekday")));
    }
    Ok(weekday)
}

async fn merge_span(
    State(state): State<AppState>,
    Path(teacher_id): Path<TeacherId>,
    Query(query): Query<SpanQuery>,
) -> Result<Json<SpanBody>, ApiError> {
    let anchor = match (query.date, query.weekday.as_deref()) {
        (Some(date), None) => SpanAnchor::Date(date),
        (None, Some(raw)) => SpanAnchor::Weekday(parse_school_weekday(raw)?),
        _ => {
            return Err(ApiError::invalid(
                "exactly one of date or weekday must be given",
            ));
        }
    };
    let span = resolve_merge_span(state.store.as_ref(), teacher_id, anchor, query.period)?;
    Ok(Json(span.into()))
}

#[derive(Debug, Deserialize)]
struct MergePreviewPayload {
    weekday: String,
    period: u32,
    action: MergeAction,
}

async fn merge_preview(
    State(state): State<AppState>,
    Path(teacher_id): Path<TeacherId>,
    Json(payload): Json<MergePreviewPayload>,
) -> Result<Json<SpanBody>, ApiError> {
    let weekday = parse_school_weekday(&payload.weekday)?;
    let mut plan = DayPlan::load(
        state.store.as_ref(),
        teacher_id,
        SpanAnchor::Weekday(weekday),
    )?;
    plan.apply(payload.action, payload.period)
        .map_err(|err| ApiError::Conflict(err.to_string()))?;
    let span = plan.merge_span(payload.period)?;
    Ok(Json(span.into()))
}
