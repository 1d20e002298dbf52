use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a teacher does during a period. Exactly one kind of reference is set,
/// which the enum guarantees by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityRef {
    Classroom(i64),
    MixedGroup(i64),
    CustomTask(String),
}

/// Presentation data for an activity. Never consulted by scheduling logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDisplay {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ActivityDisplay {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subject: None,
            color: None,
        }
    }
}

impl ActivityRef {
    pub fn kind(&self) -> &'static str {
        match self {
            ActivityRef::Classroom(_) => "classroom",
            ActivityRef::MixedGroup(_) => "mixed_group",
            ActivityRef::CustomTask(_) => "custom_task",
        }
    }

    /// Builds a reference from the three nullable columns used by flat
    /// storage formats. All-null yields `None`; more than one set is an error.
    pub fn from_parts(
        classroom_id: Option<i64>,
        mixed_group_id: Option<i64>,
        custom_task_title: Option<String>,
    ) -> Result<Option<Self>, String> {
        let custom_task_title = custom_task_title.filter(|title| !title.trim().is_empty());
        match (classroom_id, mixed_group_id, custom_task_title) {
            (None, None, None) => Ok(None),
            (Some(id), None, None) => Ok(Some(ActivityRef::Classroom(id))),
            (None, Some(id), None) => Ok(Some(ActivityRef::MixedGroup(id))),
            (None, None, Some(title)) => Ok(Some(ActivityRef::CustomTask(title))),
            _ => Err("at most one of classroom, mixed group or custom task may be set".into()),
        }
    }

    pub fn to_parts(&self) -> (Option<i64>, Option<i64>, Option<String>) {
        match self {
            ActivityRef::Classroom(id) => (Some(*id), None, None),
            ActivityRef::MixedGroup(id) => (None, Some(*id), None),
            ActivityRef::CustomTask(title) => (None, None, Some(title.clone())),
        }
    }
}

impl fmt::Display for ActivityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityRef::Classroom(id) => write!(f, "classroom:{id}"),
            ActivityRef::MixedGroup(id) => write!(f, "mixed_group:{id}"),
            ActivityRef::CustomTask(title) => write!(f, "custom_task:{title}"),
        }
    }
}

impl FromStr for ActivityRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("activity '{s}' must look like <kind>:<value>"))?;
        let parse_id = |value: &str| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("invalid id '{value}' in activity '{s}'"))
        };
        match kind.trim().to_ascii_lowercase().as_str() {
            "classroom" => Ok(ActivityRef::Classroom(parse_id(value)?)),
            "mixed_group" | "group" => Ok(ActivityRef::MixedGroup(parse_id(value)?)),
            "custom_task" | "task" => {
                let title = value.trim();
                if title.is_empty() {
                    return Err("custom task title must not be empty".into());
                }
                Ok(ActivityRef::CustomTask(title.to_string()))
            }
            other => Err(format!("unknown activity kind '{other}'")),
        }
    }
}
