use crate::domain::error::{Field, ValidationError};
use chrono::{NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_WORK_DURATION_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_DURATION_MINUTES: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default, with = "clock_time")]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_date: Option<NaiveDate>,
}

impl Task {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_non_empty(&self.id, Field::TaskId)?;
        validate_non_empty(&self.title, Field::TaskTitle)?;
        if self.completed != self.completed_date.is_some() {
            return Err(ValidationError::Inconsistent(
                "task.completedDate must be set iff task.completed".to_string(),
            ));
        }
        Ok(())
    }

    /// Flips completion and keeps `completed_date` in step with it.
    pub fn toggle_complete(&mut self, today: NaiveDate) {
        self.completed = !self.completed;
        self.completed_date = self.completed.then_some(today);
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum IdeaStatus {
    #[default]
    New,
    InProgress,
    Implemented,
}

impl IdeaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in-progress",
            Self::Implemented => "implemented",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In progress",
            Self::Implemented => "Implemented",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    #[serde(default)]
    pub status: IdeaStatus,
}

impl Idea {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_non_empty(&self.id, Field::IdeaId)?;
        validate_non_empty(&self.title, Field::IdeaTitle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    #[serde(
        rename = "workDuration",
        default = "default_work_duration",
        deserialize_with = "or_default"
    )]
    pub work_duration_minutes: u32,
    #[serde(
        rename = "breakDuration",
        default = "default_break_duration",
        deserialize_with = "or_default"
    )]
    pub break_duration_minutes: u32,
    #[serde(default, deserialize_with = "or_default")]
    pub completed_sessions: u64,
}

fn default_work_duration() -> u32 {
    DEFAULT_WORK_DURATION_MINUTES
}

fn default_break_duration() -> u32 {
    DEFAULT_BREAK_DURATION_MINUTES
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_duration_minutes: DEFAULT_WORK_DURATION_MINUTES,
            break_duration_minutes: DEFAULT_BREAK_DURATION_MINUTES,
            completed_sessions: 0,
        }
    }
}

impl TimerSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_positive(self.work_duration_minutes, Field::WorkDuration)?;
        validate_positive(self.break_duration_minutes, Field::BreakDuration)
    }

    pub fn work_seconds(&self) -> u32 {
        self.work_duration_minutes.saturating_mul(60)
    }

    pub fn break_seconds(&self) -> u32 {
        self.break_duration_minutes.saturating_mul(60)
    }

    /// Replaces zero durations with the defaults, leaving the session counter alone.
    pub fn sanitized(mut self) -> Self {
        if self.work_duration_minutes == 0 {
            self.work_duration_minutes = DEFAULT_WORK_DURATION_MINUTES;
        }
        if self.break_duration_minutes == 0 {
            self.break_duration_minutes = DEFAULT_BREAK_DURATION_MINUTES;
        }
        self
    }
}

/// The whole persisted document. Missing or `null` fields read as defaults, and a
/// record that does not decode is skipped instead of failing the whole document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    #[serde(default, deserialize_with = "decodable_records")]
    pub tasks: Vec<Task>,
    #[serde(default, deserialize_with = "decodable_records")]
    pub ideas: Vec<Idea>,
    #[serde(
        rename = "pomodoroSettings",
        alias = "timerSettings",
        default,
        deserialize_with = "or_default"
    )]
    pub timer_settings: TimerSettings,
}

impl Snapshot {
    pub fn find_task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == task_id)
    }

    pub fn find_idea_mut(&mut self, idea_id: &str) -> Option<&mut Idea> {
        self.ideas.iter_mut().find(|idea| idea.id == idea_id)
    }

    /// Collects a message for every record that breaks a model invariant.
    pub fn invalid_records(&self) -> Vec<String> {
        let tasks = self
            .tasks
            .iter()
            .filter_map(|task| task.validate().err().map(|error| format!("task {}: {error}", task.id)));
        let ideas = self
            .ideas
            .iter()
            .filter_map(|idea| idea.validate().err().map(|error| format!("idea {}: {error}", idea.id)));
        tasks.chain(ideas).collect()
    }
}

fn decodable_records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let records = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(Vec::new()),
        Value::Array(records) => records,
        other => {
            tracing::warn!(found = %other, "expected a list of records; ignoring it");
            return Ok(Vec::new());
        }
    };
    Ok(records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(index, %error, "skipping record that does not decode");
                None
            }
        })
        .collect())
}

fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let raw = Value::deserialize(deserializer)?;
    if raw.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(raw).unwrap_or_else(|error| {
        tracing::warn!(%error, "unreadable value replaced by its default");
        T::default()
    }))
}

pub(crate) fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn validate_non_empty(value: &str, field: Field) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn validate_positive(value: u32, field: Field) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::NotPositive(field));
    }
    Ok(())
}

/// Clock times travel as `HH:MM`, or `HH:MM:SS` when the seconds are not zero.
mod clock_time {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    const WIRE_FORMAT: &str = "%H:%M";
    const WIRE_FORMAT_SECONDS: &str = "%H:%M:%S";

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let Some(time) = value else {
            return serializer.serialize_none();
        };
        let format = if time.second() == 0 {
            WIRE_FORMAT
        } else {
            WIRE_FORMAT_SECONDS
        };
        serializer.serialize_str(&time.format(format).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        let Some(raw) = raw.as_deref().map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(None);
        };
        NaiveTime::parse_from_str(raw, WIRE_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, WIRE_FORMAT_SECONDS))
            .map(Some)
            .map_err(|error| serde::de::Error::custom(format!("invalid clock time '{raw}': {error}")))
    }
}
