use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TaskId,
    TaskTitle,
    TaskDate,
    IdeaId,
    IdeaTitle,
    WorkDuration,
    BreakDuration,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskId => "task.id",
            Self::TaskTitle => "task.title",
            Self::TaskDate => "task.date",
            Self::IdeaId => "idea.id",
            Self::IdeaTitle => "idea.title",
            Self::WorkDuration => "timer.work_duration",
            Self::BreakDuration => "timer.break_duration",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    MissingField(Field),
    #[error("{0} must be > 0")]
    NotPositive(Field),
    #[error("{0}")]
    Inconsistent(String),
}

impl ValidationError {
    /// The input field the user has to fix, when there is one.
    pub fn field(&self) -> Option<Field> {
        match self {
            Self::MissingField(field) | Self::NotPositive(field) => Some(*field),
            Self::Inconsistent(_) => None,
        }
    }
}
