use crate::application::error::AppError;
use crate::application::ids::next_id;
use crate::application::state_store::StateStore;
use crate::application::sync::SaveScheduler;
use crate::domain::error::{Field, ValidationError};
use crate::domain::models::{Idea, IdeaStatus, normalize_text};
use std::sync::Arc;

/// Fields to overwrite on an idea. `None` leaves the field as it is; blank text clears
/// `description` and `implementation`.
#[derive(Debug, Clone, Default)]
pub struct IdeaPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub implementation: Option<String>,
    pub status: Option<IdeaStatus>,
}

pub struct IdeaManager {
    store: Arc<StateStore>,
    saver: Arc<dyn SaveScheduler>,
}

impl IdeaManager {
    pub fn new(store: Arc<StateStore>, saver: Arc<dyn SaveScheduler>) -> Self {
        Self { store, saver }
    }

    pub fn create(
        &self,
        title: &str,
        description: Option<String>,
        implementation: Option<String>,
        status: Option<IdeaStatus>,
    ) -> Result<Idea, AppError> {
        let title = required_title(title)?;
        let idea = Idea {
            id: next_id("idea"),
            title,
            description: normalize_text(description),
            implementation: normalize_text(implementation),
            status: status.unwrap_or_default(),
        };
        self.store.update(|snapshot| snapshot.ideas.push(idea.clone()))?;
        self.saver.schedule_save();

        tracing::info!(idea_id = %idea.id, status = idea.status.as_str(), "created idea");
        Ok(idea)
    }

    /// Returns the updated idea, or `None` when the id is unknown.
    pub fn update(&self, idea_id: &str, patch: IdeaPatch) -> Result<Option<Idea>, AppError> {
        let title = patch.title.as_deref().map(required_title).transpose()?;

        let updated = self.store.update(|snapshot| {
            let idea = snapshot.find_idea_mut(idea_id)?;
            if let Some(title) = title {
                idea.title = title;
            }
            if let Some(description) = patch.description {
                idea.description = normalize_text(Some(description));
            }
            if let Some(implementation) = patch.implementation {
                idea.implementation = normalize_text(Some(implementation));
            }
            if let Some(status) = patch.status {
                idea.status = status;
            }
            Some(idea.clone())
        })?;

        let Some(idea) = updated else {
            return Ok(None);
        };
        self.saver.schedule_save();
        tracing::info!(idea_id, status = idea.status.as_str(), "updated idea");
        Ok(Some(idea))
    }

    pub fn delete(&self, idea_id: &str) -> Result<bool, AppError> {
        let removed = self.store.update(|snapshot| {
            let before = snapshot.ideas.len();
            snapshot.ideas.retain(|idea| idea.id != idea_id);
            snapshot.ideas.len() != before
        })?;
        if !removed {
            return Ok(false);
        }
        self.saver.schedule_save();
        tracing::info!(idea_id, "deleted idea");
        Ok(true)
    }

    pub fn list(&self) -> Result<Vec<Idea>, AppError> {
        Ok(self.store.read(|snapshot| snapshot.ideas.clone())?)
    }
}

fn required_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::MissingField(Field::IdeaTitle));
    }
    Ok(title.to_string())
}
