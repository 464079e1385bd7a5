pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::app::{App, launch};
pub use application::clock::Clock;
pub use application::error::AppError;
pub use application::idea_manager::{IdeaManager, IdeaPatch};
pub use application::sync::{SaveScheduler, SyncClient, SyncOptions, SyncStatus};
pub use application::task_manager::TaskManager;
pub use application::timer_runtime::{LogNotifier, SessionEvent, SessionNotifier, TimerRuntime};
pub use domain::display::{format_clock, progress_fraction, relative_date_label};
pub use domain::error::{Field, ValidationError};
pub use domain::models::{Idea, IdeaStatus, Snapshot, Task, TimerSettings};
pub use domain::timer::{TimerPhase, TimerView};
pub use infrastructure::document_store::{InMemoryDocumentStore, RemoteDocumentStore, ReqwestDocumentStore};
pub use infrastructure::error::InfraError;
