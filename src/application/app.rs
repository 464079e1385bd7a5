use crate::application::clock::Clock;
use crate::application::error::AppError;
use crate::application::idea_manager::IdeaManager;
use crate::application::state_store::StateStore;
use crate::application::sync::{SaveScheduler, SyncClient, SyncOptions, SyncStatus};
use crate::application::task_manager::TaskManager;
use crate::application::timer_runtime::{LogNotifier, SessionNotifier, TimerRuntime};
use crate::infrastructure::config::{AppConfig, ensure_default_config, load_config};
use crate::infrastructure::credential_store::{KeyringSecretStore, SecretStore, resolve_master_key};
use crate::infrastructure::document_store::{RemoteDocumentStore, ReqwestDocumentStore};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::logging::init_tracing;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

/// Owns every component. Nothing here is global.
pub struct App<R> {
    store: Arc<StateStore>,
    sync: SyncClient<R>,
    tasks: TaskManager,
    ideas: IdeaManager,
    timer: TimerRuntime,
}

impl App<ReqwestDocumentStore> {
    pub async fn from_config(config: &AppConfig, secrets: &dyn SecretStore) -> Result<Self, AppError> {
        config.validate()?;
        let master_key = resolve_master_key(config, secrets)?;
        let endpoint = ReqwestDocumentStore::document_endpoint(&config.api_base, &config.bin_id)?;
        let remote = ReqwestDocumentStore::new(endpoint, config.credential_header.clone(), master_key)?;
        let options = SyncOptions {
            debounce: config.debounce(),
            synced_hold: config.synced_status_hold(),
        };
        let clock = Clock::system(config.parsed_timezone()?);
        Self::bootstrap(Arc::new(remote), options, clock, Arc::new(LogNotifier)).await
    }
}

impl<R> App<R>
where
    R: RemoteDocumentStore + 'static,
{
    /// Loads the remote snapshot before returning. A failed load keeps the defaults.
    pub async fn bootstrap(
        remote: Arc<R>,
        options: SyncOptions,
        clock: Clock,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Result<Self, AppError> {
        let store = Arc::new(StateStore::default());
        let sync = SyncClient::new(remote, Arc::clone(&store), options);
        if let Err(error) = sync.load().await {
            tracing::warn!(%error, "remote load failed; starting from defaults");
        }

        let saver: Arc<dyn SaveScheduler> = Arc::new(sync.clone());
        let tasks = TaskManager::new(Arc::clone(&store), Arc::clone(&saver), clock);
        let ideas = IdeaManager::new(Arc::clone(&store), Arc::clone(&saver));
        let timer = TimerRuntime::new(Arc::clone(&store), saver, notifier)?;

        Ok(Self {
            store,
            sync,
            tasks,
            ideas,
            timer,
        })
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    pub fn ideas(&self) -> &IdeaManager {
        &self.ideas
    }

    pub fn timer(&self) -> &TimerRuntime {
        &self.timer
    }

    pub fn sync(&self) -> &SyncClient<R> {
        &self.sync
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.sync.subscribe()
    }

    /// Stops the timer and writes any pending change before the process exits.
    pub async fn shutdown(&self) -> Result<(), InfraError> {
        self.timer.pause()?;
        if self.sync.flush().await? {
            tracing::info!("flushed pending save on shutdown");
        }
        Ok(())
    }
}

/// Entry point: config directory → logging → credentials → loaded `App`.
pub async fn launch(config_dir: &Path) -> Result<App<ReqwestDocumentStore>, AppError> {
    ensure_default_config(config_dir)?;
    let config = load_config(config_dir)?;
    if !init_tracing(&config.log_filter)? {
        tracing::debug!("tracing subscriber already installed");
    }
    App::from_config(&config, &KeyringSecretStore::default()).await
}
