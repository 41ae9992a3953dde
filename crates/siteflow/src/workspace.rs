//! Connection and state file for one SiteFlow directory

use siteflow_cloud::{GlobalState, StateLock, StateManager};
use siteflow_tableau::{ProjectController, TableauClient, TableauConfig};
use std::path::Path;

pub fn state_manager(dir: &Path) -> StateManager {
    StateManager::new(dir)
}

pub struct Workspace {
    pub state: StateManager,
    pub controller: ProjectController,
}

impl Workspace {
    pub fn open(dir: &Path, config: &TableauConfig) -> anyhow::Result<Self> {
        tracing::debug!("Using API {}", config.api_url);
        let client = TableauClient::new(config)?;
        Ok(Self::new(state_manager(dir), ProjectController::new(client)))
    }

    pub fn new(state: StateManager, controller: ProjectController) -> Self {
        Self { state, controller }
    }

    /// Lock the state file and load it
    pub async fn begin(&self) -> anyhow::Result<(StateLock, GlobalState)> {
        let lock = self.state.acquire_lock().await?;
        let state = self.state.load().await?;
        Ok((lock, state))
    }

    /// Save the state file and release the lock
    pub async fn commit(&self, lock: StateLock, state: &GlobalState) -> anyhow::Result<()> {
        self.state.save(state).await?;
        lock.release().await?;
        Ok(())
    }
}
