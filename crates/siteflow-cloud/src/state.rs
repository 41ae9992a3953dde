//! State management for tracked resources
//!
//! Manages the `.siteflow/state.json` file which records the declarative
//! attributes of every resource SiteFlow has created or imported.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".siteflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const STATE_STAGING: &str = "state.json.tmp";
const LOCK_FILE: &str = "lock.json";
const STALE_LOCK_HOURS: i64 = 1;

/// Every tracked resource, keyed by `type:id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the key a resource is stored under
    pub fn key(resource_type: &str, id: &str) -> String {
        format!("{}:{}", resource_type, id)
    }

    /// All tracked resources of one type
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a ResourceState> + 'a {
        self.resources
            .values()
            .filter(move |r| r.resource_type == resource_type)
    }

    /// Add or replace a resource
    pub fn track(&mut self, state: ResourceState) {
        let key = Self::key(&state.resource_type, &state.id);
        self.resources.insert(key, state);
        self.updated_at = Utc::now();
    }

    /// Stop tracking a resource
    pub fn untrack(&mut self, resource_type: &str, id: &str) -> Option<ResourceState> {
        let result = self.resources.remove(&Self::key(resource_type, id));
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    pub fn get(&self, resource_type: &str, id: &str) -> Option<&ResourceState> {
        self.resources.get(&Self::key(resource_type, id))
    }
}

/// Recorded state of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Remote-assigned identifier
    pub id: String,

    pub resource_type: String,

    pub status: ResourceStatus,

    /// Declarative attributes as last observed
    pub attributes: serde_json::Map<String, serde_json::Value>,

    /// When tracking started
    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            status: ResourceStatus::Active,
            attributes: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a typed attribute model, which must serialize to a JSON object
    pub fn from_model<T: Serialize>(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        model: &T,
    ) -> Result<Self> {
        let mut state = Self::new(id, resource_type);
        state.set_model(model)?;
        Ok(state)
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    /// Replace the recorded attributes with a typed model
    pub fn set_model<T: Serialize>(&mut self, model: &T) -> Result<()> {
        match serde_json::to_value(model)? {
            serde_json::Value::Object(map) => {
                self.attributes = map;
                self.updated_at = Utc::now();
                Ok(())
            }
            other => Err(CloudError::StateError(format!(
                "attributes of {} must be an object, got {}",
                self.id, other
            ))),
        }
    }

    /// Decode the recorded attributes into a typed model
    pub fn model<T: DeserializeOwned>(&self) -> Result<T> {
        let value = serde_json::Value::Object(self.attributes.clone());
        Ok(serde_json::from_value(value)?)
    }

    pub fn get_attribute<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Status of a tracked resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Last operation confirmed the resource remotely
    Active,
    /// Created, but the remote service has not confirmed it yet
    Tainted,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Active => write!(f, "active"),
            ResourceStatus::Tainted => write!(f, "tainted"),
        }
    }
}

/// Reads and writes `.siteflow/` under a working directory
pub struct StateManager {
    root: PathBuf,
}

impl StateManager {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(STATE_DIR).join(name)
    }

    async fn prepare(&self) -> Result<()> {
        let dir = self.root.join(STATE_DIR);
        fs::create_dir_all(&dir).await?;
        Ok(())
    }

    /// Load the tracked state; a missing file is an empty state
    pub async fn load(&self) -> Result<GlobalState> {
        let content = match fs::read_to_string(self.path(STATE_FILE)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No state file yet");
                return Ok(GlobalState::new());
            }
            Err(e) => return Err(e.into()),
        };

        let state: GlobalState = serde_json::from_str(&content)?;
        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "state file has version {}, this build understands up to {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded {} tracked resources", state.resources.len());
        Ok(state)
    }

    /// Write the state through a temporary file, keeping the previous
    /// content as `state.json.backup`
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        self.prepare().await?;

        let target = self.path(STATE_FILE);
        let staged = self.path(STATE_STAGING);
        fs::write(&staged, serde_json::to_vec_pretty(state)?).await?;

        if fs::try_exists(&target).await? {
            fs::copy(&target, self.path(STATE_BACKUP)).await?;
        }
        fs::rename(&staged, &target).await?;

        tracing::debug!("Saved {} tracked resources", state.resources.len());
        Ok(())
    }

    /// Take the advisory lock; a lock older than an hour is taken over
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.prepare().await?;
        let path = self.path(LOCK_FILE);

        let holder = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        // Staged under a per-process name and linked into place, so the lock
        // file never exists without its content
        let staged = self.path(&format!("{}.{}", LOCK_FILE, holder.pid));
        fs::write(&staged, serde_json::to_vec_pretty(&holder)?).await?;

        let mut outcome = Err(CloudError::LockError(format!(
            "{} keeps reappearing",
            path.display()
        )));
        for _ in 0..2 {
            match fs::hard_link(&staged, &path).await {
                Ok(()) => {
                    tracing::debug!("Locked {}", path.display());
                    outcome = Ok(StateLock {
                        path: path.clone(),
                        released: false,
                    });
                    break;
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Err(e) = self.clear_stale_lock(&path).await {
                        outcome = Err(e);
                        break;
                    }
                }
                Err(e) => {
                    outcome = Err(e.into());
                    break;
                }
            }
        }

        fs::remove_file(&staged).await?;
        outcome
    }

    /// Remove an existing lock if it is stale or unreadable, fail otherwise
    async fn clear_stale_lock(&self, path: &Path) -> Result<()> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            // released between our attempt and this read
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<LockInfo>(&content) {
            Ok(existing) => {
                let age = Utc::now().signed_duration_since(existing.acquired_at);
                if age.num_hours() < STALE_LOCK_HOURS {
                    return Err(CloudError::LockError(format!(
                        "held by {} (pid {}) since {}",
                        existing.holder, existing.pid, existing.acquired_at
                    )));
                }
                tracing::warn!(
                    "Taking over stale lock of {} (pid {})",
                    existing.holder,
                    existing.pid
                );
            }
            Err(e) => {
                tracing::warn!("Removing unreadable lock {}: {}", path.display(), e);
            }
        }

        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    #[serde(default)]
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Held advisory lock; removed on release or drop
pub struct StateLock {
    path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Attrs {
        name: String,
        parent: Option<String>,
    }

    fn sales() -> Attrs {
        Attrs {
            name: "Sales".to_string(),
            parent: None,
        }
    }

    #[tokio::test]
    async fn test_tracked_model_survives_save_and_load() {
        let dir = tempdir().unwrap();
        let manager = StateManager::new(dir.path());

        let mut state = GlobalState::new();
        state.track(ResourceState::from_model("p-1", "project", &sales()).unwrap());
        manager.save(&state).await.unwrap();

        let loaded = manager.load().await.unwrap();
        let resource = loaded.get("project", "p-1").unwrap();
        assert_eq!(resource.status, ResourceStatus::Active);
        assert_eq!(resource.model::<Attrs>().unwrap(), sales());
        assert_eq!(
            resource.get_attribute::<String>("name").as_deref(),
            Some("Sales")
        );
        assert!(!dir.path().join(".siteflow/state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let dir = tempdir().unwrap();
        let state = StateManager::new(dir.path()).load().await.unwrap();
        assert_eq!(state.resources.len(), 0);
    }

    #[tokio::test]
    async fn test_backup_holds_previous_content() {
        let dir = tempdir().unwrap();
        let manager = StateManager::new(dir.path());

        manager.save(&GlobalState::new()).await.unwrap();
        let mut state = GlobalState::new();
        state.track(ResourceState::new("p-1", "project"));
        manager.save(&state).await.unwrap();

        let backup = std::fs::read_to_string(dir.path().join(".siteflow/state.json.backup")).unwrap();
        let previous: GlobalState = serde_json::from_str(&backup).unwrap();
        assert!(previous.resources.is_empty());
        assert_eq!(manager.load().await.unwrap().resources.len(), 1);
    }

    #[tokio::test]
    async fn test_future_version_is_refused() {
        let dir = tempdir().unwrap();
        let manager = StateManager::new(dir.path());

        let state = GlobalState {
            version: STATE_VERSION + 1,
            ..GlobalState::new()
        };
        manager.save(&state).await.unwrap();

        let err = manager.load().await.unwrap_err();
        assert!(matches!(err, CloudError::StateError(_)));
    }

    #[test]
    fn test_track_and_untrack() {
        let mut state = GlobalState::new();
        state.track(ResourceState::new("p-1", "project"));
        state.track(ResourceState::new("p-2", "project"));
        state.track(ResourceState::new("p-1", "group"));

        assert!(state.untrack("project", "p-1").is_some());
        assert!(state.untrack("project", "p-1").is_none());
        assert_eq!(state.resources_of_type("project").count(), 1);
        assert!(state.get("group", "p-1").is_some());
    }

    #[test]
    fn test_model_must_be_an_object() {
        let result = ResourceState::from_model("p-1", "project", &"just a string");
        assert!(matches!(result, Err(CloudError::StateError(_))));
    }

    #[tokio::test]
    async fn test_lock_excludes_second_holder() {
        let dir = tempdir().unwrap();
        let manager = StateManager::new(dir.path());

        let lock = manager.acquire_lock().await.unwrap();
        let err = manager.acquire_lock().await.err().unwrap();
        assert!(matches!(err, CloudError::LockError(_)));

        lock.release().await.unwrap();
        drop(manager.acquire_lock().await.unwrap());
        assert!(!dir.path().join(".siteflow/lock.json").exists());
    }

    #[tokio::test]
    async fn test_stale_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        let manager = StateManager::new(dir.path());

        std::fs::create_dir_all(dir.path().join(".siteflow")).unwrap();
        let stale = LockInfo {
            holder: "elsewhere".to_string(),
            pid: 1,
            acquired_at: Utc::now() - chrono::Duration::hours(2),
        };
        std::fs::write(
            dir.path().join(".siteflow/lock.json"),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        let lock = manager.acquire_lock().await.unwrap();
        lock.release().await.unwrap();
    }

    /// A lock file left empty by a crashed run does not block later runs
    #[tokio::test]
    async fn test_empty_lock_file_is_cleared() {
        let dir = tempdir().unwrap();
        let manager = StateManager::new(dir.path());

        std::fs::create_dir_all(dir.path().join(".siteflow")).unwrap();
        std::fs::write(dir.path().join(".siteflow/lock.json"), "").unwrap();

        let lock = manager.acquire_lock().await.unwrap();
        let err = manager.acquire_lock().await.err().unwrap();
        assert!(matches!(err, CloudError::LockError(_)));

        lock.release().await.unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join(".siteflow"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert!(leftovers.is_empty(), "left behind: {:?}", leftovers);
    }
}
