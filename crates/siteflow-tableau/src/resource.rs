//! Declarative attributes of a tracked project
//!
//! Translates between what a host records for a project and the shapes the
//! client speaks. Refreshing from an observed project follows one rule that
//! hosts depend on: `parent_project_id` is only overwritten by a non-empty
//! observed value, so an empty parent from the service never clears a
//! recorded one. Every other field is copied as observed, empty or not.

use crate::project::{ContentPermissions, Project, ProjectFields};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAttributes {
    /// Assigned by the service on create
    #[serde(default)]
    pub id: Option<String>,

    pub name: String,

    #[serde(default)]
    pub parent_project_id: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub content_permissions: ContentPermissions,

    #[serde(default)]
    pub owner_id: Option<String>,

    /// Last create or update made through SiteFlow
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl ProjectAttributes {
    pub fn new(name: impl Into<String>, content_permissions: ContentPermissions) -> Self {
        Self {
            name: name.into(),
            content_permissions,
            ..Self::default()
        }
    }

    /// Attributes that only know the identifier, to be filled by a read
    pub fn imported(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Fields to send on create or update; unset optionals become empty
    pub fn to_fields(&self) -> ProjectFields {
        ProjectFields {
            name: self.name.clone(),
            parent_project_id: self.parent_project_id.clone().unwrap_or_default(),
            description: self.description.clone(),
            content_permissions: self.content_permissions,
            owner_id: self.owner_id.clone().unwrap_or_default(),
        }
    }

    /// Record what the service assigned on create
    pub fn apply_created(&mut self, created: &Project) {
        self.id = Some(created.id.clone());
        self.owner_id = Some(created.owner.id.clone());
        self.touch();
    }

    /// Copy an observed project into these attributes
    pub fn refresh_from(&mut self, observed: &Project) {
        self.id = Some(observed.id.clone());
        self.name = observed.name.clone();
        if !observed.parent_project_id.is_empty() {
            self.parent_project_id = Some(observed.parent_project_id.clone());
        }
        self.description = observed.description.clone();
        self.content_permissions = observed.content_permissions;
        self.owner_id = Some(observed.owner.id.clone());
    }

    pub fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
    }
}
