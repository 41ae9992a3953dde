//! Project entity and its wire envelopes

use crate::error::TableauError;
use crate::pagination::{PageEnvelope, RawPagination};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Who may manage content inside a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentPermissions {
    LockedToProject,
    #[default]
    ManagedByOwner,
    LockedToProjectWithoutNested,
}

impl ContentPermissions {
    pub const ALL: [ContentPermissions; 3] = [
        ContentPermissions::LockedToProject,
        ContentPermissions::ManagedByOwner,
        ContentPermissions::LockedToProjectWithoutNested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentPermissions::LockedToProject => "LockedToProject",
            ContentPermissions::ManagedByOwner => "ManagedByOwner",
            ContentPermissions::LockedToProjectWithoutNested => "LockedToProjectWithoutNested",
        }
    }
}

impl std::fmt::Display for ContentPermissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentPermissions {
    type Err = TableauError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| TableauError::InvalidContentPermissions(s.to_string()))
    }
}

/// Reference to the principal owning a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerRef {
    pub id: String,
}

/// Remote project entity
///
/// Missing string fields decode as empty strings; `id` stays empty until the
/// service has assigned one. `contentPermissions` has no empty form and must
/// be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_project_id: String,
    #[serde(default)]
    pub description: String,
    pub content_permissions: ContentPermissions,
    #[serde(default)]
    pub owner: OwnerRef,
}

/// Fields a caller controls on create and update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFields {
    pub name: String,
    /// Empty means no parent
    pub parent_project_id: String,
    pub description: String,
    pub content_permissions: ContentPermissions,
    /// Empty means unspecified
    pub owner_id: String,
}

impl ProjectFields {
    pub fn new(name: impl Into<String>, content_permissions: ContentPermissions) -> Self {
        Self {
            name: name.into(),
            content_permissions,
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent_project_id: impl Into<String>) -> Self {
        self.parent_project_id = parent_project_id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }
}

// ============ Request / Response Envelopes ============

#[derive(Debug, Serialize)]
pub(crate) struct ProjectRequest<'a> {
    project: ProjectPayload<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectPayload<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_project_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    content_permissions: ContentPermissions,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<OwnerPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct OwnerPayload<'a> {
    id: &'a str,
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

impl<'a> ProjectRequest<'a> {
    /// Create body: empty optionals are left out, the owner only when given
    pub(crate) fn create(fields: &'a ProjectFields) -> Self {
        Self {
            project: ProjectPayload {
                name: &fields.name,
                parent_project_id: non_empty(&fields.parent_project_id),
                description: non_empty(&fields.description),
                content_permissions: fields.content_permissions,
                owner: non_empty(&fields.owner_id).map(|id| OwnerPayload { id }),
            },
        }
    }

    /// Update body: a full replacement, every field sent even when empty
    pub(crate) fn update(fields: &'a ProjectFields) -> Self {
        Self {
            project: ProjectPayload {
                name: &fields.name,
                parent_project_id: Some(&fields.parent_project_id),
                description: Some(&fields.description),
                content_permissions: fields.content_permissions,
                owner: Some(OwnerPayload {
                    id: &fields.owner_id,
                }),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectResponse {
    pub(crate) project: Project,
}

/// One page of `GET /projects`
#[derive(Debug, Deserialize)]
pub(crate) struct ProjectListResponse {
    #[serde(default)]
    projects: ProjectList,
    pagination: RawPagination,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectList {
    #[serde(default)]
    project: Vec<Project>,
}

impl PageEnvelope for ProjectListResponse {
    type Item = Project;

    fn pagination(&self) -> &RawPagination {
        &self.pagination
    }

    fn into_items(self) -> Vec<Project> {
        self.projects.project
    }
}
