//! Tableau controller error types

use siteflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableauError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pagination {field}: {value:?}")]
    Pagination { field: &'static str, value: String },

    #[error("Response did not include a project id")]
    MissingId,

    #[error("Invalid project ID {0:?}")]
    InvalidProjectId(String),

    #[error("Did not find project ID {0}")]
    NotFound(String),

    #[error(
        "Invalid content permissions {0:?}. Expected one of: LockedToProject, ManagedByOwner, LockedToProjectWithoutNested"
    )]
    InvalidContentPermissions(String),

    #[error("Project {id} was created but is still not visible after {attempts} reads")]
    NotVisible { id: String, attempts: u32 },

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TableauError {
    /// Whether the error means the identifier is absent remotely
    pub fn is_not_found(&self) -> bool {
        matches!(self, TableauError::NotFound(_))
    }

    /// Whether the error came from the transport layer
    pub fn is_transport(&self) -> bool {
        matches!(self, TableauError::Transport(_) | TableauError::Status { .. })
    }

    /// Whether the response body could not be decoded
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            TableauError::Json(_) | TableauError::Pagination { .. } | TableauError::MissingId
        )
    }
}

impl From<TableauError> for CloudError {
    fn from(err: TableauError) -> Self {
        match err {
            TableauError::NotFound(id) => CloudError::ResourceNotFound(id),
            TableauError::Json(e) => CloudError::Json(e),
            e @ (TableauError::Pagination { .. } | TableauError::MissingId) => {
                CloudError::Decode(e.to_string())
            }
            e @ (TableauError::InvalidContentPermissions(_)
            | TableauError::InvalidProjectId(_)
            | TableauError::MissingEnvVar(_)
            | TableauError::InvalidConfig(_)) => CloudError::InvalidConfig(e.to_string()),
            TableauError::NotVisible { id, attempts } => CloudError::Unconfirmed {
                id,
                reason: format!("not listed after {} reads", attempts),
            },
            e @ (TableauError::Transport(_) | TableauError::Status { .. }) => {
                CloudError::ApiError(e.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TableauError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_resource_not_found() {
        let err: CloudError = TableauError::NotFound("missing".to_string()).into();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Resource not found: missing");
    }

    #[test]
    fn test_status_maps_to_api_error() {
        let err = TableauError::Status {
            method: "DELETE".to_string(),
            path: "/projects/p-1".to_string(),
            status: 404,
            body: "gone".to_string(),
        };
        assert!(err.is_transport());
        assert!(!err.is_not_found());

        let cloud: CloudError = err.into();
        assert!(matches!(cloud, CloudError::ApiError(msg) if msg.contains("404")));
    }

    #[test]
    fn test_not_visible_maps_to_unconfirmed() {
        let err: CloudError = TableauError::NotVisible {
            id: "p-9".to_string(),
            attempts: 3,
        }
        .into();
        assert!(matches!(
            err,
            CloudError::Unconfirmed { id, reason } if id == "p-9" && reason.contains("3 reads")
        ));
    }
}
