//! Project CRUD operations against the Tableau REST API

use crate::config::TableauConfig;
use crate::error::{Result, TableauError};
use crate::pagination::PageScanner;
use crate::project::{Project, ProjectFields, ProjectListResponse, ProjectRequest, ProjectResponse};
use crate::transport::{HttpTransport, Transport};
use reqwest::Method;
use siteflow_cloud::RetryConfig;
use std::sync::Arc;

const PROJECTS_PATH: &str = "/projects";

/// Tableau projects client
pub struct TableauClient {
    transport: Arc<dyn Transport>,
    settle: RetryConfig,
}

impl TableauClient {
    /// Create a client speaking HTTP to the configured site
    pub fn new(config: &TableauConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(Arc::new(transport), config.settle.clone()))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>, settle: RetryConfig) -> Self {
        Self { transport, settle }
    }

    fn projects(&self) -> PageScanner<'_, ProjectListResponse> {
        PageScanner::new(self.transport.as_ref(), PROJECTS_PATH)
    }

    /// List every project on the site, across all pages
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let projects = self.projects().collect_all().await?;
        tracing::debug!("Listed {} projects", projects.len());
        Ok(projects)
    }

    /// Find a project by ID, scanning pages until it turns up
    pub async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.projects()
            .find(|project| project.id == project_id)
            .await?
            .ok_or_else(|| TableauError::NotFound(project_id.to_string()))
    }

    /// Create a project
    ///
    /// The owner reference is only sent when `fields.owner_id` is non-empty.
    /// Before returning, the new project is read back under the settle policy
    /// so callers can rely on it being listed.
    pub async fn create_project(&self, fields: &ProjectFields) -> Result<Project> {
        tracing::info!("Creating project: {}", fields.name);

        let body = serde_json::to_vec(&ProjectRequest::create(fields))?;
        let response = self
            .transport
            .execute(Method::POST, PROJECTS_PATH, Some(body))
            .await?;
        let created = serde_json::from_slice::<ProjectResponse>(&response)?.project;

        if created.id.is_empty() {
            return Err(TableauError::MissingId);
        }

        self.await_visible(&created.id).await?;
        tracing::info!("Created project {} (ID: {})", created.name, created.id);
        Ok(created)
    }

    /// Replace a project's fields; every field is sent, the owner included
    pub async fn update_project(&self, project_id: &str, fields: &ProjectFields) -> Result<Project> {
        tracing::info!("Updating project {}", project_id);

        let body = serde_json::to_vec(&ProjectRequest::update(fields))?;
        let response = self
            .transport
            .execute(Method::PUT, &project_path(project_id)?, Some(body))
            .await?;

        Ok(serde_json::from_slice::<ProjectResponse>(&response)?.project)
    }

    /// Delete a project; whatever the service answers is passed through
    pub async fn delete_project(&self, project_id: &str) -> Result<()> {
        tracing::info!("Deleting project {}", project_id);

        self.transport
            .execute(Method::DELETE, &project_path(project_id)?, None)
            .await?;
        Ok(())
    }

    /// Poll until a freshly created project is listed
    async fn await_visible(&self, project_id: &str) -> Result<()> {
        let policy = &self.settle;

        for attempt in 0..policy.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(policy.delay_for(attempt - 1)).await;
            }

            match self.get_project(project_id).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(
                        "Project {} not listed yet (attempt {}/{})",
                        project_id,
                        attempt + 1,
                        policy.max_attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if policy.max_attempts == 0 {
            return Ok(());
        }

        Err(TableauError::NotVisible {
            id: project_id.to_string(),
            attempts: policy.max_attempts,
        })
    }
}

/// Path of one project, with the id encoded as a single segment
fn project_path(project_id: &str) -> Result<String> {
    if matches!(project_id, "" | "." | "..") {
        return Err(TableauError::InvalidProjectId(project_id.to_string()));
    }
    Ok(format!(
        "{}/{}",
        PROJECTS_PATH,
        urlencoding::encode(project_id)
    ))
}
