//! Tableau project controller implementation

use crate::client::TableauClient;
use crate::resource::ProjectAttributes;
use async_trait::async_trait;
use siteflow_cloud::{CloudError, ResourceController};

pub const PROJECT_RESOURCE: &str = "project";

/// Drives Tableau projects for a declarative host
pub struct ProjectController {
    client: TableauClient,
}

impl ProjectController {
    pub fn new(client: TableauClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &TableauClient {
        &self.client
    }
}

fn require_id(state: &ProjectAttributes) -> siteflow_cloud::Result<&str> {
    state
        .id()
        .ok_or_else(|| CloudError::StateError("project has no id yet".to_string()))
}

#[async_trait]
impl ResourceController for ProjectController {
    type State = ProjectAttributes;

    fn resource_type(&self) -> &str {
        PROJECT_RESOURCE
    }

    async fn create(&self, desired: &ProjectAttributes) -> siteflow_cloud::Result<ProjectAttributes> {
        let created = self.client.create_project(&desired.to_fields()).await?;

        let mut state = desired.clone();
        state.apply_created(&created);
        Ok(state)
    }

    async fn read(&self, current: &ProjectAttributes) -> siteflow_cloud::Result<ProjectAttributes> {
        let id = require_id(current)?;
        let observed = self.client.get_project(id).await?;

        let mut state = current.clone();
        state.refresh_from(&observed);
        Ok(state)
    }

    async fn update(
        &self,
        prior: &ProjectAttributes,
        desired: &ProjectAttributes,
    ) -> siteflow_cloud::Result<ProjectAttributes> {
        let id = require_id(prior)?;
        self.client.update_project(id, &desired.to_fields()).await?;

        let observed = self.client.get_project(id).await?;
        let mut state = prior.clone();
        state.refresh_from(&observed);
        state.touch();
        Ok(state)
    }

    async fn delete(&self, current: &ProjectAttributes) -> siteflow_cloud::Result<()> {
        let id = require_id(current)?;
        self.client.delete_project(id).await?;
        Ok(())
    }

    async fn import(&self, id: &str) -> siteflow_cloud::Result<ProjectAttributes> {
        tracing::info!("Importing project {}", id);
        self.read(&ProjectAttributes::imported(id)).await
    }
}
