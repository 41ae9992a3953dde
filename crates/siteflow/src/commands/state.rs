use crate::commands::print_attributes;
use crate::workspace::Workspace;
use colored::Colorize;
use siteflow_cloud::{ResourceController, ResourceState, ResourceStatus, StateManager};
use siteflow_tableau::{PROJECT_RESOURCE, ProjectAttributes};

/// Show tracked projects without contacting the service
pub async fn handle(manager: &StateManager) -> anyhow::Result<()> {
    let state = manager.load().await?;
    let projects: Vec<&ResourceState> = state.resources_of_type(PROJECT_RESOURCE).collect();

    if projects.is_empty() {
        println!("{}", "No tracked projects".dimmed());
        return Ok(());
    }

    for resource in projects {
        let status = match resource.status {
            ResourceStatus::Active => resource.status.to_string().green(),
            ResourceStatus::Tainted => resource.status.to_string().yellow(),
        };
        println!("{} [{}]", resource.id.cyan().bold(), status);
        print_attributes(&resource.model::<ProjectAttributes>()?);
        println!();
    }

    Ok(())
}

pub async fn handle_refresh(workspace: &Workspace) -> anyhow::Result<()> {
    let (lock, mut state) = workspace.begin().await?;

    let tracked: Vec<ResourceState> = state
        .resources_of_type(PROJECT_RESOURCE)
        .cloned()
        .collect();

    println!(
        "{}",
        format!("Refreshing {} tracked project(s)...", tracked.len()).blue()
    );

    let mut removed = 0;
    let mut pending = 0;
    for mut resource in tracked {
        let current: ProjectAttributes = resource.model()?;

        match workspace.controller.read(&current).await {
            Ok(observed) => {
                resource.set_model(&observed)?;
                resource.status = ResourceStatus::Active;
                state.track(resource);
            }
            Err(e) if e.is_not_found() && resource.status == ResourceStatus::Tainted => {
                tracing::warn!("Project {} is still not listed", resource.id);
                pending += 1;
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("Project {} no longer exists, dropping it", resource.id);
                state.untrack(PROJECT_RESOURCE, &resource.id);
                removed += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    workspace.commit(lock, &state).await?;

    if pending > 0 {
        println!(
            "{} {} created project(s) still not listed",
            "⚠".yellow(),
            pending
        );
    }
    if removed > 0 {
        println!("{} Dropped {} deleted project(s)", "⚠".yellow(), removed);
    }
    println!("{} State refreshed", "✓".green());
    Ok(())
}
