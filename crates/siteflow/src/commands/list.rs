use crate::commands::{print_header, print_row};
use crate::workspace::Workspace;
use colored::Colorize;

pub async fn handle_list(workspace: &Workspace, json: bool) -> anyhow::Result<()> {
    let projects = workspace.controller.client().list_projects().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("{}", "No projects on this site".dimmed());
        return Ok(());
    }

    print_header();
    for project in &projects {
        print_row(
            &project.id,
            &project.name,
            &project.parent_project_id,
            project.content_permissions.as_str(),
        );
    }
    println!();
    println!("{} project(s)", projects.len());

    Ok(())
}

pub async fn handle_get(workspace: &Workspace, id: &str, json: bool) -> anyhow::Result<()> {
    let project = workspace.controller.client().get_project(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&project)?);
        return Ok(());
    }

    print_header();
    print_row(
        &project.id,
        &project.name,
        &project.parent_project_id,
        project.content_permissions.as_str(),
    );
    if !project.description.is_empty() {
        println!("\n{}", project.description);
    }
    if !project.owner.id.is_empty() {
        println!("{} {}", "owner:".dimmed(), project.owner.id);
    }

    Ok(())
}
