pub mod apply;
pub mod list;
pub mod state;

use colored::Colorize;
use siteflow_tableau::ProjectAttributes;

const TABLE_WIDTH: usize = 110;

pub(crate) fn print_header() {
    println!(
        "{}",
        format!(
            "{:<38} {:<24} {:<38} {:<30}",
            "ID", "NAME", "PARENT", "PERMISSIONS"
        )
        .bold()
    );
    println!("{}", "─".repeat(TABLE_WIDTH).dimmed());
}

pub(crate) fn print_row(id: &str, name: &str, parent: &str, permissions: &str) {
    let parent = if parent.is_empty() { "-" } else { parent };
    println!(
        "{:<38} {:<24} {:<38} {:<30}",
        id.cyan(),
        name,
        parent.dimmed(),
        permissions
    );
}

pub(crate) fn print_attributes(attrs: &ProjectAttributes) {
    println!("  {:<20} {}", "id:".bold(), attrs.id().unwrap_or("-").cyan());
    println!("  {:<20} {}", "name:".bold(), attrs.name);
    println!(
        "  {:<20} {}",
        "parent:".bold(),
        attrs.parent_project_id.as_deref().unwrap_or("-")
    );
    println!("  {:<20} {}", "description:".bold(), attrs.description);
    println!(
        "  {:<20} {}",
        "content permissions:".bold(),
        attrs.content_permissions
    );
    println!(
        "  {:<20} {}",
        "owner:".bold(),
        attrs.owner_id.as_deref().unwrap_or("-")
    );
    if let Some(at) = attrs.last_updated {
        println!("  {:<20} {}", "last updated:".bold(), at.to_rfc3339());
    }
}
