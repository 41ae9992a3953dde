//! Tableau project controller for SiteFlow
//!
//! This crate implements the ResourceController trait for Tableau Server
//! projects, talking to the site-scoped REST API directly.
//!
//! # Features
//!
//! - Project listing across every page of `GET /projects`
//! - Lookup by ID with early exit once the project's page is reached
//! - Create / update / delete, with a bounded read-back after create
//! - Declarative attribute mapping for hosts that track state
//!
//! # Requirements
//!
//! - `TABLEAU_API_URL` (e.g. `https://tableau.example.com/api/3.19/sites/<site-id>`)
//!   and `TABLEAU_AUTH_TOKEN` env vars, or an explicit [`TableauConfig`]
//!
//! # Example
//!
//! ```ignore
//! use siteflow_tableau::{ContentPermissions, ProjectFields, TableauClient, TableauConfig};
//!
//! let config = TableauConfig::from_env()?;
//! let client = TableauClient::new(&config)?;
//!
//! let fields = ProjectFields::new("Sales", ContentPermissions::ManagedByOwner)
//!     .with_owner("owner-123");
//! let project = client.create_project(&fields).await?;
//!
//! let same = client.get_project(&project.id).await?;
//! client.delete_project(&same.id).await?;
//! ```

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod pagination;
pub mod project;
pub mod resource;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::TableauClient;
pub use config::TableauConfig;
pub use controller::{PROJECT_RESOURCE, ProjectController};
pub use error::{Result, TableauError};
pub use pagination::{Page, PageEnvelope, PageScanner, Pagination};
pub use project::{ContentPermissions, OwnerRef, Project, ProjectFields};
pub use resource::ProjectAttributes;
pub use transport::{HttpTransport, Transport};
