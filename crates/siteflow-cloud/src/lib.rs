//! SiteFlow resource abstraction
//!
//! This crate provides the host-independent side of SiteFlow: the
//! controller contract every managed resource type implements, the error
//! taxonomy hosts consume, retry policy, and the local state file that
//! records tracked resources.
//!
//! # Layering
//!
//! ```text
//!   siteflow (CLI host)
//!     │  loads / saves ──────────────► state::StateManager (.siteflow/state.json)
//!     │  drives
//!     ▼
//!   controller::ResourceController    retry policy: controller::RetryConfig
//!     ▲
//!     │  implemented by
//!   siteflow-tableau::ProjectController (Tableau REST projects)
//! ```

pub mod controller;
pub mod error;
pub mod state;

// Re-exports
pub use controller::{ResourceController, RetryConfig};
pub use error::{CloudError, Result};
pub use state::{GlobalState, ResourceState, ResourceStatus, StateLock, StateManager};
