//! Project workflow state machine
//!
//! This module handles:
//! - The seven fixed workflow steps and their persisted state
//! - Resolving each step's effective status, visibility and click action
//! - Building partial updates for user actions and sevDesk reconciliation
//! - Applying those updates to stored projects
//!
//! # Example
//!
//! ```ignore
//! use projektflow::workflow::{WorkflowService, resolve_view};
//!
//! let service = WorkflowService::new(store, sevdesk);
//! let project = service.load_project("p-1").await?;
//!
//! for row in resolve_view(project.workflow.as_ref()) {
//!     println!("{} [{}]", row.label, row.status);
//! }
//! ```

mod actions;
mod error;
mod resolver;
mod service;
mod step;
mod transitions;

pub use actions::{StepAction, WorkflowActions, dispatch_action, dispatch_reset};
pub use error::WorkflowError;
pub use resolver::{StepView, resolve_status_by_name, resolve_view};
pub use service::WorkflowService;
pub use step::{OfferStatus, ProjectWorkflow, StepId, StepStatus};
