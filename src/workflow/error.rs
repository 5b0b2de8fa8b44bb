//! Error types for workflow operations

use super::step::StepId;
use crate::sevdesk::SevdeskError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("sevDesk request failed: {0}")]
    Sevdesk(#[from] SevdeskError),

    /// A transition needs a linked sevDesk document that is not set
    #[error("step '{step}' has no linked {field}")]
    MissingLink { step: StepId, field: &'static str },

    #[error("failed to encode workflow: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkflowError::MissingLink {
            step: StepId::OfferCreated,
            field: "offer id",
        };
        assert_eq!(err.to_string(), "step 'offerCreated' has no linked offer id");

        let err: WorkflowError = StoreError::NotFound { id: "p-9".into() }.into();
        assert_eq!(err.to_string(), "project 'p-9' not found");

        let err: WorkflowError = SevdeskError::auth("denied").into();
        assert!(err.to_string().contains("sevDesk"));
    }
}
