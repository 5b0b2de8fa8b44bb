//! Effective step status, visibility and the rendered step list

use super::actions::StepAction;
use super::step::{ProjectWorkflow, StepId, StepStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Resolve the status a step should be displayed with
///
/// Completed and skipped steps keep their stored status. Every other step is
/// derived from its prerequisite: `current` or `pending` once the
/// prerequisite is met, `disabled` otherwise.
pub fn resolve_status(workflow: Option<&ProjectWorkflow>, step: StepId) -> StepStatus {
    let Some(wf) = workflow else {
        return if step == StepId::TeamInvited {
            StepStatus::Current
        } else {
            StepStatus::Disabled
        };
    };

    if step == StepId::OfferApproved && wf.has_status(StepId::OfferCreated, StepStatus::Skipped) {
        return StepStatus::Skipped;
    }

    let stored = wf.stored_status(step);
    if let Some(status) = stored.filter(|s| s.is_terminal()) {
        return status;
    }

    if !prerequisite_met(wf, step) {
        return StepStatus::Disabled;
    }

    match stored {
        Some(StepStatus::Current) => StepStatus::Current,
        None if step == StepId::TeamInvited => StepStatus::Current,
        _ => StepStatus::Pending,
    }
}

/// Resolve by wire name; unknown step ids are disabled
pub fn resolve_status_by_name(workflow: Option<&ProjectWorkflow>, step: &str) -> StepStatus {
    match StepId::parse(step) {
        Some(step) => resolve_status(workflow, step),
        None => StepStatus::Disabled,
    }
}

fn prerequisite_met(wf: &ProjectWorkflow, step: StepId) -> bool {
    let completed = |s| wf.has_status(s, StepStatus::Completed);
    match step {
        StepId::TeamInvited => true,
        StepId::DistributeTasks | StepId::OfferCreated => completed(StepId::TeamInvited),
        StepId::OfferApproved => completed(StepId::OfferCreated),
        StepId::InvoiceCreated => {
            wf.has_status(StepId::OfferCreated, StepStatus::Skipped)
                || completed(StepId::OfferApproved)
        }
        StepId::InvoicePaid => completed(StepId::InvoiceCreated),
        StepId::ProjectArchived => completed(StepId::InvoicePaid),
    }
}

/// Whether clicking a step with this status does anything
pub fn is_clickable(status: StepStatus) -> bool {
    !matches!(status, StepStatus::Disabled)
}

/// Whether the step appears in the rendered list at all
pub fn is_visible(workflow: Option<&ProjectWorkflow>, step: StepId) -> bool {
    let status = resolve_status(workflow, step);
    match step {
        StepId::TeamInvited | StepId::DistributeTasks => status != StepStatus::Completed,
        StepId::OfferApproved => !workflow
            .is_some_and(|wf| wf.has_status(StepId::OfferCreated, StepStatus::Skipped)),
        _ => true,
    }
}

/// One row of the rendered step list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub step: StepId,
    pub label: &'static str,
    pub status: StepStatus,
    pub clickable: bool,
    pub action: StepAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Build the ordered list of visible steps
pub fn resolve_view(workflow: Option<&ProjectWorkflow>) -> Vec<StepView> {
    StepId::ALL
        .into_iter()
        .filter(|step| is_visible(workflow, *step))
        .map(|step| {
            let status = resolve_status(workflow, step);
            let stored = workflow.and_then(|wf| wf.get(step));
            StepView {
                step,
                label: step.label(),
                status,
                clickable: is_clickable(status),
                action: StepAction::for_step(step),
                offer_number: stored.and_then(|s| s.offer_number.clone()),
                invoice_number: stored.and_then(|s| s.invoice_number.clone()),
                completed_at: stored.and_then(|s| s.completed_at),
            }
        })
        .collect()
}
