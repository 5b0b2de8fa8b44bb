//! Partial workflow updates produced by user actions and reconciliation
//!
//! Transitions are pure: they only build the [`WorkflowUpdate`] that the
//! service merges and persists. Nothing here checks whether a transition is
//! legal for the current state; the clickable gate in the UI is the only
//! guard.

use super::step::{
    InvoiceStatus, OfferStatus, ProjectWorkflow, StepId, StepStatus, WorkflowStep, WorkflowUpdate,
};
use crate::sevdesk::{invoice_is_paid, order_is_accepted};

fn update<const N: usize>(steps: [(StepId, WorkflowStep); N]) -> WorkflowUpdate {
    steps.into_iter().collect()
}

/// Team saved: task distribution and offer creation open up in parallel
pub fn team_saved() -> WorkflowUpdate {
    update([
        (StepId::TeamInvited, WorkflowStep::completed_now()),
        (StepId::DistributeTasks, WorkflowStep::new(StepStatus::Current)),
        (StepId::OfferCreated, WorkflowStep::new(StepStatus::Current)),
    ])
}

/// "No offer" chosen: approval is skipped and invoicing opens directly
pub fn offer_skipped() -> WorkflowUpdate {
    update([
        (StepId::OfferCreated, WorkflowStep::new(StepStatus::Skipped)),
        (StepId::OfferApproved, WorkflowStep::new(StepStatus::Skipped)),
        (StepId::InvoiceCreated, WorkflowStep::new(StepStatus::Current)),
    ])
}

pub fn offer_selected(offer_id: &str, offer_number: &str) -> WorkflowUpdate {
    update([
        (
            StepId::OfferCreated,
            WorkflowStep::completed_now().with_offer(offer_id, offer_number),
        ),
        (StepId::OfferApproved, WorkflowStep::new(StepStatus::Current)),
    ])
}

pub fn offer_status_changed(status: OfferStatus) -> WorkflowUpdate {
    match status {
        OfferStatus::Approved => update([
            (
                StepId::OfferApproved,
                WorkflowStep::completed_now().with_offer_status(OfferStatus::Approved),
            ),
            (StepId::InvoiceCreated, WorkflowStep::new(StepStatus::Current)),
        ]),
        OfferStatus::Open => update([(
            StepId::OfferApproved,
            WorkflowStep::new(StepStatus::Current).with_offer_status(OfferStatus::Open),
        )]),
    }
}

pub fn invoice_selected(invoice_id: &str, invoice_number: &str) -> WorkflowUpdate {
    update([
        (
            StepId::InvoiceCreated,
            WorkflowStep::completed_now().with_invoice(invoice_id, invoice_number),
        ),
        (StepId::InvoicePaid, WorkflowStep::new(StepStatus::Current)),
    ])
}

pub fn invoice_paid() -> WorkflowUpdate {
    update([
        (
            StepId::InvoicePaid,
            WorkflowStep::completed_now().with_invoice_status(InvoiceStatus::Paid),
        ),
        (StepId::ProjectArchived, WorkflowStep::new(StepStatus::Current)),
    ])
}

pub fn project_archived() -> WorkflowUpdate {
    update([(StepId::ProjectArchived, WorkflowStep::completed_now())])
}

/// Reopen `step` and disable everything after it
///
/// `distributeTasks` runs alongside the offer chain and is left alone unless
/// it is the step being reset.
pub fn reset_step(step: StepId) -> WorkflowUpdate {
    let reopened = if step.index() == 0 {
        StepStatus::Current
    } else {
        StepStatus::Pending
    };

    let mut changes = WorkflowUpdate::new();
    changes.insert(step, WorkflowStep::new(reopened));
    for later in &StepId::ALL[step.index() + 1..] {
        if *later != StepId::DistributeTasks {
            changes.insert(*later, WorkflowStep::new(StepStatus::Disabled));
        }
    }
    changes
}

/// Drop the opened follow-up step when the workflow already finished it
fn keep_finished(
    workflow: &ProjectWorkflow,
    mut changes: WorkflowUpdate,
    next: StepId,
) -> WorkflowUpdate {
    if workflow.stored_status(next).is_some_and(StepStatus::is_terminal) {
        changes.remove(&next);
    }
    changes
}

/// Upgrade a pending approval once sevDesk reports the order accepted
///
/// Only fires while `offerApproved` is stored `current`. A completed or
/// skipped `invoiceCreated` is left as stored.
pub fn reconcile_offer(workflow: &ProjectWorkflow, remote_status: u16) -> Option<WorkflowUpdate> {
    if !workflow.has_status(StepId::OfferApproved, StepStatus::Current) {
        return None;
    }
    if !order_is_accepted(remote_status) {
        return None;
    }
    Some(keep_finished(
        workflow,
        offer_status_changed(OfferStatus::Approved),
        StepId::InvoiceCreated,
    ))
}

/// Upgrade a pending payment once sevDesk reports the invoice paid
pub fn reconcile_invoice(
    workflow: &ProjectWorkflow,
    remote_status: u16,
) -> Option<WorkflowUpdate> {
    if !workflow.has_status(StepId::InvoicePaid, StepStatus::Current) {
        return None;
    }
    if !invoice_is_paid(remote_status) {
        return None;
    }
    Some(keep_finished(workflow, invoice_paid(), StepId::ProjectArchived))
}
