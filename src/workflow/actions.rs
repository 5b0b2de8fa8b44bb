//! Step click dispatch
//!
//! Every step maps to exactly one action. The UI shell (here: the CLI)
//! implements [`WorkflowActions`] to open the matching dialog or run the
//! matching command.

use super::resolver::{is_clickable, resolve_status};
use super::step::{ProjectWorkflow, StepId};
use serde::Serialize;

/// What clicking a step does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    ManageTeam,
    NavigateToTasks,
    SelectOrCreateOffer,
    ApproveOffer,
    SelectOrCreateInvoice,
    OpenInvoice,
    ArchiveProject,
}

impl StepAction {
    /// Fixed dispatch table
    pub fn for_step(step: StepId) -> Self {
        match step {
            StepId::TeamInvited => StepAction::ManageTeam,
            StepId::DistributeTasks => StepAction::NavigateToTasks,
            StepId::OfferCreated => StepAction::SelectOrCreateOffer,
            StepId::OfferApproved => StepAction::ApproveOffer,
            StepId::InvoiceCreated => StepAction::SelectOrCreateInvoice,
            StepId::InvoicePaid => StepAction::OpenInvoice,
            StepId::ProjectArchived => StepAction::ArchiveProject,
        }
    }
}

/// Callbacks exposed to the UI shell
pub trait WorkflowActions {
    fn on_manage_team(&mut self);

    fn on_navigate_to_tasks(&mut self);

    fn on_select_or_create_offer(&mut self);

    fn on_approve_offer(&mut self);

    fn on_select_or_create_invoice(&mut self);

    /// Open the linked invoice in sevDesk
    fn on_open_invoice(&mut self, invoice_id: Option<&str>);

    fn on_archive_project(&mut self);

    fn on_reset_step(&mut self, step: StepId);
}

/// Dispatch a click on `step`
///
/// Returns the action that was invoked, or `None` when the step is not
/// clickable (the click is ignored).
pub fn dispatch_action(
    workflow: Option<&ProjectWorkflow>,
    step: StepId,
    handler: &mut dyn WorkflowActions,
) -> Option<StepAction> {
    let status = resolve_status(workflow, step);
    if !is_clickable(status) {
        tracing::debug!(step = %step, status = %status, "Ignoring click on disabled step");
        return None;
    }

    let action = StepAction::for_step(step);
    match action {
        StepAction::ManageTeam => handler.on_manage_team(),
        StepAction::NavigateToTasks => handler.on_navigate_to_tasks(),
        StepAction::SelectOrCreateOffer => handler.on_select_or_create_offer(),
        StepAction::ApproveOffer => handler.on_approve_offer(),
        StepAction::SelectOrCreateInvoice => handler.on_select_or_create_invoice(),
        StepAction::OpenInvoice => {
            let invoice_id = workflow
                .and_then(|wf| wf.get(StepId::InvoiceCreated))
                .and_then(|s| s.invoice_id.as_deref());
            handler.on_open_invoice(invoice_id);
        }
        StepAction::ArchiveProject => handler.on_archive_project(),
    }

    tracing::debug!(step = %step, action = ?action, "Dispatched step action");
    Some(action)
}

/// Dispatch a reset request for `step`
///
/// Uses the same gate as clicks: a disabled step cannot be reset.
pub fn dispatch_reset(
    workflow: Option<&ProjectWorkflow>,
    step: StepId,
    handler: &mut dyn WorkflowActions,
) -> bool {
    if !is_clickable(resolve_status(workflow, step)) {
        tracing::debug!(step = %step, "Ignoring reset of disabled step");
        return false;
    }
    handler.on_reset_step(step);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::step::{StepStatus, WorkflowStep};

    /// Records every callback it receives
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl WorkflowActions for Recorder {
        fn on_manage_team(&mut self) {
            self.calls.push("manage_team".into());
        }
        fn on_navigate_to_tasks(&mut self) {
            self.calls.push("tasks".into());
        }
        fn on_select_or_create_offer(&mut self) {
            self.calls.push("offer".into());
        }
        fn on_approve_offer(&mut self) {
            self.calls.push("approve".into());
        }
        fn on_select_or_create_invoice(&mut self) {
            self.calls.push("invoice".into());
        }
        fn on_open_invoice(&mut self, invoice_id: Option<&str>) {
            self.calls.push(format!("open:{}", invoice_id.unwrap_or("-")));
        }
        fn on_archive_project(&mut self) {
            self.calls.push("archive".into());
        }
        fn on_reset_step(&mut self, step: StepId) {
            self.calls.push(format!("reset:{}", step));
        }
    }

    #[test]
    fn test_every_step_has_distinct_action() {
        let actions: Vec<_> = StepId::ALL.iter().map(|s| StepAction::for_step(*s)).collect();
        for (i, a) in actions.iter().enumerate() {
            assert!(!actions[i + 1..].contains(a));
        }
    }

    #[test]
    fn test_dispatch_clickable_step() {
        let mut recorder = Recorder::default();
        let action = dispatch_action(None, StepId::TeamInvited, &mut recorder);

        assert_eq!(action, Some(StepAction::ManageTeam));
        assert_eq!(recorder.calls, vec!["manage_team"]);
    }

    #[test]
    fn test_dispatch_disabled_step_is_noop() {
        let mut recorder = Recorder::default();
        let wf = ProjectWorkflow::initial();

        assert_eq!(dispatch_action(Some(&wf), StepId::ProjectArchived, &mut recorder), None);
        assert_eq!(dispatch_action(None, StepId::OfferCreated, &mut recorder), None);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_open_invoice_passes_linked_id() {
        let mut wf = ProjectWorkflow::default();
        wf.set(
            StepId::InvoiceCreated,
            WorkflowStep::completed_now().with_invoice("991", "RE-2024-001"),
        );
        wf.set(StepId::InvoicePaid, WorkflowStep::new(StepStatus::Current));

        let mut recorder = Recorder::default();
        let action = dispatch_action(Some(&wf), StepId::InvoicePaid, &mut recorder);

        assert_eq!(action, Some(StepAction::OpenInvoice));
        assert_eq!(recorder.calls, vec!["open:991"]);
    }

    #[test]
    fn test_reset_gate() {
        let mut wf = ProjectWorkflow::initial();
        wf.set(StepId::TeamInvited, WorkflowStep::completed_now());

        let mut recorder = Recorder::default();
        assert!(dispatch_reset(Some(&wf), StepId::TeamInvited, &mut recorder));
        assert!(!dispatch_reset(Some(&wf), StepId::InvoicePaid, &mut recorder));
        assert_eq!(recorder.calls, vec!["reset:teamInvited"]);
    }

    #[test]
    fn test_completed_step_still_dispatches() {
        let mut wf = ProjectWorkflow::default();
        wf.set(StepId::TeamInvited, WorkflowStep::completed_now());
        wf.set(StepId::OfferCreated, WorkflowStep::completed_now().with_offer("1", "AN-1"));

        let mut recorder = Recorder::default();
        let action = dispatch_action(Some(&wf), StepId::OfferCreated, &mut recorder);
        assert_eq!(action, Some(StepAction::SelectOrCreateOffer));
    }
}
