//! Workflow service: applies transitions to stored projects
//!
//! Every mutation is a read-modify-write against the project document: the
//! update is merged into the in-memory snapshot, the merged workflow is
//! persisted, and the project is fetched again so callers always render the
//! stored state.

use super::error::WorkflowError;
use super::step::{OfferStatus, ProjectWorkflow, StepId, StepStatus, WorkflowUpdate};
use super::transitions;
use crate::sevdesk::{
    ORDER_STATUS_ACCEPTED, ORDER_STATUS_OPEN, SevdeskApi, describe_invoice_status,
    describe_order_status,
};
use crate::store::{Project, ProjectStatus, ProjectStore};
use serde_json::{Map, Value};

pub struct WorkflowService<S, A> {
    store: S,
    api: A,
}

fn logged<T>(
    action: &str,
    project_id: &str,
    result: Result<T, WorkflowError>,
) -> Result<T, WorkflowError> {
    result.inspect_err(|e| {
        tracing::error!(project = project_id, action, error = %e, "Workflow update failed");
    })
}

impl<S: ProjectStore, A: SevdeskApi> WorkflowService<S, A> {
    pub fn new(store: S, api: A) -> Self {
        Self { store, api }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a project together with its initial workflow
    pub fn create_project(&self, id: &str, name: &str) -> Result<Project, WorkflowError> {
        let mut project = Project::new(id, name);
        project.workflow = Some(ProjectWorkflow::initial());
        self.store.create_project(&project)?;
        Ok(project)
    }

    /// Load a project for display
    ///
    /// Creates the workflow if the document has none, then reconciles it
    /// against sevDesk.
    pub async fn load_project(&self, id: &str) -> Result<Project, WorkflowError> {
        let mut project = self.store.get_project(id)?;

        if project.workflow.is_none() {
            tracing::info!(project = id, "Creating missing workflow");
            project = self.persist_workflow(id, &ProjectWorkflow::initial())?;
        }

        Ok(self.reconcile(project).await)
    }

    /// Merge `update` into the snapshot's workflow, persist, and re-fetch
    pub fn update_workflow(
        &self,
        project: &Project,
        update: WorkflowUpdate,
    ) -> Result<Project, WorkflowError> {
        let changed: Vec<_> = update
            .iter()
            .map(|(step, state)| format!("{}={}", step, state.status))
            .collect();

        let merged = project
            .workflow
            .clone()
            .unwrap_or_else(ProjectWorkflow::initial)
            .merged(update);

        let fresh = self.persist_workflow(&project.id, &merged)?;
        tracing::info!(project = %project.id, changes = ?changed, "Workflow updated");
        Ok(fresh)
    }

    fn persist_workflow(
        &self,
        project_id: &str,
        workflow: &ProjectWorkflow,
    ) -> Result<Project, WorkflowError> {
        let mut patch = Map::new();
        patch.insert("workflow".into(), serde_json::to_value(workflow)?);
        self.persist(project_id, patch)
    }

    fn persist(
        &self,
        project_id: &str,
        patch: Map<String, Value>,
    ) -> Result<Project, WorkflowError> {
        self.store.merge_project(project_id, patch)?;
        Ok(self.store.get_project(project_id)?)
    }

    fn apply(
        &self,
        action: &str,
        project_id: &str,
        update: WorkflowUpdate,
    ) -> Result<Project, WorkflowError> {
        let result = self
            .store
            .get_project(project_id)
            .map_err(WorkflowError::from)
            .and_then(|project| self.update_workflow(&project, update));
        logged(action, project_id, result)
    }

    /// Save the project team and open task distribution and offer creation
    ///
    /// The team lists and the workflow are written separately; if the
    /// second write fails the team is saved but the workflow is not advanced.
    pub fn save_team(
        &self,
        project_id: &str,
        involved_users: Vec<String>,
        project_managers: Vec<String>,
    ) -> Result<Project, WorkflowError> {
        let mut patch = Map::new();
        patch.insert("involvedUsers".into(), Value::from(involved_users));
        patch.insert("projectManagers".into(), Value::from(project_managers));

        logged("save_team", project_id, self.persist(project_id, patch))?;
        self.apply("save_team", project_id, transitions::team_saved())
    }

    /// Continue without an offer
    pub fn skip_offer(&self, project_id: &str) -> Result<Project, WorkflowError> {
        self.apply("skip_offer", project_id, transitions::offer_skipped())
    }

    /// Link a sevDesk order as the project's offer
    pub fn select_offer(
        &self,
        project_id: &str,
        offer_id: &str,
        offer_number: &str,
    ) -> Result<Project, WorkflowError> {
        self.apply(
            "select_offer",
            project_id,
            transitions::offer_selected(offer_id, offer_number),
        )
    }

    /// Approve or reopen the linked offer, in sevDesk and in the workflow
    pub async fn set_offer_status(
        &self,
        project_id: &str,
        status: OfferStatus,
    ) -> Result<Project, WorkflowError> {
        let result: Result<Project, WorkflowError> = async {
            let project = self.store.get_project(project_id)?;
            let offer_id = project
                .workflow
                .as_ref()
                .and_then(|wf| wf.get(StepId::OfferCreated))
                .and_then(|s| s.offer_id.clone())
                .ok_or(WorkflowError::MissingLink {
                    step: StepId::OfferCreated,
                    field: "offer id",
                })?;

            let code = match status {
                OfferStatus::Approved => ORDER_STATUS_ACCEPTED,
                OfferStatus::Open => ORDER_STATUS_OPEN,
            };
            self.api.set_order_status(&offer_id, code).await?;

            self.update_workflow(&project, transitions::offer_status_changed(status))
        }
        .await;

        logged("set_offer_status", project_id, result)
    }

    /// Link a sevDesk invoice to the project
    pub fn select_invoice(
        &self,
        project_id: &str,
        invoice_id: &str,
        invoice_number: &str,
    ) -> Result<Project, WorkflowError> {
        self.apply(
            "select_invoice",
            project_id,
            transitions::invoice_selected(invoice_id, invoice_number),
        )
    }

    /// Complete the last step and mark the project itself completed
    pub fn archive_project(&self, project_id: &str) -> Result<Project, WorkflowError> {
        let result = self
            .store
            .get_project(project_id)
            .map_err(WorkflowError::from)
            .and_then(|project| {
                let merged = project
                    .workflow
                    .clone()
                    .unwrap_or_else(ProjectWorkflow::initial)
                    .merged(transitions::project_archived());

                let mut patch = Map::new();
                patch.insert("workflow".into(), serde_json::to_value(&merged)?);
                patch.insert(
                    "status".into(),
                    Value::from(ProjectStatus::Completed.as_str()),
                );
                self.persist(project_id, patch)
            });

        let project = logged("archive_project", project_id, result)?;
        tracing::info!(project = project_id, "Project archived");
        Ok(project)
    }

    /// Reopen a step; every later step except task distribution is disabled
    pub fn reset_step(&self, project_id: &str, step: StepId) -> Result<Project, WorkflowError> {
        self.apply("reset_step", project_id, transitions::reset_step(step))
    }

    /// Pull offer approval and invoice payment from sevDesk
    ///
    /// Only upgrades steps that are still `current`. Lookup or write failures
    /// are logged and leave the project unchanged.
    pub async fn reconcile(&self, project: Project) -> Project {
        let project = self.reconcile_offer(project).await;
        self.reconcile_invoice(project).await
    }

    async fn reconcile_offer(&self, project: Project) -> Project {
        let Some(wf) = project.workflow.as_ref() else {
            return project;
        };
        if !wf.has_status(StepId::OfferApproved, StepStatus::Current) {
            return project;
        }
        let Some(offer_id) = wf.get(StepId::OfferCreated).and_then(|s| s.offer_id.clone()) else {
            return project;
        };

        let code = match self.api.fetch_order_status(&offer_id).await {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(
                    project = %project.id,
                    offer_id = %offer_id,
                    error = %e,
                    "Could not check offer status"
                );
                return project;
            }
        };

        tracing::debug!(
            project = %project.id,
            offer_id = %offer_id,
            status = code,
            state = describe_order_status(code),
            "Checked offer status"
        );

        match transitions::reconcile_offer(wf, code) {
            Some(update) => self.apply_reconciled(project, update, "offer accepted"),
            None => project,
        }
    }

    async fn reconcile_invoice(&self, project: Project) -> Project {
        let Some(wf) = project.workflow.as_ref() else {
            return project;
        };
        if !wf.has_status(StepId::InvoicePaid, StepStatus::Current) {
            return project;
        }
        let Some(invoice_id) = wf
            .get(StepId::InvoiceCreated)
            .and_then(|s| s.invoice_id.clone())
        else {
            return project;
        };

        let code = match self.api.fetch_invoice_status(&invoice_id).await {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(
                    project = %project.id,
                    invoice_id = %invoice_id,
                    error = %e,
                    "Could not check invoice status"
                );
                return project;
            }
        };

        tracing::debug!(
            project = %project.id,
            invoice_id = %invoice_id,
            status = code,
            state = describe_invoice_status(code),
            "Checked invoice status"
        );

        match transitions::reconcile_invoice(wf, code) {
            Some(update) => self.apply_reconciled(project, update, "invoice paid"),
            None => project,
        }
    }

    fn apply_reconciled(&self, project: Project, update: WorkflowUpdate, reason: &str) -> Project {
        match self.update_workflow(&project, update) {
            Ok(fresh) => {
                tracing::info!(project = %project.id, reason, "Workflow reconciled with sevDesk");
                fresh
            }
            Err(e) => {
                tracing::warn!(
                    project = %project.id,
                    reason,
                    error = %e,
                    "Could not store reconciled workflow"
                );
                project
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sevdesk::SevdeskError;
    use crate::store::SqliteStore;
    use crate::workflow::step::WorkflowStep;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory sevDesk stand-in
    #[derive(Default)]
    struct MockApi {
        orders: HashMap<String, u16>,
        invoices: HashMap<String, u16>,
        fail: bool,
        puts: Mutex<Vec<(String, u16)>>,
    }

    impl MockApi {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn with_order(mut self, id: &str, status: u16) -> Self {
            self.orders.insert(id.into(), status);
            self
        }

        fn with_invoice(mut self, id: &str, status: u16) -> Self {
            self.invoices.insert(id.into(), status);
            self
        }

        fn check(&self) -> Result<(), SevdeskError> {
            if self.fail {
                Err(SevdeskError::network("connection refused"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SevdeskApi for MockApi {
        async fn fetch_order_status(&self, order_id: &str) -> Result<u16, SevdeskError> {
            self.check()?;
            self.orders.get(order_id).copied().ok_or(SevdeskError::NotFound {
                object: "Order",
                id: order_id.into(),
            })
        }

        async fn fetch_invoice_status(&self, invoice_id: &str) -> Result<u16, SevdeskError> {
            self.check()?;
            self.invoices.get(invoice_id).copied().ok_or(SevdeskError::NotFound {
                object: "Invoice",
                id: invoice_id.into(),
            })
        }

        async fn set_order_status(&self, order_id: &str, status: u16) -> Result<(), SevdeskError> {
            self.check()?;
            self.puts.lock().unwrap().push((order_id.into(), status));
            Ok(())
        }
    }

    fn service(api: MockApi) -> WorkflowService<SqliteStore, MockApi> {
        WorkflowService::new(SqliteStore::open_in_memory().unwrap(), api)
    }

    fn status(project: &Project, step: StepId) -> Option<StepStatus> {
        project.workflow.as_ref().and_then(|wf| wf.stored_status(step))
    }

    /// Store a project whose workflow holds exactly these steps
    fn seed(svc: &WorkflowService<SqliteStore, MockApi>, steps: Vec<(StepId, WorkflowStep)>) {
        let mut project = Project::new("p-1", "Relaunch");
        project.workflow = Some(steps.into_iter().collect::<WorkflowUpdate>().into());
        svc.store().create_project(&project).unwrap();
    }

    #[tokio::test]
    async fn test_load_creates_missing_workflow() {
        let svc = service(MockApi::default());
        svc.store().create_project(&Project::new("p-1", "Relaunch")).unwrap();

        let project = svc.load_project("p-1").await.unwrap();
        assert_eq!(project.workflow, Some(ProjectWorkflow::initial()));
        let stored = svc.store().get_project("p-1").unwrap();
        assert_eq!(stored.workflow, Some(ProjectWorkflow::initial()));
    }

    #[tokio::test]
    async fn test_load_missing_project() {
        let svc = service(MockApi::default());
        let err = svc.load_project("ghost").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Store(_)));
    }

    #[test]
    fn test_save_team_fans_out() {
        let svc = service(MockApi::default());
        seed(&svc, vec![(StepId::TeamInvited, WorkflowStep::new(StepStatus::Current))]);

        let project = svc
            .save_team("p-1", vec!["u-1".into(), "u-2".into()], vec!["u-9".into()])
            .unwrap();

        assert_eq!(project.involved_users, vec!["u-1", "u-2"]);
        assert_eq!(project.project_managers, vec!["u-9"]);
        assert_eq!(status(&project, StepId::TeamInvited), Some(StepStatus::Completed));
        assert_eq!(status(&project, StepId::DistributeTasks), Some(StepStatus::Current));
        assert_eq!(status(&project, StepId::OfferCreated), Some(StepStatus::Current));
        for later in &StepId::ALL[3..] {
            assert_eq!(status(&project, *later), None);
        }
    }

    #[test]
    fn test_skip_offer() {
        let svc = service(MockApi::default());
        seed(
            &svc,
            vec![
                (StepId::TeamInvited, WorkflowStep::completed_now()),
                (StepId::OfferCreated, WorkflowStep::new(StepStatus::Current)),
            ],
        );

        let project = svc.skip_offer("p-1").unwrap();
        assert_eq!(status(&project, StepId::OfferCreated), Some(StepStatus::Skipped));
        assert_eq!(status(&project, StepId::OfferApproved), Some(StepStatus::Skipped));
        assert_eq!(status(&project, StepId::InvoiceCreated), Some(StepStatus::Current));
    }

    #[tokio::test]
    async fn test_approve_offer_updates_sevdesk() {
        let svc = service(MockApi::default());
        svc.create_project("p-1", "Relaunch").unwrap();
        svc.save_team("p-1", vec![], vec![]).unwrap();
        svc.select_offer("p-1", "4711", "AN-4711").unwrap();

        let project = svc.set_offer_status("p-1", OfferStatus::Approved).await.unwrap();
        let approved = project.workflow.as_ref().unwrap().get(StepId::OfferApproved).unwrap();
        assert_eq!(approved.status, StepStatus::Completed);
        assert_eq!(approved.offer_status, Some(OfferStatus::Approved));
        assert_eq!(status(&project, StepId::InvoiceCreated), Some(StepStatus::Current));

        let project = svc.set_offer_status("p-1", OfferStatus::Open).await.unwrap();
        let reopened = project.workflow.as_ref().unwrap().get(StepId::OfferApproved).unwrap();
        assert_eq!(reopened.status, StepStatus::Current);
        assert!(reopened.completed_at.is_none());

        let puts = svc.api.puts.lock().unwrap().clone();
        assert_eq!(puts, vec![("4711".to_string(), 500), ("4711".to_string(), 200)]);
    }

    #[tokio::test]
    async fn test_approve_without_offer_fails() {
        let svc = service(MockApi::default());
        svc.create_project("p-1", "Relaunch").unwrap();

        let err = svc.set_offer_status("p-1", OfferStatus::Approved).await.unwrap_err();
        assert!(matches!(err, WorkflowError::MissingLink { .. }));
        assert!(svc.api.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sevdesk_failure_leaves_workflow() {
        let svc = service(MockApi::failing());
        seed(
            &svc,
            vec![
                (StepId::OfferCreated, WorkflowStep::completed_now().with_offer("1", "AN-1")),
                (StepId::OfferApproved, WorkflowStep::new(StepStatus::Current)),
            ],
        );

        let err = svc.set_offer_status("p-1", OfferStatus::Approved).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Sevdesk(_)));

        let stored = svc.store().get_project("p-1").unwrap();
        assert_eq!(status(&stored, StepId::OfferApproved), Some(StepStatus::Current));
    }

    #[test]
    fn test_select_invoice_and_archive() {
        let svc = service(MockApi::default());
        seed(
            &svc,
            vec![(StepId::InvoiceCreated, WorkflowStep::new(StepStatus::Current))],
        );

        let project = svc.select_invoice("p-1", "88", "RE-88").unwrap();
        assert_eq!(status(&project, StepId::InvoiceCreated), Some(StepStatus::Completed));
        assert_eq!(status(&project, StepId::InvoicePaid), Some(StepStatus::Current));

        let project = svc.archive_project("p-1").unwrap();
        assert_eq!(status(&project, StepId::ProjectArchived), Some(StepStatus::Completed));
        assert_eq!(project.status, ProjectStatus::Completed);
    }

    #[test]
    fn test_reset_offer_created() {
        let svc = service(MockApi::default());
        seed(
            &svc,
            StepId::ALL
                .into_iter()
                .map(|s| (s, WorkflowStep::completed_now()))
                .collect(),
        );

        let project = svc.reset_step("p-1", StepId::OfferCreated).unwrap();
        assert_eq!(status(&project, StepId::OfferCreated), Some(StepStatus::Pending));
        assert_eq!(status(&project, StepId::DistributeTasks), Some(StepStatus::Completed));
        for step in &StepId::ALL[StepId::OfferApproved.index()..] {
            assert_eq!(status(&project, *step), Some(StepStatus::Disabled));
        }
    }

    #[tokio::test]
    async fn test_reconcile_accepted_offer() {
        let svc = service(MockApi::default().with_order("4711", 500));
        seed(
            &svc,
            vec![
                (StepId::OfferCreated, WorkflowStep::completed_now().with_offer("4711", "AN-4711")),
                (StepId::OfferApproved, WorkflowStep::new(StepStatus::Current)),
            ],
        );

        let project = svc.load_project("p-1").await.unwrap();
        assert_eq!(status(&project, StepId::OfferApproved), Some(StepStatus::Completed));
        assert_eq!(status(&project, StepId::InvoiceCreated), Some(StepStatus::Current));
        // reconciliation only reads from sevDesk
        assert!(svc.api.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_paid_invoice() {
        let svc = service(MockApi::default().with_invoice("88", 400));
        seed(
            &svc,
            vec![
                (StepId::InvoiceCreated, WorkflowStep::completed_now().with_invoice("88", "RE-88")),
                (StepId::InvoicePaid, WorkflowStep::new(StepStatus::Current)),
            ],
        );

        let project = svc.load_project("p-1").await.unwrap();
        assert_eq!(status(&project, StepId::InvoicePaid), Some(StepStatus::Completed));
        assert_eq!(status(&project, StepId::ProjectArchived), Some(StepStatus::Current));
    }

    #[tokio::test]
    async fn test_reconcile_never_regresses_completed() {
        let svc = service(MockApi::default().with_invoice("88", 200));
        seed(
            &svc,
            vec![
                (StepId::InvoiceCreated, WorkflowStep::completed_now().with_invoice("88", "RE-88")),
                (StepId::InvoicePaid, WorkflowStep::completed_now()),
            ],
        );

        let project = svc.load_project("p-1").await.unwrap();
        assert_eq!(status(&project, StepId::InvoicePaid), Some(StepStatus::Completed));
    }

    #[tokio::test]
    async fn test_reconcile_both_in_one_load() {
        let svc = service(
            MockApi::default()
                .with_order("1", 500)
                .with_invoice("2", 1000),
        );
        seed(
            &svc,
            vec![
                (StepId::OfferCreated, WorkflowStep::completed_now().with_offer("1", "AN-1")),
                (StepId::OfferApproved, WorkflowStep::new(StepStatus::Current)),
                (StepId::InvoiceCreated, WorkflowStep::completed_now().with_invoice("2", "RE-2")),
                (StepId::InvoicePaid, WorkflowStep::new(StepStatus::Current)),
            ],
        );

        let project = svc.load_project("p-1").await.unwrap();
        assert_eq!(status(&project, StepId::OfferApproved), Some(StepStatus::Completed));
        assert_eq!(status(&project, StepId::InvoiceCreated), Some(StepStatus::Completed));
        let invoice = project
            .workflow
            .as_ref()
            .and_then(|wf| wf.get(StepId::InvoiceCreated))
            .and_then(|s| s.invoice_id.clone());
        assert_eq!(invoice.as_deref(), Some("2"));
        assert_eq!(status(&project, StepId::InvoicePaid), Some(StepStatus::Completed));
        assert_eq!(status(&project, StepId::ProjectArchived), Some(StepStatus::Current));
    }

    #[tokio::test]
    async fn test_reconcile_failure_is_swallowed() {
        let svc = service(MockApi::failing());
        seed(
            &svc,
            vec![
                (StepId::InvoiceCreated, WorkflowStep::completed_now().with_invoice("88", "RE-88")),
                (StepId::InvoicePaid, WorkflowStep::new(StepStatus::Current)),
            ],
        );

        let project = svc.load_project("p-1").await.unwrap();
        assert_eq!(status(&project, StepId::InvoicePaid), Some(StepStatus::Current));
        assert!(status(&project, StepId::ProjectArchived).is_none());
    }
}
