//! CLI command implementations
//!
//! Each command returns the process exit code; failures are reported
//! through the output handler.

use super::output::{OutputEvent, OutputHandler, ProjectSummary};
use crate::config::SevdeskConfig;
use crate::sevdesk::SevdeskApi;
use crate::store::{Project, ProjectStore};
use crate::workflow::{
    OfferStatus, StepId, StepStatus, WorkflowActions, WorkflowError, WorkflowService,
    dispatch_action, dispatch_reset, resolve_status_by_name, resolve_view,
};

/// What to do at the offer step
#[derive(Debug, Clone)]
pub enum OfferChoice {
    /// Continue without an offer
    Skip,
    /// Link an existing or newly created sevDesk order
    Select { id: String, number: String },
}

fn emit_project(handler: &dyn OutputHandler, project: &Project) {
    handler.emit(OutputEvent::Workflow {
        project_id: project.id.clone(),
        name: project.name.clone(),
        project_status: project.status.as_str().into(),
        steps: resolve_view(project.workflow.as_ref()),
    });
}

/// Render the updated project, or report the failure
fn report(handler: &dyn OutputHandler, result: Result<Project, WorkflowError>) -> i32 {
    match result {
        Ok(project) => {
            emit_project(handler, &project);
            0
        }
        Err(e) => {
            handler.emit(OutputEvent::Error {
                error: e.to_string(),
            });
            1
        }
    }
}

/// Create a project with a fresh workflow
pub fn create<S: ProjectStore, A: SevdeskApi>(
    service: &WorkflowService<S, A>,
    id: &str,
    name: &str,
    handler: &dyn OutputHandler,
) -> i32 {
    report(handler, service.create_project(id, name))
}

/// List all projects with the step they are waiting on
pub fn list<S: ProjectStore, A: SevdeskApi>(
    service: &WorkflowService<S, A>,
    handler: &dyn OutputHandler,
) -> i32 {
    match service.store().list_projects() {
        Ok(projects) => {
            let projects = projects
                .into_iter()
                .map(|p| ProjectSummary {
                    current_step: resolve_view(p.workflow.as_ref())
                        .into_iter()
                        .find(|v| v.status == StepStatus::Current)
                        .map(|v| v.step),
                    id: p.id,
                    name: p.name,
                    status: p.status.as_str().into(),
                })
                .collect();
            handler.emit(OutputEvent::Projects { projects });
            0
        }
        Err(e) => {
            handler.emit(OutputEvent::Error {
                error: e.to_string(),
            });
            1
        }
    }
}

/// Load (and reconcile) a project and render its workflow
pub async fn show<S: ProjectStore, A: SevdeskApi>(
    service: &WorkflowService<S, A>,
    project_id: &str,
    handler: &dyn OutputHandler,
) -> i32 {
    report(handler, service.load_project(project_id).await)
}

pub fn save_team<S: ProjectStore, A: SevdeskApi>(
    service: &WorkflowService<S, A>,
    project_id: &str,
    members: Vec<String>,
    managers: Vec<String>,
    handler: &dyn OutputHandler,
) -> i32 {
    report(handler, service.save_team(project_id, members, managers))
}

pub fn offer<S: ProjectStore, A: SevdeskApi>(
    service: &WorkflowService<S, A>,
    project_id: &str,
    choice: OfferChoice,
    handler: &dyn OutputHandler,
) -> i32 {
    let result = match choice {
        OfferChoice::Skip => service.skip_offer(project_id),
        OfferChoice::Select { id, number } => service.select_offer(project_id, &id, &number),
    };
    report(handler, result)
}

pub async fn set_offer_status<S: ProjectStore, A: SevdeskApi>(
    service: &WorkflowService<S, A>,
    project_id: &str,
    status: OfferStatus,
    handler: &dyn OutputHandler,
) -> i32 {
    report(handler, service.set_offer_status(project_id, status).await)
}

pub fn invoice<S: ProjectStore, A: SevdeskApi>(
    service: &WorkflowService<S, A>,
    project_id: &str,
    invoice_id: &str,
    invoice_number: &str,
    handler: &dyn OutputHandler,
) -> i32 {
    report(
        handler,
        service.select_invoice(project_id, invoice_id, invoice_number),
    )
}

pub fn archive<S: ProjectStore, A: SevdeskApi>(
    service: &WorkflowService<S, A>,
    project_id: &str,
    handler: &dyn OutputHandler,
) -> i32 {
    report(handler, service.archive_project(project_id))
}

/// Collects what a dispatched click or reset asks the CLI to do
struct CliActions<'a> {
    project_id: &'a str,
    sevdesk: &'a SevdeskConfig,
    hint: Option<String>,
    archive: bool,
    reset: Option<StepId>,
}

impl<'a> CliActions<'a> {
    fn new(project_id: &'a str, sevdesk: &'a SevdeskConfig) -> Self {
        Self {
            project_id,
            sevdesk,
            hint: None,
            archive: false,
            reset: None,
        }
    }
}

impl WorkflowActions for CliActions<'_> {
    fn on_manage_team(&mut self) {
        self.hint = Some(format!(
            "Save the team with: projektflow team {} --member <user> --manager <user>",
            self.project_id
        ));
    }

    fn on_navigate_to_tasks(&mut self) {
        self.hint = Some(format!(
            "Distribute the tasks of project {} in the tasks tab",
            self.project_id
        ));
    }

    fn on_select_or_create_offer(&mut self) {
        self.hint = Some(format!(
            "Link an offer with: projektflow offer {} --id <order-id> --number <number> (or --skip)",
            self.project_id
        ));
    }

    fn on_approve_offer(&mut self) {
        self.hint = Some(format!(
            "Approve the offer with: projektflow approve {}",
            self.project_id
        ));
    }

    fn on_select_or_create_invoice(&mut self) {
        self.hint = Some(format!(
            "Link an invoice with: projektflow invoice {} --id <invoice-id> --number <number>",
            self.project_id
        ));
    }

    fn on_open_invoice(&mut self, invoice_id: Option<&str>) {
        self.hint = Some(match invoice_id {
            Some(id) => self.sevdesk.invoice_url(id),
            None => "No invoice linked to this project".into(),
        });
    }

    fn on_archive_project(&mut self) {
        self.archive = true;
    }

    fn on_reset_step(&mut self, step: StepId) {
        self.reset = Some(step);
    }
}

/// Click a step: run or describe the action it is mapped to
pub async fn click<S: ProjectStore, A: SevdeskApi>(
    service: &WorkflowService<S, A>,
    sevdesk: &SevdeskConfig,
    project_id: &str,
    step_name: &str,
    handler: &dyn OutputHandler,
) -> i32 {
    let project = match service.load_project(project_id).await {
        Ok(project) => project,
        Err(e) => return report(handler, Err(e)),
    };
    let workflow = project.workflow.as_ref();

    let Some(step) = StepId::parse(step_name) else {
        handler.emit(OutputEvent::Info {
            message: format!(
                "Step '{}' is {}; nothing to do",
                step_name,
                resolve_status_by_name(workflow, step_name)
            ),
        });
        return 0;
    };

    let mut actions = CliActions::new(project_id, sevdesk);
    let Some(action) = dispatch_action(workflow, step, &mut actions) else {
        handler.emit(OutputEvent::Info {
            message: format!("Step '{}' is not available yet", step.label()),
        });
        return 0;
    };

    if actions.archive {
        return report(handler, service.archive_project(project_id));
    }

    handler.emit(OutputEvent::Action {
        step,
        action,
        message: actions.hint.unwrap_or_default(),
    });
    0
}

/// Reopen a step and disable the steps after it
pub fn reset<S: ProjectStore, A: SevdeskApi>(
    service: &WorkflowService<S, A>,
    sevdesk: &SevdeskConfig,
    project_id: &str,
    step: StepId,
    handler: &dyn OutputHandler,
) -> i32 {
    let project = match service.store().get_project(project_id) {
        Ok(project) => project,
        Err(e) => return report(handler, Err(e.into())),
    };

    let mut actions = CliActions::new(project_id, sevdesk);
    if !dispatch_reset(project.workflow.as_ref(), step, &mut actions) {
        handler.emit(OutputEvent::Info {
            message: format!("Step '{}' is not available yet", step.label()),
        });
        return 0;
    }

    match actions.reset {
        Some(step) => report(handler, service.reset_step(project_id, step)),
        None => 0,
    }
}
