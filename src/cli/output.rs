//! Output handlers for CLI commands
//!
//! Supports console (pretty), JSON, and quiet output modes.

use crate::workflow::{StepAction, StepId, StepStatus, StepView};
use serde::Serialize;

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

/// One line of the project list
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    /// First step that is waiting for action, if any
    pub current_step: Option<StepId>,
}

/// Events emitted by commands
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    Workflow {
        project_id: String,
        name: String,
        project_status: String,
        steps: Vec<StepView>,
    },
    Projects {
        projects: Vec<ProjectSummary>,
    },
    Action {
        step: StepId,
        action: StepAction,
        message: String,
    },
    Info {
        message: String,
    },
    Error {
        error: String,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    fn emit(&self, event: OutputEvent);
}

/// Human-readable output
pub struct ConsoleHandler;

impl ConsoleHandler {
    fn marker(status: StepStatus) -> &'static str {
        match status {
            StepStatus::Completed => "✓",
            StepStatus::Current => "▶",
            StepStatus::Pending => "○",
            StepStatus::Skipped => "–",
            StepStatus::Disabled => "·",
        }
    }

    fn action_label(action: StepAction) -> &'static str {
        match action {
            StepAction::ManageTeam => "manage team",
            StepAction::NavigateToTasks => "open tasks",
            StepAction::SelectOrCreateOffer => "select or create offer",
            StepAction::ApproveOffer => "approve offer",
            StepAction::SelectOrCreateInvoice => "select or create invoice",
            StepAction::OpenInvoice => "open invoice",
            StepAction::ArchiveProject => "archive project",
        }
    }

    fn format_step(view: &StepView) -> String {
        let mut line = format!(
            "  {} {:<22} {}",
            Self::marker(view.status),
            view.label,
            view.status
        );
        if let Some(ref number) = view.offer_number {
            line.push_str(&format!("  [{}]", number));
        }
        if let Some(ref number) = view.invoice_number {
            line.push_str(&format!("  [{}]", number));
        }
        if let Some(at) = view.completed_at {
            line.push_str(&format!("  {}", at.format("%d.%m.%Y")));
        }
        line
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::Workflow {
                project_id,
                name,
                project_status,
                steps,
            } => {
                println!("{} ({}) - {}", name, project_id, project_status);
                for view in &steps {
                    println!("{}", Self::format_step(view));
                }
            }
            OutputEvent::Projects { projects } => {
                if projects.is_empty() {
                    println!("(no projects)");
                }
                for p in projects {
                    let step = p.current_step.map(|s| s.label()).unwrap_or("-");
                    println!("{:<16} {:<30} {:<10} {}", p.id, p.name, p.status, step);
                }
            }
            OutputEvent::Action {
                step,
                action,
                message,
            } => {
                println!("{} → {}", step.label(), Self::action_label(action));
                if !message.is_empty() {
                    println!("  {}", message);
                }
            }
            OutputEvent::Info { message } => {
                println!("{}", message);
            }
            OutputEvent::Error { error } => {
                eprintln!("Error: {}", error);
            }
        }
    }
}

/// JSON output handler, one document per event
pub struct JsonHandler {
    pretty: bool,
}

impl JsonHandler {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        let json = if self.pretty {
            serde_json::to_string_pretty(&event)
        } else {
            serde_json::to_string(&event)
        };

        if let Ok(s) = json {
            println!("{}", s);
        }
    }
}

/// Quiet handler that only reports errors
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, event: OutputEvent) {
        if let OutputEvent::Error { error } = event {
            eprintln!("Error: {}", error);
        }
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler),
        OutputMode::Json => Box::new(JsonHandler::new(true)),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}
