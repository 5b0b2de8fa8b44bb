//! Workflow step types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the seven fixed workflow stages, in workflow order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepId {
    TeamInvited,
    DistributeTasks,
    OfferCreated,
    OfferApproved,
    InvoiceCreated,
    InvoicePaid,
    ProjectArchived,
}

impl StepId {
    /// All steps in workflow order
    pub const ALL: [StepId; 7] = [
        StepId::TeamInvited,
        StepId::DistributeTasks,
        StepId::OfferCreated,
        StepId::OfferApproved,
        StepId::InvoiceCreated,
        StepId::InvoicePaid,
        StepId::ProjectArchived,
    ];

    /// Position in the workflow order
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name, as stored in the project document
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::TeamInvited => "teamInvited",
            StepId::DistributeTasks => "distributeTasks",
            StepId::OfferCreated => "offerCreated",
            StepId::OfferApproved => "offerApproved",
            StepId::InvoiceCreated => "invoiceCreated",
            StepId::InvoicePaid => "invoicePaid",
            StepId::ProjectArchived => "projectArchived",
        }
    }

    /// Label shown in the step list
    pub fn label(self) -> &'static str {
        match self {
            StepId::TeamInvited => "Team einladen",
            StepId::DistributeTasks => "Aufgaben verteilen",
            StepId::OfferCreated => "Angebot erstellen",
            StepId::OfferApproved => "Angebot freigeben",
            StepId::InvoiceCreated => "Rechnung erstellen",
            StepId::InvoicePaid => "Rechnung bezahlt",
            StepId::ProjectArchived => "Projekt archivieren",
        }
    }

    /// Look up a step by its wire name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.as_str() == name)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            let known: Vec<_> = Self::ALL.iter().map(|s| s.as_str()).collect();
            format!("unknown step '{}' (expected one of: {})", s, known.join(", "))
        })
    }
}

/// Stored or resolved status of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Current,
    Completed,
    Disabled,
    Skipped,
}

impl StepStatus {
    /// Completed and skipped steps keep their stored status when resolved
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Skipped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Current => "current",
            StepStatus::Completed => "completed",
            StepStatus::Disabled => "disabled",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval state of the linked sevDesk order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Open,
    Approved,
}

/// Payment state of the linked sevDesk invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Open,
    Paid,
}

/// Persisted state of a single step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_status: Option<OfferStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_status: Option<InvoiceStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowStep {
    pub fn new(status: StepStatus) -> Self {
        Self {
            status,
            offer_id: None,
            offer_number: None,
            offer_status: None,
            invoice_id: None,
            invoice_number: None,
            invoice_status: None,
            completed_at: None,
        }
    }

    /// A completed step stamped with the current time
    pub fn completed_now() -> Self {
        Self::new(StepStatus::Completed).with_completed_at(Utc::now())
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn with_offer(mut self, id: impl Into<String>, number: impl Into<String>) -> Self {
        self.offer_id = Some(id.into());
        self.offer_number = Some(number.into());
        self
    }

    pub fn with_offer_status(mut self, status: OfferStatus) -> Self {
        self.offer_status = Some(status);
        self
    }

    pub fn with_invoice(mut self, id: impl Into<String>, number: impl Into<String>) -> Self {
        self.invoice_id = Some(id.into());
        self.invoice_number = Some(number.into());
        self
    }

    pub fn with_invoice_status(mut self, status: InvoiceStatus) -> Self {
        self.invoice_status = Some(status);
        self
    }
}

/// Partial workflow: only the steps present are written
pub type WorkflowUpdate = BTreeMap<StepId, WorkflowStep>;

/// Workflow record owned by a project
///
/// Any step may be missing; the resolver treats a missing step the same as
/// one whose prerequisites decide its status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectWorkflow {
    steps: BTreeMap<StepId, WorkflowStep>,
}

impl ProjectWorkflow {
    /// Fresh workflow for a project that has none yet
    pub fn initial() -> Self {
        let steps = StepId::ALL
            .into_iter()
            .map(|step| {
                let status = if step == StepId::TeamInvited {
                    StepStatus::Current
                } else {
                    StepStatus::Disabled
                };
                (step, WorkflowStep::new(status))
            })
            .collect();
        Self { steps }
    }

    pub fn get(&self, step: StepId) -> Option<&WorkflowStep> {
        self.steps.get(&step)
    }

    /// Stored status of a step, if the step is present
    pub fn stored_status(&self, step: StepId) -> Option<StepStatus> {
        self.steps.get(&step).map(|s| s.status)
    }

    /// True when the step is stored with exactly this status
    pub fn has_status(&self, step: StepId, status: StepStatus) -> bool {
        self.stored_status(step) == Some(status)
    }

    #[cfg(test)]
    pub fn set(&mut self, step: StepId, state: WorkflowStep) {
        self.steps.insert(step, state);
    }

    /// Replace every step present in the update
    pub fn merge(&mut self, update: WorkflowUpdate) {
        self.steps.extend(update);
    }

    /// Copy of this workflow with the update applied
    pub fn merged(&self, update: WorkflowUpdate) -> Self {
        let mut merged = self.clone();
        merged.merge(update);
        merged
    }
}

impl From<WorkflowUpdate> for ProjectWorkflow {
    fn from(steps: WorkflowUpdate) -> Self {
        Self { steps }
    }
}
