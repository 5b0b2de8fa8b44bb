mod cli;
mod config;
mod logging;
mod sevdesk;
mod store;
mod workflow;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::{OfferChoice, OutputMode, commands};
use std::path::PathBuf;
use store::SqliteStore;
use workflow::{OfferStatus, StepId, WorkflowService};

#[derive(Parser)]
#[command(name = "projektflow")]
#[command(about = "Track projects from team invite to paid invoice, backed by sevDesk")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Working directory for project-level config (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputMode::Console)]
    output: OutputMode,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project with a fresh workflow
    Create {
        /// Project id
        id: String,
        /// Project name
        name: String,
    },

    /// List projects and the step each is waiting on
    List,

    /// Show a project's workflow (checks sevDesk for offer/invoice updates)
    Show { id: String },

    /// Save the project team
    Team {
        id: String,

        /// Involved user id (repeatable)
        #[arg(long = "member")]
        members: Vec<String>,

        /// Project manager user id (repeatable)
        #[arg(long = "manager")]
        managers: Vec<String>,
    },

    /// Link an offer, or continue without one
    Offer {
        id: String,

        /// Continue without an offer
        #[arg(long, conflicts_with_all = ["offer_id", "number"])]
        skip: bool,

        /// sevDesk order id
        #[arg(long = "id", required_unless_present = "skip", requires = "number")]
        offer_id: Option<String>,

        /// Offer number
        #[arg(long)]
        number: Option<String>,
    },

    /// Approve the linked offer (sets the sevDesk order to accepted)
    Approve { id: String },

    /// Reopen the linked offer (sets the sevDesk order back to open)
    ReopenOffer { id: String },

    /// Link an invoice
    Invoice {
        id: String,

        /// sevDesk invoice id
        #[arg(long = "id")]
        invoice_id: String,

        /// Invoice number
        #[arg(long)]
        number: String,
    },

    /// Archive the project
    Archive { id: String },

    /// Reopen a step; later steps are disabled again
    Reset { id: String, step: StepId },

    /// Click a step and run its action
    Click { id: String, step: String },

    /// Check sevDesk for accepted offers and paid invoices
    Reconcile { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_guard = logging::init_logging(cli.debug, cli.quiet, cli.log_file.clone())?;

    let config = config::ProjektflowConfig::load(cli.dir.as_deref())?;
    let store_path = config.store_path()?;
    let store = SqliteStore::open(&store_path)
        .with_context(|| format!("opening project store {}", store_path.display()))?;
    let api = sevdesk::create_client(&config.sevdesk).context("creating sevDesk client")?;
    let service = WorkflowService::new(store, api);

    let mode = if cli.quiet { OutputMode::Quiet } else { cli.output };
    let handler = cli::create_handler(mode);
    let handler = handler.as_ref();

    let code = match cli.command {
        Commands::Create { id, name } => commands::create(&service, &id, &name, handler),
        Commands::List => commands::list(&service, handler),
        Commands::Show { id } | Commands::Reconcile { id } => {
            commands::show(&service, &id, handler).await
        }
        Commands::Team {
            id,
            members,
            managers,
        } => commands::save_team(&service, &id, members, managers, handler),
        Commands::Offer {
            id,
            skip,
            offer_id,
            number,
        } => {
            let choice = match (skip, offer_id, number) {
                (true, _, _) => OfferChoice::Skip,
                (false, Some(id), Some(number)) => OfferChoice::Select { id, number },
                _ => anyhow::bail!("either --skip or --id with --number is required"),
            };
            commands::offer(&service, &id, choice, handler)
        }
        Commands::Approve { id } => {
            commands::set_offer_status(&service, &id, OfferStatus::Approved, handler).await
        }
        Commands::ReopenOffer { id } => {
            commands::set_offer_status(&service, &id, OfferStatus::Open, handler).await
        }
        Commands::Invoice {
            id,
            invoice_id,
            number,
        } => commands::invoice(&service, &id, &invoice_id, &number, handler),
        Commands::Archive { id } => commands::archive(&service, &id, handler),
        Commands::Reset { id, step } => {
            commands::reset(&service, &config.sevdesk, &id, step, handler)
        }
        Commands::Click { id, step } => {
            commands::click(&service, &config.sevdesk, &id, &step, handler).await
        }
    };

    if code != 0 {
        drop(log_guard);
        std::process::exit(code);
    }

    Ok(())
}
