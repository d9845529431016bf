//! `fleetdesk-access`: check, request and watch module access from a terminal.
//!
//! Drives one access workflow against the FleetDesk backend configured by the
//! `FLEETDESK_*` environment variables (a `.env` file is read if present).

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use fleetdesk_access::workflow::{
    AccessPhase, AccessWorkflowStore, NoticeLevel, WorkflowAction, WorkflowEnvironment,
    WorkflowState, workflow_store,
};
use fleetdesk_access::{AccessConfig, HttpAccessRequestClient, RequestType, SessionContext};
use fleetdesk_core::environment::SystemClock;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type ConsoleStore = AccessWorkflowStore<HttpAccessRequestClient, SystemClock>;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Time-limited edit/delete access for FleetDesk modules
#[derive(Parser)]
#[command(name = "fleetdesk-access", version, about)]
struct Cli {
    /// Protected module, e.g. "Items" or "Service Invoice"
    #[arg(long, global = true, default_value = "Items")]
    module: String,

    /// Scope the workflow to one record (invoice number, policy number, ...)
    #[arg(long, global = true)]
    reference: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show current access, pending requests and countdown
    Status,

    /// Ask for edit or delete access
    Request {
        /// `edit` or `delete`
        #[arg(long = "type")]
        request_type: RequestType,

        /// Why access is needed
        #[arg(long)]
        remarks: String,
    },

    /// Follow the countdown until access expires (Ctrl-C to stop)
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetdesk_access=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AccessConfig::from_env().context("invalid FLEETDESK_* configuration")?;
    let session = SessionContext::load(&config.session_file)
        .with_context(|| format!("cannot read {}", config.session_file.display()))?;
    if session.is_none() {
        tracing::warn!(
            path = %config.session_file.display(),
            "No session file; sign in to FleetDesk first"
        );
    }

    let client = HttpAccessRequestClient::from_config(&config)?;
    let env = WorkflowEnvironment::from_config(client, SystemClock, session, &config);
    let store = workflow_store(cli.module.clone(), cli.reference.clone(), env);

    // Listing can take up to the request timeout; leave room for decoding.
    let settle = config.request_timeout + Duration::from_secs(1);

    let outcome = match cli.command {
        Command::Status => status(&store, settle).await,
        Command::Request {
            request_type,
            remarks,
        } => request(&store, request_type, remarks, settle).await,
        Command::Watch => watch(&store, config.tick_interval, settle).await,
    };

    store.send(WorkflowAction::Unmount).await?;
    store.shutdown(SHUTDOWN_TIMEOUT).await?;

    outcome
}

async fn status(store: &ConsoleStore, settle: Duration) -> anyhow::Result<()> {
    mount(store, settle).await?;
    let state = store.state(Clone::clone).await;
    print_state(&state);
    Ok(())
}

async fn request(
    store: &ConsoleStore,
    request_type: RequestType,
    remarks: String,
    settle: Duration,
) -> anyhow::Result<()> {
    mount(store, settle).await?;

    store
        .send(WorkflowAction::OpenRequestForm {
            request_type: Some(request_type),
        })
        .await?;
    if store.state(|s| s.form.is_none()).await {
        let state = store.state(Clone::clone).await;
        print_notices(&state);
        bail!("{request_type} request not opened");
    }

    store.send(WorkflowAction::EditRemarks(remarks)).await?;
    store.send(WorkflowAction::SubmitRequest).await?;

    wait_until(store, settle * 2, |s| {
        !s.is_submitting() && s.phase != AccessPhase::Evaluating
    })
    .await?;

    let state = store.state(Clone::clone).await;
    print_notices(&state);
    if let Some(error) = state.form.as_ref().and_then(|f| f.error.as_ref()) {
        bail!("{error}");
    }
    print_state(&state);
    Ok(())
}

async fn watch(store: &ConsoleStore, tick: Duration, settle: Duration) -> anyhow::Result<()> {
    mount(store, settle).await?;

    let state = store.state(Clone::clone).await;
    print_state(&state);
    if state.countdown.is_none() {
        println!("Nothing to watch: no active grant for {}", state.module);
        return Ok(());
    }

    let mut interval = tokio::time::interval(tick);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                tracing::info!("Interrupted");
                return Ok(());
            }
            _ = interval.tick() => {
                let (countdown, phase) = store
                    .state(|s| (s.countdown_display(), s.phase))
                    .await;
                match countdown {
                    Some(remaining) => println!("{} {remaining}", phase_label(phase)),
                    None => {
                        let state = store.state(Clone::clone).await;
                        print_notices(&state);
                        print_state(&state);
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Mount the workflow and wait for the first evaluation.
async fn mount(store: &ConsoleStore, settle: Duration) -> anyhow::Result<()> {
    store.send(WorkflowAction::Mount).await?;
    wait_until(store, settle, |s| s.phase != AccessPhase::Evaluating).await
}

async fn wait_until<F>(store: &ConsoleStore, timeout: Duration, predicate: F) -> anyhow::Result<()>
where
    F: Fn(&WorkflowState) -> bool,
{
    tokio::time::timeout(timeout, async {
        while !store.state(|s| predicate(s)).await {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .context("backend did not answer in time")
}

const fn phase_label(phase: AccessPhase) -> &'static str {
    match phase {
        AccessPhase::Idle => "idle",
        AccessPhase::Evaluating => "checking",
        AccessPhase::Granted(RequestType::Edit) => "edit access",
        AccessPhase::Granted(RequestType::Delete) => "delete access",
        AccessPhase::Pending(RequestType::Edit) => "edit request pending",
        AccessPhase::Pending(RequestType::Delete) => "delete request pending",
        AccessPhase::Unauthorized => "no access",
    }
}

fn print_state(state: &WorkflowState) {
    let scope = match &state.reference_id {
        Some(reference) => format!("{} ({reference})", state.module),
        None => state.module.clone(),
    };
    println!("{scope}: {}", phase_label(state.phase));
    println!(
        "  edit: {}  delete: {}",
        yes_no(state.can_edit()),
        yes_no(state.can_delete())
    );
    if let Some(remaining) = state.countdown_display() {
        println!("  expires in {remaining}");
    }
    if state.session_expired {
        println!("  session expired: sign in again");
    }
}

fn print_notices(state: &WorkflowState) {
    for notice in &state.notices {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        println!("[{tag}] {}", notice.message);
    }
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
