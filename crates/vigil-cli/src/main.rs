mod display;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use vigil_core::{Bucket, Clock, Selection, SystemClock, project};
use vigil_sync::config::DEFAULT_API_URL;
use vigil_sync::{ClientConfig, HttpVisitApi, Orchestrator, ReconciliationStore};

#[derive(Parser)]
#[command(name = "vigil", version, about = "Visit-monitoring board")]
struct Cli {
    /// Collection endpoint of the visit API.
    #[arg(long, env = "VIGIL_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Deadline for each request, in milliseconds.
    #[arg(long, env = "VIGIL_TIMEOUT_MS", default_value_t = 10_000, global = true)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show overdue, urgent and scheduled records.
    Board {
        /// Name fragment, or digits of an identity code.
        #[arg(short, long, default_value = "")]
        query: String,
    },
    /// Register a visit for one or more records.
    Ack {
        ids: Vec<u64>,

        /// Also select every record in this column.
        #[arg(long, value_enum)]
        bucket: Option<BucketArg>,

        /// Narrow --bucket to records matching this query.
        #[arg(short, long, default_value = "")]
        query: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BucketArg {
    Overdue,
    Urgent,
    Scheduled,
}

impl From<BucketArg> for Bucket {
    fn from(arg: BucketArg) -> Self {
        match arg {
            BucketArg::Overdue => Bucket::Overdue,
            BucketArg::Urgent => Bucket::Urgent,
            BucketArg::Scheduled => Bucket::Scheduled,
        }
    }
}

type HttpOrchestrator = Orchestrator<HttpVisitApi, SystemClock>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("vigil v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::new(cli.api_url, Duration::from_millis(cli.timeout_ms));
    let api = HttpVisitApi::new(&config).context("building HTTP client")?;
    let orch = Orchestrator::new(
        api,
        Arc::new(ReconciliationStore::new()),
        SystemClock,
        config.timeout,
    );

    match cli.command {
        Command::Board { query } => board(&orch, &query).await,
        Command::Ack { ids, bucket, query } => ack(&orch, ids, bucket.map(Bucket::from), &query).await,
    }
}

async fn board(orch: &HttpOrchestrator, query: &str) -> anyhow::Result<()> {
    orch.refresh().await.context("loading monitored records")?;
    let view = orch.store().effective();
    let columns = project(&view, query);
    print!("{}", display::render_board(&columns, query, SystemClock.now()));
    Ok(())
}

async fn ack(
    orch: &HttpOrchestrator,
    ids: Vec<u64>,
    bucket: Option<Bucket>,
    query: &str,
) -> anyhow::Result<()> {
    orch.refresh().await.context("loading monitored records")?;
    let view = orch.store().effective();

    let mut selection = Selection::new();
    selection.enter(None);
    selection.select_all(ids);
    if let Some(bucket) = bucket {
        let columns = project(&view, query);
        selection.select_all(columns.get(bucket).iter().map(|r| r.id()));
    }
    if selection.count() == 0 {
        bail!("nothing selected: pass record ids or --bucket");
    }

    let named = selection.selected_records(&view);
    let ids = selection.ids();
    if let &[id] = ids.as_slice() {
        orch.acknowledge(id).await.map_err(|err| {
            anyhow::anyhow!("visit for #{id} not registered: {}", err.user_message())
        })?;
        let name = named
            .first()
            .map_or_else(|| format!("#{id}"), |r| r.name().to_string());
        println!("Visit registered for {name}");
        return Ok(());
    }

    let outcome = orch.acknowledge_batch(&ids).await;
    print!("{}", display::render_batch(&outcome, &named));
    selection.exit();
    if !outcome.all_succeeded() {
        bail!("{} of {} visits were not registered", outcome.failed.len(), ids.len());
    }
    Ok(())
}
