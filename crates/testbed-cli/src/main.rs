use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use testbed_core::config::QueueConfig;
use testbed_core::domain::{Task, TaskType};
use testbed_core::impls::FjallStore;
use testbed_core::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};
use testbed_core::queue::{PersistentQueue, StateLabel, TaskQueue};
use testbed_core::worker::{StopWhen, TaskHandler, WorkerGroup};

#[derive(Debug, Parser)]
#[command(name = "testbed", about = "Enqueue and drain build/run tasks")]
struct Cli {
    /// JSON config file (see QueueConfig)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides store.data_dir
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Overrides priority
    #[arg(long, global = true)]
    priority: Option<u8>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Schedule a task
    Push {
        #[arg(long = "type", value_enum)]
        task_type: Kind,
        #[arg(long)]
        plan: String,
        #[arg(long)]
        case: String,
        /// Opaque JSON payload handed to the runner
        #[arg(long)]
        input: Option<String>,
        /// Schedule this many identical tasks
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Show the scheduled backlog in recovery order
    List,
    /// Claim scheduled tasks until the queue is empty
    Drain {
        #[arg(long)]
        workers: Option<usize>,
        /// Keep polling for new tasks until Ctrl-C
        #[arg(long)]
        follow: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Build,
    Run,
}

impl From<Kind> for TaskType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Build => TaskType::Build,
            Kind::Run => TaskType::Run,
        }
    }
}

/// Stands in for runner dispatch: logs what it claimed.
struct LogHandler;

#[async_trait]
impl TaskHandler<Task> for LogHandler {
    async fn handle(&self, worker_id: usize, task: Task) -> Result<(), String> {
        tracing::info!(
            worker_id,
            task_id = %task.id,
            task_type = %task.task_type,
            plan = %task.plan,
            case = %task.case,
            "claimed task"
        );
        Ok(())
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<QueueConfig> {
    let mut config = match &cli.config {
        Some(path) => QueueConfig::load(path)?,
        None => QueueConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.store.data_dir = dir.clone();
    }
    if let Some(priority) = cli.priority {
        config.priority = priority;
    }
    if let Command::Drain {
        workers: Some(n), ..
    } = cli.command
    {
        config.worker.workers = n;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let store = Arc::new(FjallStore::open(&config.store).with_context(|| {
        format!("failed to open store at {}", config.store.data_dir.display())
    })?);
    let queue = Arc::new(
        PersistentQueue::<Task>::with_json(store.clone(), config.priority)
            .context("failed to recover queue")?,
    );

    match cli.command {
        Command::Push {
            task_type,
            plan,
            case,
            input,
            count,
        } => {
            let input = match input {
                Some(raw) => serde_json::from_str(&raw).context("--input is not valid JSON")?,
                None => serde_json::Value::Null,
            };
            let clock = SystemClock;
            let ids = UlidGenerator::new(clock);
            for _ in 0..count {
                let task = Task::new(
                    ids.generate_task_id(),
                    task_type.into(),
                    plan.as_str(),
                    case.as_str(),
                    clock.now(),
                    input.clone(),
                );
                queue.push(&task)?;
                println!("{}", task.id);
            }
            tracing::info!(backlog = queue.len(), "scheduled {count} task(s)");
        }
        Command::List => {
            let stats = queue.stats()?;
            println!(
                "priority={} indexed={} scheduled_records={}",
                stats.priority, stats.indexed, stats.scheduled_records
            );
            for (id, task) in queue.records().scan(StateLabel::Scheduled)? {
                println!(
                    "{id}\t{}\t{}:{}\t{}",
                    task.task_type,
                    task.plan,
                    task.case,
                    task.created.to_rfc3339()
                );
            }
        }
        Command::Drain { follow, .. } => {
            let stop = if follow {
                StopWhen::Shutdown
            } else {
                StopWhen::Empty
            };
            let group = WorkerGroup::spawn(
                &config.worker,
                vec![queue.clone() as Arc<dyn TaskQueue<Task>>],
                Arc::new(LogHandler),
                stop,
            );

            let summary = if follow {
                tokio::signal::ctrl_c().await?;
                tracing::info!("shutting down workers");
                group.shutdown_and_join().await
            } else {
                group.join().await
            };
            tracing::info!(
                claimed = summary.claimed,
                failed = summary.failed,
                pop_errors = summary.pop_errors,
                remaining = queue.len(),
                "drain finished"
            );
        }
    }

    store.persist()?;
    Ok(())
}
