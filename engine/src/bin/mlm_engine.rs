// MLM engine command line tool
//
// Usage:
//   mlm-engine --db-path data init-root --id 1 --name root
//   mlm-engine --db-path data signup --id 2 --name alice --sponsor 1 --parent 1
//   mlm-engine --db-path data sale --order 10 --buyer 2 --amount 10000.00

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use serde::Serialize;

use mlm_common::{
    amount::{parse_amount, Amount},
    ledger::{Adjustment, Direction},
    participant::{ParticipantId, Registration},
    plan::CompensationPlan,
    sale::{OrderId, SaleEvent},
    time::get_current_time_in_seconds,
};
use mlm_engine::{
    config::{EngineConfig, StorageBackend, StorageConfig},
    core::storage::{MemoryStorage, SledStorage, Storage},
    Engine,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mlm-engine")]
#[command(about = "Binary tree compensation engine: placement, commissions and ledgers")]
struct Args {
    #[command(flatten)]
    storage: StorageConfig,

    #[command(flatten)]
    engine: EngineConfig,

    /// Compensation plan JSON file, the built-in plan is used otherwise
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Log level, RUST_LOG is used when not set
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the compensation plan in use
    DumpPlan,
    /// Register a tree root
    InitRoot {
        #[arg(long)]
        id: ParticipantId,
        #[arg(long)]
        name: String,
    },
    /// Attach a new participant
    Signup {
        #[arg(long)]
        id: ParticipantId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        sponsor: ParticipantId,
        #[arg(long)]
        parent: ParticipantId,
    },
    /// Re-parent a participant
    Move {
        #[arg(long)]
        child: ParticipantId,
        #[arg(long)]
        parent: ParticipantId,
    },
    /// Approve a sale and run its commission cascade
    Sale {
        #[arg(long)]
        order: OrderId,
        #[arg(long)]
        buyer: ParticipantId,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
        #[arg(long)]
        repurchase: bool,
        #[arg(long, value_parser = parse_amount, default_value = "0")]
        points: Amount,
        /// Sale time in seconds, now by default
        #[arg(long)]
        timestamp: Option<u64>,
    },
    /// Manual credit or debit of a participant
    Adjust {
        #[arg(long)]
        participant: ParticipantId,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
        #[arg(long)]
        debit: bool,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Withdraw from a participant's wallet
    Withdraw {
        #[arg(long)]
        participant: ParticipantId,
        #[arg(long, value_parser = parse_amount)]
        amount: Amount,
    },
    /// Show a participant's rank and balances
    Show {
        #[arg(long)]
        id: ParticipantId,
    },
    /// Wallet statement with running balance
    Statement {
        #[arg(long)]
        id: ParticipantId,
    },
    /// Tree rooted at a participant
    Tree {
        #[arg(long)]
        id: ParticipantId,
        #[arg(long, default_value_t = 3)]
        depth: usize,
    },
    /// Recompute every rank bottom-up
    RecomputeRanks,
    /// Check one participant, or all of them, against the ledgers
    Reconcile {
        #[arg(long)]
        id: Option<ParticipantId>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

async fn run<S: Storage>(engine: Engine<S>, command: Command) -> Result<()> {
    let now = get_current_time_in_seconds();
    match command {
        Command::DumpPlan => print_json(engine.plan())?,
        Command::InitRoot { id, name } => {
            print_json(&engine.register_root(id, name, now).await?)?;
        }
        Command::Signup {
            id,
            name,
            sponsor,
            parent,
        } => {
            let registration = Registration {
                id,
                name,
                sponsor,
                parent,
                timestamp: now,
            };
            print_json(&engine.on_distributor_signup(registration).await?)?;
        }
        Command::Move { child, parent } => {
            print_json(&engine.on_parent_change_request(child, parent).await?)?;
        }
        Command::Sale {
            order,
            buyer,
            amount,
            repurchase,
            points,
            timestamp,
        } => {
            let sale = SaleEvent {
                order_id: order,
                buyer,
                amount,
                is_repurchase: repurchase,
                point_base: points,
                timestamp: timestamp.unwrap_or(now),
            };
            let report = engine
                .on_sale_approved(sale)
                .await
                .with_context(|| format!("Cascade of order {} failed", order))?;
            print_json(&report)?;
        }
        Command::Adjust {
            participant,
            amount,
            debit,
            note,
        } => {
            let adjustment = Adjustment {
                participant,
                amount,
                direction: if debit { Direction::Debit } else { Direction::Credit },
                note,
                timestamp: now,
            };
            print_json(&engine.manual_adjustment(adjustment).await?)?;
        }
        Command::Withdraw {
            participant,
            amount,
        } => {
            print_json(&engine.withdraw(participant, amount, now).await?)?;
        }
        Command::Show { id } => print_json(&engine.get_participant_summary(id).await?)?,
        Command::Statement { id } => print_json(&engine.get_wallet_statement(id).await?)?,
        Command::Tree { id, depth } => print_json(&engine.get_tree(id, depth).await?)?,
        Command::RecomputeRanks => print_json(&engine.recompute_all_ranks().await?)?,
        Command::Reconcile { id: Some(id) } => print_json(&engine.reconcile(id).await?)?,
        Command::Reconcile { id: None } => print_json(&engine.audit_all().await?)?,
    }

    engine.flush().await.context("Failed to flush storage")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = args.log_level {
        logger.parse_filters(level.as_filter());
    }
    logger.init();

    let plan = match args.plan.as_ref() {
        Some(path) => CompensationPlan::load_from_file(path)
            .with_context(|| format!("Failed to load plan from {}", path.display()))?,
        None => CompensationPlan::default(),
    };
    debug!("using storage backend {:?}", args.storage.backend);

    match args.storage.backend {
        StorageBackend::Memory => {
            info!("memory backend selected, nothing will be persisted");
            let engine = Engine::new(MemoryStorage::in_memory(), plan, args.engine)?;
            run(engine, args.command).await
        }
        StorageBackend::Sled => {
            let storage = SledStorage::open(&args.storage)
                .with_context(|| format!("Failed to open {}", args.storage.db_path.display()))?;
            let engine = Engine::new(storage, plan, args.engine)?;
            run(engine, args.command).await
        }
    }
}
