//! dayleader - run daily leader assignment against a local event ledger.
//!
//! Every command prints pretty JSON on stdout. Assignment failures are
//! printed as a structured `Failure` and the process exits non-zero.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dayleader_core::assignment::{AllocationOptions, AssignmentStatistics};
use dayleader_core::config::Config;
use dayleader_core::models::{AssignmentPolicy, Event, EventId, Roster, UserId};
use dayleader_core::store::{EventSeed, FileLedger};
use dayleader_core::{AssignmentError, Failure, LeaderService};

// ============================================================================
// Constants
// ============================================================================

/// Log file name prefix inside the configured log directory
const LOG_FILE_PREFIX: &str = "dayleader.log";

/// Exit code for rejected assignment operations
const EXIT_REJECTED: u8 = 2;

/// Initialize the tracing subscriber for logging.
///
/// Logs always go to stderr. When a log directory is configured a daily
/// rolling file is added; the returned guard must live until exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "dayleader")]
#[command(about = "Daily leader assignment for multi-day reading events")]
#[command(after_help = "Logging: RUST_LOG sets the level; DAYLEADER_LOG_DIR adds a daily log file.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write the current configuration to the config file
    InitConfig,

    /// Import an event and its roster from a JSON seed file
    Init {
        /// Path to the event seed
        path: PathBuf,
    },

    /// Create the event's day slots
    Materialize { event_id: EventId },

    /// Fill open slots under an assignment policy
    Assign {
        event_id: EventId,
        /// random, balanced, rotation or voluntary
        policy: String,
        /// Leadership cap per participant, overriding the event's own
        #[arg(long)]
        max: Option<u32>,
        /// Re-decide every slot instead of keeping existing leaders
        #[arg(long)]
        reset: bool,
        /// Seed for reproducible random allocation
        #[arg(long)]
        seed: Option<u64>,
        /// Owner-curated volunteer for one day (voluntary policy)
        #[arg(long = "volunteer", value_name = "DAY=USER", value_parser = parse_volunteer)]
        volunteers: Vec<(u32, UserId)>,
    },

    /// Take an empty slot as its leader
    Claim {
        event_id: EventId,
        user_id: UserId,
        day: u32,
    },

    /// Owner replaces a slot's leader
    Reassign {
        event_id: EventId,
        actor: UserId,
        day: u32,
        user_id: UserId,
    },

    /// Owner fills a slot that needs backup
    Backup {
        event_id: EventId,
        actor: UserId,
        day: u32,
        user_id: UserId,
    },

    /// Owner clears a slot's leader
    Unassign {
        event_id: EventId,
        actor: UserId,
        day: u32,
    },

    /// Record published material for a day
    Content { event_id: EventId, day: u32 },

    /// Record reader engagement for a day
    Engagement { event_id: EventId, day: u32 },

    /// Coverage and workload statistics
    Stats { event_id: EventId },

    /// Slots that need a substitute leader, most urgent first
    Backups { event_id: EventId },

    /// Capability flags for an actor, optionally on one day
    Perms {
        event_id: EventId,
        actor: UserId,
        day: Option<u32>,
    },

    /// Days a user currently leads
    History { event_id: EventId, user_id: UserId },

    /// Claim one slot concurrently for several users
    Race {
        event_id: EventId,
        day: u32,
        #[arg(required = true, num_args = 1..)]
        users: Vec<UserId>,
    },
}

/// Parse `DAY=USER`.
fn parse_volunteer(raw: &str) -> Result<(u32, UserId), String> {
    let (day, user) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected DAY=USER, got '{}'", raw))?;
    let day = day
        .trim()
        .parse()
        .map_err(|e| format!("invalid day in '{}': {}", raw, e))?;
    let user = user
        .trim()
        .parse()
        .map_err(|e| format!("invalid user in '{}': {}", raw, e))?;
    Ok((day, user))
}

/// Resolve the `assign` arguments. An unknown policy is an assignment
/// failure rather than a usage error.
fn allocation_request(
    policy: &str,
    max: Option<u32>,
    reset: bool,
    volunteers: &[(u32, UserId)],
) -> Result<(AssignmentPolicy, AllocationOptions), AssignmentError> {
    let policy = AssignmentPolicy::from_str(policy)?;
    let options = AllocationOptions {
        max_leadership_count: max,
        volunteer_assignments: volunteers.iter().copied().collect(),
        reset,
    };
    Ok((policy, options))
}

// ============================================================================
// Execution
// ============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct ImportSummary {
    event: Event,
    reading_days: usize,
    participants: usize,
    eligible_participants: usize,
    saved_at: String,
}

#[derive(Serialize)]
struct StatsReport {
    #[serde(flatten)]
    statistics: AssignmentStatistics,
    workload_spread: usize,
}

#[derive(Serialize)]
struct SignalRecorded {
    event_id: EventId,
    day_number: u32,
    signal: &'static str,
}

#[derive(Serialize)]
struct RaceEntry {
    user_id: UserId,
    won: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<Failure>,
}

/// Claim one slot for every user at once. Each claim runs on its own
/// blocking task against the shared service.
async fn race(
    service: Arc<LeaderService<FileLedger>>,
    event_id: EventId,
    day: u32,
    users: Vec<UserId>,
) -> Result<Vec<RaceEntry>> {
    let handles: Vec<_> = users
        .iter()
        .map(|&user_id| {
            let service = Arc::clone(&service);
            tokio::task::spawn_blocking(move || (user_id, service.claim(event_id, user_id, day)))
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let mut entries = Vec::with_capacity(results.len());
    for joined in results {
        let (user_id, outcome) = joined.context("Claim task panicked")?;
        entries.push(match outcome {
            Ok(_) => RaceEntry {
                user_id,
                won: true,
                failure: None,
            },
            Err(e) => RaceEntry {
                user_id,
                won: false,
                failure: Some(e.to_failure()),
            },
        });
    }
    let winners = entries.iter().filter(|e| e.won).count();
    info!(event_id, day, contenders = entries.len(), winners, "Claim race finished");
    Ok(entries)
}

fn import(service: &LeaderService<FileLedger>, path: &Path, config: &Config) -> Result<ImportSummary> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file: {}", path.display()))?;
    let seed: EventSeed = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse event file: {}", path.display()))?;

    let roster = Roster::new(seed.participants.clone());
    let event = service
        .store()
        .import(seed, config.defaults)
        .map_err(AssignmentError::from)?;
    let saved_at = service
        .store()
        .saved_at(event.id)
        .map_err(AssignmentError::from)?;

    Ok(ImportSummary {
        reading_days: event.reading_day_count(),
        participants: roster.all().len(),
        eligible_participants: roster.eligible_count(),
        saved_at: saved_at.to_rfc3339(),
        event,
    })
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    let service = Arc::new(LeaderService::new(FileLedger::new(config.data_dir()?)?));
    debug!(?command, "Running command");

    match command {
        Commands::InitConfig => {
            config.save()?;
            print_json(config)?;
        }
        Commands::Init { path } => print_json(&import(&service, &path, config)?)?,
        Commands::Materialize { event_id } => print_json(&service.materialize(event_id)?)?,
        Commands::Assign {
            event_id,
            policy,
            max,
            reset,
            seed,
            volunteers,
        } => {
            let (policy, options) = allocation_request(&policy, max, reset, &volunteers)?;
            let result = match seed {
                Some(seed) => service.auto_assign_with_rng(
                    event_id,
                    policy,
                    &options,
                    &mut StdRng::seed_from_u64(seed),
                )?,
                None => service.auto_assign(event_id, policy, &options)?,
            };
            print_json(&result)?;
        }
        Commands::Claim {
            event_id,
            user_id,
            day,
        } => print_json(&service.claim(event_id, user_id, day)?)?,
        Commands::Reassign {
            event_id,
            actor,
            day,
            user_id,
        } => print_json(&service.reassign(event_id, actor, day, user_id)?)?,
        Commands::Backup {
            event_id,
            actor,
            day,
            user_id,
        } => print_json(&service.backup_assign(event_id, actor, day, user_id)?)?,
        Commands::Unassign {
            event_id,
            actor,
            day,
        } => print_json(&service.unassign(event_id, actor, day)?)?,
        Commands::Content { event_id, day } => {
            service
                .store()
                .record_content(event_id, day)
                .map_err(AssignmentError::from)?;
            print_json(&SignalRecorded {
                event_id,
                day_number: day,
                signal: "content",
            })?;
        }
        Commands::Engagement { event_id, day } => {
            service
                .store()
                .record_engagement(event_id, day)
                .map_err(AssignmentError::from)?;
            print_json(&SignalRecorded {
                event_id,
                day_number: day,
                signal: "engagement",
            })?;
        }
        Commands::Stats { event_id } => {
            let statistics = service.statistics(event_id)?;
            print_json(&StatsReport {
                workload_spread: statistics.workload_spread(),
                statistics,
            })?;
        }
        Commands::Backups { event_id } => print_json(&service.backup_needed(event_id)?)?,
        Commands::Perms {
            event_id,
            actor,
            day,
        } => print_json(&service.check_permissions(event_id, actor, day)?)?,
        Commands::History { event_id, user_id } => {
            print_json(&service.leader_history(event_id, user_id)?)?
        }
        Commands::Race {
            event_id,
            day,
            users,
        } => print_json(&race(service, event_id, day, users).await?)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    let _guard = init_tracing(config.log_dir.as_deref());

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<AssignmentError>() {
            Some(failure) => {
                match serde_json::to_string_pretty(&failure.to_failure()) {
                    Ok(json) => println!("{}", json),
                    Err(_) => eprintln!("Error: {}", failure),
                }
                ExitCode::from(EXIT_REJECTED)
            }
            None => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}
