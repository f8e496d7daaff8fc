//! Conclave CLI: review reports over a SQLite database.
//!
//! Usage:
//!   conclave [--db path] [--config file] import <snapshot.json>
//!   conclave [--db path] scores | rough-scores | coverage | batch-stats | progress | summary
//!   conclave [--db path] next --email <email> --voter <id>
//!   conclave [--db path] auto-group [--topics N] [--threshold T]
//!   conclave [--db path] export-votes <path>

use clap::{Parser, Subcommand};
use conclave::storage::VoteStore;
use conclave::{EngineConfig, OpenStore, ReviewEngine, Snapshot, SqliteStore, VoterId};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "conclave",
    version,
    about = "Review allocation and consensus aggregation for crowd-reviewed proposals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to SQLite database file
    #[arg(long, global = true, env = "CONCLAVE_DB")]
    db: Option<PathBuf>,

    /// Path to a YAML engine configuration
    #[arg(long, global = true, env = "CONCLAVE_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Load an ingestion snapshot (proposals, rubric, voters, groups, votes)
    Import {
        /// Snapshot JSON file
        path: PathBuf,
    },
    /// Screening ranking, best first
    Scores,
    /// Ranking joined with second-round consensus
    RoughScores,
    /// Outcome percentages per batch group
    Coverage,
    /// Voter, message and consensus statistics per batch group
    BatchStats,
    /// Number of proposals at each vote count
    Progress,
    /// Totals for both review rounds
    Summary,
    /// Next proposal a reviewer should score
    Next {
        /// Reviewer email, used to skip their own proposals
        #[arg(long)]
        email: String,
        /// Reviewer voter id
        #[arg(long)]
        voter: i64,
    },
    /// Suggest topic groups from proposal text
    AutoGroup {
        /// Latent topics kept (defaults to the configured value)
        #[arg(long)]
        topics: Option<usize>,
        /// Similarity above which proposals are linked (defaults to the configured value)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Write every screening vote to a JSON file
    ExportVotes {
        /// Output file
        path: PathBuf,
    },
}

/// Get the default database path (~/.local/share/conclave/conclave.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    let conclave_dir = data_dir.join("conclave");
    std::fs::create_dir_all(&conclave_dir).ok();
    conclave_dir.join("conclave.db")
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_engine(
    db: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<ReviewEngine<SqliteStore>, String> {
    let config = match config {
        Some(path) => EngineConfig::from_yaml_file(&path).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    let db_path = db.unwrap_or_else(default_db_path);
    let store =
        SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    Ok(ReviewEngine::with_config(Arc::new(store), config))
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn report<T: Serialize, E: std::fmt::Display>(result: Result<T, E>) -> i32 {
    match result {
        Ok(value) => print_json(&value),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_import(engine: &ReviewEngine<SqliteStore>, path: &Path) -> i32 {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", path.display(), e);
            return 1;
        }
    };
    let snapshot = match Snapshot::from_json(&text) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: invalid snapshot '{}': {}", path.display(), e);
            return 1;
        }
    };
    match snapshot.load_into(engine.store().as_ref()) {
        Ok(()) => {
            println!(
                "Imported {} proposals, {} votes, {} batch votes",
                snapshot.proposals.len(),
                snapshot.votes.len(),
                snapshot.batch_votes.len()
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_next(engine: &ReviewEngine<SqliteStore>, email: &str, voter: i64) -> i32 {
    match engine.next_for_reviewer(email, VoterId::new(voter)) {
        Ok(Some(id)) => print_json(&id),
        Ok(None) => {
            println!("null");
            eprintln!("No proposals left for {}", email);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_auto_group(
    engine: &ReviewEngine<SqliteStore>,
    topics: Option<usize>,
    threshold: Option<f64>,
) -> i32 {
    if topics.is_none() && threshold.is_none() {
        return report(engine.auto_group_default());
    }
    let topics = topics.unwrap_or(engine.config().topic_count);
    let threshold = threshold.unwrap_or(engine.config().similarity_threshold);
    report(engine.auto_group_proposals(topics, threshold))
}

fn cmd_export_votes(engine: &ReviewEngine<SqliteStore>, path: &Path) -> i32 {
    let votes = match engine.store().all_votes() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let json = match serde_json::to_string_pretty(&votes) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match std::fs::write(path, json) {
        Ok(()) => {
            println!("Exported {} votes to {}", votes.len(), path.display());
            0
        }
        Err(e) => {
            eprintln!("Error: cannot write '{}': {}", path.display(), e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let engine = match open_engine(cli.db, cli.config) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Import { path } => cmd_import(&engine, &path),
        Commands::Scores => report(engine.score_proposals()),
        Commands::RoughScores => report(engine.rough_scores()),
        Commands::Coverage => report(engine.batch_coverage()),
        Commands::BatchStats => report(engine.batch_stats()),
        Commands::Progress => report(engine.coverage_progress()),
        Commands::Summary => report(engine.review_summary()),
        Commands::Next { email, voter } => cmd_next(&engine, &email, voter),
        Commands::AutoGroup { topics, threshold } => cmd_auto_group(&engine, topics, threshold),
        Commands::ExportVotes { path } => cmd_export_votes(&engine, &path),
    };
    std::process::exit(code);
}
