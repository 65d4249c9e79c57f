use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use progress_dashboard::models::{ActivityContext, RawStatsSnapshot};
use progress_dashboard::{badges, catalog, db, journal, report, stats};

#[derive(Parser)]
#[command(name = "progress-dashboard")]
#[command(about = "Learning progress dashboard for coding practice", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo learner with stats, journal and activity
    Seed,
    /// Store a stats snapshot exported by the practice platform
    Sync {
        #[arg(long, default_value = db::DEMO_IDENTITY)]
        identity: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Import journal reflections from a CSV file
    ImportJournal {
        #[arg(long, default_value = db::DEMO_IDENTITY)]
        identity: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show derived dashboard stats
    #[command(group(
        ArgGroup::new("source")
            .args(["identity", "snapshot"])
            .multiple(false)
    ))]
    Stats {
        #[arg(long)]
        identity: Option<String>,
        /// Derive from a snapshot JSON file instead of the database
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Evaluate badges against the latest synced stats
    Badges {
        #[arg(long, default_value = db::DEMO_IDENTITY)]
        identity: String,
        #[arg(long, env = "DASHBOARD_BADGE_CATALOG")]
        catalog: Option<PathBuf>,
    },
    /// Show the reflection journal grouped by topic
    Journal {
        #[arg(long, default_value = db::DEMO_IDENTITY)]
        identity: String,
        #[arg(long, default_value_t = 3)]
        limit: usize,
    },
    /// Generate a markdown dashboard report
    Report {
        #[arg(long, default_value = db::DEMO_IDENTITY)]
        identity: String,
        #[arg(long, env = "DASHBOARD_BADGE_CATALOG")]
        catalog: Option<PathBuf>,
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn read_snapshot(path: &Path) -> anyhow::Result<RawStatsSnapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("{} is not a stats snapshot", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("progress_dashboard=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted for {}.", db::DEMO_IDENTITY);
        }
        Commands::Sync { identity, file } => {
            let snapshot = read_snapshot(&file)?;
            let pool = connect().await?;
            db::record_snapshot(&pool, &identity, &snapshot).await?;
            println!(
                "Synced {} solved problems for {identity}.",
                snapshot.total_solved
            );
        }
        Commands::ImportJournal { identity, csv } => {
            let pool = connect().await?;
            let inserted = db::import_journal_csv(&pool, &identity, &csv).await?;
            println!("Inserted {inserted} reflections from {}.", csv.display());
        }
        Commands::Stats {
            identity,
            snapshot,
            json,
        } => {
            let raw = match snapshot {
                Some(path) => Some(read_snapshot(&path)?),
                None => {
                    let identity = identity.as_deref().unwrap_or(db::DEMO_IDENTITY);
                    let pool = connect().await?;
                    db::latest_snapshot(&pool, identity).await?
                }
            };

            let Some(derived) = stats::derive(raw.as_ref()) else {
                println!("No stats synced yet. Run `sync` first.");
                return Ok(());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&derived)?);
                return Ok(());
            }

            println!("Topics learned: {}", derived.topics_learned);
            println!(
                "Solved {} of {} attempts (estimated)",
                derived.total_solved, derived.total_attempted
            );
            println!("Accuracy (estimated): {:.1}%", derived.accuracy_rate);
            println!("Streak (estimated): {} days", derived.streak_days);
            println!("Weak areas: {}", derived.weak_areas.join(", "));
            for point in derived.skill_radar.iter() {
                println!("- {}: {} / {}", point.subject, point.value, point.scale_max);
            }
        }
        Commands::Badges {
            identity,
            catalog: catalog_path,
        } => {
            let rules = catalog::load_catalog(catalog_path.as_deref())?;
            let pool = connect().await?;
            let snapshots = db::recent_snapshots(&pool, &identity, 2).await?;
            let Some(derived) = stats::derive(snapshots.first()) else {
                println!("No stats synced yet. Run `sync` first.");
                return Ok(());
            };
            let activity = db::fetch_activity(&pool, &identity).await?;
            let context = ActivityContext {
                user_stats: &derived,
                activity: &activity,
            };

            let outcomes = badges::evaluate_detailed(&rules, &context);
            println!("Badges for {identity}:");
            for outcome in outcomes.iter() {
                let state = match (&outcome.error, outcome.earned) {
                    (Some(err), _) => format!("unavailable ({err})"),
                    (None, true) => "earned".to_string(),
                    (None, false) => "locked".to_string(),
                };
                println!("- {} [{}] {}", outcome.name, outcome.id, state);
            }

            // Activity is not versioned, so only the stats half differs between syncs.
            if let Some(previous_stats) = stats::derive(snapshots.get(1)) {
                let previous_context = ActivityContext {
                    user_stats: &previous_stats,
                    activity: &activity,
                };
                let previous = badges::evaluate(&rules, &previous_context);
                let current: badges::EarnedBadgeSet = outcomes
                    .iter()
                    .filter(|outcome| outcome.earned)
                    .map(|outcome| outcome.id.clone())
                    .collect();
                let unlocked = badges::newly_earned(&previous, &current);
                if !unlocked.is_empty() {
                    let names: Vec<&str> = unlocked.iter().map(String::as_str).collect();
                    println!("Unlocked since the previous sync: {}", names.join(", "));
                }
            }
        }
        Commands::Journal { identity, limit } => {
            let pool = connect().await?;
            let entries = db::fetch_journal(&pool, &identity).await?;
            let grouped = journal::group(entries);

            if grouped.is_empty() {
                println!("Your journal is empty. Solve problems to see reflections here!");
                return Ok(());
            }

            println!(
                "{} problems across {} topics",
                grouped.entry_count(),
                grouped.len()
            );
            for group in grouped.iter() {
                println!("{} ({} problems)", group.topic, group.entries.len());
                for entry in group.entries.iter().take(limit) {
                    println!(
                        "- {} on {} ({} reflections)",
                        entry.problem_title,
                        entry.completed_at.date_naive(),
                        entry.reflections.len()
                    );
                }
            }
        }
        Commands::Report {
            identity,
            catalog: catalog_path,
            out,
        } => {
            let rules = catalog::load_catalog(catalog_path.as_deref())?;
            let pool = connect().await?;
            let raw = db::latest_snapshot(&pool, &identity).await?;
            let derived = stats::derive(raw.as_ref());
            let activity = db::fetch_activity(&pool, &identity).await?;
            let outcomes = match derived.as_ref() {
                Some(user_stats) => {
                    let context = ActivityContext {
                        user_stats,
                        activity: &activity,
                    };
                    badges::evaluate_detailed(&rules, &context)
                }
                None => Vec::new(),
            };
            let grouped = journal::group(db::fetch_journal(&pool, &identity).await?);

            let report = report::build_report(&identity, derived.as_ref(), &outcomes, &grouped);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
