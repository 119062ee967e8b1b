use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use log::info;
use sqlx::postgres::PgPoolOptions;

mod blocking;
mod config;
mod diff;
mod error;
mod import;
mod kpi;
mod models;
mod portfolio;
mod recommend;
mod report;
mod sla;
mod store;

use crate::diff::Window;
use crate::import::ImportOptions;
use crate::models::{Claim, RecommendationStatus};
use crate::store::{ClaimStore, PgBackend, StorageBackend};

#[derive(Parser)]
#[command(name = "claims-pro")]
#[command(about = "Claim snapshot comparison and next-action planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WindowArgs {
    /// Import date used as the current snapshot (defaults to the latest)
    #[arg(long)]
    current: Option<NaiveDate>,
    /// Import date to compare against (defaults to the one before current)
    #[arg(long)]
    previous: Option<NaiveDate>,
    /// Only show claims owned by this advisor
    #[arg(long)]
    advisor: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load two sample snapshots
    Seed,
    /// Import one snapshot from a CSV export
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Snapshot date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
    /// List imported snapshot dates, newest first
    Dates,
    /// Compare two snapshots
    Compare {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Recommended next actions for open claims
    Tasks {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Include tasks already marked done or skipped
        #[arg(long)]
        all: bool,
    },
    /// Per-advisor scorecard
    Advisors {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Claim volume per snapshot and month
    Trend,
    /// Set a task status, or advance it when no status is given
    Mark {
        #[arg(long)]
        id: String,
        #[arg(long, value_enum)]
        status: Option<RecommendationStatus>,
    },
    /// Generate a markdown management report
    Report {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value = "claims-report.md")]
        out: PathBuf,
    },
    /// Show how much of the storage budget is used
    Usage,
    /// Delete every stored snapshot
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

const SEED_PREVIOUS: &str = "\
ID Zgłoszenia;Status;Data zgłoszenia;Realizuje;Data modyfikacji;Opis pracownika
SZK/2026/0101;W naprawie;2026-01-12;Anna Nowak;2026-01-27 10:20;27.01.2026 10:20 - serwis potwierdził termin
SZK/2026/0102;Oczekiwanie na dokumenty;2026-01-20;Piotr Zieliński;2026-01-23 15:00;23.01.2026 15:00 - klient ma dosłać upoważnienie
SZK/2026/0103;Kosztorys do akceptacji;2026-01-18;Anna Nowak;2026-01-22 09:00;22.01.2026 09:00 - wysłano kosztorys do PZU
SZK/2026/0104;W warsztacie;2026-01-05;Piotr Zieliński;2026-01-26 12:00;26.01.2026 12:00 - czekamy na części
";

const SEED_CURRENT: &str = "\
ID Zgłoszenia;Status;Data zgłoszenia;Realizuje;Data modyfikacji;Opis pracownika
SZK/2026/0101;W naprawie;2026-01-12;Anna Nowak;2026-01-27 10:20;27.01.2026 10:20 - serwis potwierdził termin
SZK/2026/0102;Oczekiwanie na dokumenty;2026-01-20;Piotr Zieliński;2026-02-02 11:00;02.02.2026 11:00 - klient nadal bez dokumentów
SZK/2026/0103;Weryfikacja kosztorysu;2026-01-18;Anna Nowak;2026-02-03 08:30;03.02.2026 08:30 - likwidator weryfikuje wycenę
SZK/2026/0105;Nowe zgłoszenie;2026-02-06;Marta Wiśniewska;2026-02-06 14:00;
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let settings = config::Settings::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = ClaimStore::new(
        PgBackend::new(pool),
        settings.storage_budget_bytes,
        settings.full_snapshots,
    );

    match cli.command {
        Commands::InitDb => {
            store.init().await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            seed(&store).await?;
            println!("Seed data inserted.");
        }
        Commands::Import {
            csv,
            date,
            delimiter,
        } => {
            let delimiter =
                u8::try_from(delimiter).context("delimiter must be a single ASCII character")?;
            let options = ImportOptions {
                import_date: date.unwrap_or_else(|| Utc::now().date_naive()),
                now: Utc::now().naive_utc(),
                delimiter,
            };
            let claims = import::read_claims(&csv, &options)?;
            if claims.is_empty() {
                println!("No claims found in {}.", csv.display());
                return Ok(());
            }
            let imported = claims.len();
            let saved = store.import_snapshot(claims).await?;
            println!(
                "Imported {imported} claims for {} from {}. Store holds {} claims ({}% of budget).",
                options.import_date,
                csv.display(),
                saved.saved_count,
                saved.usage_percent
            );
        }
        Commands::Dates => {
            let dates = store.import_dates().await?;
            if dates.is_empty() {
                println!("No snapshots imported yet.");
            }
            for date in dates {
                println!("- {date}");
            }
        }
        Commands::Compare { window } => {
            let history = store.fetch_all().await?;
            let Some(resolved) = resolve(&history, &window) else {
                println!("No snapshots imported yet.");
                return Ok(());
            };
            let compared = diff::compare(&history, resolved);
            let open = portfolio::open_portfolio(&compared, window.advisor.as_deref());
            let stats = portfolio::dashboard(&open, &compared);

            print_window(resolved);
            println!(
                "New {} | Closed {} ({}%) | Changed {} | Unchanged {} | Avg inactivity {} days",
                stats.new,
                stats.closed,
                stats.closed_percent,
                stats.in_progress,
                stats.stagnant,
                stats.avg_inactivity
            );
            for bucket in portfolio::aging_buckets(&open) {
                println!("- {}: {}", bucket.label, bucket.count);
            }
        }
        Commands::Tasks { window, limit, all } => {
            let history = store.fetch_all().await?;
            let Some(resolved) = resolve(&history, &window) else {
                println!("No snapshots imported yet.");
                return Ok(());
            };
            let compared = diff::compare(&history, resolved);
            let open = portfolio::open_portfolio(&compared, window.advisor.as_deref());
            let tasks: Vec<_> = recommend::task_list(&open)
                .into_iter()
                .filter(|task| all || task.is_pending())
                .collect();

            print_window(resolved);
            if tasks.is_empty() {
                println!("No open tasks.");
            }
            for task in tasks.iter().take(limit) {
                let claim = &task.entry.claim;
                println!(
                    "- [{}] {} {} ({}, {}): {} days idle, SLA {}, {}",
                    claim.recommendation_status().as_str(),
                    claim.id,
                    claim.claim_number,
                    claim.advisor,
                    task.entry.comparison,
                    claim.inactivity_days,
                    sla::classify(claim.inactivity_days).as_str(),
                    blocking::infer(&claim.status, claim.last_comment.as_deref()).label()
                );
                println!(
                    "    {} [{}] {} (score {}): {}",
                    task.recommendation.action.as_str(),
                    task.recommendation.priority.as_str(),
                    task.recommendation.label,
                    task.score,
                    task.recommendation.explanation
                );
            }
        }
        Commands::Advisors { window } => {
            let history = store.fetch_all().await?;
            let Some(resolved) = resolve(&history, &window) else {
                println!("No snapshots imported yet.");
                return Ok(());
            };
            let compared = diff::compare(&history, resolved);

            print_window(resolved);
            for kpi in kpi::aggregate(&compared)
                .iter()
                .filter(|kpi| window.advisor.as_deref().map_or(true, |name| kpi.name == name))
            {
                println!(
                    "- {}: open {}, new {}, closed {}, overdue {} ({}%), avg age {} days",
                    kpi.name,
                    kpi.open_count,
                    kpi.new_count,
                    kpi.closed_count,
                    kpi.stagnant_count,
                    kpi.overdue_percent,
                    kpi.avg_age
                );
            }
        }
        Commands::Trend => {
            let history = store.fetch_all().await?;
            println!("Claims per snapshot:");
            for point in portfolio::history_trend(&history) {
                println!("- {}: {}", point.date, point.count);
            }
            println!("Month over month:");
            for month in portfolio::monthly_trend(&history) {
                println!(
                    "- {}: {} claims, avg inactivity {} days, efficiency {}%",
                    month.month, month.volume, month.avg_inactivity, month.efficiency
                );
            }
        }
        Commands::Mark { id, status } => {
            match store.update_recommendation_status(&id, status).await? {
                Some(next) => println!("{id} is now {}.", next.as_str()),
                None => anyhow::bail!("no claim with id {id}"),
            }
        }
        Commands::Report { window, out } => {
            let history = store.fetch_all().await?;
            let Some(resolved) = resolve(&history, &window) else {
                println!("No snapshots imported yet.");
                return Ok(());
            };
            let report = report::build_report(&history, resolved, window.advisor.as_deref());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Usage => {
            let percent = store.usage_percent().await?;
            println!(
                "Storage usage: {percent}% of {} bytes.",
                settings.storage_budget_bytes
            );
        }
        Commands::Reset { yes } => {
            if !yes {
                println!("Refusing to clear every snapshot without --yes.");
                return Ok(());
            }
            store.clear().await?;
            println!("Claim store cleared.");
        }
    }

    Ok(())
}

fn resolve(history: &[Claim], args: &WindowArgs) -> Option<Window> {
    diff::resolve_window(history, args.current, args.previous)
}

fn print_window(window: Window) {
    match window.previous {
        Some(previous) => println!("Snapshot {} vs {}", window.current, previous),
        None => println!("Snapshot {} (no earlier snapshot)", window.current),
    }
}

async fn seed<B: StorageBackend>(store: &ClaimStore<B>) -> anyhow::Result<()> {
    let snapshots = [
        (NaiveDate::from_ymd_opt(2026, 2, 2), SEED_PREVIOUS),
        (NaiveDate::from_ymd_opt(2026, 2, 9), SEED_CURRENT),
    ];

    for (date, rows) in snapshots {
        let import_date = date.context("invalid date")?;
        let options = ImportOptions {
            import_date,
            now: import_date.and_hms_opt(18, 0, 0).context("invalid time")?,
            delimiter: b';',
        };
        let claims = import::parse_claims(rows.as_bytes(), &options)?;
        info!("seeding {} claims for {import_date}", claims.len());
        store.import_snapshot(claims).await?;
    }

    Ok(())
}
