use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use worklog_assessment::config::AppConfig;
use worklog_assessment::db::{self, PgStore};
use worklog_assessment::factors::{self, FactorUpdate};
use worklog_assessment::{assess_month, report, telemetry, AssessmentRequest, AssessmentStore};

#[derive(Parser)]
#[command(name = "worklog-assessment")]
#[command(about = "Daily activity assessment for a personal work log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load default factors, bands and sample activity
    Seed,
    /// Import activity rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the month grid for a date
    Month {
        /// Any date in the month; defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        search: String,
        /// Emit the full assessment as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown month report
    Report {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "assessment.md")]
        out: PathBuf,
    },
    /// Inspect or tune scoring factors
    Factors {
        #[command(subcommand)]
        command: FactorCommands,
    },
}

#[derive(Subcommand)]
enum FactorCommands {
    /// List configured factors
    List,
    /// Enable or disable a factor
    Toggle {
        #[arg(long)]
        id: Uuid,
    },
    /// Set the minimum weighted count a factor needs to score
    SetThreshold {
        #[arg(long)]
        id: Uuid,
        #[arg(long, allow_negative_numbers = true)]
        value: i64,
    },
    /// Set the multiplier applied to a factor's count
    SetWeight {
        #[arg(long)]
        id: Uuid,
        #[arg(long, allow_negative_numbers = true)]
        value: i64,
    },
}

fn print_update(update: &FactorUpdate) {
    let factor = &update.current;
    println!(
        "{} {}: weight {}, threshold {}, {}.",
        factor.id,
        factor.describe(),
        factor.weight,
        factor.threshold,
        if factor.active { "active" } else { "inactive" }
    );
    if update.requires_reassessment() {
        println!("Rebuild the month to see updated scores.");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.log_level)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = PgStore::new(pool);

    match cli.command {
        Commands::InitDb => {
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(store.pool()).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(store.pool(), &csv).await?;
            println!("Inserted {inserted} activity rows from {}.", csv.display());
        }
        Commands::Month { date, search, json } => {
            let request = AssessmentRequest::new(date.unwrap_or_else(|| Local::now().date_naive()))
                .with_search_term(search);
            let month = assess_month(&store, &request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&month)?);
            } else {
                print!("{}", report::render_grid(&month));
            }
        }
        Commands::Report { date, search, out } => {
            let request = AssessmentRequest::new(date.unwrap_or_else(|| Local::now().date_naive()))
                .with_search_term(search);
            let month = assess_month(&store, &request).await?;
            std::fs::write(&out, report::build_report(&month))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Factors { command } => match command {
            FactorCommands::List => {
                let factors = store.load_factor_definitions().await?;
                if factors.is_empty() {
                    println!("No factors configured.");
                    return Ok(());
                }

                for factor in factors {
                    println!(
                        "- {} {} weight {} threshold {}{}",
                        factor.id,
                        factor.describe(),
                        factor.weight,
                        factor.threshold,
                        if factor.active { "" } else { " (inactive)" }
                    );
                }
            }
            FactorCommands::Toggle { id } => {
                print_update(&factors::toggle_active(&store, id).await?);
            }
            FactorCommands::SetThreshold { id, value } => {
                print_update(&factors::set_threshold(&store, id, value).await?);
            }
            FactorCommands::SetWeight { id, value } => {
                print_update(&factors::set_weight(&store, id, value).await?);
            }
        },
    }

    Ok(())
}
