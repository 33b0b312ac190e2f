use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

mod completion;
mod config;
mod db;
mod error;
mod models;
mod report;
mod review;

use models::{Advisor, Decision};

#[derive(Parser)]
#[command(name = "kkl-tracker")]
#[command(about = "Internship (KKL/KKN) lifecycle tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import logbook entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Evaluate completion status of accepted internships
    #[command(group(
        ArgGroup::new("scope")
            .args(["advisor", "student"])
            .multiple(false)
    ))]
    Status {
        #[arg(long)]
        advisor: Option<String>,
        #[arg(long)]
        student: Option<String>,
        /// Evaluation date, defaults to today (UTC)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Evaluate one internship from its full logbook and report records
    Inspect {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Accept or reject a waiting internship application
    ReviewInternship {
        #[arg(long)]
        id: Uuid,
        #[arg(long, value_enum)]
        decision: Decision,
    },
    /// Approve or reject a pending report
    ReviewReport {
        #[arg(long)]
        id: Uuid,
        #[arg(long, value_enum)]
        decision: Decision,
        #[arg(long)]
        note: Option<String>,
    },
    /// Assign a supervising lecturer to an internship
    AssignAdvisor {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Soft-delete an internship
    Delete {
        #[arg(long)]
        id: Uuid,
    },
    /// Restore a soft-deleted internship
    Restore {
        #[arg(long)]
        id: Uuid,
    },
    /// Generate a markdown completion report
    #[command(group(
        ArgGroup::new("scope")
            .args(["advisor", "student"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        advisor: Option<String>,
        #[arg(long)]
        student: Option<String>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "completion-report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = config::Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    info!(max_connections = config.max_connections, "connected to Postgres");

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_logbooks(&pool, &csv).await?;
            println!("Inserted {inserted} logbook entries from {}.", csv.display());
        }
        Commands::Status {
            advisor,
            student,
            as_of,
            json,
        } => {
            let today = completion::evaluation_date(as_of);
            let snapshots =
                db::fetch_completion_snapshots(&pool, advisor.as_deref(), student.as_deref())
                    .await?;
            let batch = completion::evaluate_snapshots(&snapshots, today);

            if json {
                println!("{}", serde_json::to_string_pretty(&batch.evaluations)?);
            } else if batch.evaluations.is_empty() {
                println!("No accepted internships found.");
            } else {
                println!("Internship completion as of {today}:");
                for evaluation in batch.evaluations.iter() {
                    println!(
                        "- {} ({}) at {}: {}",
                        evaluation.internship.student_name,
                        evaluation.internship.student_email,
                        evaluation.internship.company_name,
                        evaluation.status
                    );
                }
            }

            for record in batch.invalid.iter() {
                eprintln!(
                    "Skipped {} ({}): {}",
                    record.internship.student_name, record.internship.student_email, record.error
                );
            }
        }
        Commands::Inspect { id, as_of } => {
            let today = completion::evaluation_date(as_of);
            let records = db::fetch_internship_records(&pool, id).await?;
            let evaluation = completion::evaluate_detailed(&records.internship, &records, today)?;

            println!(
                "{} ({}) at {}",
                records.internship.student_name,
                records.internship.student_email,
                records.internship.company_name
            );
            println!(
                "Programme: {}, status: {}",
                records.internship.internship_type.as_str(),
                records.internship.status
            );
            println!("Completion as of {today}: {}", evaluation.status);
            println!(
                "Logbook coverage: {} of {} days",
                evaluation.logged_days, evaluation.required_days
            );
            println!("Reports:");
            if records.reports.is_empty() {
                println!("- none submitted");
            }
            for report in records.reports.iter() {
                println!("- {} ({})", report.file_path, report.status);
            }
        }
        Commands::ReviewInternship { id, decision } => {
            let status = db::set_internship_status(&pool, id, decision).await?;
            println!("Internship {id} is now {status}.");
        }
        Commands::ReviewReport { id, decision, note } => {
            let status = db::set_report_status(&pool, id, decision, note.as_deref()).await?;
            println!("Report {id} is now {status}.");
        }
        Commands::AssignAdvisor { id, name, email } => {
            db::assign_advisor(&pool, id, &Advisor { name, email }).await?;
            println!("Advisor assigned to internship {id}.");
        }
        Commands::Delete { id } => {
            anyhow::ensure!(
                db::soft_delete_internship(&pool, id).await?,
                "internship {id} not found or already deleted"
            );
            println!("Internship {id} deleted.");
        }
        Commands::Restore { id } => {
            anyhow::ensure!(
                db::restore_internship(&pool, id).await?,
                "internship {id} not found or not deleted"
            );
            println!("Internship {id} restored.");
        }
        Commands::Report {
            advisor,
            student,
            as_of,
            out,
        } => {
            let today = completion::evaluation_date(as_of);
            let snapshots =
                db::fetch_completion_snapshots(&pool, advisor.as_deref(), student.as_deref())
                    .await?;
            let batch = completion::evaluate_snapshots(&snapshots, today);
            let report = report::build_report(
                advisor.as_deref().or(student.as_deref()),
                today,
                &batch,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
