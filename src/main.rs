use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod models;
mod report;
mod routes;
mod server;
mod stats;
mod store;
mod validation;

use config::{DatabaseConfig, ServerConfig};
use db::PgFeedbackStore;
use models::{NewFeedback, RatingInput};
use report::Snapshot;
use sqlx::PgPool;
use store::{FeedbackStore, StoreError};

#[derive(Parser)]
#[command(name = "student-feedback")]
#[command(about = "Student course feedback service and dashboard", long_about = None)]
struct Cli {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import feedback from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Serve the REST API
    Serve {
        #[command(flatten)]
        server: ServerConfig,
    },
    /// Render the dashboard as markdown
    Dashboard {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List submitted feedback, newest first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Submit one feedback record
    Submit {
        #[arg(long)]
        student_name: String,
        #[arg(long)]
        course_code: String,
        #[arg(long)]
        comments: Option<String>,
        #[arg(long)]
        rating: String,
    },
    /// Delete feedback by id
    Delete {
        #[arg(long)]
        id: i64,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn snapshot(store: &PgFeedbackStore) -> anyhow::Result<Snapshot> {
    let records = store.list().await.context("failed to fetch feedback")?;
    Ok(Snapshot::capture(records))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let pool = db::connect(&cli.database).await?;
    execute(cli.command, pool).await
}

/// Runs one command and closes the pool whether or not it succeeded.
async fn execute(command: Commands, pool: PgPool) -> anyhow::Result<()> {
    let store = PgFeedbackStore::new(pool.clone());
    let result = run(command, &pool, &store).await;
    pool.close().await;
    result
}

async fn run(command: Commands, pool: &PgPool, store: &PgFeedbackStore) -> anyhow::Result<()> {
    match command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(store).await?;
            println!("Inserted {inserted} seed feedback records.");
        }
        Commands::Import { csv } => {
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let summary = db::import_csv(store, file).await?;
            println!(
                "Inserted {} feedback records from {} ({} rejected).",
                summary.inserted,
                csv.display(),
                summary.rejected
            );
        }
        Commands::Serve { server } => {
            server::serve(store.clone(), &server).await?;
        }
        Commands::Dashboard { out } => {
            let dashboard = report::build_dashboard(&snapshot(store).await?);
            match out {
                Some(path) => {
                    std::fs::write(&path, dashboard)?;
                    println!("Dashboard written to {}.", path.display());
                }
                None => print!("{dashboard}"),
            }
        }
        Commands::List { limit } => {
            print!("{}", report::build_feedback_list(&snapshot(store).await?, limit));
        }
        Commands::Submit {
            student_name,
            course_code,
            comments,
            rating,
        } => {
            let candidate = NewFeedback {
                student_name: Some(student_name),
                course_code: Some(course_code),
                comments,
                rating: Some(RatingInput::Text(rating)),
            };
            let feedback = validation::validate(&candidate)
                .map_err(|errors| anyhow::anyhow!("feedback rejected: {errors}"))?;
            let record = store
                .create(feedback)
                .await
                .context("failed to create feedback")?;
            println!("Feedback #{} submitted for {}.", record.id, record.course_code);

            let current = snapshot(store).await?;
            println!(
                "{} feedback records, average rating {:.2}.",
                current.stats.total_count, current.stats.average_rating
            );
        }
        Commands::Delete { id } => {
            match store.delete(id).await {
                Ok(()) => println!("Feedback #{id} deleted."),
                Err(StoreError::NotFound(id)) => anyhow::bail!("no feedback with id {id}"),
                Err(error) => return Err(error).context("failed to delete feedback"),
            }

            let current = snapshot(store).await?;
            println!(
                "{} feedback records remain, average rating {:.2}.",
                current.stats.total_count, current.stats.average_rating
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_reads_flags() {
        let cli = Cli::try_parse_from([
            "student-feedback",
            "--database-url",
            "postgres://localhost/feedback",
            "serve",
            "--port",
            "8080",
            "--cors-origin",
            "http://localhost:3000,https://feedback.example.edu",
        ])
        .unwrap();

        assert_eq!(cli.database.database_url, "postgres://localhost/feedback");
        match cli.command {
            Commands::Serve { server } => {
                assert_eq!(server.port, 8080);
                assert_eq!(server.cors_origins.len(), 2);
            }
            _ => panic!("expected serve command"),
        }
    }

    #[tokio::test]
    async fn failed_command_still_closes_pool() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/feedback")
            .unwrap();
        let command = Commands::Import {
            csv: PathBuf::from("/nonexistent/feedback.csv"),
        };

        let result = execute(command, pool.clone()).await;
        assert!(result.is_err());
        assert!(pool.is_closed());
    }
}
