use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::models::{FeedbackRecord, NewFeedback, RatingInput, ValidFeedback};
use crate::store::{FeedbackStore, StoreError};
use crate::validation;

pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    info!(
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed<S: FeedbackStore>(store: &S) -> anyhow::Result<usize> {
    let samples: Vec<(&str, &str, &str, i64)> = vec![
        (
            "Avery Lee",
            "BIWA2110",
            "Clear lectures, labs could use more guidance",
            4,
        ),
        ("Jules Moreno", "BIWA2110", "", 5),
        (
            "Kiara Patel",
            "CS101",
            "Assignments were released late",
            2,
        ),
        ("Noah Dube", "MA201", "Tutorials helped a lot", 4),
        ("Lerato Mokoena", "CS101", "", 3),
    ];

    let mut inserted = 0usize;
    for (student_name, course_code, comments, rating) in samples {
        let candidate = NewFeedback {
            student_name: Some(student_name.to_string()),
            course_code: Some(course_code.to_string()),
            comments: Some(comments.to_string()),
            rating: Some(RatingInput::from(rating)),
        };
        let feedback = validation::validate(&candidate)
            .map_err(|errors| anyhow::anyhow!("invalid seed row for {student_name}: {errors}"))?;
        store.create(feedback).await?;
        inserted += 1;
    }

    Ok(inserted)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub rejected: usize,
}

#[derive(serde::Deserialize)]
struct CsvRow {
    student_name: Option<String>,
    course_code: Option<String>,
    comments: Option<String>,
    rating: Option<String>,
}

impl From<CsvRow> for NewFeedback {
    fn from(row: CsvRow) -> Self {
        NewFeedback {
            student_name: row.student_name,
            course_code: row.course_code,
            comments: row.comments,
            rating: row.rating.map(RatingInput::Text),
        }
    }
}

/// Rows that fail validation are skipped and counted, never written.
pub async fn import_csv<S, R>(store: &S, reader: R) -> anyhow::Result<ImportSummary>
where
    S: FeedbackStore,
    R: std::io::Read,
{
    // short rows deserialize with missing fields and are rejected by validation
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed CSV record {}", index + 1))?;
        let candidate = NewFeedback::from(row);

        match validation::validate(&candidate) {
            Ok(feedback) => {
                store.create(feedback).await?;
                summary.inserted += 1;
            }
            Err(errors) => {
                warn!(row = index + 1, %errors, "Skipping invalid feedback row");
                summary.rejected += 1;
            }
        }
    }

    Ok(summary)
}

#[derive(Clone)]
pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn record_from_row(row: &PgRow) -> FeedbackRecord {
    let comments: Option<String> = row.get("comments");
    FeedbackRecord {
        id: row.get("id"),
        student_name: row.get("student_name"),
        course_code: row.get("course_code"),
        comments: comments.unwrap_or_default(),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
    }
}

impl FeedbackStore for PgFeedbackStore {
    async fn list(&self) -> Result<Vec<FeedbackRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, student_name, course_code, comments, rating, created_at
            FROM feedback
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    async fn create(&self, feedback: ValidFeedback) -> Result<FeedbackRecord, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO feedback (student_name, course_code, comments, rating)
            VALUES ($1, $2, $3, $4)
            RETURNING id, student_name, course_code, comments, rating, created_at
            "#,
        )
        .bind(&feedback.student_name)
        .bind(&feedback.course_code)
        .bind(&feedback.comments)
        .bind(feedback.rating)
        .fetch_one(&self.pool)
        .await?;

        Ok(record_from_row(&row))
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM feedback WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
