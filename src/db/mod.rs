#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use log::{debug, info, warn};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite};
use std::sync::Arc;

use crate::error::{PollError, Result};
use crate::models::{MAX_EXPIRATION_YEAR, NewPoll, Poll, PollId, PollOption, PollType, Response, ResponsePayload};

/// Boundary to whatever backend owns polls, options and responses.
///
/// Implementations do serialization and nothing else: expiry gating,
/// aggregation and display policy live above this trait.
#[async_trait]
pub trait PollRepository: Send + Sync {
    async fn list_polls(&self) -> Result<Vec<Poll>>;

    async fn get_options(&self, poll_id: PollId) -> Result<Vec<PollOption>>;

    /// Responses newest-first.
    async fn get_responses(&self, poll_id: PollId) -> Result<Vec<Response>>;

    async fn create_poll(&self, poll: &NewPoll) -> Result<Poll>;

    async fn expire_poll(&self, poll_id: PollId, now: DateTime<Utc>) -> Result<Poll>;

    /// Removes the poll together with its options and responses.
    async fn delete_poll(&self, poll_id: PollId) -> Result<()>;

    async fn submit_response(&self, poll_id: PollId, payload: &ResponsePayload) -> Result<Response>;
}

/// Tags free-text submissions with a category. Installed on the backend;
/// the engine itself never derives categories.
pub trait Classifier: Send + Sync {
    fn classify(&self, poll: &Poll, text: &str) -> Option<String>;
}

impl<F> Classifier for F
where
    F: Fn(&Poll, &str) -> Option<String> + Send + Sync,
{
    fn classify(&self, poll: &Poll, text: &str) -> Option<String> {
        self(poll, text)
    }
}

pub struct Database {
    pool: SqlitePool,
    classifier: Option<Arc<dyn Classifier>>,
}

impl Database {
    pub async fn connect(db_url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            Sqlite::create_database(db_url).await?;
        }

        // Every in-memory connection is its own database, so keep exactly one alive
        let pool = if db_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(db_url)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await?
        };

        Self::init_schema(&pool).await?;
        info!("Connected to poll database at {}", db_url);

        Ok(Self { pool, classifier: None })
    }

    pub fn with_classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS polls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                poll_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poll_options (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                poll_id INTEGER NOT NULL,
                option_text TEXT NOT NULL,
                option_order INTEGER NOT NULL,
                FOREIGN KEY (poll_id) REFERENCES polls(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poll_responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                poll_id INTEGER NOT NULL,
                selected_option_id INTEGER,
                text_response TEXT,
                category TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (poll_id) REFERENCES polls(id) ON DELETE CASCADE,
                FOREIGN KEY (selected_option_id) REFERENCES poll_options(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn find_poll(&self, poll_id: PollId) -> Result<Option<Poll>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, poll_type, created_at, expires_at
            FROM polls
            WHERE id = ?
            "#,
        )
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(poll_from_row).transpose()
    }

    async fn require_poll(&self, poll_id: PollId) -> Result<Poll> {
        self.find_poll(poll_id).await?.ok_or(PollError::NotFound(poll_id))
    }
}

#[async_trait]
impl PollRepository for Database {
    /// Rows that fail to decode are logged and left out; they never hide
    /// the rest of the list.
    async fn list_polls(&self) -> Result<Vec<Poll>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, poll_type, created_at, expires_at
            FROM polls
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut polls = Vec::with_capacity(rows.len());
        for row in &rows {
            match poll_from_row(row) {
                Ok(poll) => polls.push(poll),
                Err(e) => {
                    let id: Option<i64> = row.try_get("id").ok();
                    warn!("Skipping unreadable poll {:?}: {}", id, e);
                }
            }
        }
        Ok(polls)
    }

    async fn get_options(&self, poll_id: PollId) -> Result<Vec<PollOption>> {
        self.require_poll(poll_id).await?;

        sqlx::query(
            r#"
            SELECT id, poll_id, option_text, option_order
            FROM poll_options
            WHERE poll_id = ?
            ORDER BY option_order
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| -> Result<PollOption> {
            Ok(PollOption {
                id: row.try_get("id")?,
                poll_id: row.try_get("poll_id")?,
                text: row.try_get("option_text")?,
                order: row.try_get("option_order")?,
            })
        })
        .collect()
    }

    async fn get_responses(&self, poll_id: PollId) -> Result<Vec<Response>> {
        self.require_poll(poll_id).await?;

        sqlx::query(
            r#"
            SELECT pr.id, pr.poll_id, pr.selected_option_id, pr.text_response,
                   pr.category, pr.created_at, po.option_text
            FROM poll_responses pr
            LEFT JOIN poll_options po ON pr.selected_option_id = po.id
            WHERE pr.poll_id = ?
            ORDER BY pr.created_at DESC, pr.id DESC
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(response_from_row)
        .collect()
    }

    async fn create_poll(&self, poll: &NewPoll) -> Result<Poll> {
        if poll.title.trim().is_empty() {
            return Err(PollError::validation("Poll title is required"));
        }
        if poll.expires_at.is_some_and(|at| at.year() > MAX_EXPIRATION_YEAR) {
            return Err(PollError::validation("Invalid expiration"));
        }

        let mut tx = self.pool.begin().await?;

        let poll_id = sqlx::query(
            r#"
            INSERT INTO polls (title, poll_type, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&poll.title)
        .bind(poll.poll_type.key())
        .bind(encode_timestamp(poll.created_at))
        .bind(poll.expires_at.map(encode_timestamp))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        // Option polls need their vocabulary in place before any response arrives
        for (i, label) in poll.poll_type.vocabulary().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO poll_options (poll_id, option_text, option_order)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(poll_id)
            .bind(*label)
            .bind(i as i64 + 1)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Inserted poll {} with {} options", poll_id, poll.poll_type.vocabulary().len());

        Ok(Poll {
            id: poll_id,
            title: poll.title.clone(),
            poll_type: poll.poll_type,
            created_at: poll.created_at,
            expires_at: poll.expires_at,
        })
    }

    async fn expire_poll(&self, poll_id: PollId, now: DateTime<Utc>) -> Result<Poll> {
        let now = encode_timestamp(now);

        // Closing only ever moves the expiration earlier
        sqlx::query(
            r#"
            UPDATE polls
            SET expires_at = ?
            WHERE id = ? AND (expires_at IS NULL OR expires_at > ?)
            "#,
        )
        .bind(&now)
        .bind(poll_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.require_poll(poll_id).await
    }

    async fn delete_poll(&self, poll_id: PollId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM poll_responses WHERE poll_id = ?")
            .bind(poll_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM poll_options WHERE poll_id = ?")
            .bind(poll_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM polls WHERE id = ?")
            .bind(poll_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Err(PollError::NotFound(poll_id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn submit_response(&self, poll_id: PollId, payload: &ResponsePayload) -> Result<Response> {
        let poll = self.require_poll(poll_id).await?;
        let now = Utc::now();

        if poll.is_expired(now) {
            return Err(PollError::Server("Poll has expired".to_string()));
        }

        let (answer, category) = match payload {
            ResponsePayload::Choice(option_id) => {
                if !poll.poll_type.is_choice() {
                    return Err(PollError::Server("Poll expects a text response".to_string()));
                }
                let label: Option<String> = sqlx::query_scalar(
                    "SELECT option_text FROM poll_options WHERE id = ? AND poll_id = ?",
                )
                .bind(*option_id)
                .bind(poll_id)
                .fetch_optional(&self.pool)
                .await?;

                match label {
                    Some(label) => (Some(label), None),
                    None => return Err(PollError::Server("Poll option not found".to_string())),
                }
            }
            ResponsePayload::Text(text) => {
                if poll.poll_type != PollType::FreeText {
                    return Err(PollError::Server("Poll expects a selected option".to_string()));
                }
                if text.trim().is_empty() {
                    return Err(PollError::Server(
                        "Must provide either selected_option_id or text_response".to_string(),
                    ));
                }
                let category = self
                    .classifier
                    .as_ref()
                    .and_then(|classifier| classifier.classify(&poll, text));
                (category.clone(), category)
            }
        };

        let id = sqlx::query(
            r#"
            INSERT INTO poll_responses (poll_id, selected_option_id, text_response, category, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(poll_id)
        .bind(payload.selected_option_id())
        .bind(payload.text_response())
        .bind(category)
        .bind(encode_timestamp(now))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Response {
            id,
            poll_id,
            selected_option_id: payload.selected_option_id(),
            text_response: payload.text_response().map(str::to_string),
            answer,
            created_at: now,
        })
    }
}

// Fixed-width UTC so that SQL string comparison orders instants correctly
fn encode_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PollError::InvalidFormat(format!("Failed to parse {}: {}", column, e)))
}

fn poll_from_row(row: &SqliteRow) -> Result<Poll> {
    let poll_type: String = row.try_get("poll_type")?;
    let created_at: String = row.try_get("created_at")?;
    let expires_at: Option<String> = row.try_get("expires_at")?;

    Ok(Poll {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        poll_type: poll_type.parse()?,
        created_at: decode_timestamp("created_at", &created_at)?,
        expires_at: expires_at
            .map(|s| decode_timestamp("expires_at", &s))
            .transpose()?,
    })
}

fn response_from_row(row: &SqliteRow) -> Result<Response> {
    let created_at: String = row.try_get("created_at")?;
    let category: Option<String> = row.try_get("category")?;
    let option_text: Option<String> = row.try_get("option_text")?;

    Ok(Response {
        id: row.try_get("id")?,
        poll_id: row.try_get("poll_id")?,
        selected_option_id: row.try_get("selected_option_id")?,
        text_response: row.try_get("text_response")?,
        answer: category.or(option_text),
        created_at: decode_timestamp("created_at", &created_at)?,
    })
}
