use crate::backend::PollBackend;
use crate::error::BackendError;
use crate::models::{AggregateResult, CustomField, Poll, PollOption, VoteAck};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self, BackendError> {
        let in_memory = db_url.contains(":memory:");

        // Create database if it doesn't exist
        if !in_memory && !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        // An in-memory database lives and dies with its single connection.
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(db_url).await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS polls (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                header_text TEXT,
                footer_text TEXT,
                total_votes INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poll_options (
                id TEXT PRIMARY KEY,
                poll_id TEXT NOT NULL,
                title TEXT NOT NULL,
                image TEXT,
                custom_fields TEXT NOT NULL DEFAULT '[]',
                position INTEGER NOT NULL,
                votes INTEGER NOT NULL DEFAULT 0,
                win_rate REAL NOT NULL DEFAULT 0,
                FOREIGN KEY (poll_id) REFERENCES polls(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // One final choice per voter and poll; the bracket path is never stored.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                voter_id TEXT NOT NULL,
                poll_id TEXT NOT NULL,
                option_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                PRIMARY KEY (voter_id, poll_id),
                FOREIGN KEY (poll_id) REFERENCES polls(id) ON DELETE CASCADE,
                FOREIGN KEY (option_id) REFERENCES poll_options(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn create_poll(&self, poll: &Poll) -> Result<(), BackendError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO polls (id, title, description, header_text, footer_text, total_votes, created_at, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&poll.id)
        .bind(&poll.title)
        .bind(&poll.description)
        .bind(&poll.header_text)
        .bind(&poll.footer_text)
        .bind(poll.total_votes)
        .bind(poll.created_at.to_rfc3339())
        .bind(poll.is_active)
        .execute(&mut *tx)
        .await?;

        for (i, option) in poll.options.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO poll_options (id, poll_id, title, image, custom_fields, position, votes, win_rate)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&option.id)
            .bind(&poll.id)
            .bind(&option.title)
            .bind(&option.image)
            .bind(serde_json::to_string(&option.custom_fields)?)
            .bind(i as i64)
            .bind(option.votes)
            .bind(option.win_rate)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Created poll {} with {} options", poll.id, poll.options.len());
        Ok(())
    }

    // Polls without their options, newest first
    pub async fn list_polls(&self, active_only: bool) -> Result<Vec<Poll>, BackendError> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, header_text, footer_text, total_votes, created_at, is_active
            FROM polls
            WHERE is_active = TRUE OR ? = FALSE
            ORDER BY created_at DESC
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| poll_from_row(row, Vec::new()))
            .collect()
    }

    pub async fn end_poll(&self, poll_id: &str) -> Result<(), BackendError> {
        let updated = sqlx::query(
            r#"
            UPDATE polls
            SET is_active = FALSE
            WHERE id = ? AND is_active = TRUE
            "#,
        )
        .bind(poll_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            debug!("end_poll: poll {} was missing or already closed", poll_id);
        }
        Ok(())
    }
}

#[async_trait]
impl PollBackend for Database {
    async fn fetch_poll(&self, poll_id: &str) -> Result<Poll, BackendError> {
        let poll_row = sqlx::query(
            r#"
            SELECT id, title, description, header_text, footer_text, total_votes, created_at, is_active
            FROM polls
            WHERE id = ?
            "#,
        )
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BackendError::NotFound(format!("poll {}", poll_id)))?;

        let option_rows = sqlx::query(
            r#"
            SELECT id, title, image, custom_fields, votes, win_rate
            FROM poll_options
            WHERE poll_id = ?
            ORDER BY position
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        let options = option_rows
            .iter()
            .map(option_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        poll_from_row(&poll_row, options)
    }

    async fn submit_vote(
        &self,
        poll_id: &str,
        option_id: &str,
        voter_id: &str,
    ) -> Result<VoteAck, BackendError> {
        let mut tx = self.pool.begin().await?;

        let is_active: bool = sqlx::query("SELECT is_active FROM polls WHERE id = ?")
            .bind(poll_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("poll {}", poll_id)))?
            .get("is_active");
        if !is_active {
            return Err(BackendError::PollInactive(poll_id.to_string()));
        }

        let option_exists = sqlx::query("SELECT 1 FROM poll_options WHERE id = ? AND poll_id = ?")
            .bind(option_id)
            .bind(poll_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !option_exists {
            return Err(BackendError::NotFound(format!("option {}", option_id)));
        }

        let already_voted = sqlx::query("SELECT 1 FROM votes WHERE voter_id = ? AND poll_id = ?")
            .bind(voter_id)
            .bind(poll_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if already_voted {
            return Err(BackendError::AlreadyVoted {
                poll_id: poll_id.to_string(),
                voter_id: voter_id.to_string(),
            });
        }

        let recorded_at = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO votes (voter_id, poll_id, option_id, timestamp)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(voter_id)
        .bind(poll_id)
        .bind(option_id)
        .bind(recorded_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE poll_options SET votes = votes + 1 WHERE id = ?")
            .bind(option_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE polls SET total_votes = total_votes + 1 WHERE id = ?")
            .bind(poll_id)
            .execute(&mut *tx)
            .await?;

        // Every option's share moves when the total does.
        sqlx::query(
            r#"
            UPDATE poll_options
            SET win_rate = votes * 100.0 / (SELECT total_votes FROM polls WHERE id = ?)
            WHERE poll_id = ?
            "#,
        )
        .bind(poll_id)
        .bind(poll_id)
        .execute(&mut *tx)
        .await?;

        let total_votes: i64 = sqlx::query("SELECT total_votes FROM polls WHERE id = ?")
            .bind(poll_id)
            .fetch_one(&mut *tx)
            .await?
            .get("total_votes");

        tx.commit().await?;
        info!(
            "Recorded vote of {} for option {} in poll {} ({} total)",
            voter_id, option_id, poll_id, total_votes
        );

        Ok(VoteAck {
            poll_id: poll_id.to_string(),
            option_id: option_id.to_string(),
            total_votes,
            recorded_at,
        })
    }

    async fn fetch_aggregate_results(
        &self,
        poll_id: &str,
    ) -> Result<Vec<AggregateResult>, BackendError> {
        let total_votes: i64 = sqlx::query("SELECT total_votes FROM polls WHERE id = ?")
            .bind(poll_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("poll {}", poll_id)))?
            .get("total_votes");

        let rows = sqlx::query(
            r#"
            SELECT id, title, image, custom_fields, votes, win_rate
            FROM poll_options
            WHERE poll_id = ?
            ORDER BY votes DESC, position ASC
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<AggregateResult, BackendError> {
                let option = option_from_row(row)?;
                let percentage = if total_votes > 0 {
                    Some(option.votes as f64 * 100.0 / total_votes as f64)
                } else {
                    None
                };
                Ok(AggregateResult {
                    option_id: option.id,
                    title: option.title,
                    image: option.image,
                    custom_fields: option.custom_fields,
                    votes: option.votes,
                    win_rate: option.win_rate,
                    percentage,
                })
            })
            .collect()
    }

    async fn has_voted(
        &self,
        poll_id: &str,
        voter_id: &str,
    ) -> Result<Option<String>, BackendError> {
        let row = sqlx::query("SELECT option_id FROM votes WHERE poll_id = ? AND voter_id = ?")
            .bind(poll_id)
            .bind(voter_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get::<String, _>("option_id")))
    }
}

fn poll_from_row(row: &SqliteRow, options: Vec<PollOption>) -> Result<Poll, BackendError> {
    let created_at_str = row.get::<String, _>("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| BackendError::InvalidData(format!("created_at {:?}: {}", created_at_str, e)))?
        .with_timezone(&Utc);

    Ok(Poll {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        header_text: row.get("header_text"),
        footer_text: row.get("footer_text"),
        options,
        total_votes: row.get("total_votes"),
        created_at,
        is_active: row.get("is_active"),
    })
}

fn option_from_row(row: &SqliteRow) -> Result<PollOption, BackendError> {
    let custom_fields: Vec<CustomField> =
        serde_json::from_str(&row.get::<String, _>("custom_fields"))?;
    Ok(PollOption {
        id: row.get("id"),
        title: row.get("title"),
        image: row.get("image"),
        custom_fields,
        votes: row.get("votes"),
        win_rate: row.get("win_rate"),
    })
}
