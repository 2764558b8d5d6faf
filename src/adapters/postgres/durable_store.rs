//! PostgreSQL implementation of the durable tier.
//!
//! Two tables:
//! - `offer_events`: append-only rows, unique on (session_id, round,
//!   actor) so orchestrator retries are idempotent
//! - `session_summaries`: one row per closed session, insert-once
//!
//! Every statement runs under the durable-tier deadline.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::domain::foundation::{DomainError, ProductId, SessionId, Timestamp};
use crate::domain::negotiation::{Actor, NegotiationState, Tactic};
use crate::ports::{DurableStore, OfferEvent, SessionSummary};

/// PostgreSQL implementation of [`DurableStore`].
#[derive(Clone)]
pub struct PgDurableStore {
    pool: PgPool,
    op_timeout: Duration,
}

impl PgDurableStore {
    /// Creates the store over an established pool.
    pub fn new(pool: PgPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    /// Creates the audit tables when they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS offer_events (
                session_id TEXT NOT NULL,
                buyer_ref  TEXT NOT NULL,
                round      INTEGER NOT NULL,
                actor      TEXT NOT NULL,
                price      BIGINT NOT NULL,
                message    TEXT NOT NULL DEFAULT '',
                tactic     TEXT,
                bot_score  DOUBLE PRECISION NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL,
                UNIQUE (session_id, round, actor)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS offer_events_buyer_ref_idx ON offer_events (buyer_ref)",
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_summaries (
                session_id   TEXT PRIMARY KEY,
                product_id   TEXT NOT NULL,
                buyer_ref    TEXT NOT NULL,
                state        TEXT NOT NULL,
                rounds       INTEGER NOT NULL,
                agreed_price BIGINT,
                bot_score    DOUBLE PRECISION NOT NULL DEFAULT 0,
                degraded     BOOLEAN NOT NULL DEFAULT FALSE,
                created_at   TIMESTAMPTZ NOT NULL,
                closed_at    TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS session_summaries_buyer_ref_idx ON session_summaries (buyer_ref)",
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, DomainError>
    where
        F: std::future::Future<Output = Result<T, DomainError>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::degraded(format!(
                "durable store deadline of {:?} exceeded",
                self.op_timeout
            ))),
        }
    }
}

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::degraded(format!("durable store error: {}", e))
}

fn state_from_str(s: &str) -> Result<NegotiationState, DomainError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| DomainError::internal(format!("corrupt state tag '{}'", s)))
}

fn actor_from_str(s: &str) -> Result<Actor, DomainError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| DomainError::internal(format!("corrupt actor tag '{}'", s)))
}

fn tactic_from_str(s: &str) -> Result<Tactic, DomainError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| DomainError::internal(format!("corrupt tactic tag '{}'", s)))
}

#[async_trait]
impl DurableStore for PgDurableStore {
    async fn append_offer_event(&self, event: &OfferEvent) -> Result<(), DomainError> {
        let pool = self.pool.clone();
        let event = event.clone();
        self.bounded(async move {
            sqlx::query(
                r#"
                INSERT INTO offer_events (
                    session_id, buyer_ref, round, actor, price, message,
                    tactic, bot_score, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (session_id, round, actor) DO NOTHING
                "#,
            )
            .bind(event.session_id.to_string())
            .bind(&event.buyer_ref)
            .bind(event.round as i32)
            .bind(event.actor.as_str())
            .bind(event.price)
            .bind(&event.message)
            .bind(event.tactic.map(|t| t.as_str()))
            .bind(event.bot_score)
            .bind(event.timestamp.as_datetime())
            .execute(&pool)
            .await
            .map_err(db_error)?;
            Ok(())
        })
        .await
    }

    async fn write_summary(&self, summary: &SessionSummary) -> Result<(), DomainError> {
        let pool = self.pool.clone();
        let summary = summary.clone();
        self.bounded(async move {
            sqlx::query(
                r#"
                INSERT INTO session_summaries (
                    session_id, product_id, buyer_ref, state, rounds,
                    agreed_price, bot_score, degraded, created_at, closed_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (session_id) DO NOTHING
                "#,
            )
            .bind(summary.session_id.to_string())
            .bind(summary.product_id.as_str())
            .bind(&summary.buyer_ref)
            .bind(summary.state.as_str())
            .bind(summary.rounds as i32)
            .bind(summary.agreed_price)
            .bind(summary.bot_score)
            .bind(summary.degraded)
            .bind(summary.created_at.as_datetime())
            .bind(summary.closed_at.as_datetime())
            .execute(&pool)
            .await
            .map_err(db_error)?;
            Ok(())
        })
        .await
    }

    async fn load_summary(&self, id: &SessionId) -> Result<Option<SessionSummary>, DomainError> {
        let pool = self.pool.clone();
        let id = *id;
        self.bounded(async move {
            let row = sqlx::query(
                r#"
                SELECT session_id, product_id, buyer_ref, state, rounds,
                       agreed_price, bot_score, degraded, created_at, closed_at
                FROM session_summaries WHERE session_id = $1
                "#,
            )
            .bind(id.to_string())
            .fetch_optional(&pool)
            .await
            .map_err(db_error)?;

            let Some(row) = row else {
                return Ok(None);
            };

            let session_id: String = row.try_get("session_id").map_err(db_error)?;
            let product_id: String = row.try_get("product_id").map_err(db_error)?;
            let state: String = row.try_get("state").map_err(db_error)?;
            let rounds: i32 = row.try_get("rounds").map_err(db_error)?;
            let created_at: chrono::DateTime<chrono::Utc> =
                row.try_get("created_at").map_err(db_error)?;
            let closed_at: chrono::DateTime<chrono::Utc> =
                row.try_get("closed_at").map_err(db_error)?;

            Ok(Some(SessionSummary {
                session_id: SessionId::parse(&session_id)
                    .map_err(|e| DomainError::internal(e.to_string()))?,
                product_id: ProductId::new(product_id)
                    .map_err(|e| DomainError::internal(e.to_string()))?,
                buyer_ref: row.try_get("buyer_ref").map_err(db_error)?,
                state: state_from_str(&state)?,
                rounds: rounds as u32,
                agreed_price: row.try_get("agreed_price").map_err(db_error)?,
                bot_score: row.try_get("bot_score").map_err(db_error)?,
                degraded: row.try_get("degraded").map_err(db_error)?,
                created_at: Timestamp::from_datetime(created_at),
                closed_at: Timestamp::from_datetime(closed_at),
            }))
        })
        .await
    }

    async fn list_events(&self, id: &SessionId) -> Result<Vec<OfferEvent>, DomainError> {
        let pool = self.pool.clone();
        let id = *id;
        self.bounded(async move {
            let rows = sqlx::query(
                r#"
                SELECT session_id, buyer_ref, round, actor, price, message,
                       tactic, bot_score, created_at
                FROM offer_events WHERE session_id = $1
                ORDER BY round, actor
                "#,
            )
            .bind(id.to_string())
            .fetch_all(&pool)
            .await
            .map_err(db_error)?;

            let mut events = Vec::with_capacity(rows.len());
            for row in rows {
                let session_id: String = row.try_get("session_id").map_err(db_error)?;
                let round: i32 = row.try_get("round").map_err(db_error)?;
                let actor: String = row.try_get("actor").map_err(db_error)?;
                let tactic: Option<String> = row.try_get("tactic").map_err(db_error)?;
                let created_at: chrono::DateTime<chrono::Utc> =
                    row.try_get("created_at").map_err(db_error)?;

                events.push(OfferEvent {
                    session_id: SessionId::parse(&session_id)
                        .map_err(|e| DomainError::internal(e.to_string()))?,
                    buyer_ref: row.try_get("buyer_ref").map_err(db_error)?,
                    round: round as u32,
                    actor: actor_from_str(&actor)?,
                    price: row.try_get("price").map_err(db_error)?,
                    message: row.try_get("message").map_err(db_error)?,
                    tactic: tactic.as_deref().map(tactic_from_str).transpose()?,
                    bot_score: row.try_get("bot_score").map_err(db_error)?,
                    timestamp: Timestamp::from_datetime(created_at),
                });
            }
            Ok(events)
        })
        .await
    }
}

impl std::fmt::Debug for PgDurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDurableStore")
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}
