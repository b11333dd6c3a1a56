// SPDX-License-Identifier: MIT
//! Unlock ledger — at-most-once unlock plus exactly-once point credit.
//!
//! Correctness rests entirely on the store: `user_achievements` carries
//! `UNIQUE (user_id, achievement_id, period_key)`, and `try_unlock` does an
//! `INSERT OR IGNORE` inside one transaction with the point credit. A second
//! writer racing on the same (user, achievement) sees `rows_affected == 0`
//! and reports `AlreadyUnlocked` without crediting anything. No in-process
//! locking is used or needed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::model::{AchievementDefinition, UnlockRow};

/// Ledger failure. A uniqueness conflict is *not* an error — it is the
/// `AlreadyUnlocked` outcome.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Result of an unlock attempt.
#[derive(Debug, Clone)]
pub enum UnlockOutcome {
    /// The insert won; points were credited in the same transaction.
    Unlocked(UnlockRow),
    /// The row already existed (this call credited nothing).
    AlreadyUnlocked,
}

impl UnlockOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, UnlockOutcome::Unlocked(_))
    }
}

/// Write seam for the unlock ledger, substitutable in tests.
#[async_trait]
pub trait UnlockLedger: Send + Sync {
    /// Attempt a one-shot unlock (period key `""`).
    async fn try_unlock(
        &self,
        user_id: &str,
        definition: &AchievementDefinition,
        now: DateTime<Utc>,
    ) -> Result<UnlockOutcome, LedgerError>;

    /// Attempt a period-scoped unlock for a recurring definition.
    async fn try_unlock_period(
        &self,
        user_id: &str,
        definition: &AchievementDefinition,
        period_key: &str,
        now: DateTime<Utc>,
    ) -> Result<UnlockOutcome, LedgerError>;

    /// Unlock rows earned by the user on one calendar day.
    async fn unlocks_on_day(&self, user_id: &str, date: NaiveDate) -> Result<i64, LedgerError>;
}

/// SQLite-backed ledger over `user_achievements` (created on first use).
pub struct SqliteUnlockLedger {
    pool: SqlitePool,
}

impl SqliteUnlockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn ensure_table(&self) -> Result<(), LedgerError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_achievements (
                id             TEXT PRIMARY KEY,
                user_id        TEXT NOT NULL,
                achievement_id TEXT NOT NULL,
                period_key     TEXT NOT NULL DEFAULT '',
                points_earned  INTEGER NOT NULL DEFAULT 0,
                earned_at      TEXT NOT NULL,
                UNIQUE (user_id, achievement_id, period_key)
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_unlock(
        &self,
        user_id: &str,
        definition: &AchievementDefinition,
        period_key: &str,
        now: DateTime<Utc>,
    ) -> Result<UnlockOutcome, LedgerError> {
        self.ensure_table().await?;

        let row = UnlockRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            achievement_id: definition.id.clone(),
            period_key: period_key.to_string(),
            points_earned: definition.points,
            earned_at: now.to_rfc3339(),
        };

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO user_achievements
                (id, user_id, achievement_id, period_key, points_earned, earned_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.user_id)
        .bind(&row.achievement_id)
        .bind(&row.period_key)
        .bind(row.points_earned)
        .bind(&row.earned_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            // Uniqueness constraint rejected the insert: somebody (possibly
            // this same user double-firing) got here first.
            tx.rollback().await?;
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }

        if definition.points > 0 {
            let credited = sqlx::query("UPDATE users SET points = points + ? WHERE id = ?")
                .bind(definition.points)
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if credited == 0 {
                warn!(
                    user_id,
                    achievement_id = %definition.id,
                    "point credit target missing, unlock recorded without balance update"
                );
            }
        }

        tx.commit().await?;
        Ok(UnlockOutcome::Unlocked(row))
    }
}

#[async_trait]
impl UnlockLedger for SqliteUnlockLedger {
    async fn try_unlock(
        &self,
        user_id: &str,
        definition: &AchievementDefinition,
        now: DateTime<Utc>,
    ) -> Result<UnlockOutcome, LedgerError> {
        self.insert_unlock(user_id, definition, "", now).await
    }

    async fn try_unlock_period(
        &self,
        user_id: &str,
        definition: &AchievementDefinition,
        period_key: &str,
        now: DateTime<Utc>,
    ) -> Result<UnlockOutcome, LedgerError> {
        self.insert_unlock(user_id, definition, period_key, now).await
    }

    async fn unlocks_on_day(&self, user_id: &str, date: NaiveDate) -> Result<i64, LedgerError> {
        self.ensure_table().await?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_achievements
              WHERE user_id = ? AND date(earned_at) = ?",
        )
        .bind(user_id)
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
