// SPDX-License-Identifier: MIT
//! Streak tracker — per-(user, streak-type) consecutive-day state machine.
//!
//! Transition rule on a qualifying event dated `today`:
//! - no row yet            → create with current = best = 1
//! - last update == today  → no-op (duplicate same-day trigger)
//! - last update == today-1 → current += 1, best = max(best, current)
//! - otherwise             → current = 1, best unchanged
//!
//! Two same-user updates racing on stale state resolve last-writer-wins;
//! the engine accepts that for the rare gap-reset race instead of locking.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use crate::model::{StreakRow, StreakUpdate};

/// Write seam for streak state, substitutable in tests.
#[async_trait]
pub trait StreakTracker: Send + Sync {
    /// Advance the streak for one qualifying event and return the new state.
    async fn record(
        &self,
        user_id: &str,
        streak_type: &str,
        today: NaiveDate,
    ) -> Result<StreakUpdate>;

    /// Current state without advancing, if any exists.
    async fn get(&self, user_id: &str, streak_type: &str) -> Result<Option<StreakRow>>;
}

/// SQLite-backed tracker over `user_streaks` (created on first use).
pub struct SqliteStreakTracker {
    pool: SqlitePool,
}

impl SqliteStreakTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn ensure_table(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_streaks (
                id               TEXT PRIMARY KEY,
                user_id          TEXT NOT NULL,
                streak_type      TEXT NOT NULL,
                current_streak   INTEGER NOT NULL DEFAULT 0,
                best_streak      INTEGER NOT NULL DEFAULT 0,
                last_update_date TEXT NOT NULL,
                updated_at       TEXT NOT NULL,
                UNIQUE (user_id, streak_type)
            )",
        )
        .execute(&self.pool)
        .await
        .context("create user_streaks table")?;
        Ok(())
    }
}

#[async_trait]
impl StreakTracker for SqliteStreakTracker {
    async fn record(
        &self,
        user_id: &str,
        streak_type: &str,
        today: NaiveDate,
    ) -> Result<StreakUpdate> {
        self.ensure_table().await?;

        let existing = self.get(user_id, streak_type).await?;
        let today_str = today.format("%Y-%m-%d").to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let Some(row) = existing else {
            // First qualifying event for this dimension: best goes 0 → 1,
            // which counts as a record.
            sqlx::query(
                "INSERT OR IGNORE INTO user_streaks
                    (id, user_id, streak_type, current_streak, best_streak,
                     last_update_date, updated_at)
                 VALUES (?, ?, ?, 1, 1, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(streak_type)
            .bind(&today_str)
            .bind(&now)
            .execute(&self.pool)
            .await
            .context("insert streak row")?;
            return Ok(StreakUpdate {
                current_streak: 1,
                best_streak: 1,
                is_new_record: true,
            });
        };

        let last_update = match row.last_update() {
            Some(date) => date,
            None => {
                // Malformed date in the row: treat as a broken streak rather
                // than failing the whole evaluation.
                warn!(
                    user_id,
                    streak_type,
                    stored = %row.last_update_date,
                    "unparseable last_update_date, resetting streak"
                );
                today - chrono::Days::new(2)
            }
        };

        let days_gap = (today - last_update).num_days();
        if days_gap == 0 {
            return Ok(StreakUpdate {
                current_streak: row.current_streak,
                best_streak: row.best_streak,
                is_new_record: false,
            });
        }

        let new_current = if days_gap == 1 {
            row.current_streak + 1
        } else {
            1
        };
        let new_best = new_current.max(row.best_streak);

        sqlx::query(
            "UPDATE user_streaks
                SET current_streak = ?, best_streak = ?,
                    last_update_date = ?, updated_at = ?
              WHERE user_id = ? AND streak_type = ?",
        )
        .bind(new_current)
        .bind(new_best)
        .bind(&today_str)
        .bind(&now)
        .bind(user_id)
        .bind(streak_type)
        .execute(&self.pool)
        .await
        .context("update streak row")?;

        Ok(StreakUpdate {
            current_streak: new_current,
            best_streak: new_best,
            is_new_record: new_best > row.best_streak,
        })
    }

    async fn get(&self, user_id: &str, streak_type: &str) -> Result<Option<StreakRow>> {
        self.ensure_table().await?;
        sqlx::query_as(
            "SELECT id, user_id, streak_type, current_streak, best_streak,
                    last_update_date, updated_at
               FROM user_streaks
              WHERE user_id = ? AND streak_type = ?",
        )
        .bind(user_id)
        .bind(streak_type)
        .fetch_optional(&self.pool)
        .await
        .context("load streak row")
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
