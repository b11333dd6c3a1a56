// SPDX-License-Identifier: MIT
//! Daily challenge progress — per-(user, challenge, day) counters that feed
//! the challenge predicates and pay their own point rewards.
//!
//! Completion is exactly-once per (user, challenge, day): the completing
//! `UPDATE` is guarded by `is_completed = 0` and runs in the same transaction
//! as the point credit, so two rapid-fire events crossing the requirement
//! together cannot double-pay.

use anyhow::{Context as _, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::model::{CompletedChallenge, DailyChallenge};

/// Tracker over `user_daily_challenges` (created on first use).
pub struct DailyChallengeTracker {
    pool: SqlitePool,
}

impl DailyChallengeTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn ensure_table(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_daily_challenges (
                id             TEXT PRIMARY KEY,
                user_id        TEXT NOT NULL,
                challenge_id   TEXT NOT NULL,
                challenge_date TEXT NOT NULL,
                progress_count INTEGER NOT NULL DEFAULT 0,
                is_completed   INTEGER NOT NULL DEFAULT 0,
                points_earned  INTEGER NOT NULL DEFAULT 0,
                completed_at   TEXT,
                UNIQUE (user_id, challenge_id, challenge_date)
            )",
        )
        .execute(&self.pool)
        .await
        .context("create user_daily_challenges table")?;
        Ok(())
    }

    /// Active challenge templates for one dimension (`habits` | `media` |
    /// `nutrition`).
    async fn active_challenges(&self, dimension: &str) -> Result<Vec<DailyChallenge>> {
        sqlx::query_as(
            "SELECT id, requirement_type, requirement_value, points_reward,
                    category, is_active
               FROM daily_challenges
              WHERE is_active = 1 AND requirement_type = ?",
        )
        .bind(dimension)
        .fetch_all(&self.pool)
        .await
        .context("load active challenges")
    }

    /// Advance today's progress for every active challenge of `dimension` by
    /// `amount`, returning the challenges this event pushed to completion.
    pub async fn advance(
        &self,
        user_id: &str,
        dimension: &str,
        amount: i64,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<CompletedChallenge>> {
        self.ensure_table().await?;

        let today_str = today.format("%Y-%m-%d").to_string();
        let mut completed = Vec::new();

        for challenge in self.active_challenges(dimension).await? {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                "INSERT INTO user_daily_challenges
                    (id, user_id, challenge_id, challenge_date, progress_count)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT (user_id, challenge_id, challenge_date)
                 DO UPDATE SET progress_count = progress_count + excluded.progress_count",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(&challenge.id)
            .bind(&today_str)
            .bind(amount)
            .execute(&mut *tx)
            .await
            .context("upsert challenge progress")?;

            // Completes at most once: the guard on is_completed makes the
            // crossing event the only one that pays.
            let crossed = sqlx::query(
                "UPDATE user_daily_challenges
                    SET is_completed = 1, completed_at = ?, points_earned = ?
                  WHERE user_id = ? AND challenge_id = ? AND challenge_date = ?
                    AND is_completed = 0 AND progress_count >= ?",
            )
            .bind(now.to_rfc3339())
            .bind(challenge.points_reward)
            .bind(user_id)
            .bind(&challenge.id)
            .bind(&today_str)
            .bind(challenge.requirement_value)
            .execute(&mut *tx)
            .await
            .context("complete challenge")?
            .rows_affected();

            if crossed > 0 {
                if challenge.points_reward > 0 {
                    sqlx::query("UPDATE users SET points = points + ? WHERE id = ?")
                        .bind(challenge.points_reward)
                        .bind(user_id)
                        .execute(&mut *tx)
                        .await
                        .context("credit challenge reward")?;
                }
                completed.push(CompletedChallenge {
                    challenge_id: challenge.id.clone(),
                    challenge_date: today_str.clone(),
                    points_earned: challenge.points_reward,
                });
            }

            tx.commit().await?;
        }

        Ok(completed)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
