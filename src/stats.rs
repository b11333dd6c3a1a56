// SPDX-License-Identifier: MIT
//! Stats aggregator — point-in-time rollups of a user's cumulative activity.
//!
//! Pure reads over the domain tables. A user with zero history (or no user
//! row at all) yields an all-zero snapshot, never an error: most first-session
//! evaluations happen before any activity rows exist.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::model::StatsSnapshot;

/// Read seam for the stats rollup, substitutable in tests.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn snapshot(&self, user_id: &str) -> Result<StatsSnapshot>;
}

/// SQLite-backed aggregator over the domain tables
/// (`users`, `habits`, `habit_completions`, `media_uploads`,
/// `user_nutrition_logs`, `user_weight_logs`).
pub struct SqliteStatsSource {
    pool: SqlitePool,
}

impl SqliteStatsSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str, user_id: &str) -> Result<i64> {
        sqlx::query_scalar(sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("stats count query: {sql}"))
    }
}

#[async_trait]
impl StatsSource for SqliteStatsSource {
    async fn snapshot(&self, user_id: &str) -> Result<StatsSnapshot> {
        // Point total and account age come from the user row; absent row
        // means a brand-new or unknown user and is treated as empty history.
        let user_row: Option<(i64, String)> =
            sqlx::query_as("SELECT points, created_at FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .context("stats user row")?;
        let (total_points, account_created_at) = match user_row {
            Some((points, created_at)) => (points, Some(created_at)),
            None => (0, None),
        };

        let habits_created = self
            .count("SELECT COUNT(*) FROM habits WHERE user_id = ?", user_id)
            .await?;
        let total_completions = self
            .count(
                "SELECT COUNT(*) FROM habit_completions WHERE user_id = ?",
                user_id,
            )
            .await?;
        let photos_uploaded = self
            .count(
                "SELECT COUNT(*) FROM media_uploads WHERE user_id = ? AND file_type LIKE 'image/%'",
                user_id,
            )
            .await?;
        let videos_uploaded = self
            .count(
                "SELECT COUNT(*) FROM media_uploads WHERE user_id = ? AND file_type LIKE 'video/%'",
                user_id,
            )
            .await?;
        let total_media = self
            .count(
                "SELECT COUNT(*) FROM media_uploads WHERE user_id = ?",
                user_id,
            )
            .await?;
        let before_uploads = self
            .count(
                "SELECT COUNT(*) FROM media_uploads WHERE user_id = ? AND media_type = 'before'",
                user_id,
            )
            .await?;
        let after_uploads = self
            .count(
                "SELECT COUNT(*) FROM media_uploads WHERE user_id = ? AND media_type = 'after'",
                user_id,
            )
            .await?;
        let progress_uploads = self
            .count(
                "SELECT COUNT(*) FROM media_uploads WHERE user_id = ? AND media_type = 'progress'",
                user_id,
            )
            .await?;
        let nutrition_logs = self
            .count(
                "SELECT COUNT(*) FROM user_nutrition_logs WHERE user_id = ?",
                user_id,
            )
            .await?;
        let weight_logs = self
            .count(
                "SELECT COUNT(*) FROM user_weight_logs WHERE user_id = ?",
                user_id,
            )
            .await?;

        // A pair is a `before` upload answered by an `after` upload within
        // seven days. Counted on the `before` side so re-used afters do not
        // inflate the tally.
        let before_after_pairs: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
               FROM media_uploads m1
              WHERE m1.user_id = ?
                AND m1.media_type = 'before'
                AND EXISTS (
                    SELECT 1 FROM media_uploads m2
                     WHERE m2.user_id = m1.user_id
                       AND m2.media_type = 'after'
                       AND m2.uploaded_at > m1.uploaded_at
                       AND julianday(m2.uploaded_at) - julianday(m1.uploaded_at) <= 7
                )",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("stats before/after pairs")?;

        Ok(StatsSnapshot {
            habits_created,
            total_completions,
            photos_uploaded,
            videos_uploaded,
            total_media,
            before_uploads,
            after_uploads,
            progress_uploads,
            nutrition_logs,
            weight_logs,
            before_after_pairs,
            total_points,
            account_created_at,
        })
    }
}
