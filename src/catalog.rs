// SPDX-License-Identifier: MIT
//! Rule catalog — read-only access to the `achievements` reference table.
//!
//! The engine never writes this table; it is seeded and migrated by the
//! application that owns the schema.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::model::AchievementDefinition;

/// Queryable view of the achievement definitions.
#[async_trait]
pub trait RuleCatalog: Send + Sync {
    /// Non-recurring definitions the user has not yet unlocked.
    /// This is the candidate set for one evaluation pass.
    async fn unearned_definitions(&self, user_id: &str) -> Result<Vec<AchievementDefinition>>;

    /// Look up one definition by its stable id.
    async fn definition(&self, achievement_id: &str) -> Result<Option<AchievementDefinition>>;

    /// Count of non-hidden definitions per category, for mastery rules.
    async fn non_hidden_by_category(&self) -> Result<Vec<(String, i64)>>;

    /// Total count of non-hidden definitions, for the completionist rule.
    async fn non_hidden_total(&self) -> Result<i64>;
}

/// SQLite-backed catalog.
pub struct SqliteRuleCatalog {
    pool: SqlitePool,
}

impl SqliteRuleCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleCatalog for SqliteRuleCatalog {
    async fn unearned_definitions(&self, user_id: &str) -> Result<Vec<AchievementDefinition>> {
        // Recurring definitions are excluded here: their period-scoped
        // unlocks are driven by the period key, not the unearned set.
        sqlx::query_as(
            "SELECT a.id, a.name, a.description, a.category, a.rarity,
                    a.requirement_type, a.requirement_value, a.points,
                    a.is_recurring, a.is_hidden
               FROM achievements a
          LEFT JOIN user_achievements ua
                 ON ua.achievement_id = a.id
                AND ua.user_id = ?
                AND ua.period_key = ''
              WHERE ua.id IS NULL
                AND a.is_recurring = 0",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("load unearned definitions")
    }

    async fn definition(&self, achievement_id: &str) -> Result<Option<AchievementDefinition>> {
        sqlx::query_as(
            "SELECT id, name, description, category, rarity,
                    requirement_type, requirement_value, points,
                    is_recurring, is_hidden
               FROM achievements
              WHERE id = ?",
        )
        .bind(achievement_id)
        .fetch_optional(&self.pool)
        .await
        .context("load definition by id")
    }

    async fn non_hidden_by_category(&self) -> Result<Vec<(String, i64)>> {
        sqlx::query_as(
            "SELECT category, COUNT(*)
               FROM achievements
              WHERE is_hidden = 0
           GROUP BY category",
        )
        .fetch_all(&self.pool)
        .await
        .context("count definitions by category")
    }

    async fn non_hidden_total(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM achievements WHERE is_hidden = 0")
            .fetch_one(&self.pool)
            .await
            .context("count non-hidden definitions")
    }
}
