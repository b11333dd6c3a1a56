// SPDX-License-Identifier: MIT
//! Windowed aggregate reads over the activity tables.
//!
//! Every predicate pulls the minimum data it needs through this struct:
//! distinct qualifying days in a trailing window, counts inside a calendar
//! block, cohort comparisons. Callers compute the window edges from the
//! injected clock and pass calendar dates in; no query reads `date('now')`,
//! which keeps the whole registry deterministic under test.

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use sqlx::SqlitePool;

/// Time-of-day band for habit-completion day counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBand {
    /// Strictly before 10:00 (morning completions).
    BeforeTen,
    /// At or before 08:00 (early-bird streaks).
    AtOrBeforeEight,
    /// At or after 18:00 (evening streaks).
    AtOrAfterSix,
}

impl TimeBand {
    fn sql_clause(self) -> &'static str {
        match self {
            TimeBand::BeforeTen => "time(completed_at) < '10:00:00'",
            TimeBand::AtOrBeforeEight => "time(completed_at) <= '08:00:00'",
            TimeBand::AtOrAfterSix => "time(completed_at) >= '18:00:00'",
        }
    }
}

/// Nutrient column a log row must have tracked for the day to qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NutrientFilter {
    Any,
    Calories,
    Water,
    Fiber,
    Carbs,
    Fat,
    Sugar,
}

impl NutrientFilter {
    fn sql_clause(self) -> &'static str {
        match self {
            NutrientFilter::Any => "1 = 1",
            NutrientFilter::Calories => "calories > 0",
            NutrientFilter::Water => "water_ml > 0",
            NutrientFilter::Fiber => "fiber_g > 0",
            NutrientFilter::Carbs => "carbs_g > 0",
            NutrientFilter::Fat => "fat_g > 0",
            NutrientFilter::Sugar => "sugar_g > 0",
        }
    }
}

/// Daily-rollup goal a `user_daily_nutrition` row must meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyGoal {
    /// Protein, carbs and fat goals all met.
    AllMacros,
    Water,
    /// Macro split inside the balanced bands (25/45/30 ± tolerance).
    BalancedSplit,
}

impl DailyGoal {
    fn sql_clause(self) -> &'static str {
        match self {
            DailyGoal::AllMacros => {
                "met_protein_goal = 1 AND met_carbs_goal = 1 AND met_fat_goal = 1"
            }
            DailyGoal::Water => "met_water_goal = 1",
            DailyGoal::BalancedSplit => {
                "ABS(protein_pct - 25.0) <= 2.5 \
                 AND ABS(carbs_pct - 45.0) <= 4.5 \
                 AND ABS(fat_pct - 30.0) <= 3.0"
            }
        }
    }
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Shared read layer for the predicate registry.
pub struct ActivityQueries {
    pool: SqlitePool,
}

impl ActivityQueries {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ─── Habit completions ───────────────────────────────────────────────────

    /// Distinct calendar days with at least one completion on/after `since`.
    pub async fn completion_days_since(&self, user_id: &str, since: NaiveDate) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT date(completed_at))
               FROM habit_completions
              WHERE user_id = ? AND date(completed_at) >= ?",
        )
        .bind(user_id)
        .bind(day(since))
        .fetch_one(&self.pool)
        .await
        .context("completion days in window")
    }

    /// Like [`Self::completion_days_since`] but restricted to a time band.
    pub async fn completion_days_in_band(
        &self,
        user_id: &str,
        since: NaiveDate,
        band: TimeBand,
    ) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(DISTINCT date(completed_at))
               FROM habit_completions
              WHERE user_id = ? AND date(completed_at) >= ? AND {}",
            band.sql_clause()
        );
        sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(day(since))
            .fetch_one(&self.pool)
            .await
            .context("banded completion days")
    }

    /// All-time count of completions logged before 10:00.
    pub async fn morning_completion_count(&self, user_id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*)
               FROM habit_completions
              WHERE user_id = ? AND time(completed_at) < '10:00:00'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("morning completion count")
    }

    /// Best per-habit distinct-day count on/after `since`.
    pub async fn max_single_habit_days(&self, user_id: &str, since: NaiveDate) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(day_count), 0) FROM (
                SELECT COUNT(DISTINCT date(completed_at)) AS day_count
                  FROM habit_completions
                 WHERE user_id = ? AND date(completed_at) >= ?
              GROUP BY habit_id
             )",
        )
        .bind(user_id)
        .bind(day(since))
        .fetch_one(&self.pool)
        .await
        .context("max single-habit days")
    }

    /// Habits with at least `min_days` distinct completion days since `since`.
    pub async fn habits_with_min_days(
        &self,
        user_id: &str,
        since: NaiveDate,
        min_days: i64,
    ) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM (
                SELECT habit_id
                  FROM habit_completions
                 WHERE user_id = ? AND date(completed_at) >= ?
              GROUP BY habit_id
                HAVING COUNT(DISTINCT date(completed_at)) >= ?
             )",
        )
        .bind(user_id)
        .bind(day(since))
        .bind(min_days)
        .fetch_one(&self.pool)
        .await
        .context("habits meeting day minimum")
    }

    /// Days since `since` where some habit was completed and the same habit
    /// was also completed the following day.
    pub async fn routine_consistent_days(&self, user_id: &str, since: NaiveDate) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT date(hc1.completed_at))
               FROM habit_completions hc1
              WHERE hc1.user_id = ? AND date(hc1.completed_at) >= ?
                AND EXISTS (
                    SELECT 1 FROM habit_completions hc2
                     WHERE hc2.user_id = hc1.user_id
                       AND hc2.habit_id = hc1.habit_id
                       AND date(hc2.completed_at) = date(hc1.completed_at, '+1 day')
                )",
        )
        .bind(user_id)
        .bind(day(since))
        .fetch_one(&self.pool)
        .await
        .context("routine-consistent days")
    }

    /// Days since `since` on which every habit the user had already created
    /// was completed at least once.
    pub async fn perfect_completion_days(&self, user_id: &str, since: NaiveDate) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT date(hc1.completed_at))
               FROM habit_completions hc1
              WHERE hc1.user_id = ? AND date(hc1.completed_at) >= ?
                AND NOT EXISTS (
                    SELECT 1 FROM habits h
                     WHERE h.user_id = hc1.user_id
                       AND date(h.created_at) <= date(hc1.completed_at)
                       AND NOT EXISTS (
                           SELECT 1 FROM habit_completions hc2
                            WHERE hc2.habit_id = h.id
                              AND date(hc2.completed_at) = date(hc1.completed_at)
                       )
                )",
        )
        .bind(user_id)
        .bind(day(since))
        .fetch_one(&self.pool)
        .await
        .context("perfect completion days")
    }

    /// Calendar weeks (all time) containing both a Saturday and a Sunday
    /// completion.
    pub async fn full_weekend_weeks(&self, user_id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM (
                SELECT strftime('%Y-%W', completed_at) AS week
                  FROM habit_completions
                 WHERE user_id = ? AND strftime('%w', completed_at) IN ('0', '6')
              GROUP BY week
                HAVING COUNT(DISTINCT strftime('%w', completed_at)) = 2
             )",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("full weekend weeks")
    }

    /// (habit, week) pairs whose completion count reached the habit's weekly
    /// target.
    pub async fn weekly_goals_met(&self, user_id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM (
                SELECT h.id
                  FROM habit_completions hc
                  JOIN habits h ON h.id = hc.habit_id
                 WHERE h.user_id = ?
              GROUP BY h.id, strftime('%Y-%W', hc.completed_at)
                HAVING COUNT(*) >= h.weekly_target
             )",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("weekly goals met")
    }

    /// All habit names for the variety rule.
    pub async fn habit_names(&self, user_id: &str) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT name FROM habits WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("habit names")
    }

    /// Completion points earned in a calendar block, for cohort ranking.
    pub async fn completion_points_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(points), 0)
               FROM habit_completions
              WHERE user_id = ? AND date(completed_at) BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(day(start))
        .bind(day(end))
        .fetch_one(&self.pool)
        .await
        .context("completion points in block")
    }

    /// 1-based rank of the user by completion points inside a block:
    /// one plus the number of users with a strictly higher total.
    pub async fn completion_rank_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64> {
        let mine = self
            .completion_points_between(user_id, start, end)
            .await?;
        let better: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM (
                SELECT user_id
                  FROM habit_completions
                 WHERE date(completed_at) BETWEEN ? AND ? AND user_id != ?
              GROUP BY user_id
                HAVING COALESCE(SUM(points), 0) > ?
             )",
        )
        .bind(day(start))
        .bind(day(end))
        .bind(user_id)
        .bind(mine)
        .fetch_one(&self.pool)
        .await
        .context("completion rank in block")?;
        Ok(better + 1)
    }

    // ─── Media uploads ───────────────────────────────────────────────────────

    /// Distinct upload days on/after `since`.
    pub async fn media_days_since(&self, user_id: &str, since: NaiveDate) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT date(uploaded_at))
               FROM media_uploads
              WHERE user_id = ? AND date(uploaded_at) >= ?",
        )
        .bind(user_id)
        .bind(day(since))
        .fetch_one(&self.pool)
        .await
        .context("media upload days")
    }

    /// Upload count inside a calendar block, optionally restricted to a MIME
    /// class prefix (`"image/"` or `"video/"`).
    pub async fn media_count_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        file_class: Option<&str>,
    ) -> Result<i64> {
        let sql = match file_class {
            Some(_) => {
                "SELECT COUNT(*) FROM media_uploads
                  WHERE user_id = ? AND date(uploaded_at) BETWEEN ? AND ?
                    AND file_type LIKE ? || '%'"
            }
            None => {
                "SELECT COUNT(*) FROM media_uploads
                  WHERE user_id = ? AND date(uploaded_at) BETWEEN ? AND ?"
            }
        };
        let mut query = sqlx::query_scalar(sql)
            .bind(user_id)
            .bind(day(start))
            .bind(day(end));
        if let Some(class) = file_class {
            query = query.bind(class);
        }
        query
            .fetch_one(&self.pool)
            .await
            .context("media count in block")
    }

    /// Photo uploads in a block as (count, first day, last day).
    pub async fn photo_span_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(i64, Option<String>, Option<String>)> {
        sqlx::query_as(
            "SELECT COUNT(*), MIN(date(uploaded_at)), MAX(date(uploaded_at))
               FROM media_uploads
              WHERE user_id = ? AND file_type LIKE 'image/%'
                AND date(uploaded_at) BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(day(start))
        .bind(day(end))
        .fetch_one(&self.pool)
        .await
        .context("photo span in block")
    }

    /// Uploads with a non-empty description.
    pub async fn described_upload_count(&self, user_id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*)
               FROM media_uploads
              WHERE user_id = ? AND description IS NOT NULL AND description != ''",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("described upload count")
    }

    /// Distinct months containing a before/after comparison video.
    pub async fn comparison_video_months(&self, user_id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT strftime('%Y-%m', uploaded_at))
               FROM media_uploads
              WHERE user_id = ? AND file_type LIKE 'video/%'
                AND media_type IN ('before', 'after')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("comparison video months")
    }

    // ─── Nutrition logs ──────────────────────────────────────────────────────

    /// Distinct logging days on/after `since` where the filtered nutrient was
    /// tracked.
    pub async fn nutrition_days_since(
        &self,
        user_id: &str,
        since: NaiveDate,
        filter: NutrientFilter,
    ) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(DISTINCT date(logged_at))
               FROM user_nutrition_logs
              WHERE user_id = ? AND date(logged_at) >= ? AND {}",
            filter.sql_clause()
        );
        sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(day(since))
            .fetch_one(&self.pool)
            .await
            .context("nutrition tracking days")
    }

    /// All-time days on which every macro was logged in meaningful amounts.
    pub async fn macro_perfection_days(&self, user_id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT date(logged_at))
               FROM user_nutrition_logs
              WHERE user_id = ? AND protein_g > 20 AND carbs_g > 30 AND fat_g > 10",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("macro perfection days")
    }

    /// Distinct custom recipe names logged by the user.
    pub async fn custom_recipe_count(&self, user_id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT food_name)
               FROM user_nutrition_logs
              WHERE user_id = ? AND is_custom_recipe = 1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("custom recipe count")
    }

    /// Days on/after `since` whose daily rollup met `goal`.
    pub async fn daily_goal_days_since(
        &self,
        user_id: &str,
        since: NaiveDate,
        goal: DailyGoal,
    ) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*)
               FROM user_daily_nutrition
              WHERE user_id = ? AND log_date >= ? AND {}",
            goal.sql_clause()
        );
        sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(day(since))
            .fetch_one(&self.pool)
            .await
            .context("daily goal days")
    }

    // ─── Activity log / social ───────────────────────────────────────────────

    /// All-time count of one activity type (stats_view, progress_view, ...).
    pub async fn activity_count(&self, user_id: &str, activity_type: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*)
               FROM user_activity_log
              WHERE user_id = ? AND activity_type = ?",
        )
        .bind(user_id)
        .bind(activity_type)
        .fetch_one(&self.pool)
        .await
        .context("activity type count")
    }

    /// Distinct login days on/after `since`.
    pub async fn login_days_since(&self, user_id: &str, since: NaiveDate) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT date(created_at))
               FROM user_activity_log
              WHERE user_id = ? AND activity_type = 'login' AND date(created_at) >= ?",
        )
        .bind(user_id)
        .bind(day(since))
        .fetch_one(&self.pool)
        .await
        .context("login days since")
    }

    /// Distinct login days inside a calendar block.
    pub async fn login_days_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT date(created_at))
               FROM user_activity_log
              WHERE user_id = ? AND activity_type = 'login'
                AND date(created_at) BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(day(start))
        .bind(day(end))
        .fetch_one(&self.pool)
        .await
        .context("login days in block")
    }

    /// Distinct core features exercised on `date` (habit creation, media
    /// upload, nutrition log, achievement view).
    pub async fn core_features_used_on(&self, user_id: &str, date: NaiveDate) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT activity_type)
               FROM user_activity_log
              WHERE user_id = ?
                AND activity_type IN
                    ('habit_creation', 'media_upload', 'nutrition_log', 'achievement_view')
                AND date(created_at) = ?",
        )
        .bind(user_id)
        .bind(day(date))
        .fetch_one(&self.pool)
        .await
        .context("core features used")
    }

    /// Accepted friendships touching the user.
    pub async fn accepted_friend_count(&self, user_id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*)
               FROM friendships
              WHERE (user_id = ? OR friend_id = ?) AND status = 'accepted'",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("accepted friend count")
    }

    /// Friend requests the user sent inside a calendar block.
    pub async fn friendships_initiated_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*)
               FROM friendships
              WHERE user_id = ? AND date(created_at) BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(day(start))
        .bind(day(end))
        .fetch_one(&self.pool)
        .await
        .context("friendships initiated in block")
    }

    /// Accepted friends holding strictly more unlocks than `unlock_count`.
    pub async fn friends_with_more_unlocks(
        &self,
        user_id: &str,
        unlock_count: i64,
    ) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM (
                SELECT CASE WHEN user_id = ?1 THEN friend_id ELSE user_id END AS fid
                  FROM friendships
                 WHERE (user_id = ?1 OR friend_id = ?1) AND status = 'accepted'
             ) cohort
             WHERE (SELECT COUNT(*) FROM user_achievements ua
                     WHERE ua.user_id = cohort.fid) > ?2",
        )
        .bind(user_id)
        .bind(unlock_count)
        .fetch_one(&self.pool)
        .await
        .context("friends with more unlocks")
    }

    // ─── Unlock ledger reads (meta predicates) ───────────────────────────────

    /// Total unlock rows for the user.
    pub async fn unlock_total(&self, user_id: &str) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM user_achievements WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .context("total unlock count")
    }

    /// Unlock rows earned on one calendar day.
    pub async fn unlocks_on_day(&self, user_id: &str, date: NaiveDate) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_achievements
              WHERE user_id = ? AND date(earned_at) = ?",
        )
        .bind(user_id)
        .bind(day(date))
        .fetch_one(&self.pool)
        .await
        .context("unlocks on day")
    }

    /// Distinct unlock days on/after `since`.
    pub async fn unlock_days_since(&self, user_id: &str, since: NaiveDate) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT date(earned_at))
               FROM user_achievements
              WHERE user_id = ? AND date(earned_at) >= ?",
        )
        .bind(user_id)
        .bind(day(since))
        .fetch_one(&self.pool)
        .await
        .context("unlock days since")
    }

    /// Unlock rows inside a calendar block.
    pub async fn unlocks_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_achievements
              WHERE user_id = ? AND date(earned_at) BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(day(start))
        .bind(day(end))
        .fetch_one(&self.pool)
        .await
        .context("unlocks in block")
    }

    /// Non-hidden unlocks for the user, optionally scoped to one category.
    pub async fn non_hidden_unlocks(
        &self,
        user_id: &str,
        category: Option<&str>,
    ) -> Result<i64> {
        let sql = match category {
            Some(_) => {
                "SELECT COUNT(*)
                   FROM user_achievements ua
                   JOIN achievements a ON a.id = ua.achievement_id
                  WHERE ua.user_id = ? AND a.is_hidden = 0 AND a.category = ?"
            }
            None => {
                "SELECT COUNT(*)
                   FROM user_achievements ua
                   JOIN achievements a ON a.id = ua.achievement_id
                  WHERE ua.user_id = ? AND a.is_hidden = 0"
            }
        };
        let mut query = sqlx::query_scalar(sql).bind(user_id);
        if let Some(cat) = category {
            query = query.bind(cat);
        }
        query
            .fetch_one(&self.pool)
            .await
            .context("non-hidden unlock count")
    }

    // ─── Daily challenges ────────────────────────────────────────────────────

    /// Completed challenge rows, optionally scoped to a challenge category.
    pub async fn completed_challenges(
        &self,
        user_id: &str,
        category: Option<&str>,
    ) -> Result<i64> {
        let sql = match category {
            Some(_) => {
                "SELECT COUNT(*)
                   FROM user_daily_challenges udc
                   JOIN daily_challenges dc ON dc.id = udc.challenge_id
                  WHERE udc.user_id = ? AND udc.is_completed = 1 AND dc.category = ?"
            }
            None => {
                "SELECT COUNT(*)
                   FROM user_daily_challenges
                  WHERE user_id = ? AND is_completed = 1"
            }
        };
        let mut query = sqlx::query_scalar(sql).bind(user_id);
        if let Some(cat) = category {
            query = query.bind(cat);
        }
        query
            .fetch_one(&self.pool)
            .await
            .context("completed challenge count")
    }

    /// Calendar weeks in which every started challenge was completed.
    pub async fn perfect_challenge_weeks(&self, user_id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM (
                SELECT strftime('%Y-%W', challenge_date) AS week
                  FROM user_daily_challenges
                 WHERE user_id = ?
              GROUP BY week
                HAVING COUNT(*) > 0 AND COUNT(*) = SUM(is_completed)
             )",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("perfect challenge weeks")
    }
}
