// SPDX-License-Identifier: MIT
//! Predicate registry — one pure boolean rule per requirement kind.
//!
//! The dispatch table is an exhaustive `match` over [`RequirementKind`], so
//! adding a variant without binding a predicate is a compile error. Each
//! predicate pulls the minimum data it needs from the shared
//! [`PredicateContext`]; kinds whose product rules are unsettled are bound to
//! [`unsupported`] and never unlock.
//!
//! Window slack: consecutiveness is tested loosely — "N distinct qualifying
//! days inside a trailing window of N + slack days" — instead of an exact
//! consecutive-run query. The per-kind slack constants live next to their
//! predicates.

pub mod habits;
pub mod media;
pub mod meta;
pub mod nutrition;
pub mod social;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use std::future::Future;
use tracing::debug;

use crate::activity::{ActivityQueries, NutrientFilter};
use crate::catalog::RuleCatalog;
use crate::model::{AchievementDefinition, ActionEvent, RequirementKind, StatsSnapshot};

/// Everything a predicate may consult for one evaluation pass.
pub struct PredicateContext<'a> {
    pub user_id: &'a str,
    pub activity: &'a ActivityQueries,
    pub catalog: &'a dyn RuleCatalog,
    pub stats: &'a StatsSnapshot,
    /// Evaluation date from the injected clock.
    pub today: NaiveDate,
}

/// Evaluate one definition's requirement against the user's state.
///
/// Errors from the underlying store propagate to the orchestrator, which
/// forces the result to `false` and keeps evaluating siblings.
pub async fn holds(
    kind: RequirementKind,
    def: &AchievementDefinition,
    event: &ActionEvent,
    ctx: &PredicateContext<'_>,
) -> Result<bool> {
    use RequirementKind::*;

    let value = def.requirement_value;
    match kind {
        // Cumulative thresholds straight off the stats snapshot.
        AccountCreated => Ok(true),
        HabitsCreated => Ok(ctx.stats.habits_created >= value),
        TotalCompletions => Ok(ctx.stats.total_completions >= value),
        PhotosUploaded => Ok(ctx.stats.photos_uploaded >= value),
        VideosUploaded => Ok(ctx.stats.videos_uploaded >= value),
        TotalMedia => Ok(ctx.stats.total_media >= value),
        WeightLogs => Ok(ctx.stats.weight_logs >= value),
        NutritionLogs => Ok(ctx.stats.nutrition_logs >= value),
        BeforeAfterPairs => Ok(ctx.stats.before_after_pairs >= value),
        TotalPoints => Ok(ctx.stats.total_points >= value),

        // Habit activity.
        MorningCompletions => habits::morning_completions(ctx, event, value).await,
        MorningHabitStreak => habits::morning_habit_streak(ctx, value).await,
        EveningHabitStreak => habits::evening_habit_streak(ctx, value).await,
        RoutineConsistency => habits::routine_consistency(ctx, value).await,
        WeekendConsistency => habits::weekend_consistency(ctx, value).await,
        SingleHabitStreak => habits::single_habit_streak(ctx, value).await,
        MultiHabitStreaks => habits::multi_habit_streaks(ctx, value).await,
        SimultaneousStreaks => habits::simultaneous_streaks(ctx, value).await,
        YearlyConsistency => habits::yearly_consistency(ctx, value).await,
        PerfectConsistency => habits::perfect_consistency(ctx, value).await,
        WeeklyGoalsCompleted => habits::weekly_goals_completed(ctx, value).await,
        HabitCategories => habits::habit_categories(ctx, value).await,

        // Media uploads.
        BeforeUploads => media::typed_uploads(ctx, event, "before", ctx.stats.before_uploads, value),
        AfterUploads => media::typed_uploads(ctx, event, "after", ctx.stats.after_uploads, value),
        ProgressUploads => {
            media::typed_uploads(ctx, event, "progress", ctx.stats.progress_uploads, value)
        }
        WeeklyBeforeAfter => media::weekly_before_after(ctx, event).await,
        DescribedUploads => media::described_uploads(ctx, value).await,
        MonthlyVideoComparisons => media::monthly_video_comparisons(ctx, value).await,
        WeeklyPhotoStreak => media::weekly_photo_streak(ctx, value).await,
        WeeklyVideoStreak => media::weekly_video_streak(ctx, value).await,
        WeeklyUploadStreak => media::weekly_upload_streak(ctx, event, value).await,
        ProgressDayStreak => media::progress_day_streak(ctx, value).await,

        // Nutrition.
        FirstNutritionLog => nutrition::first_nutrition_log(ctx, event, value),
        CalorieTrackingWeek => nutrition::calorie_tracking_week(ctx, event, value).await,
        WaterTracking => {
            nutrition::tracked_nutrient(ctx, event, value, NutrientFilter::Water).await
        }
        FiberTracking => {
            nutrition::tracked_nutrient(ctx, event, value, NutrientFilter::Fiber).await
        }
        CarbTrackingStreak => {
            nutrition::tracked_nutrient(ctx, event, value, NutrientFilter::Carbs).await
        }
        FatBalanceStreak => {
            nutrition::tracked_nutrient(ctx, event, value, NutrientFilter::Fat).await
        }
        SugarTracking => {
            nutrition::tracked_nutrient(ctx, event, value, NutrientFilter::Sugar).await
        }
        NutritionTrackingMonth => nutrition::tracking_month(ctx, event, value).await,
        NutritionTrackingStreak => nutrition::tracking_streak(ctx, value).await,
        NutritionSuperStreak => nutrition::super_streak(ctx, event, value).await,
        MacroPerfectionCount => nutrition::macro_perfection_count(ctx, event, value).await,
        MacroPerfectStreak => nutrition::macro_perfect_streak(ctx, value).await,
        BalancedMacroStreak => nutrition::balanced_macro_streak(ctx, value).await,
        HydrationStreak => nutrition::hydration_streak(ctx, value).await,
        CustomRecipes => nutrition::custom_recipes(ctx, value).await,

        // Social / engagement.
        FriendsCount => social::friends_count(ctx, value).await,
        WeeklyRank => social::weekly_rank(ctx, value).await,
        TopFiveWeeks => social::top_five_weeks(ctx, value).await,
        StatsViews => social::view_count(ctx, "stats_view", value).await,
        ProgressViews => social::view_count(ctx, "progress_view", value).await,
        LeaderboardViews => social::view_count(ctx, "leaderboard_view", value).await,
        LoginStreak => social::login_streak(ctx, value).await,
        FeatureExploration => social::feature_exploration(ctx).await,
        EarlyEngagement => social::early_engagement(ctx, value).await,
        EarlyInvites => social::early_invites(ctx, value).await,
        CommitmentStreak => social::commitment_streak(ctx, value).await,

        // Challenges.
        DailyChallengesCompleted => meta::daily_challenges_completed(ctx, value).await,
        PerfectChallengeWeek => meta::perfect_challenge_week(ctx, value).await,
        NutritionChallenges => meta::nutrition_challenges(ctx, event, value).await,

        // Meta: derived from the unlock ledger.
        FastAchievements => meta::fast_achievements(ctx, value).await,
        DailyAchievementCount => meta::daily_achievement_count(ctx, value).await,
        DailyAchievementStreak => meta::daily_achievement_streak(ctx, value).await,
        WeeklyAchievementStreak => meta::weekly_achievement_streak(ctx, value).await,
        TotalAchievements => meta::total_achievements(ctx, value).await,
        AchievementsInTimeframe => meta::achievements_in_timeframe(ctx, value).await,
        AchievementRank => meta::achievement_rank(ctx, value).await,
        AchievementLeaderboard => meta::achievement_leaderboard(ctx).await,
        CategoryMastery => meta::category_mastery(ctx, &def.category).await,
        PerfectCategory => meta::perfect_category(ctx).await,
        Completionist => meta::completionist(ctx).await,

        // Deliberately inert kinds.
        HabitStreak | WeekendStreaks | StreakComeback | SeasonalEvent | MonthlyChallenge
        | ConsecutiveMonthly | AchievementCombo => Ok(unsupported(def)),
    }
}

/// Explicitly-unsupported kinds: present in the catalog, never unlock.
fn unsupported(def: &AchievementDefinition) -> bool {
    debug!(
        achievement_id = %def.id,
        requirement_type = %def.requirement_type,
        "requirement kind is not supported, skipping"
    );
    false
}

/// Trailing window start for "N qualifying days in N + slack days".
pub(crate) fn window_start(today: NaiveDate, required: i64, slack: i64) -> NaiveDate {
    let span = (required + slack).max(0) as u64;
    today - Days::new(span)
}

/// Scan trailing 7-day blocks (newest first) until `required` consecutive
/// blocks each report a positive count. Scans `required + scan_extra` blocks
/// before giving up.
pub(crate) async fn weekly_run_reaches<F, Fut>(
    today: NaiveDate,
    required: i64,
    scan_extra: i64,
    mut block_count: F,
) -> Result<bool>
where
    F: FnMut(NaiveDate, NaiveDate) -> Fut,
    Fut: Future<Output = Result<i64>>,
{
    if required <= 0 {
        return Ok(true);
    }
    let mut consecutive = 0;
    for i in 0..(required + scan_extra) {
        let start = today - Days::new((7 * i) as u64);
        let end = start + Days::new(6);
        if block_count(start, end).await? > 0 {
            consecutive += 1;
            if consecutive >= required {
                return Ok(true);
            }
        } else {
            consecutive = 0;
        }
    }
    Ok(false)
}

/// Sunday-aligned start of the calendar week containing `date`.
pub(crate) fn week_start(date: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    date - Days::new(date.weekday().num_days_from_sunday() as u64)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteRuleCatalog;
    use sqlx::SqlitePool;

    fn definition(kind_tag: &str, value: i64) -> AchievementDefinition {
        AchievementDefinition {
            id: format!("test_{kind_tag}"),
            name: kind_tag.to_string(),
            description: String::new(),
            category: "habits".to_string(),
            rarity: "common".to_string(),
            requirement_type: kind_tag.to_string(),
            requirement_value: value,
            points: 10,
            is_recurring: false,
            is_hidden: false,
        }
    }

    async fn bare_ctx_parts() -> (ActivityQueries, SqliteRuleCatalog) {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        (
            ActivityQueries::new(pool.clone()),
            SqliteRuleCatalog::new(pool),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
    }

    #[tokio::test]
    async fn stats_threshold_kinds_compare_snapshot() {
        let (activity, catalog) = bare_ctx_parts().await;
        let stats = StatsSnapshot {
            total_completions: 10,
            ..StatsSnapshot::default()
        };
        let ctx = PredicateContext {
            user_id: "u1",
            activity: &activity,
            catalog: &catalog,
            stats: &stats,
            today: today(),
        };
        let event = ActionEvent::bare(crate::model::ActionType::HabitCompletion);

        let met = holds(
            RequirementKind::TotalCompletions,
            &definition("total_completions", 10),
            &event,
            &ctx,
        )
        .await
        .unwrap();
        assert!(met);

        let unmet = holds(
            RequirementKind::TotalCompletions,
            &definition("total_completions", 11),
            &event,
            &ctx,
        )
        .await
        .unwrap();
        assert!(!unmet);
    }

    #[tokio::test]
    async fn account_created_always_holds() {
        let (activity, catalog) = bare_ctx_parts().await;
        let stats = StatsSnapshot::default();
        let ctx = PredicateContext {
            user_id: "u1",
            activity: &activity,
            catalog: &catalog,
            stats: &stats,
            today: today(),
        };
        let met = holds(
            RequirementKind::AccountCreated,
            &definition("account_created", 1),
            &ActionEvent::bare(crate::model::ActionType::General),
            &ctx,
        )
        .await
        .unwrap();
        assert!(met);
    }

    #[tokio::test]
    async fn unsupported_kinds_never_hold() {
        let (activity, catalog) = bare_ctx_parts().await;
        let stats = StatsSnapshot::default();
        let ctx = PredicateContext {
            user_id: "u1",
            activity: &activity,
            catalog: &catalog,
            stats: &stats,
            today: today(),
        };
        let event = ActionEvent::bare(crate::model::ActionType::HabitCompletion);

        for tag in ["habit_streak", "seasonal_event", "achievement_combo"] {
            let def = definition(tag, 1);
            let kind = def.kind().unwrap();
            assert!(!holds(kind, &def, &event, &ctx).await.unwrap(), "{tag}");
        }
    }

    #[test]
    fn window_start_applies_slack() {
        let start = window_start(today(), 7, 5);
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 7, 26).unwrap());
    }

    #[test]
    fn week_start_is_sunday_aligned() {
        // 2026-08-07 is a Friday; the week began Sunday 2026-08-02.
        assert_eq!(
            week_start(today()),
            NaiveDate::from_ymd_opt(2026, 8, 2).unwrap()
        );
        // A Sunday maps to itself.
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 2).unwrap();
        assert_eq!(week_start(sunday), sunday);
    }

    #[tokio::test]
    async fn weekly_run_counts_consecutive_blocks_only() {
        // Blocks: 1, 1, 0, 1 — longest run is 2.
        let counts = [1i64, 1, 0, 1];
        let mut i = 0;
        let reached = weekly_run_reaches(today(), 3, 2, |_, _| {
            let c = counts.get(i).copied().unwrap_or(0);
            i += 1;
            async move { Ok(c) }
        })
        .await
        .unwrap();
        assert!(!reached);

        let mut j = 0;
        let run = [1i64, 1, 1];
        let reached = weekly_run_reaches(today(), 3, 2, |_, _| {
            let c = run.get(j).copied().unwrap_or(0);
            j += 1;
            async move { Ok(c) }
        })
        .await
        .unwrap();
        assert!(reached);
    }
}
