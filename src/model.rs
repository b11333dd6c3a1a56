// SPDX-License-Identifier: MIT
//! Engine data models — achievement definitions, requirement kinds, and the
//! serialisable results returned to the calling handlers.
//!
//! Achievement IDs are stable snake_case string slugs (e.g. `"first_habit"`,
//! `"achievement_spree"`). They never change across releases; all cross-table
//! references and the combo configuration use them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Action types ─────────────────────────────────────────────────────────────

/// The activity event that triggered an evaluation.
///
/// Handlers emit one of these after the primary action succeeds (e.g. after a
/// habit completion row is written, evaluate with `HabitCompletion`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    HabitCompletion,
    MediaUpload,
    VideoUpload,
    NutritionLog,
    Login,
    HabitCreation,
    ChallengeCompletion,
    /// Catch-all for events with no dedicated trigger semantics.
    General,
}

impl ActionType {
    /// Streak dimension advanced by this action, if any.
    pub fn streak_type(self) -> Option<&'static str> {
        match self {
            ActionType::Login => Some("daily_login"),
            ActionType::HabitCompletion => Some("habit_completion"),
            _ => None,
        }
    }

    /// Daily-challenge dimension advanced by this action, if any.
    pub fn challenge_dimension(self) -> Option<&'static str> {
        match self {
            ActionType::HabitCompletion => Some("habits"),
            ActionType::MediaUpload | ActionType::VideoUpload => Some("media"),
            ActionType::NutritionLog => Some("nutrition"),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::HabitCompletion => "habit_completion",
            ActionType::MediaUpload => "media_upload",
            ActionType::VideoUpload => "video_upload",
            ActionType::NutritionLog => "nutrition_log",
            ActionType::Login => "login",
            ActionType::HabitCreation => "habit_creation",
            ActionType::ChallengeCompletion => "challenge_completion",
            ActionType::General => "general",
        }
    }
}

/// An activity event: the action type plus whatever structured payload the
/// emitting handler attached (e.g. `{"time": "...", "media_type": "before"}`).
#[derive(Debug, Clone)]
pub struct ActionEvent {
    pub action_type: ActionType,
    pub data: serde_json::Value,
}

impl ActionEvent {
    pub fn new(action_type: ActionType, data: serde_json::Value) -> Self {
        Self { action_type, data }
    }

    /// Event with no payload.
    pub fn bare(action_type: ActionType) -> Self {
        Self {
            action_type,
            data: serde_json::Value::Null,
        }
    }

    /// String field from the payload, if present.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}

// ─── Requirement kinds ────────────────────────────────────────────────────────

/// Closed set of requirement kinds an [`AchievementDefinition`] can carry.
///
/// The definition row stores the kind as a TEXT tag; [`RequirementKind::from_tag`]
/// parses it. An unrecognized tag parses to `None` and the definition fails
/// closed (never unlocks, never aborts sibling evaluation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementKind {
    // Cumulative counts served by the stats snapshot.
    AccountCreated,
    HabitsCreated,
    TotalCompletions,
    PhotosUploaded,
    VideosUploaded,
    TotalMedia,
    WeightLogs,
    NutritionLogs,
    BeforeAfterPairs,
    TotalPoints,
    BeforeUploads,
    AfterUploads,
    ProgressUploads,
    FirstNutritionLog,

    // Habit activity over trailing windows.
    MorningCompletions,
    MorningHabitStreak,
    EveningHabitStreak,
    RoutineConsistency,
    WeekendConsistency,
    SingleHabitStreak,
    MultiHabitStreaks,
    SimultaneousStreaks,
    YearlyConsistency,
    PerfectConsistency,
    WeeklyGoalsCompleted,
    HabitCategories,

    // Media uploads.
    WeeklyBeforeAfter,
    DescribedUploads,
    MonthlyVideoComparisons,
    WeeklyPhotoStreak,
    WeeklyVideoStreak,
    WeeklyUploadStreak,
    ProgressDayStreak,

    // Nutrition logging.
    CalorieTrackingWeek,
    WaterTracking,
    FiberTracking,
    CarbTrackingStreak,
    FatBalanceStreak,
    SugarTracking,
    NutritionTrackingMonth,
    NutritionTrackingStreak,
    NutritionSuperStreak,
    MacroPerfectionCount,
    MacroPerfectStreak,
    BalancedMacroStreak,
    HydrationStreak,
    CustomRecipes,

    // Social / engagement.
    FriendsCount,
    WeeklyRank,
    TopFiveWeeks,
    StatsViews,
    ProgressViews,
    LeaderboardViews,
    LoginStreak,
    FeatureExploration,
    EarlyEngagement,
    EarlyInvites,
    CommitmentStreak,

    // Challenges.
    DailyChallengesCompleted,
    PerfectChallengeWeek,
    NutritionChallenges,

    // Meta: derived from the unlock ledger itself.
    FastAchievements,
    DailyAchievementCount,
    DailyAchievementStreak,
    WeeklyAchievementStreak,
    TotalAchievements,
    AchievementsInTimeframe,
    AchievementRank,
    AchievementLeaderboard,
    CategoryMastery,
    PerfectCategory,
    Completionist,

    // Explicitly unsupported: present in the catalog but deliberately inert
    // until the product rules for them are settled. Always evaluate false.
    HabitStreak,
    WeekendStreaks,
    StreakComeback,
    SeasonalEvent,
    MonthlyChallenge,
    ConsecutiveMonthly,
    AchievementCombo,
}

impl RequirementKind {
    /// Parse a definition row's TEXT tag. Returns `None` for tags this engine
    /// version does not know, which the registry treats as fail-closed.
    pub fn from_tag(tag: &str) -> Option<Self> {
        use RequirementKind::*;
        Some(match tag {
            "account_created" => AccountCreated,
            "habits_created" => HabitsCreated,
            "total_completions" => TotalCompletions,
            "photos_uploaded" => PhotosUploaded,
            "videos_uploaded" => VideosUploaded,
            // Legacy catalogs carry both spellings.
            "total_media" | "media_uploads" => TotalMedia,
            "weight_logs" => WeightLogs,
            "nutrition_logs" => NutritionLogs,
            "before_after_pairs" => BeforeAfterPairs,
            "total_points" => TotalPoints,
            "before_uploads" => BeforeUploads,
            "after_uploads" => AfterUploads,
            "progress_uploads" => ProgressUploads,
            "first_nutrition_log" => FirstNutritionLog,
            "morning_completions" => MorningCompletions,
            "morning_habit_streak" => MorningHabitStreak,
            "evening_habit_streak" => EveningHabitStreak,
            "routine_consistency" => RoutineConsistency,
            "weekend_consistency" => WeekendConsistency,
            "single_habit_streak" => SingleHabitStreak,
            "multi_habit_streaks" => MultiHabitStreaks,
            "simultaneous_streaks" => SimultaneousStreaks,
            "yearly_consistency" => YearlyConsistency,
            "perfect_consistency" => PerfectConsistency,
            "weekly_goals_completed" => WeeklyGoalsCompleted,
            "habit_categories" => HabitCategories,
            "weekly_before_after" => WeeklyBeforeAfter,
            "described_uploads" => DescribedUploads,
            "monthly_video_comparisons" => MonthlyVideoComparisons,
            "weekly_photo_streak" => WeeklyPhotoStreak,
            "weekly_video_streak" => WeeklyVideoStreak,
            "weekly_upload_streak" => WeeklyUploadStreak,
            "progress_day_streak" => ProgressDayStreak,
            "calorie_tracking_week" => CalorieTrackingWeek,
            "water_tracking" => WaterTracking,
            "fiber_tracking" => FiberTracking,
            "carb_tracking_streak" => CarbTrackingStreak,
            "fat_balance_streak" => FatBalanceStreak,
            "sugar_tracking" => SugarTracking,
            "nutrition_tracking_month" => NutritionTrackingMonth,
            "nutrition_tracking_streak" => NutritionTrackingStreak,
            "nutrition_super_streak" => NutritionSuperStreak,
            "macro_perfection_count" => MacroPerfectionCount,
            "macro_perfect_streak" => MacroPerfectStreak,
            "balanced_macro_streak" => BalancedMacroStreak,
            "hydration_streak" => HydrationStreak,
            "custom_recipes" => CustomRecipes,
            "friends_count" => FriendsCount,
            "weekly_rank" => WeeklyRank,
            "top_5_weeks" => TopFiveWeeks,
            "stats_views" => StatsViews,
            "progress_views" => ProgressViews,
            "leaderboard_views" => LeaderboardViews,
            "login_streak" => LoginStreak,
            "feature_exploration" => FeatureExploration,
            "early_engagement" => EarlyEngagement,
            "early_invites" => EarlyInvites,
            "commitment_streak" => CommitmentStreak,
            "daily_challenges_completed" => DailyChallengesCompleted,
            "perfect_challenge_week" => PerfectChallengeWeek,
            "nutrition_challenges" => NutritionChallenges,
            "fast_achievements" => FastAchievements,
            "daily_achievement_count" => DailyAchievementCount,
            "daily_achievement_streak" => DailyAchievementStreak,
            "weekly_achievement_streak" => WeeklyAchievementStreak,
            "total_achievements" => TotalAchievements,
            "achievements_in_timeframe" => AchievementsInTimeframe,
            "achievement_rank" => AchievementRank,
            "achievement_leaderboard" => AchievementLeaderboard,
            "category_mastery" => CategoryMastery,
            "perfect_category" => PerfectCategory,
            "completionist" => Completionist,
            "habit_streak" => HabitStreak,
            "weekend_streaks" => WeekendStreaks,
            "streak_comeback" => StreakComeback,
            "seasonal_event" => SeasonalEvent,
            "monthly_challenge" => MonthlyChallenge,
            "consecutive_monthly" => ConsecutiveMonthly,
            "achievement_combo" => AchievementCombo,
            _ => return None,
        })
    }

    /// Whether this kind has evaluation rules in this engine version.
    /// Unsupported kinds are kept in the catalog but never unlock.
    pub fn is_supported(self) -> bool {
        use RequirementKind::*;
        !matches!(
            self,
            HabitStreak
                | WeekendStreaks
                | StreakComeback
                | SeasonalEvent
                | MonthlyChallenge
                | ConsecutiveMonthly
                | AchievementCombo
        )
    }
}

// ─── Achievement definition ───────────────────────────────────────────────────

/// A single achievement rule from the `achievements` reference table.
/// Immutable from the engine's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AchievementDefinition {
    /// Stable string slug, e.g. `"habit_master"`.
    pub id: String,
    /// Display name shown on the badge card.
    pub name: String,
    /// Short description of how to earn it.
    pub description: String,
    /// Grouping used for category-mastery rules, e.g. `"habits"`, `"nutrition"`.
    pub category: String,
    /// Display rarity: `common` | `rare` | `epic` | `legendary`.
    pub rarity: String,
    /// TEXT tag naming the requirement kind; see [`RequirementKind::from_tag`].
    pub requirement_type: String,
    /// Numeric threshold the predicate compares against.
    pub requirement_value: i64,
    /// Points credited on unlock. Non-negative.
    pub points: i64,
    /// Recurring definitions may unlock once per qualifying period.
    pub is_recurring: bool,
    /// Hidden definitions are excluded from mastery/completionist totals.
    pub is_hidden: bool,
}

impl AchievementDefinition {
    /// Parsed requirement kind, `None` if the tag is unknown to this version.
    pub fn kind(&self) -> Option<RequirementKind> {
        RequirementKind::from_tag(&self.requirement_type)
    }
}

// ─── Unlock results ───────────────────────────────────────────────────────────

/// A persisted unlock row from `user_achievements`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UnlockRow {
    /// Row id (UUID v4).
    pub id: String,
    pub user_id: String,
    pub achievement_id: String,
    /// Qualifying period for recurring definitions; `""` for one-shot ones.
    pub period_key: String,
    /// Points credited by this unlock. Equals the definition's `points` at
    /// unlock time, so ledger rows alone reconstruct the credit history.
    pub points_earned: i64,
    /// RFC 3339 unlock timestamp.
    pub earned_at: String,
}

/// A newly unlocked achievement returned to the caller, joined with its
/// definition so handlers can render the celebration without a second read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub definition: AchievementDefinition,
    /// RFC 3339 unlock timestamp.
    pub earned_at: String,
    pub points_earned: i64,
}

// ─── Streaks ──────────────────────────────────────────────────────────────────

/// Result of advancing a streak state machine by one qualifying event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakUpdate {
    pub current_streak: i64,
    pub best_streak: i64,
    /// True when this transition pushed `best_streak` past its previous value.
    pub is_new_record: bool,
}

/// A persisted streak row from `user_streaks`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StreakRow {
    pub id: String,
    pub user_id: String,
    pub streak_type: String,
    pub current_streak: i64,
    pub best_streak: i64,
    /// `YYYY-MM-DD` of the last qualifying event.
    pub last_update_date: String,
    pub updated_at: String,
}

impl StreakRow {
    /// Parsed `last_update_date`; `None` if the stored text is malformed.
    pub fn last_update(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.last_update_date, "%Y-%m-%d").ok()
    }
}

// ─── Daily challenges ─────────────────────────────────────────────────────────

/// A daily challenge template from the `daily_challenges` reference table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyChallenge {
    pub id: String,
    /// Challenge dimension: `habits` | `media` | `nutrition`.
    pub requirement_type: String,
    /// Progress count at which the challenge completes.
    pub requirement_value: i64,
    /// Points credited exactly once on completion.
    pub points_reward: i64,
    pub category: String,
    pub is_active: bool,
}

/// A challenge the current event pushed over its requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedChallenge {
    pub challenge_id: String,
    pub challenge_date: String,
    pub points_earned: i64,
}

// ─── Progress hints ───────────────────────────────────────────────────────────

/// An unearned definition the user is close to satisfying (≥ 80%, < 100%).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressHint {
    pub achievement: AchievementDefinition,
    pub current_progress: i64,
    pub required_progress: i64,
}

// ─── Stats snapshot ───────────────────────────────────────────────────────────

/// Point-in-time rollup of a user's cumulative activity. All counters are
/// zero for a user with no history; that is a valid snapshot, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub habits_created: i64,
    pub total_completions: i64,
    pub photos_uploaded: i64,
    pub videos_uploaded: i64,
    pub total_media: i64,
    pub before_uploads: i64,
    pub after_uploads: i64,
    pub progress_uploads: i64,
    pub nutrition_logs: i64,
    pub weight_logs: i64,
    /// `before` uploads followed by an `after` upload within seven days.
    pub before_after_pairs: i64,
    pub total_points: i64,
    /// RFC 3339 account creation time; `None` when the user row is absent.
    pub account_created_at: Option<String>,
}

// ─── Tests ────────────────────────────────────────────────────────────────────
