// SPDX-License-Identifier: MIT
//! Evaluation orchestrator — the engine's entry point, invoked once per
//! activity event.
//!
//! `evaluate` is best-effort by contract: the caller's primary action (a
//! habit completion, an upload) must never fail or roll back because
//! achievement evaluation had a bad day. Individual predicate errors force
//! that predicate to `false`; a total failure returns an empty list. Both
//! are logged.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::activity::ActivityQueries;
use crate::catalog::{RuleCatalog, SqliteRuleCatalog};
use crate::challenges::DailyChallengeTracker;
use crate::clock::{Clock, SystemClock};
use crate::combo::ComboDetector;
use crate::config::EngineConfig;
use crate::ledger::{SqliteUnlockLedger, UnlockLedger, UnlockOutcome};
use crate::model::{
    ActionEvent, ActionType, ProgressHint, RequirementKind, StatsSnapshot, UnlockedAchievement,
};
use crate::predicates::{self, PredicateContext};
use crate::stats::{SqliteStatsSource, StatsSource};
use crate::streaks::{SqliteStreakTracker, StreakTracker};

/// The achievement & streak evaluation engine.
///
/// Every collaborator sits behind a trait so tests can substitute fakes;
/// [`Engine::new`] wires the SQLite implementations over one shared pool.
pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    stats: Arc<dyn StatsSource>,
    catalog: Arc<dyn RuleCatalog>,
    streaks: Arc<dyn StreakTracker>,
    ledger: Arc<dyn UnlockLedger>,
    challenges: DailyChallengeTracker,
    activity: ActivityQueries,
    combo: ComboDetector,
}

impl Engine {
    /// Production wiring: SQLite-backed components over a shared pool and
    /// the system clock.
    pub fn new(pool: SqlitePool, config: EngineConfig) -> Self {
        Self::with_clock(pool, config, Arc::new(SystemClock))
    }

    /// Like [`Engine::new`] with an explicit clock (tests pin a date here).
    pub fn with_clock(pool: SqlitePool, config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let combo = ComboDetector::new(config.combo_tiers.clone());
        Self {
            config,
            clock,
            stats: Arc::new(SqliteStatsSource::new(pool.clone())),
            catalog: Arc::new(SqliteRuleCatalog::new(pool.clone())),
            streaks: Arc::new(SqliteStreakTracker::new(pool.clone())),
            ledger: Arc::new(SqliteUnlockLedger::new(pool.clone())),
            challenges: DailyChallengeTracker::new(pool.clone()),
            activity: ActivityQueries::new(pool),
            combo,
        }
    }

    /// Full dependency injection for tests and alternative stores.
    #[allow(clippy::too_many_arguments)]
    pub fn with_components(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        stats: Arc<dyn StatsSource>,
        catalog: Arc<dyn RuleCatalog>,
        streaks: Arc<dyn StreakTracker>,
        ledger: Arc<dyn UnlockLedger>,
        challenges: DailyChallengeTracker,
        activity: ActivityQueries,
    ) -> Self {
        let combo = ComboDetector::new(config.combo_tiers.clone());
        Self {
            config,
            clock,
            stats,
            catalog,
            streaks,
            ledger,
            challenges,
            activity,
            combo,
        }
    }

    // ─── evaluate ────────────────────────────────────────────────────────────

    /// Evaluate one activity event and return the achievements it newly
    /// unlocked (pre-existing unlocks are never repeated). Never fails:
    /// evaluation problems are logged and yield an empty list.
    pub async fn evaluate(
        &self,
        user_id: &str,
        action_type: ActionType,
        action_data: serde_json::Value,
    ) -> Vec<UnlockedAchievement> {
        let event = ActionEvent::new(action_type, action_data);
        match self.evaluate_event(user_id, &event).await {
            Ok(unlocked) => {
                if !unlocked.is_empty() {
                    info!(
                        user_id,
                        action = action_type.as_str(),
                        count = unlocked.len(),
                        "achievements unlocked"
                    );
                }
                unlocked
            }
            Err(e) => {
                error!(
                    user_id,
                    action = action_type.as_str(),
                    error = %e,
                    "achievement evaluation failed, returning no unlocks"
                );
                Vec::new()
            }
        }
    }

    async fn evaluate_event(
        &self,
        user_id: &str,
        event: &ActionEvent,
    ) -> Result<Vec<UnlockedAchievement>> {
        let now = self.clock.now();
        let today = self.clock.today();

        // Streak and challenge bookkeeping run first so predicates in this
        // same pass observe the advanced state. Both are best-effort.
        if let Some(streak_type) = event.action_type.streak_type() {
            if let Err(e) = self.streaks.record(user_id, streak_type, today).await {
                warn!(user_id, streak_type, error = %e, "streak update failed");
            }
        }
        if let Some(dimension) = event.action_type.challenge_dimension() {
            if let Err(e) = self
                .challenges
                .advance(user_id, dimension, 1, today, now)
                .await
            {
                warn!(user_id, dimension, error = %e, "challenge progress failed");
            }
        }

        let definitions = self
            .catalog
            .unearned_definitions(user_id)
            .await
            .context("fetch unearned definitions")?;
        let stats = self
            .stats
            .snapshot(user_id)
            .await
            .context("compute stats snapshot")?;

        let ctx = PredicateContext {
            user_id,
            activity: &self.activity,
            catalog: self.catalog.as_ref(),
            stats: &stats,
            today,
        };

        let mut satisfied = Vec::new();
        for definition in &definitions {
            let Some(kind) = definition.kind() else {
                warn!(
                    achievement_id = %definition.id,
                    requirement_type = %definition.requirement_type,
                    "unknown requirement kind, failing closed"
                );
                continue;
            };
            match predicates::holds(kind, definition, event, &ctx).await {
                Ok(true) => satisfied.push(definition),
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        achievement_id = %definition.id,
                        error = %e,
                        "predicate error, forcing false"
                    );
                }
            }
        }

        let mut newly_unlocked = Vec::new();
        for definition in satisfied {
            match self.ledger.try_unlock(user_id, definition, now).await {
                Ok(UnlockOutcome::Unlocked(row)) => {
                    newly_unlocked.push(UnlockedAchievement {
                        definition: definition.clone(),
                        earned_at: row.earned_at,
                        points_earned: row.points_earned,
                    });
                }
                Ok(UnlockOutcome::AlreadyUnlocked) => {}
                Err(e) => {
                    warn!(
                        achievement_id = %definition.id,
                        error = %e,
                        "unlock attempt failed"
                    );
                }
            }
        }

        if !newly_unlocked.is_empty() {
            match self
                .combo
                .check(user_id, self.catalog.as_ref(), self.ledger.as_ref(), now)
                .await
            {
                Ok(mut combos) => newly_unlocked.append(&mut combos),
                Err(e) => warn!(user_id, error = %e, "combo detection failed"),
            }
        }

        Ok(newly_unlocked)
    }

    // ─── progress hints ──────────────────────────────────────────────────────

    /// Unearned definitions the user is close to (≥ hint threshold, < 100%),
    /// capped to the configured count, nearest-first.
    pub async fn progress_hints(&self, user_id: &str) -> Result<Vec<ProgressHint>> {
        let stats = self
            .stats
            .snapshot(user_id)
            .await
            .context("compute stats snapshot")?;
        let definitions = self
            .catalog
            .unearned_definitions(user_id)
            .await
            .context("fetch unearned definitions")?;

        let mut hints: Vec<ProgressHint> = definitions
            .into_iter()
            .filter_map(|definition| {
                let kind = definition.kind()?;
                let current = snapshot_progress(kind, &stats)?;
                let required = definition.requirement_value;
                if required <= 0 || current >= required {
                    return None;
                }
                if (current as f64) < self.config.hint_threshold * required as f64 {
                    return None;
                }
                Some(ProgressHint {
                    achievement: definition,
                    current_progress: current,
                    required_progress: required,
                })
            })
            .collect();

        hints.sort_by(|a, b| {
            let ratio_a = a.current_progress as f64 / a.required_progress as f64;
            let ratio_b = b.current_progress as f64 / b.required_progress as f64;
            ratio_b.partial_cmp(&ratio_a).unwrap_or(std::cmp::Ordering::Equal)
        });
        hints.truncate(self.config.hint_limit);
        Ok(hints)
    }
}

/// Current progress toward a definition, for the kinds whose progress is a
/// plain snapshot counter. Windowed and cohort kinds have no meaningful
/// single number to show and return `None`.
fn snapshot_progress(kind: RequirementKind, stats: &StatsSnapshot) -> Option<i64> {
    use RequirementKind::*;
    Some(match kind {
        HabitsCreated => stats.habits_created,
        TotalCompletions => stats.total_completions,
        PhotosUploaded => stats.photos_uploaded,
        VideosUploaded => stats.videos_uploaded,
        TotalMedia => stats.total_media,
        WeightLogs => stats.weight_logs,
        NutritionLogs => stats.nutrition_logs,
        BeforeAfterPairs => stats.before_after_pairs,
        TotalPoints => stats.total_points,
        BeforeUploads => stats.before_uploads,
        AfterUploads => stats.after_uploads,
        ProgressUploads => stats.progress_uploads,
        _ => return None,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
