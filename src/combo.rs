// SPDX-License-Identifier: MIT
//! Combo detector — meta-achievements for unlock velocity.
//!
//! After a pass that unlocked something, today's ledger rows are counted
//! once and every configured tier at or below that count is attempted.
//! Awarding goes through the ledger, so crossing a threshold twice in one
//! day (two passes both observing count == 3) still unlocks the tier once.
//! Combo rows land in the ledger like any other unlock and therefore count
//! toward higher tiers in later passes.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::catalog::RuleCatalog;
use crate::config::ComboTier;
use crate::ledger::{UnlockLedger, UnlockOutcome};
use crate::model::UnlockedAchievement;

pub struct ComboDetector {
    /// Ascending by threshold (normalized by the config loader).
    tiers: Vec<ComboTier>,
}

impl ComboDetector {
    pub fn new(tiers: Vec<ComboTier>) -> Self {
        Self { tiers }
    }

    /// Check today's unlock count against every tier and award the ones
    /// reached. Returns the combo achievements newly unlocked by this call.
    pub async fn check(
        &self,
        user_id: &str,
        catalog: &dyn RuleCatalog,
        ledger: &dyn UnlockLedger,
        now: DateTime<Utc>,
    ) -> Result<Vec<UnlockedAchievement>> {
        let today = now.date_naive();
        let count = ledger.unlocks_on_day(user_id, today).await?;

        let mut newly = Vec::new();
        for tier in &self.tiers {
            if count < tier.threshold {
                break;
            }
            // Resolved by stable id; a catalogue missing the meta-definition
            // is a deployment gap, not an evaluation failure.
            let Some(definition) = catalog.definition(&tier.achievement_id).await? else {
                warn!(
                    achievement_id = %tier.achievement_id,
                    threshold = tier.threshold,
                    "combo meta-achievement missing from catalogue"
                );
                continue;
            };
            match ledger.try_unlock(user_id, &definition, now).await? {
                UnlockOutcome::Unlocked(row) => {
                    newly.push(UnlockedAchievement {
                        definition,
                        earned_at: row.earned_at,
                        points_earned: row.points_earned,
                    });
                }
                UnlockOutcome::AlreadyUnlocked => {}
            }
        }
        Ok(newly)
    }
}
