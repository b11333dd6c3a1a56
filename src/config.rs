// SPDX-License-Identifier: MIT
//! Engine configuration — combo tiers, progress-hint shaping.
//!
//! Priority (highest to lowest):
//!   1. `STRIVE_*` environment variables
//!   2. TOML file (`engine.toml` next to the database, or an explicit path)
//!   3. Built-in defaults
//!
//! The defaults reproduce the reference catalogue: combo meta-achievements at
//! 3 / 5 / 10 same-day unlocks and at most two progress hints per check.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

const DEFAULT_HINT_LIMIT: usize = 2;
const DEFAULT_HINT_THRESHOLD: f64 = 0.8;

// ─── Combo tiers ──────────────────────────────────────────────────────────────

/// One unlock-velocity tier: when a user's same-day unlock count reaches
/// `threshold`, the meta-achievement with this stable id is awarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboTier {
    /// Same-day unlock count that arms this tier.
    pub threshold: i64,
    /// Stable achievement id of the meta-achievement, e.g. `"achievement_spree"`.
    /// Addressed by id, never by display name — display names are mutable.
    pub achievement_id: String,
}

fn default_combo_tiers() -> Vec<ComboTier> {
    vec![
        ComboTier {
            threshold: 3,
            achievement_id: "achievement_spree".to_string(),
        },
        ComboTier {
            threshold: 5,
            achievement_id: "achievement_frenzy".to_string(),
        },
        ComboTier {
            threshold: 10,
            achievement_id: "achievement_hurricane".to_string(),
        },
    ]
}

// ─── EngineConfig ─────────────────────────────────────────────────────────────

/// Tunable knobs for the evaluation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Unlock-velocity tiers checked after every successful unlock,
    /// ascending by threshold.
    pub combo_tiers: Vec<ComboTier>,
    /// Maximum number of progress hints returned per check.
    pub hint_limit: usize,
    /// Fraction of the requirement at which a hint becomes visible (0.0–1.0).
    pub hint_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            combo_tiers: default_combo_tiers(),
            hint_limit: DEFAULT_HINT_LIMIT,
            hint_threshold: DEFAULT_HINT_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Build config from an optional TOML file plus env overrides.
    ///
    /// A missing file is not an error (defaults apply); a malformed file is
    /// logged and ignored so a bad edit cannot take achievement evaluation
    /// down with it.
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = path
            .and_then(|p| match std::fs::read_to_string(p) {
                Ok(contents) => match toml::from_str::<EngineConfig>(&contents) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "ignoring malformed engine config");
                        None
                    }
                },
                Err(_) => None,
            })
            .unwrap_or_default();

        if let Some(limit) = std::env::var("STRIVE_HINT_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.hint_limit = limit;
        }

        config.normalize();
        config
    }

    /// Clamp out-of-range values and keep tiers in ascending threshold order
    /// so the combo detector can award lower tiers before higher ones.
    fn normalize(&mut self) {
        if !(0.0..=1.0).contains(&self.hint_threshold) {
            warn!(
                hint_threshold = self.hint_threshold,
                "hint_threshold out of range, using default"
            );
            self.hint_threshold = DEFAULT_HINT_THRESHOLD;
        }
        self.combo_tiers.retain(|t| t.threshold > 0);
        self.combo_tiers.sort_by_key(|t| t.threshold);
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tiers() {
        let config = EngineConfig::default();
        assert_eq!(config.combo_tiers.len(), 3);
        assert_eq!(config.combo_tiers[0].threshold, 3);
        assert_eq!(config.combo_tiers[0].achievement_id, "achievement_spree");
        assert_eq!(config.combo_tiers[2].threshold, 10);
        assert_eq!(config.hint_limit, 2);
    }

    #[test]
    fn toml_overrides_defaults() {
        let parsed: EngineConfig = toml::from_str(
            r#"
            hint_limit = 4

            [[combo_tiers]]
            threshold = 2
            achievement_id = "double_up"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.hint_limit, 4);
        assert_eq!(parsed.combo_tiers.len(), 1);
        assert_eq!(parsed.combo_tiers[0].achievement_id, "double_up");
        // Fields absent from the file keep their defaults.
        assert!((parsed.hint_threshold - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn normalize_sorts_tiers_and_drops_invalid() {
        let mut config = EngineConfig {
            combo_tiers: vec![
                ComboTier {
                    threshold: 10,
                    achievement_id: "big".into(),
                },
                ComboTier {
                    threshold: 0,
                    achievement_id: "never".into(),
                },
                ComboTier {
                    threshold: 3,
                    achievement_id: "small".into(),
                },
            ],
            hint_threshold: 7.0,
            ..EngineConfig::default()
        };
        config.normalize();
        assert_eq!(config.combo_tiers.len(), 2);
        assert_eq!(config.combo_tiers[0].threshold, 3);
        assert!((config.hint_threshold - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let config = EngineConfig::load(Some(Path::new("/nonexistent/engine.toml")));
        assert_eq!(config.combo_tiers.len(), 3);
    }
}
