// SPDX-License-Identifier: MIT
//! Nutrition predicates: per-nutrient tracking days, daily-rollup goal runs,
//! and recipe variety.
//!
//! The per-log kinds are gated on a `nutrition_log` event (they describe the
//! act of logging, so only a log should complete them); the rollup-based
//! runs evaluate on any trigger.

use anyhow::Result;
use chrono::Days;

use super::{window_start, PredicateContext};
use crate::activity::{DailyGoal, NutrientFilter};
use crate::model::{ActionEvent, ActionType};

/// Slack for single-nutrient tracking windows.
const NUTRIENT_SLACK: i64 = 2;
/// Slack for whole-diary tracking runs.
const DIARY_SLACK: i64 = 5;
/// Slack for the all-macros perfect run.
const MACRO_SLACK: i64 = 10;

fn is_log_event(event: &ActionEvent) -> bool {
    event.action_type == ActionType::NutritionLog
}

/// First log milestone — fires on the logging event itself.
pub fn first_nutrition_log(
    ctx: &PredicateContext<'_>,
    event: &ActionEvent,
    required: i64,
) -> Result<bool> {
    Ok(is_log_event(event) && ctx.stats.nutrition_logs >= required)
}

/// Days with calories tracked inside the current 7-day window.
pub async fn calorie_tracking_week(
    ctx: &PredicateContext<'_>,
    event: &ActionEvent,
    required: i64,
) -> Result<bool> {
    if !is_log_event(event) {
        return Ok(false);
    }
    let since = ctx.today - Days::new(7);
    let days = ctx
        .activity
        .nutrition_days_since(ctx.user_id, since, NutrientFilter::Calories)
        .await?;
    Ok(days >= required)
}

/// Days with the given nutrient tracked in a loose trailing window.
pub async fn tracked_nutrient(
    ctx: &PredicateContext<'_>,
    event: &ActionEvent,
    required: i64,
    filter: NutrientFilter,
) -> Result<bool> {
    if !is_log_event(event) {
        return Ok(false);
    }
    let since = window_start(ctx.today, required, NUTRIENT_SLACK);
    let days = ctx
        .activity
        .nutrition_days_since(ctx.user_id, since, filter)
        .await?;
    Ok(days >= required)
}

/// Logging days inside an exact trailing window of `required` days.
pub async fn tracking_month(
    ctx: &PredicateContext<'_>,
    event: &ActionEvent,
    required: i64,
) -> Result<bool> {
    if !is_log_event(event) {
        return Ok(false);
    }
    let since = ctx.today - Days::new(required.max(0) as u64);
    let days = ctx
        .activity
        .nutrition_days_since(ctx.user_id, since, NutrientFilter::Any)
        .await?;
    Ok(days >= required)
}

/// Logging days in a loose trailing window; evaluates on any trigger.
pub async fn tracking_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = window_start(ctx.today, required, DIARY_SLACK);
    let days = ctx
        .activity
        .nutrition_days_since(ctx.user_id, since, NutrientFilter::Any)
        .await?;
    Ok(days >= required)
}

/// Like [`tracking_streak`] but gated on the log event (long-run variant).
pub async fn super_streak(
    ctx: &PredicateContext<'_>,
    event: &ActionEvent,
    required: i64,
) -> Result<bool> {
    if !is_log_event(event) {
        return Ok(false);
    }
    tracking_streak(ctx, required).await
}

/// All-time days where every macro was logged in meaningful amounts.
pub async fn macro_perfection_count(
    ctx: &PredicateContext<'_>,
    event: &ActionEvent,
    required: i64,
) -> Result<bool> {
    if !is_log_event(event) {
        return Ok(false);
    }
    let days = ctx.activity.macro_perfection_days(ctx.user_id).await?;
    Ok(days >= required)
}

/// Days whose daily rollup met all three macro goals.
pub async fn macro_perfect_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = window_start(ctx.today, required, MACRO_SLACK);
    let days = ctx
        .activity
        .daily_goal_days_since(ctx.user_id, since, DailyGoal::AllMacros)
        .await?;
    Ok(days >= required)
}

/// Days whose macro split stayed inside the balanced bands.
pub async fn balanced_macro_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = window_start(ctx.today, required, DIARY_SLACK);
    let days = ctx
        .activity
        .daily_goal_days_since(ctx.user_id, since, DailyGoal::BalancedSplit)
        .await?;
    Ok(days >= required)
}

/// Days whose daily rollup met the water goal.
pub async fn hydration_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = window_start(ctx.today, required, DIARY_SLACK);
    let days = ctx
        .activity
        .daily_goal_days_since(ctx.user_id, since, DailyGoal::Water)
        .await?;
    Ok(days >= required)
}

/// Distinct custom recipes ever logged.
pub async fn custom_recipes(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let count = ctx.activity.custom_recipe_count(ctx.user_id).await?;
    Ok(count >= required)
}
