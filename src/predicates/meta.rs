// SPDX-License-Identifier: MIT
//! Meta predicates — rules over the unlock ledger itself and over daily
//! challenge history. The ledger rows these read were written by earlier
//! evaluations, so ordering inside one pass matters only to the combo
//! detector, which runs after all of these.

use anyhow::Result;
use chrono::{DateTime, Days};

use super::{weekly_run_reaches, PredicateContext};
use crate::model::{ActionEvent, ActionType};

const WEEK_SCAN_EXTRA: i64 = 2;
/// Completionist fires at 95% of the non-hidden catalogue.
const COMPLETIONIST_FRACTION: f64 = 0.95;

pub async fn daily_challenges_completed(
    ctx: &PredicateContext<'_>,
    required: i64,
) -> Result<bool> {
    let completed = ctx.activity.completed_challenges(ctx.user_id, None).await?;
    Ok(completed >= required)
}

pub async fn perfect_challenge_week(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let weeks = ctx.activity.perfect_challenge_weeks(ctx.user_id).await?;
    Ok(weeks >= required)
}

/// Nutrition-category challenges; fires on the completing event.
pub async fn nutrition_challenges(
    ctx: &PredicateContext<'_>,
    event: &ActionEvent,
    required: i64,
) -> Result<bool> {
    if event.action_type != ActionType::ChallengeCompletion {
        return Ok(false);
    }
    let completed = ctx
        .activity
        .completed_challenges(ctx.user_id, Some("nutrition"))
        .await?;
    Ok(completed >= required)
}

/// Unlocks inside the first two weeks after signup.
pub async fn fast_achievements(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let Some(created) = signup_date(ctx) else {
        return Ok(false);
    };
    let count = ctx
        .activity
        .unlocks_between(ctx.user_id, created, created + Days::new(14))
        .await?;
    Ok(count >= required)
}

pub async fn daily_achievement_count(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let today_count = ctx.activity.unlocks_on_day(ctx.user_id, ctx.today).await?;
    Ok(today_count >= required)
}

/// At least one unlock on each of the trailing `required` days (exact
/// window, no slack: unlock velocity is self-referential enough already).
pub async fn daily_achievement_streak(
    ctx: &PredicateContext<'_>,
    required: i64,
) -> Result<bool> {
    let since = ctx.today - Days::new(required.max(0) as u64);
    let days = ctx.activity.unlock_days_since(ctx.user_id, since).await?;
    Ok(days >= required)
}

pub async fn weekly_achievement_streak(
    ctx: &PredicateContext<'_>,
    required: i64,
) -> Result<bool> {
    weekly_run_reaches(ctx.today, required, WEEK_SCAN_EXTRA, |start, end| {
        ctx.activity.unlocks_between(ctx.user_id, start, end)
    })
    .await
}

pub async fn total_achievements(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let total = ctx.activity.unlock_total(ctx.user_id).await?;
    Ok(total >= required)
}

/// Unlocks inside the first month after signup.
pub async fn achievements_in_timeframe(
    ctx: &PredicateContext<'_>,
    required: i64,
) -> Result<bool> {
    let Some(created) = signup_date(ctx) else {
        return Ok(false);
    };
    let count = ctx
        .activity
        .unlocks_between(ctx.user_id, created, created + Days::new(30))
        .await?;
    Ok(count >= required)
}

/// Percentile by unlock count among accepted friends. No cohort → false.
pub async fn achievement_rank(ctx: &PredicateContext<'_>, percentile: i64) -> Result<bool> {
    let friends = ctx.activity.accepted_friend_count(ctx.user_id).await?;
    if friends == 0 {
        return Ok(false);
    }
    let mine = ctx.activity.unlock_total(ctx.user_id).await?;
    let better = ctx
        .activity
        .friends_with_more_unlocks(ctx.user_id, mine)
        .await?;
    let rank_percentile = ((friends - better) as f64 / friends as f64) * 100.0;
    Ok(rank_percentile >= percentile as f64)
}

/// Most unlocks in the friend cohort (nobody strictly ahead).
pub async fn achievement_leaderboard(ctx: &PredicateContext<'_>) -> Result<bool> {
    let friends = ctx.activity.accepted_friend_count(ctx.user_id).await?;
    if friends == 0 {
        return Ok(false);
    }
    let mine = ctx.activity.unlock_total(ctx.user_id).await?;
    let better = ctx
        .activity
        .friends_with_more_unlocks(ctx.user_id, mine)
        .await?;
    Ok(better == 0)
}

/// Every non-hidden achievement in `category` earned.
pub async fn category_mastery(ctx: &PredicateContext<'_>, category: &str) -> Result<bool> {
    let totals = ctx.catalog.non_hidden_by_category().await?;
    let Some((_, total)) = totals.iter().find(|(name, _)| name == category) else {
        return Ok(false);
    };
    if *total == 0 {
        return Ok(false);
    }
    let earned = ctx
        .activity
        .non_hidden_unlocks(ctx.user_id, Some(category))
        .await?;
    Ok(earned >= *total)
}

/// Any category fully mastered.
pub async fn perfect_category(ctx: &PredicateContext<'_>) -> Result<bool> {
    for (category, total) in ctx.catalog.non_hidden_by_category().await? {
        if total == 0 {
            continue;
        }
        let earned = ctx
            .activity
            .non_hidden_unlocks(ctx.user_id, Some(&category))
            .await?;
        if earned >= total {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Nearly the whole non-hidden catalogue earned.
pub async fn completionist(ctx: &PredicateContext<'_>) -> Result<bool> {
    let total = ctx.catalog.non_hidden_total().await?;
    if total == 0 {
        return Ok(false);
    }
    let earned = ctx.activity.non_hidden_unlocks(ctx.user_id, None).await?;
    Ok(earned as f64 >= total as f64 * COMPLETIONIST_FRACTION)
}

fn signup_date(ctx: &PredicateContext<'_>) -> Option<chrono::NaiveDate> {
    let raw = ctx.stats.account_created_at.as_deref()?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.date_naive())
        .ok()
        .or_else(|| chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}
