// SPDX-License-Identifier: MIT
//! Social and engagement predicates: friend cohort sizes, weekly leaderboard
//! ranks, view counters, and early-account engagement windows.

use anyhow::Result;
use chrono::{DateTime, Days, NaiveDate};

use super::{week_start, window_start, PredicateContext};

const LOGIN_SLACK: i64 = 5;
/// Extra weeks scanned beyond the required consecutive top-rank run.
const RANK_SCAN_EXTRA: i64 = 5;

/// Account creation date parsed from the stats snapshot; `None` when the
/// user row is missing or its timestamp is malformed.
fn account_created_date(ctx: &PredicateContext<'_>) -> Option<NaiveDate> {
    let raw = ctx.stats.account_created_at.as_deref()?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

pub async fn friends_count(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let friends = ctx.activity.accepted_friend_count(ctx.user_id).await?;
    Ok(friends >= required)
}

/// Rank by completion points inside the current calendar week.
pub async fn weekly_rank(ctx: &PredicateContext<'_>, max_rank: i64) -> Result<bool> {
    let start = week_start(ctx.today);
    let end = start + Days::new(6);
    let rank = ctx
        .activity
        .completion_rank_between(ctx.user_id, start, end)
        .await?;
    Ok(rank <= max_rank)
}

/// Consecutive trailing weeks ranked in the top five.
pub async fn top_five_weeks(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    if required <= 0 {
        return Ok(true);
    }
    let mut consecutive = 0;
    for i in 0..(required + RANK_SCAN_EXTRA) {
        let start = ctx.today - Days::new((7 * i) as u64);
        let end = start + Days::new(6);
        let rank = ctx
            .activity
            .completion_rank_between(ctx.user_id, start, end)
            .await?;
        if rank <= 5 {
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

/// All-time counter for one view activity type.
pub async fn view_count(
    ctx: &PredicateContext<'_>,
    activity_type: &str,
    required: i64,
) -> Result<bool> {
    let count = ctx.activity.activity_count(ctx.user_id, activity_type).await?;
    Ok(count >= required)
}

/// Distinct login days in a loose trailing window.
pub async fn login_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = window_start(ctx.today, required, LOGIN_SLACK);
    let days = ctx.activity.login_days_since(ctx.user_id, since).await?;
    Ok(days >= required)
}

/// All four core features touched today. The requirement value is implicit
/// in the feature set itself.
pub async fn feature_exploration(ctx: &PredicateContext<'_>) -> Result<bool> {
    let used = ctx
        .activity
        .core_features_used_on(ctx.user_id, ctx.today)
        .await?;
    Ok(used >= 4)
}

/// Active login days inside the first two weeks after signup.
pub async fn early_engagement(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let Some(created) = account_created_date(ctx) else {
        return Ok(false);
    };
    let days = ctx
        .activity
        .login_days_between(ctx.user_id, created, created + Days::new(14))
        .await?;
    Ok(days >= required)
}

/// Friend invites sent inside the first month after signup.
pub async fn early_invites(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let Some(created) = account_created_date(ctx) else {
        return Ok(false);
    };
    let invites = ctx
        .activity
        .friendships_initiated_between(ctx.user_id, created, created + Days::new(30))
        .await?;
    Ok(invites >= required)
}

/// Login days inside the first month after signup.
pub async fn commitment_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let Some(created) = account_created_date(ctx) else {
        return Ok(false);
    };
    let days = ctx
        .activity
        .login_days_between(ctx.user_id, created, created + Days::new(30))
        .await?;
    Ok(days >= required)
}
