// SPDX-License-Identifier: MIT
//! Habit-activity predicates: time-banded completions, loose consecutive-day
//! runs, variety, and weekly goal tallies.

use anyhow::Result;
use chrono::{DateTime, Days};
use std::collections::HashSet;

use super::{window_start, PredicateContext};
use crate::activity::TimeBand;
use crate::model::{ActionEvent, ActionType};

/// Slack for single-day qualifying windows (morning/evening bands).
const DAILY_SLACK: i64 = 5;
/// Slack for run-shaped checks that tolerate bigger gaps.
const RUN_SLACK: i64 = 10;

/// Morning completions: only advances when the triggering completion itself
/// happened before 10:00, then compares the all-time early count.
pub async fn morning_completions(
    ctx: &PredicateContext<'_>,
    event: &ActionEvent,
    required: i64,
) -> Result<bool> {
    if event.action_type != ActionType::HabitCompletion {
        return Ok(false);
    }
    let Some(time) = event.data_str("time") else {
        return Ok(false);
    };
    let Ok(completed_at) = DateTime::parse_from_rfc3339(time) else {
        return Ok(false);
    };
    use chrono::Timelike;
    if completed_at.hour() >= 10 {
        return Ok(false);
    }
    let count = ctx.activity.morning_completion_count(ctx.user_id).await?;
    Ok(count >= required)
}

pub async fn morning_habit_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = window_start(ctx.today, required, DAILY_SLACK);
    let days = ctx
        .activity
        .completion_days_in_band(ctx.user_id, since, TimeBand::AtOrBeforeEight)
        .await?;
    Ok(days >= required)
}

pub async fn evening_habit_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = window_start(ctx.today, required, DAILY_SLACK);
    let days = ctx
        .activity
        .completion_days_in_band(ctx.user_id, since, TimeBand::AtOrAfterSix)
        .await?;
    Ok(days >= required)
}

/// Days where some habit was completed both that day and the next.
pub async fn routine_consistency(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = window_start(ctx.today, required, RUN_SLACK);
    let days = ctx.activity.routine_consistent_days(ctx.user_id, since).await?;
    Ok(days >= required)
}

/// Calendar weeks with completions on both weekend days.
pub async fn weekend_consistency(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let weeks = ctx.activity.full_weekend_weeks(ctx.user_id).await?;
    Ok(weeks >= required)
}

pub async fn single_habit_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = window_start(ctx.today, required, RUN_SLACK);
    let best = ctx.activity.max_single_habit_days(ctx.user_id, since).await?;
    Ok(best >= required)
}

/// At least `required` habits each held a loose 14-day run inside 20 days.
pub async fn multi_habit_streaks(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = ctx.today - Days::new(20);
    let habits = ctx
        .activity
        .habits_with_min_days(ctx.user_id, since, 14)
        .await?;
    Ok(habits >= required)
}

/// At least `required` habits each held a loose 30-day run inside 35 days.
pub async fn simultaneous_streaks(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = ctx.today - Days::new(35);
    let habits = ctx
        .activity
        .habits_with_min_days(ctx.user_id, since, 30)
        .await?;
    Ok(habits >= required)
}

/// Active days across a whole trailing year.
pub async fn yearly_consistency(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = ctx.today - Days::new(366);
    let days = ctx.activity.completion_days_since(ctx.user_id, since).await?;
    Ok(days >= required)
}

/// Days on which every habit that existed by then was completed.
pub async fn perfect_consistency(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = window_start(ctx.today, required, RUN_SLACK);
    let days = ctx
        .activity
        .perfect_completion_days(ctx.user_id, since)
        .await?;
    Ok(days >= required)
}

/// (habit, week) pairs that met the habit's weekly target.
pub async fn weekly_goals_completed(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let met = ctx.activity.weekly_goals_met(ctx.user_id).await?;
    Ok(met >= required)
}

/// Distinct habit categories inferred from habit names. The catalogue has no
/// category column on habits, so this mirrors how users actually name them:
/// emoji or keyword.
pub async fn habit_categories(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    const CATEGORY_MARKERS: &[(&str, &[&str])] = &[
        ("hydration", &["💧", "water"]),
        ("cardio", &["🏃", "cardio", "run"]),
        ("strength", &["💪", "strength", "gym"]),
        ("nutrition", &["🍎", "nutrition", "eat"]),
        ("wellness", &["😴", "sleep", "rest"]),
        ("learning", &["📚", "read", "study"]),
        ("mindfulness", &["🧘", "meditat", "mindful"]),
    ];

    let names = ctx.activity.habit_names(ctx.user_id).await?;
    let mut categories: HashSet<&str> = HashSet::new();
    for name in &names {
        let lowered = name.to_lowercase();
        for (category, markers) in CATEGORY_MARKERS {
            if markers.iter().any(|marker| lowered.contains(marker)) {
                categories.insert(category);
            }
        }
    }
    Ok(categories.len() as i64 >= required)
}
