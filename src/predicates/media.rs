// SPDX-License-Identifier: MIT
//! Media-upload predicates: typed upload counts, weekly upload runs, and the
//! paired before/after detection.

use anyhow::Result;

use super::{week_start, weekly_run_reaches, window_start, PredicateContext};
use crate::model::{ActionEvent, ActionType};

const DAILY_SLACK: i64 = 5;
/// Extra 7-day blocks scanned beyond the required run length.
const WEEK_SCAN_EXTRA: i64 = 2;

/// Typed upload thresholds (`before` / `after` / `progress`) only fire on a
/// matching upload event, so a stale count cannot unlock them out of context.
pub fn typed_uploads(
    _ctx: &PredicateContext<'_>,
    event: &ActionEvent,
    media_type: &str,
    current_count: i64,
    required: i64,
) -> Result<bool> {
    if event.action_type != ActionType::MediaUpload {
        return Ok(false);
    }
    if event.data_str("media_type") != Some(media_type) {
        return Ok(false);
    }
    Ok(current_count >= required)
}

/// A before/after pair inside the current calendar week: at least two photos
/// whose first and last upload days are three or more days apart.
pub async fn weekly_before_after(
    ctx: &PredicateContext<'_>,
    event: &ActionEvent,
) -> Result<bool> {
    if event.action_type != ActionType::MediaUpload {
        return Ok(false);
    }
    let start = week_start(ctx.today);
    let end = start + chrono::Days::new(6);
    let (count, first, last) = ctx
        .activity
        .photo_span_between(ctx.user_id, start, end)
        .await?;
    if count < 2 {
        return Ok(false);
    }
    let (Some(first), Some(last)) = (first, last) else {
        return Ok(false);
    };
    let parse = |s: &str| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
    match (parse(&first), parse(&last)) {
        (Some(first), Some(last)) => Ok((last - first).num_days() >= 3),
        _ => Ok(false),
    }
}

pub async fn described_uploads(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let count = ctx.activity.described_upload_count(ctx.user_id).await?;
    Ok(count >= required)
}

/// Distinct months containing a before/after comparison video.
pub async fn monthly_video_comparisons(
    ctx: &PredicateContext<'_>,
    required: i64,
) -> Result<bool> {
    let months = ctx.activity.comparison_video_months(ctx.user_id).await?;
    Ok(months >= required)
}

pub async fn weekly_photo_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    weekly_run_reaches(ctx.today, required, WEEK_SCAN_EXTRA, |start, end| {
        ctx.activity
            .media_count_between(ctx.user_id, start, end, Some("image/"))
    })
    .await
}

pub async fn weekly_video_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    weekly_run_reaches(ctx.today, required, WEEK_SCAN_EXTRA, |start, end| {
        ctx.activity
            .media_count_between(ctx.user_id, start, end, Some("video/"))
    })
    .await
}

/// Any-media weekly run; gated on an upload event like the original trigger.
pub async fn weekly_upload_streak(
    ctx: &PredicateContext<'_>,
    event: &ActionEvent,
    required: i64,
) -> Result<bool> {
    if !matches!(
        event.action_type,
        ActionType::MediaUpload | ActionType::VideoUpload
    ) {
        return Ok(false);
    }
    weekly_run_reaches(ctx.today, required, WEEK_SCAN_EXTRA, |start, end| {
        ctx.activity
            .media_count_between(ctx.user_id, start, end, None)
    })
    .await
}

/// Distinct upload days in a loose trailing window.
pub async fn progress_day_streak(ctx: &PredicateContext<'_>, required: i64) -> Result<bool> {
    let since = window_start(ctx.today, required, DAILY_SLACK);
    let days = ctx.activity.media_days_since(ctx.user_id, since).await?;
    Ok(days >= required)
}
