// SPDX-License-Identifier: MIT
//! Windowed and gated predicates driven end-to-end through the engine with a
//! pinned clock and seeded activity history.

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use strivetrack_engine::{ActionType, Engine, EngineConfig, FixedClock};

fn engine_on(pool: sqlx::SqlitePool, date: (i32, u32, u32)) -> Engine {
    let clock = FixedClock::on_date(NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap());
    Engine::with_clock(pool, EngineConfig::default(), Arc::new(clock))
}

async fn add_login(pool: &sqlx::SqlitePool, day: &str) {
    sqlx::query(
        "INSERT INTO user_activity_log (id, user_id, activity_type, created_at)
         VALUES (?, 'u1', 'login', ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(format!("{day}T07:30:00Z"))
    .execute(pool)
    .await
    .unwrap();
}

async fn add_photo(pool: &sqlx::SqlitePool, day: &str) {
    sqlx::query(
        "INSERT INTO media_uploads (id, user_id, file_type, media_type, uploaded_at)
         VALUES (?, 'u1', 'image/jpeg', 'progress', ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(format!("{day}T12:00:00Z"))
    .execute(pool)
    .await
    .unwrap();
}

async fn add_water_log(pool: &sqlx::SqlitePool, day: &str) {
    sqlx::query(
        "INSERT INTO user_nutrition_logs (id, user_id, food_name, water_ml, logged_at)
         VALUES (?, 'u1', 'water', 500, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(format!("{day}T09:00:00Z"))
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn login_streak_counts_distinct_days_in_window() {
    let pool = common::memory_pool().await;
    common::seed_user(&pool, "u1", "2026-07-01T00:00:00Z").await;
    common::seed_definition(&pool, "week_of_logins", "login_streak", 7, 40).await;

    // Seven qualifying days inside the 7+5-day window, with one gap.
    for day in [
        "2026-07-29",
        "2026-07-30",
        "2026-07-31",
        "2026-08-01",
        "2026-08-03",
        "2026-08-04",
        "2026-08-05",
    ] {
        add_login(&pool, day).await;
    }

    let engine = engine_on(pool.clone(), (2026, 8, 5));
    let unlocked = engine
        .evaluate("u1", ActionType::General, serde_json::json!({}))
        .await;
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].definition.id, "week_of_logins");
}

#[tokio::test]
async fn login_streak_outside_window_does_not_count() {
    let pool = common::memory_pool().await;
    common::seed_user(&pool, "u1", "2026-07-01T00:00:00Z").await;
    common::seed_definition(&pool, "week_of_logins", "login_streak", 7, 40).await;

    // Seven days, but four of them fall before the trailing window.
    for day in [
        "2026-07-01",
        "2026-07-02",
        "2026-07-03",
        "2026-07-04",
        "2026-08-03",
        "2026-08-04",
        "2026-08-05",
    ] {
        add_login(&pool, day).await;
    }

    let engine = engine_on(pool.clone(), (2026, 8, 5));
    let unlocked = engine
        .evaluate("u1", ActionType::General, serde_json::json!({}))
        .await;
    assert!(unlocked.is_empty());
}

#[tokio::test]
async fn water_tracking_is_gated_on_nutrition_log_events() {
    let pool = common::memory_pool().await;
    common::seed_user(&pool, "u1", "2026-07-01T00:00:00Z").await;
    common::seed_definition(&pool, "hydrated", "water_tracking", 5, 25).await;

    for day in [
        "2026-08-01",
        "2026-08-02",
        "2026-08-03",
        "2026-08-04",
        "2026-08-05",
    ] {
        add_water_log(&pool, day).await;
    }

    // A login does not evaluate the nutrition-gated kind.
    let on_login = engine_on(pool.clone(), (2026, 8, 5))
        .evaluate("u1", ActionType::Login, serde_json::json!({}))
        .await;
    assert!(on_login.is_empty());

    let on_log = engine_on(pool.clone(), (2026, 8, 5))
        .evaluate("u1", ActionType::NutritionLog, serde_json::json!({}))
        .await;
    assert_eq!(on_log.len(), 1);
    assert_eq!(on_log[0].definition.id, "hydrated");
}

#[tokio::test]
async fn weekly_photo_streak_needs_consecutive_blocks() {
    let pool = common::memory_pool().await;
    common::seed_user(&pool, "u1", "2026-07-01T00:00:00Z").await;
    common::seed_definition(&pool, "photo_rhythm", "weekly_photo_streak", 3, 35).await;

    // One photo in each of the three most recent 7-day blocks.
    add_photo(&pool, "2026-08-07").await;
    add_photo(&pool, "2026-08-01").await;
    add_photo(&pool, "2026-07-25").await;

    let engine = engine_on(pool.clone(), (2026, 8, 7));
    let unlocked = engine
        .evaluate("u1", ActionType::General, serde_json::json!({}))
        .await;
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].definition.id, "photo_rhythm");
}

#[tokio::test]
async fn weekly_photo_streak_broken_by_empty_block() {
    let pool = common::memory_pool().await;
    common::seed_user(&pool, "u1", "2026-07-01T00:00:00Z").await;
    common::seed_definition(&pool, "photo_rhythm", "weekly_photo_streak", 3, 35).await;

    // Middle block empty: the run restarts.
    add_photo(&pool, "2026-08-07").await;
    add_photo(&pool, "2026-07-25").await;

    let engine = engine_on(pool.clone(), (2026, 8, 7));
    let unlocked = engine
        .evaluate("u1", ActionType::General, serde_json::json!({}))
        .await;
    assert!(unlocked.is_empty());
}

#[tokio::test]
async fn weekly_before_after_pairs_photos_in_calendar_week() {
    let pool = common::memory_pool().await;
    common::seed_user(&pool, "u1", "2026-07-01T00:00:00Z").await;
    common::seed_definition(&pool, "week_transformer", "weekly_before_after", 1, 30).await;

    // 2026-08-07 is a Friday; its week runs Sunday 08-02 through 08-08.
    add_photo(&pool, "2026-08-03").await;
    add_photo(&pool, "2026-08-07").await;

    let unlocked = engine_on(pool.clone(), (2026, 8, 7))
        .evaluate(
            "u1",
            ActionType::MediaUpload,
            serde_json::json!({ "media_type": "progress" }),
        )
        .await;
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].definition.id, "week_transformer");
}

#[tokio::test]
async fn weekly_before_after_requires_three_day_spread() {
    let pool = common::memory_pool().await;
    common::seed_user(&pool, "u1", "2026-07-01T00:00:00Z").await;
    common::seed_definition(&pool, "week_transformer", "weekly_before_after", 1, 30).await;

    // Two photos only one day apart: not a before/after pair.
    add_photo(&pool, "2026-08-06").await;
    add_photo(&pool, "2026-08-07").await;

    let unlocked = engine_on(pool.clone(), (2026, 8, 7))
        .evaluate(
            "u1",
            ActionType::MediaUpload,
            serde_json::json!({ "media_type": "progress" }),
        )
        .await;
    assert!(unlocked.is_empty());
}

#[tokio::test]
async fn morning_completions_require_an_early_trigger() {
    let pool = common::memory_pool().await;
    common::seed_user(&pool, "u1", "2026-07-01T00:00:00Z").await;
    common::seed_habit(&pool, "h1", "u1", "Stretch").await;
    common::seed_definition(&pool, "early_bird", "morning_completions", 3, 20).await;

    for day in ["2026-08-04", "2026-08-05", "2026-08-06"] {
        common::add_completion(&pool, "u1", "h1", &format!("{day}T07:00:00Z")).await;
    }

    // An afternoon completion event does not qualify even though three
    // morning completions already exist.
    let afternoon = engine_on(pool.clone(), (2026, 8, 7))
        .evaluate(
            "u1",
            ActionType::HabitCompletion,
            serde_json::json!({ "time": "2026-08-07T15:00:00Z" }),
        )
        .await;
    assert!(afternoon.is_empty());

    let morning = engine_on(pool.clone(), (2026, 8, 7))
        .evaluate(
            "u1",
            ActionType::HabitCompletion,
            serde_json::json!({ "time": "2026-08-07T07:45:00Z" }),
        )
        .await;
    assert_eq!(morning.len(), 1);
    assert_eq!(morning[0].definition.id, "early_bird");
}

#[tokio::test]
async fn habit_variety_counts_marker_categories() {
    let pool = common::memory_pool().await;
    common::seed_user(&pool, "u1", "2026-07-01T00:00:00Z").await;
    common::seed_definition(&pool, "well_rounded", "habit_categories", 3, 30).await;
    common::seed_habit(&pool, "h1", "u1", "Drink water").await;
    common::seed_habit(&pool, "h2", "u1", "Morning run").await;
    common::seed_habit(&pool, "h3", "u1", "Gym session").await;

    let unlocked = engine_on(pool.clone(), (2026, 8, 7))
        .evaluate("u1", ActionType::General, serde_json::json!({}))
        .await;
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].definition.id, "well_rounded");
}

#[tokio::test]
async fn category_mastery_fires_when_category_is_complete() {
    let pool = common::memory_pool().await;
    common::seed_user(&pool, "u1", "2026-07-01T00:00:00Z").await;
    common::seed_habit(&pool, "h1", "u1", "Walk").await;
    common::seed_definition_full(&pool, "welcome", "account_created", 1, 10, "starter", false)
        .await;
    common::seed_definition_full(&pool, "first_habit", "habits_created", 1, 15, "starter", false)
        .await;
    // The mastery badge itself is hidden so it does not gate its own total.
    common::seed_definition_full(
        &pool,
        "starter_master",
        "category_mastery",
        1,
        50,
        "starter",
        true,
    )
    .await;

    let engine = engine_on(pool.clone(), (2026, 8, 7));

    // First pass earns both starter badges; mastery evaluated in the same
    // pass still saw an incomplete category.
    let first = engine
        .evaluate("u1", ActionType::General, serde_json::json!({}))
        .await;
    let ids: Vec<&str> = first.iter().map(|u| u.definition.id.as_str()).collect();
    assert!(ids.contains(&"welcome"));
    assert!(ids.contains(&"first_habit"));

    // Second pass observes the completed category.
    let second = engine
        .evaluate("u1", ActionType::General, serde_json::json!({}))
        .await;
    let ids: Vec<&str> = second.iter().map(|u| u.definition.id.as_str()).collect();
    assert!(ids.contains(&"starter_master"), "got {ids:?}");
}
