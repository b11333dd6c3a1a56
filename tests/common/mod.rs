// SPDX-License-Identifier: MIT
//! Shared test fixtures: an in-memory SQLite pool carrying the domain schema
//! the engine reads (users, habits, media, nutrition, social), plus seed
//! helpers. The engine creates its own tables lazily.

#![allow(dead_code)]

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Once;

/// Route engine tracing through the test harness once per binary.
/// `RUST_LOG=strivetrack_engine=debug cargo test` shows the warn/error
/// paths the best-effort contract swallows.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub async fn memory_pool() -> SqlitePool {
    init_tracing();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory database");
    create_domain_schema(&pool).await;
    pool
}

/// File-backed pool with several connections, for tests that need real
/// write concurrency against one database.
pub async fn file_pool(path: &std::path::Path, connections: u32) -> SqlitePool {
    init_tracing();
    let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", path.display()))
        .expect("sqlite options")
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(connections)
        .connect_with(opts)
        .await
        .expect("open file database");
    create_domain_schema(&pool).await;
    pool
}

async fn create_domain_schema(pool: &SqlitePool) {
    let statements = [
        "CREATE TABLE IF NOT EXISTS users (
            id         TEXT PRIMARY KEY,
            points     INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS achievements (
            id                TEXT PRIMARY KEY,
            name              TEXT NOT NULL,
            description       TEXT NOT NULL DEFAULT '',
            category          TEXT NOT NULL DEFAULT 'habits',
            rarity            TEXT NOT NULL DEFAULT 'common',
            requirement_type  TEXT NOT NULL,
            requirement_value INTEGER NOT NULL DEFAULT 1,
            points            INTEGER NOT NULL DEFAULT 0,
            is_recurring      INTEGER NOT NULL DEFAULT 0,
            is_hidden         INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE TABLE IF NOT EXISTS habits (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL,
            name          TEXT NOT NULL,
            weekly_target INTEGER NOT NULL DEFAULT 7,
            created_at    TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS habit_completions (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL,
            habit_id     TEXT NOT NULL,
            points       INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS media_uploads (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            file_type   TEXT NOT NULL,
            media_type  TEXT NOT NULL DEFAULT 'progress',
            description TEXT,
            uploaded_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS user_nutrition_logs (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL,
            food_name        TEXT NOT NULL DEFAULT '',
            calories         REAL NOT NULL DEFAULT 0,
            protein_g        REAL NOT NULL DEFAULT 0,
            carbs_g          REAL NOT NULL DEFAULT 0,
            fat_g            REAL NOT NULL DEFAULT 0,
            fiber_g          REAL NOT NULL DEFAULT 0,
            sugar_g          REAL NOT NULL DEFAULT 0,
            water_ml         REAL NOT NULL DEFAULT 0,
            is_custom_recipe INTEGER NOT NULL DEFAULT 0,
            logged_at        TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS user_daily_nutrition (
            user_id          TEXT NOT NULL,
            log_date         TEXT NOT NULL,
            met_calorie_goal INTEGER NOT NULL DEFAULT 0,
            met_protein_goal INTEGER NOT NULL DEFAULT 0,
            met_carbs_goal   INTEGER NOT NULL DEFAULT 0,
            met_fat_goal     INTEGER NOT NULL DEFAULT 0,
            met_water_goal   INTEGER NOT NULL DEFAULT 0,
            protein_pct      REAL NOT NULL DEFAULT 0,
            carbs_pct        REAL NOT NULL DEFAULT 0,
            fat_pct          REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, log_date)
        )",
        "CREATE TABLE IF NOT EXISTS user_weight_logs (
            id        TEXT PRIMARY KEY,
            user_id   TEXT NOT NULL,
            logged_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS user_activity_log (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL,
            activity_type TEXT NOT NULL,
            activity_data TEXT,
            created_at    TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS friendships (
            id         TEXT PRIMARY KEY,
            user_id    TEXT NOT NULL,
            friend_id  TEXT NOT NULL,
            status     TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS daily_challenges (
            id                TEXT PRIMARY KEY,
            requirement_type  TEXT NOT NULL,
            requirement_value INTEGER NOT NULL DEFAULT 1,
            points_reward     INTEGER NOT NULL DEFAULT 0,
            category          TEXT NOT NULL DEFAULT '',
            is_active         INTEGER NOT NULL DEFAULT 1
        )",
    ];
    for sql in statements {
        sqlx::query(sql).execute(pool).await.expect("create table");
    }
}

pub async fn seed_user(pool: &SqlitePool, user_id: &str, created_at: &str) {
    sqlx::query("INSERT INTO users (id, points, created_at) VALUES (?, 0, ?)")
        .bind(user_id)
        .bind(created_at)
        .execute(pool)
        .await
        .expect("seed user");
}

pub async fn seed_definition(
    pool: &SqlitePool,
    id: &str,
    requirement_type: &str,
    requirement_value: i64,
    points: i64,
) {
    sqlx::query(
        "INSERT INTO achievements
            (id, name, description, requirement_type, requirement_value, points)
         VALUES (?, ?, '', ?, ?, ?)",
    )
    .bind(id)
    .bind(id)
    .bind(requirement_type)
    .bind(requirement_value)
    .bind(points)
    .execute(pool)
    .await
    .expect("seed definition");
}

pub async fn seed_definition_full(
    pool: &SqlitePool,
    id: &str,
    requirement_type: &str,
    requirement_value: i64,
    points: i64,
    category: &str,
    is_hidden: bool,
) {
    sqlx::query(
        "INSERT INTO achievements
            (id, name, description, category, requirement_type,
             requirement_value, points, is_hidden)
         VALUES (?, ?, '', ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(id)
    .bind(category)
    .bind(requirement_type)
    .bind(requirement_value)
    .bind(points)
    .bind(is_hidden)
    .execute(pool)
    .await
    .expect("seed definition");
}

pub async fn seed_habit(pool: &SqlitePool, habit_id: &str, user_id: &str, name: &str) {
    sqlx::query(
        "INSERT INTO habits (id, user_id, name, weekly_target, created_at)
         VALUES (?, ?, ?, 7, '2026-01-01T00:00:00Z')",
    )
    .bind(habit_id)
    .bind(user_id)
    .bind(name)
    .execute(pool)
    .await
    .expect("seed habit");
}

pub async fn add_completion(
    pool: &SqlitePool,
    user_id: &str,
    habit_id: &str,
    completed_at: &str,
) {
    sqlx::query(
        "INSERT INTO habit_completions (id, user_id, habit_id, points, completed_at)
         VALUES (?, ?, ?, 5, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(habit_id)
    .bind(completed_at)
    .execute(pool)
    .await
    .expect("add completion");
}

pub async fn user_points(pool: &SqlitePool, user_id: &str) -> i64 {
    sqlx::query_scalar("SELECT points FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("read points")
}

pub async fn unlock_rows(pool: &SqlitePool, user_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM user_achievements WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("count unlocks")
}

pub async fn ledger_point_sum(pool: &SqlitePool, user_id: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(points_earned), 0) FROM user_achievements WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .expect("sum ledger points")
}
