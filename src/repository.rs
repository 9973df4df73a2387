use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
#[cfg(test)]
use mockall::automock;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::skyhook::{NewSkyhookTimer, SkyhookTimer};

/// `skyhook_timers`から取得するカラム。
const TIMER_COLUMNS: &str = "id, eve_system, planet_number, countdown_time, notified_at";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS skyhook_timers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    eve_system TEXT NOT NULL,
    planet_number INTEGER NOT NULL,
    countdown_time TEXT NOT NULL,
    notified_at TEXT
)";

/// skyhookタイマーを永続化するためのリポジトリ。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SkyhookRepository {
    /// タイマーを保存し、採番された行を返す。
    async fn create(&self, timer: &NewSkyhookTimer) -> Result<SkyhookTimer>;

    /// すべてのタイマーを期限の早い順に返す。
    async fn list_all(&self) -> Result<Vec<SkyhookTimer>>;

    /// タイマーを削除する。削除した場合は`true`を返す。
    async fn delete(&self, id: i64) -> Result<bool>;

    /// 通知済みとして記録する。
    async fn mark_notified(&self, id: i64, at: DateTime<Utc>) -> Result<()>;
}

/// SQLiteを利用した`SkyhookRepository`の実装。
///
/// # Examples
///
/// ```
/// let repository = SqliteSkyhookRepository::connect("sqlite::memory:").await.unwrap();
/// let timers = repository.list_all().await.unwrap();
/// ```
pub struct SqliteSkyhookRepository {
    pool: SqlitePool,
}

impl SqliteSkyhookRepository {
    /// データベースに接続し、テーブルが無ければ作成する。
    pub async fn connect(database_url: &str) -> Result<Self> {
        // インメモリDBは接続ごとに別のDBになるため、接続は1本に絞る
        let max_connections = if database_url.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database at {}", database_url))?;
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .context("Failed to create skyhook_timers table")?;
        debug!("Connected to {}", database_url);

        Ok(Self { pool })
    }
}

#[async_trait]
impl SkyhookRepository for SqliteSkyhookRepository {
    async fn create(&self, timer: &NewSkyhookTimer) -> Result<SkyhookTimer> {
        let query = format!(
            "INSERT INTO skyhook_timers (eve_system, planet_number, countdown_time)
             VALUES (?1, ?2, ?3)
             RETURNING {TIMER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, SkyhookTimer>(&query)
            .bind(&timer.eve_system)
            .bind(timer.planet_number)
            .bind(timer.countdown_time)
            .fetch_one(&self.pool)
            .await
            .context("Failed to insert skyhook timer")?;
        info!("Created skyhook timer {}: {}", created.id, created.name());

        Ok(created)
    }

    async fn list_all(&self) -> Result<Vec<SkyhookTimer>> {
        let query = format!("SELECT {TIMER_COLUMNS} FROM skyhook_timers ORDER BY countdown_time, id");
        sqlx::query_as::<_, SkyhookTimer>(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list skyhook timers")
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM skyhook_timers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete skyhook timer {}", id))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_notified(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE skyhook_timers SET notified_at = ?1 WHERE id = ?2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to mark skyhook timer {} as notified", id))?;

        Ok(())
    }
}
