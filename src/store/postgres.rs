use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::info;

use super::{Store, StoreError};
use crate::config::DatabaseConfig;
use crate::models::{
    AdminChallenge, AttackAlert, AuditEntry, ChallengeAttempt, EmailLogEntry, ErrorLogEntry,
    League, Prediction, Presence, PresenceSession, RaceResult, Score, User,
};
use crate::scoring::TopSix;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL,
        team_name TEXT NOT NULL,
        secondary_team_name TEXT,
        is_admin BOOLEAN NOT NULL DEFAULT FALSE,
        must_change_pin BOOLEAN NOT NULL DEFAULT FALSE,
        providers TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS predictions (
        team_id TEXT NOT NULL,
        race_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        team_name TEXT NOT NULL,
        drivers TEXT[] NOT NULL,
        submitted_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (team_id, race_id)
    )"#,
    "CREATE INDEX IF NOT EXISTS predictions_race_idx ON predictions (race_id)",
    r#"CREATE TABLE IF NOT EXISTS race_results (
        race_id TEXT PRIMARY KEY,
        drivers TEXT[] NOT NULL,
        submitted_by TEXT NOT NULL,
        submitted_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS scores (
        user_id TEXT NOT NULL,
        team_id TEXT NOT NULL,
        team_name TEXT NOT NULL,
        race_id TEXT NOT NULL,
        total_points INTEGER NOT NULL,
        breakdown TEXT NOT NULL,
        calculated_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (team_id, race_id)
    )"#,
    "CREATE INDEX IF NOT EXISTS scores_race_idx ON scores (race_id)",
    r#"CREATE TABLE IF NOT EXISTS admin_challenges (
        token_hash TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        email TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS admin_challenge_attempts (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS admin_challenge_attempts_created_idx ON admin_challenge_attempts (created_at)",
    r#"CREATE TABLE IF NOT EXISTS audit_logs (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        action TEXT NOT NULL,
        details JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS error_logs (
        correlation_id TEXT PRIMARY KEY,
        message TEXT NOT NULL,
        context JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS email_logs (
        id TEXT PRIMARY KEY,
        to_address TEXT NOT NULL,
        subject TEXT NOT NULL,
        status TEXT NOT NULL,
        error TEXT,
        created_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS attack_alerts (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        user_id TEXT,
        details JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS leagues (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        owner_id TEXT NOT NULL,
        member_user_ids TEXT[] NOT NULL DEFAULT '{}',
        is_global BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS presence (
        user_id TEXT PRIMARY KEY,
        online BOOLEAN NOT NULL,
        sessions JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS app_settings (
        key TEXT PRIMARY KEY,
        value JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )"#,
];

/// PostgreSQL-backed store, one table per collection.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;
        info!("Connected to PostgreSQL store");
        Ok(Self { pool })
    }

    /// Creates missing tables and indexes. Safe to re-run.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Store schema is up to date ({} statements)", SCHEMA.len());
        Ok(())
    }
}

fn top_six(row: &PgRow, column: &str) -> Result<TopSix, StoreError> {
    let drivers: Vec<String> = row.try_get(column)?;
    TopSix::from_drivers(drivers).map_err(|e| StoreError::Corrupt(format!("{}: {}", column, e)))
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        team_name: row.try_get("team_name")?,
        secondary_team_name: row.try_get("secondary_team_name")?,
        is_admin: row.try_get("is_admin")?,
        must_change_pin: row.try_get("must_change_pin")?,
        providers: row.try_get("providers")?,
        created_at: row.try_get("created_at")?,
    })
}

fn prediction_from_row(row: &PgRow) -> Result<Prediction, StoreError> {
    Ok(Prediction {
        user_id: row.try_get("user_id")?,
        team_id: row.try_get("team_id")?,
        team_name: row.try_get("team_name")?,
        race_id: row.try_get("race_id")?,
        predictions: top_six(row, "drivers")?,
        submitted_at: row.try_get("submitted_at")?,
    })
}

fn score_from_row(row: &PgRow) -> Result<Score, StoreError> {
    let total: i32 = row.try_get("total_points")?;
    Ok(Score {
        user_id: row.try_get("user_id")?,
        team_id: row.try_get("team_id")?,
        team_name: row.try_get("team_name")?,
        race_id: row.try_get("race_id")?,
        total_points: u32::try_from(total)
            .map_err(|_| StoreError::Corrupt(format!("negative total_points {}", total)))?,
        breakdown: row.try_get("breakdown")?,
        calculated_at: row.try_get("calculated_at")?,
    })
}

fn league_from_row(row: &PgRow) -> Result<League, StoreError> {
    Ok(League {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        owner_id: row.try_get("owner_id")?,
        member_user_ids: row.try_get("member_user_ids")?,
        is_global: row.try_get("is_global")?,
        created_at: row.try_get("created_at")?,
    })
}

const SCORE_COLUMNS: &str =
    "user_id, team_id, team_name, race_id, total_points, breakdown, calculated_at";

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn put_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, team_name, secondary_team_name, is_admin, must_change_pin, providers, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                team_name = EXCLUDED.team_name,
                secondary_team_name = EXCLUDED.secondary_team_name,
                is_admin = EXCLUDED.is_admin,
                must_change_pin = EXCLUDED.must_change_pin,
                providers = EXCLUDED.providers
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.team_name)
        .bind(&user.secondary_team_name)
        .bind(user.is_admin)
        .bind(user.must_change_pin)
        .bind(&user.providers)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn put_prediction(&self, prediction: &Prediction) -> Result<(), StoreError> {
        let drivers: Vec<String> = prediction.predictions.clone().into();
        sqlx::query(
            r#"
            INSERT INTO predictions (team_id, race_id, user_id, team_name, drivers, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (team_id, race_id) DO UPDATE SET
                team_name = EXCLUDED.team_name,
                drivers = EXCLUDED.drivers,
                submitted_at = EXCLUDED.submitted_at
            "#,
        )
        .bind(&prediction.team_id)
        .bind(&prediction.race_id)
        .bind(&prediction.user_id)
        .bind(&prediction.team_name)
        .bind(&drivers)
        .bind(prediction.submitted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_prediction(
        &self,
        team_id: &str,
        race_id: &str,
    ) -> Result<Option<Prediction>, StoreError> {
        let row = sqlx::query("SELECT * FROM predictions WHERE team_id = $1 AND race_id = $2")
            .bind(team_id)
            .bind(race_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(prediction_from_row).transpose()
    }

    async fn list_predictions_for_race(&self, race_id: &str) -> Result<Vec<Prediction>, StoreError> {
        let rows = sqlx::query("SELECT * FROM predictions WHERE race_id = $1 ORDER BY team_id")
            .bind(race_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(prediction_from_row).collect()
    }

    async fn put_race_result(&self, result: &RaceResult) -> Result<(), StoreError> {
        let drivers: Vec<String> = result.drivers.clone().into();
        sqlx::query(
            r#"
            INSERT INTO race_results (race_id, drivers, submitted_by, submitted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (race_id) DO UPDATE SET
                drivers = EXCLUDED.drivers,
                submitted_by = EXCLUDED.submitted_by,
                submitted_at = EXCLUDED.submitted_at
            "#,
        )
        .bind(&result.race_id)
        .bind(&drivers)
        .bind(&result.submitted_by)
        .bind(result.submitted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_race_result(&self, race_id: &str) -> Result<Option<RaceResult>, StoreError> {
        let row = sqlx::query("SELECT * FROM race_results WHERE race_id = $1")
            .bind(race_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(RaceResult {
                race_id: row.try_get("race_id")?,
                drivers: top_six(&row, "drivers")?,
                submitted_by: row.try_get("submitted_by")?,
                submitted_at: row.try_get("submitted_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn put_scores(&self, scores: &[Score]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for score in scores {
            sqlx::query(
                r#"
                INSERT INTO scores (user_id, team_id, team_name, race_id, total_points, breakdown, calculated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (team_id, race_id) DO UPDATE SET
                    team_name = EXCLUDED.team_name,
                    total_points = EXCLUDED.total_points,
                    breakdown = EXCLUDED.breakdown,
                    calculated_at = EXCLUDED.calculated_at
                "#,
            )
            .bind(&score.user_id)
            .bind(&score.team_id)
            .bind(&score.team_name)
            .bind(&score.race_id)
            .bind(score.total_points as i32)
            .bind(&score.breakdown)
            .bind(score.calculated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_scores_for_race(&self, race_id: &str) -> Result<Vec<Score>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {} FROM scores WHERE race_id = $1", SCORE_COLUMNS))
            .bind(race_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(score_from_row).collect()
    }

    async fn list_scores(&self) -> Result<Vec<Score>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {} FROM scores", SCORE_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(score_from_row).collect()
    }

    async fn put_challenge(&self, challenge: &AdminChallenge) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO admin_challenges (token_hash, user_id, email, created_at, expires_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&challenge.token_hash)
        .bind(&challenge.user_id)
        .bind(&challenge.email)
        .bind(challenge.created_at)
        .bind(challenge.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_challenge(&self, token_hash: &str) -> Result<Option<AdminChallenge>, StoreError> {
        let row = sqlx::query("SELECT * FROM admin_challenges WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(AdminChallenge {
                token_hash: row.try_get("token_hash")?,
                user_id: row.try_get("user_id")?,
                email: row.try_get("email")?,
                created_at: row.try_get("created_at")?,
                expires_at: row.try_get("expires_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_challenge(&self, token_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM admin_challenges WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn put_challenge_attempt(&self, attempt: &ChallengeAttempt) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO admin_challenge_attempts (id, user_id, created_at) VALUES ($1, $2, $3)")
            .bind(&attempt.id)
            .bind(&attempt.user_id)
            .bind(attempt.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_challenge_attempts(
        &self,
        user_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM admin_challenge_attempts WHERE created_at >= $1 AND ($2::TEXT IS NULL OR user_id = $2)",
        )
        .bind(since)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0.max(0) as u64)
    }

    async fn prune_challenges(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let attempts = sqlx::query("DELETE FROM admin_challenge_attempts WHERE created_at < $1")
            .bind(before)
            .execute(&mut *tx)
            .await?;
        let challenges = sqlx::query("DELETE FROM admin_challenges WHERE expires_at < $1")
            .bind(before)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(attempts.rows_affected() + challenges.rows_affected())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO audit_logs (id, user_id, action, details, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.action)
        .bind(&entry.details)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM audit_logs ORDER BY created_at DESC LIMIT $1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(AuditEntry {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    action: row.try_get("action")?,
                    details: row.try_get("details")?,
                    timestamp: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn append_error(&self, entry: &ErrorLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO error_logs (correlation_id, message, context, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&entry.correlation_id)
        .bind(&entry.message)
        .bind(&entry.context)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_errors(&self, limit: usize) -> Result<Vec<ErrorLogEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM error_logs ORDER BY created_at DESC LIMIT $1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(ErrorLogEntry {
                    correlation_id: row.try_get("correlation_id")?,
                    message: row.try_get("message")?,
                    context: row.try_get("context")?,
                    timestamp: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn append_email_log(&self, entry: &EmailLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO email_logs (id, to_address, subject, status, error, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&entry.id)
        .bind(&entry.to)
        .bind(&entry.subject)
        .bind(entry.status.as_str())
        .bind(&entry.error)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_attack_alert(&self, alert: &AttackAlert) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO attack_alerts (id, kind, user_id, details, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&alert.id)
        .bind(&alert.kind)
        .bind(&alert.user_id)
        .bind(&alert.details)
        .bind(alert.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_league(&self, league: &League) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO leagues (id, name, owner_id, member_user_ids, is_global, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                owner_id = EXCLUDED.owner_id,
                member_user_ids = EXCLUDED.member_user_ids,
                is_global = EXCLUDED.is_global
            "#,
        )
        .bind(&league.id)
        .bind(&league.name)
        .bind(&league.owner_id)
        .bind(&league.member_user_ids)
        .bind(league.is_global)
        .bind(league.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_league(&self, id: &str) -> Result<Option<League>, StoreError> {
        let row = sqlx::query("SELECT * FROM leagues WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(league_from_row).transpose()
    }

    async fn list_leagues(&self) -> Result<Vec<League>, StoreError> {
        let rows = sqlx::query("SELECT * FROM leagues ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(league_from_row).collect()
    }

    async fn get_presence(&self, uid: &str) -> Result<Option<Presence>, StoreError> {
        let row = sqlx::query("SELECT * FROM presence WHERE user_id = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let Json(sessions): Json<Vec<PresenceSession>> = row.try_get("sessions")?;
                Ok(Some(Presence {
                    user_id: row.try_get("user_id")?,
                    online: row.try_get("online")?,
                    sessions,
                    updated_at: row.try_get("updated_at")?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn put_presence(&self, presence: &Presence) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO presence (user_id, online, sessions, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                online = EXCLUDED.online,
                sessions = EXCLUDED.sessions,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&presence.user_id)
        .bind(presence.online)
        .bind(Json(&presence.sessions))
        .bind(presence.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_setting(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT value FROM app_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }
}
