use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::DbPool;

use super::model::{Principal, Session};

const SESSION_TTL_DAYS: i64 = 7;
const LOCKOUT_WINDOW_MINUTES: i64 = 15;
const LOCKOUT_MAX_FAILURES: i64 = 5;

// Roles that authenticate with email+password.
const PASSWORD_ROLES_SQL: &str = "role IN ('admin', 'super_admin', 'sysadmin')";

/// Patch for the admin coach-update endpoint. The statement is generated
/// structurally from the populated fields, so the set of writable columns is
/// exactly this type.
#[derive(Debug, Default)]
pub struct CoachPatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub pin_hash: Option<String>,
}

impl CoachPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.username.is_none() && self.pin_hash.is_none()
    }
}

pub struct PrincipalCrud {
    pool: DbPool,
}

impl PrincipalCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, principal: &Principal) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO principals (
                id, tenant_id, role, email, username, password_hash, pin_hash,
                email_verified, email_verification_token, email_verification_expires,
                two_factor_enabled, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&principal.id)
        .bind(&principal.tenant_id)
        .bind(&principal.role)
        .bind(&principal.email)
        .bind(&principal.username)
        .bind(&principal.password_hash)
        .bind(&principal.pin_hash)
        .bind(principal.email_verified)
        .bind(&principal.email_verification_token)
        .bind(principal.email_verification_expires)
        .bind(principal.two_factor_enabled)
        .bind(principal.created_at)
        .bind(principal.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>("SELECT * FROM principals WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_id_in_tenant(
        &self,
        id: &str,
        tenant_id: &str,
    ) -> Result<Option<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>("SELECT * FROM principals WHERE id = ? AND tenant_id = ?")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_admin_by_email(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<Option<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>(&format!(
            "SELECT * FROM principals WHERE tenant_id = ? AND email = ? AND {PASSWORD_ROLES_SQL}"
        ))
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_coach_by_username(
        &self,
        tenant_id: &str,
        username: &str,
    ) -> Result<Option<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>(
            "SELECT * FROM principals WHERE tenant_id = ? AND lower(username) = lower(?) AND role = 'coach'",
        )
        .bind(tenant_id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// PIN-reset requests identify the coach by tenant, email and username
    /// together, which keeps guesses expensive.
    pub async fn find_coach_for_pin_reset(
        &self,
        tenant_id: &str,
        email: &str,
        username: &str,
    ) -> Result<Option<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>(
            r#"
            SELECT * FROM principals
            WHERE tenant_id = ? AND email = ? AND lower(username) = lower(?) AND role = 'coach'
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn email_exists_anywhere(&self, email: &str) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM principals WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn email_exists_in_tenant(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM principals WHERE tenant_id = ? AND email = ?")
                .bind(tenant_id)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    pub async fn username_exists(
        &self,
        tenant_id: &str,
        username: &str,
    ) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM principals WHERE tenant_id = ? AND lower(username) = lower(?)",
        )
        .bind(tenant_id)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    // -------------------------------------------------------------------------
    // Email verification
    // -------------------------------------------------------------------------

    pub async fn find_by_verification_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>(
            r#"
            SELECT * FROM principals
            WHERE email_verification_token = ?
              AND email_verification_expires > ?
              AND email_verified = 0
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn mark_email_verified(&self, id: &str, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE principals
            SET email_verified = 1,
                email_verification_token = NULL,
                email_verification_expires = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Issuing a new token supersedes any previous one on the row.
    pub async fn set_verification_token(
        &self,
        id: &str,
        token: &str,
        expires: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE principals
            SET email_verification_token = ?, email_verification_expires = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(token)
        .bind(expires)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Email change: the new address starts unverified with a fresh token.
    pub async fn change_email(
        &self,
        id: &str,
        email: &str,
        token: &str,
        expires: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE principals
            SET email = ?,
                email_verified = 0,
                email_verification_token = ?,
                email_verification_expires = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(email)
        .bind(token)
        .bind(expires)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Password reset
    // -------------------------------------------------------------------------

    pub async fn set_password_reset_token(
        &self,
        id: &str,
        token: &str,
        expires: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE principals
            SET password_reset_token = ?, password_reset_expires = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(token)
        .bind(expires)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_password_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>(
            "SELECT * FROM principals WHERE password_reset_token = ? AND password_reset_expires > ?",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    /// Writes the new hash and clears the reset token in one statement.
    pub async fn update_password(
        &self,
        id: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE principals
            SET password_hash = ?,
                password_reset_token = NULL,
                password_reset_expires = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(password_hash)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // PIN reset
    // -------------------------------------------------------------------------

    pub async fn set_pin_reset_token(
        &self,
        id: &str,
        token: &str,
        expires: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE principals
            SET pin_reset_token = ?, pin_reset_expires = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(token)
        .bind(expires)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_pin_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>(
            "SELECT * FROM principals WHERE pin_reset_token = ? AND pin_reset_expires > ?",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn update_pin(
        &self,
        id: &str,
        pin_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE principals
            SET pin_hash = ?,
                pin_reset_token = NULL,
                pin_reset_expires = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(pin_hash)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Two-factor
    // -------------------------------------------------------------------------

    pub async fn set_two_factor_secret(
        &self,
        id: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE principals SET two_factor_secret = ?, updated_at = ? WHERE id = ?",
        )
        .bind(secret)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn enable_two_factor(
        &self,
        id: &str,
        backup_codes_json: &str,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE principals
            SET two_factor_enabled = 1, two_factor_backup_codes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(backup_codes_json)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn disable_two_factor(&self, id: &str, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE principals
            SET two_factor_enabled = 0,
                two_factor_secret = NULL,
                two_factor_backup_codes = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Rewrites the backup-code list after one code was consumed.
    pub async fn set_backup_codes(
        &self,
        id: &str,
        backup_codes_json: &str,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE principals SET two_factor_backup_codes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(backup_codes_json)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn touch_last_login(&self, id: &str, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE principals SET last_login = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Coach administration
    // -------------------------------------------------------------------------

    pub async fn count_coaches(&self, tenant_id: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM principals WHERE tenant_id = ? AND role = 'coach'",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn list_coaches(&self, tenant_id: &str) -> Result<Vec<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>(
            "SELECT * FROM principals WHERE tenant_id = ? AND role = 'coach' ORDER BY created_at",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_coach_by_id(
        &self,
        tenant_id: &str,
        id: &str,
    ) -> Result<Option<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>(
            "SELECT * FROM principals WHERE tenant_id = ? AND id = ? AND role = 'coach'",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// The SET list is generated from the typed patch; there is no column
    /// name that can reach the SQL from user input.
    pub async fn update_coach(
        &self,
        tenant_id: &str,
        id: &str,
        patch: &CoachPatch,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new("UPDATE principals SET updated_at = ");
        qb.push_bind(now);
        if let Some(email) = &patch.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(username) = &patch.username {
            qb.push(", username = ").push_bind(username);
        }
        if let Some(pin_hash) = &patch.pin_hash {
            qb.push(", pin_hash = ").push_bind(pin_hash);
        }
        qb.push(" WHERE tenant_id = ")
            .push_bind(tenant_id)
            .push(" AND id = ")
            .push_bind(id)
            .push(" AND role = 'coach'");

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_coach(&self, tenant_id: &str, id: &str) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM principals WHERE tenant_id = ? AND id = ? AND role = 'coach'")
                .bind(tenant_id)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

pub struct SessionCrud {
    pool: DbPool,
}

impl SessionCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn session_ttl() -> Duration {
        Duration::days(SESSION_TTL_DAYS)
    }

    pub async fn create(
        &self,
        principal_id: &str,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, sqlx::Error> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            principal_id: principal_id.to_string(),
            token_hash: token_hash.to_string(),
            expires_at: now + Self::session_ttl(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO sessions (id, principal_id, token_hash, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.principal_id)
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    pub async fn find_live_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    /// Atomic rotation: the old row is deleted and the replacement inserted
    /// in one transaction. Deleting zero rows means the token was already
    /// rotated (or never existed) and the whole operation aborts, so a
    /// replayed refresh can never mint a second session.
    pub async fn rotate(
        &self,
        old_token_hash: &str,
        new_token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let live: Option<Session> = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?",
        )
        .bind(old_token_hash)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(old) = live else {
            return Ok(None);
        };

        let deleted = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(old_token_hash)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            // Lost the race against a concurrent rotation.
            return Ok(None);
        }

        let session = Session {
            id: Uuid::new_v4().to_string(),
            principal_id: old.principal_id.clone(),
            token_hash: new_token_hash.to_string(),
            expires_at: now + Self::session_ttl(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO sessions (id, principal_id, token_hash, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.principal_id)
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(session))
    }

    pub async fn delete_by_hash(&self, token_hash: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Credential changes call this; the user signs in again everywhere.
    pub async fn delete_for_principal(&self, principal_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE principal_id = ?")
            .bind(principal_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Housekeeping for operator cron; correctness never depends on it.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

pub struct LoginAttemptCrud {
    pool: DbPool,
}

impl LoginAttemptCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        identifier: &str,
        ip: &str,
        principal_id: Option<&str>,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts (id, principal_id, identifier, ip, success, occurred_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(principal_id)
        .bind(identifier)
        .bind(ip)
        .bind(success)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Sliding window: with five or more failures in the last 15 minutes the
    /// key is locked until the fifth-newest failure ages out of the window.
    pub async fn lockout_until(
        &self,
        identifier: &str,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        let window_start = now - Duration::minutes(LOCKOUT_WINDOW_MINUTES);

        let failures: Vec<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            SELECT occurred_at FROM login_attempts
            WHERE identifier = ? AND ip = ? AND success = 0 AND occurred_at > ?
            ORDER BY occurred_at DESC
            "#,
        )
        .bind(identifier)
        .bind(ip)
        .bind(window_start)
        .fetch_all(&self.pool)
        .await?;

        if failures.len() < LOCKOUT_MAX_FAILURES as usize {
            return Ok(None);
        }

        let pivot = failures[LOCKOUT_MAX_FAILURES as usize - 1].0;
        Ok(Some(pivot + Duration::minutes(LOCKOUT_WINDOW_MINUTES)))
    }

    /// Housekeeping twin of `SessionCrud::delete_expired`.
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE occurred_at <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
