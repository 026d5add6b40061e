//! Database queries for Taskara.

use super::models::{NewUser, PushSubscription, User};
use super::{Database, DatabaseError, unix_timestamp};

impl Database {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Insert a new user row.
    pub async fn create_user(&self, user: &NewUser) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO users (id, name, email, avatar, initials, role, status, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.avatar)
        .bind(&user.initials)
        .bind(&user.role)
        .bind(&user.status)
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(&user.id)
            .await?
            .ok_or_else(|| DatabaseError::Query(format!("user {} vanished after insert", user.id)))
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// Get a user by email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// List all users, newest first.
    pub async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC, id")
            .fetch_all(self.pool())
            .await?;
        Ok(users)
    }

    /// Replace a user's password hash and activate the account.
    ///
    /// Returns the number of rows updated (0 when the user does not exist).
    pub async fn update_password(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<u64, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, status = 'active', updated_at = ? WHERE id = ?",
        )
        .bind(password_hash)
        .bind(now)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Password reset tokens
    // =========================================================================

    /// Persist a fresh reset token for a user.
    pub async fn create_reset_token(
        &self,
        token: &str,
        user_id: &str,
        expires_at: i64,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (token, user_id, expires_at, consumed, created_at) \
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Atomically consume a reset token and return its user id.
    ///
    /// A single conditional update, so under concurrent redemption exactly
    /// one caller observes the unconsumed row; everyone else gets `None`.
    /// Expired or unknown tokens also yield `None`.
    pub async fn consume_reset_token(
        &self,
        token: &str,
        now: i64,
    ) -> Result<Option<String>, DatabaseError> {
        let user_id = sqlx::query_scalar::<_, String>(
            "UPDATE password_reset_tokens SET consumed = 1 \
             WHERE token = ? AND consumed = 0 AND expires_at > ? \
             RETURNING user_id",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(user_id)
    }

    // =========================================================================
    // Push subscriptions
    // =========================================================================

    /// Insert or update a subscription keyed by `(user_id, endpoint)`.
    ///
    /// The unique constraint makes concurrent subscribes from multiple
    /// browser contexts converge on a single row with the latest keys.
    pub async fn upsert_subscription(
        &self,
        id: &str,
        user_id: &str,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO push_subscriptions (id, user_id, endpoint, p256dh, auth, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id, endpoint) DO UPDATE SET \
             p256dh = excluded.p256dh, auth = excluded.auth, updated_at = excluded.updated_at",
        )
        .bind(id)
        .bind(user_id)
        .bind(endpoint)
        .bind(p256dh)
        .bind(auth)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Delete one subscription of a user by endpoint.
    pub async fn delete_subscription(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> Result<u64, DatabaseError> {
        let result =
            sqlx::query("DELETE FROM push_subscriptions WHERE user_id = ? AND endpoint = ?")
                .bind(user_id)
                .bind(endpoint)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected())
    }

    /// Delete every subscription of a user (logout-everywhere semantics).
    pub async fn delete_all_subscriptions(&self, user_id: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// All subscriptions of a user, for push fan-out.
    pub async fn subscriptions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, DatabaseError> {
        let subscriptions = sqlx::query_as::<_, PushSubscription>(
            "SELECT * FROM push_subscriptions WHERE user_id = ? ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(subscriptions)
    }
}
