// Persistence for users, roles and refresh tokens

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::error;
use uuid::Uuid;

use crate::auth::models::{
    NewRefreshToken, NewUser, RefreshToken, Role, User, UserChanges, UserRow,
};
use crate::error::{is_unique_violation, ServiceError, ServiceResult};
use crate::pagination::Page;

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, date_of_birth, registered_at";

const TOKEN_COLUMNS: &str = "id, token_hash, user_id, revoked, issued_at, expires_at";

/// User and role persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> ServiceResult<Option<User>>;

    /// Lookup by already normalized (lower-case) email
    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>>;

    /// True when another user (other than `excluding`) owns the email
    async fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> ServiceResult<bool>;

    /// Inserts the user and assigns `role` atomically
    async fn create_with_role(&self, user: NewUser, role: Role) -> ServiceResult<User>;

    async fn update_profile(&self, id: Uuid, changes: UserChanges) -> ServiceResult<Option<User>>;

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> ServiceResult<()>;

    /// Removes the user with its participations and refresh tokens
    async fn delete(&self, id: Uuid) -> ServiceResult<bool>;

    /// Users ordered by last then first name, plus the total count
    async fn list(&self, page: Page) -> ServiceResult<(Vec<User>, u64)>;
}

/// Refresh token persistence
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert(&self, token: NewRefreshToken) -> ServiceResult<RefreshToken>;

    async fn find_by_hash(&self, token_hash: &str) -> ServiceResult<Option<RefreshToken>>;

    /// Revokes the token if it is still active; false when it was already revoked or absent
    async fn revoke(&self, id: Uuid) -> ServiceResult<bool>;

    /// Revokes every non-revoked token of the user, returning how many changed
    async fn revoke_all_for_user(&self, user_id: Uuid) -> ServiceResult<u64>;

    /// Revokes `old_id` and inserts `replacement` in one unit of work.
    /// Returns None (and inserts nothing) when `old_id` was no longer active.
    async fn rotate(
        &self,
        old_id: Uuid,
        replacement: NewRefreshToken,
    ) -> ServiceResult<Option<RefreshToken>>;
}

/// Postgres-backed user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_roles(&self, user_ids: &[Uuid]) -> ServiceResult<HashMap<Uuid, Vec<Role>>> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT ur.user_id, r.name
             FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut roles: HashMap<Uuid, Vec<Role>> = HashMap::new();
        for (user_id, name) in rows {
            let role = name.parse::<Role>().map_err(|e| {
                error!("Unexpected role stored for user {}: {}", user_id, e);
                ServiceError::database("Stored role data is invalid")
            })?;
            roles.entry(user_id).or_default().push(role);
        }
        Ok(roles)
    }

    async fn attach_roles(&self, row: UserRow) -> ServiceResult<User> {
        let mut roles = self.load_roles(&[row.id]).await?;
        let assigned = roles.remove(&row.id).unwrap_or_default();
        Ok(row.with_roles(assigned))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> ServiceResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.attach_roles(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.attach_roles(row).await?)),
            None => Ok(None),
        }
    }

    async fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> ServiceResult<bool> {
        let taken: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken.0)
    }

    async fn create_with_role(&self, user: NewUser, role: Role) -> ServiceResult<User> {
        let mut tx = self.pool.begin().await?;

        let role_id: Option<(i32,)> = sqlx::query_as("SELECT id FROM roles WHERE name = $1")
            .bind(role.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let (role_id,) = role_id.ok_or_else(|| {
            error!("Role '{}' is missing; roles must be seeded at startup", role);
            ServiceError::database(format!("Role '{}' is not configured", role))
        })?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (first_name, last_name, email, password_hash, date_of_birth, registered_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.date_of_birth)
        .bind(user.registered_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::already_exists("User with email", &user.email)
            } else {
                ServiceError::from(e)
            }
        })?;

        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(row.id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.with_roles(vec![role]))
    }

    async fn update_profile(&self, id: Uuid, changes: UserChanges) -> ServiceResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users
             SET first_name = $2, last_name = $3, email = $4, date_of_birth = $5
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(changes.date_of_birth)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::already_exists("User with email", &changes.email)
            } else {
                ServiceError::from(e)
            }
        })?;

        match row {
            Some(row) => Ok(Some(self.attach_roles(row).await?)),
            None => Ok(None),
        }
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> ServiceResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> ServiceResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM event_participants WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, page: Page) -> ServiceResult<(Vec<User>, u64)> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY last_name, first_name, id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut roles = self.load_roles(&ids).await?;
        let users = rows
            .into_iter()
            .map(|row| {
                let assigned = roles.remove(&row.id).unwrap_or_default();
                row.with_roles(assigned)
            })
            .collect();

        Ok((users, total.0.max(0) as u64))
    }
}

/// Postgres-backed refresh token repository
#[derive(Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn insert(&self, token: NewRefreshToken) -> ServiceResult<RefreshToken> {
        let stored = sqlx::query_as::<_, RefreshToken>(&format!(
            "INSERT INTO refresh_tokens (token_hash, user_id, issued_at, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            TOKEN_COLUMNS
        ))
        .bind(&token.token_hash)
        .bind(token.user_id)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn find_by_hash(&self, token_hash: &str) -> ServiceResult<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>(&format!(
            "SELECT {} FROM refresh_tokens WHERE token_hash = $1",
            TOKEN_COLUMNS
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn revoke(&self, id: Uuid) -> ServiceResult<bool> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1 AND revoked = FALSE")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> ServiceResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn rotate(
        &self,
        old_id: Uuid,
        replacement: NewRefreshToken,
    ) -> ServiceResult<Option<RefreshToken>> {
        let mut tx = self.pool.begin().await?;

        // Only one concurrent caller can flip the flag; the loser sees zero rows
        let revoked =
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1 AND revoked = FALSE")
                .bind(old_id)
                .execute(&mut *tx)
                .await?;
        if revoked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let stored = sqlx::query_as::<_, RefreshToken>(&format!(
            "INSERT INTO refresh_tokens (token_hash, user_id, issued_at, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            TOKEN_COLUMNS
        ))
        .bind(&replacement.token_hash)
        .bind(replacement.user_id)
        .bind(replacement.issued_at)
        .bind(replacement.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(stored))
    }
}
