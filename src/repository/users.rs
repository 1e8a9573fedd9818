//! Users repository for database operations

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::user::{User, UserOverview},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(username) = LOWER($1)",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check if username already exists
    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a new user account
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        full_name: &str,
        is_admin: bool,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, full_name, is_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(full_name)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Delete a user together with every record it owns. Ownership of borrow
    /// records is exclusive, so the removal happens here in one transaction
    /// rather than through a database cascade.
    pub async fn delete_with_records(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM borrow_records WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        tx.commit().await?;

        tracing::debug!(user_id = id, records = deleted.rows_affected(), "deleted user");
        Ok(())
    }

    /// Count of records the user currently has out in state `borrowed`
    pub async fn active_borrow_count(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE user_id = $1 AND status = 'borrowed'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Sum of positive fines over all of the user's records. Fines survive
    /// return, so settled records count too.
    pub async fn total_outstanding_fines(&self, user_id: i32) -> AppResult<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            "SELECT SUM(fine_amount) FROM borrow_records WHERE user_id = $1 AND fine_amount > 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }

    /// Non-admin users with their circulation aggregates, newest first
    pub async fn list_with_stats(&self) -> AppResult<Vec<UserOverview>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.username, u.full_name, u.created_at,
                   (SELECT COUNT(*) FROM borrow_records r
                    WHERE r.user_id = u.id AND r.status IN ('borrowed', 'overdue')) as active_borrows,
                   COALESCE((SELECT SUM(r.fine_amount) FROM borrow_records r
                    WHERE r.user_id = u.id AND r.fine_amount > 0), 0) as total_fine
            FROM users u
            WHERE NOT u.is_admin
            ORDER BY u.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let overviews = rows
            .into_iter()
            .map(|row| UserOverview {
                id: row.get("id"),
                username: row.get("username"),
                full_name: row.get("full_name"),
                created_at: row.get("created_at"),
                active_borrows: row.get("active_borrows"),
                total_fine: row.get("total_fine"),
            })
            .collect();

        Ok(overviews)
    }

    /// Count non-admin users
    pub async fn count_members(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE NOT is_admin")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
