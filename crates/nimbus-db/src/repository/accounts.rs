//! Account directory operations

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{Account, AccountStatus, NewAccount, Role};
use crate::repository::Database;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, password_changed_at, status, \
     email_verification_status, role, tenant_id, failed_login_attempts, \
     last_failed_login_at, locked_at, lock_reason, last_login_at, is_active, \
     is_deleted, created_at, updated_at";

impl Database {
    // ==================== Account Operations ====================

    /// Insert a new account
    pub async fn insert_account(&self, account: NewAccount) -> Result<Account, DbError> {
        let now = Utc::now();

        // Check for an existing account first (email is unique, case-insensitive)
        if self.email_exists(&account.email).await? {
            return Err(DbError::Duplicate(format!(
                "Account '{}' already exists",
                account.email
            )));
        }

        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, email, password_hash, status, email_verification_status,
                role, tenant_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.status.as_str())
        .bind(account.email_verification_status.as_str())
        .bind(account.role.as_str())
        .bind(&account.tenant_id)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Account {
            id,
            email: account.email,
            password_hash: account.password_hash,
            password_changed_at: None,
            status: account.status,
            email_verification_status: account.email_verification_status,
            role: account.role,
            tenant_id: account.tenant_id,
            failed_login_attempts: 0,
            last_failed_login_at: None,
            locked_at: None,
            lock_reason: None,
            last_login_at: None,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get an account by email (case-insensitive)
    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, DbError> {
        let result = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| Account::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Get an account by ID
    pub async fn find_account_by_id(&self, id: &str) -> Result<Option<Account>, DbError> {
        let result = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| Account::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Check whether an email is already registered (case-insensitive)
    pub async fn email_exists(&self, email: &str) -> Result<bool, DbError> {
        let result =
            sqlx::query("SELECT COUNT(*) as count FROM accounts WHERE email = ? COLLATE NOCASE")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }

    /// Atomically bump the failed-login counter and return the new value.
    ///
    /// Single statement so concurrent failed attempts never under-count.
    pub async fn increment_failed_login_attempts(&self, id: &str) -> Result<i64, DbError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET failed_login_attempts = failed_login_attempts + 1,
                last_failed_login_at = ?,
                updated_at = ?
            WHERE id = ?
            RETURNING failed_login_attempts
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let row = result.ok_or_else(|| DbError::NotFound(format!("Account: {}", id)))?;
        Ok(row.get("failed_login_attempts"))
    }

    /// Reset the failed-login counter. Idempotent.
    pub async fn reset_failed_login_attempts(&self, id: &str) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET failed_login_attempts = 0,
                last_failed_login_at = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a successful login: clears the failed-attempt state and stamps
    /// the last-login timestamp in one statement.
    pub async fn record_login(&self, id: &str) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET failed_login_attempts = 0,
                last_failed_login_at = NULL,
                last_login_at = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition an account to the locked state
    pub async fn lock_account(&self, id: &str, reason: &str) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET status = 'locked',
                locked_at = ?,
                lock_reason = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&now)
        .bind(reason)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the lifecycle status. Leaving the locked state clears the lock fields.
    pub async fn set_account_status(
        &self,
        id: &str,
        status: AccountStatus,
    ) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET status = ?,
                locked_at = CASE WHEN ? = 'locked' THEN locked_at ELSE NULL END,
                lock_reason = CASE WHEN ? = 'locked' THEN lock_reason ELSE NULL END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(status.as_str())
        .bind(status.as_str())
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update account role
    pub async fn update_account_role(&self, id: &str, role: Role) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE accounts SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update the stored credential, stamping password_changed_at
    pub async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = ?,
                password_changed_at = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(password_hash)
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark the email as verified; a pending account becomes active in the
    /// same statement.
    pub async fn mark_email_as_verified(&self, id: &str) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET email_verification_status = 'verified',
                status = CASE WHEN status = 'pending_verification' THEN 'active' ELSE status END,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete an account
    pub async fn soft_delete_account(&self, id: &str) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET is_deleted = 1,
                is_active = 0,
                updated_at = ?
            WHERE id = ? AND is_deleted = 0
            "#,
        )
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List accounts by role
    pub async fn find_accounts_by_role(&self, role: Role) -> Result<Vec<Account>, DbError> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = ? AND is_deleted = 0 ORDER BY email"
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Account::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// List accounts by lifecycle status
    pub async fn find_accounts_by_status(
        &self,
        status: AccountStatus,
    ) -> Result<Vec<Account>, DbError> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE status = ? AND is_deleted = 0 ORDER BY email"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Account::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// List accounts belonging to a tenant
    pub async fn find_accounts_by_tenant(&self, tenant_id: &str) -> Result<Vec<Account>, DbError> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE tenant_id = ? AND is_deleted = 0 ORDER BY email"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Account::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Page through accounts (soft-deleted rows excluded)
    pub async fn list_accounts(&self, limit: i64, offset: i64) -> Result<Vec<Account>, DbError> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE is_deleted = 0 ORDER BY email LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Account::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Count accounts (soft-deleted rows excluded)
    pub async fn count_accounts(&self) -> Result<i64, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM accounts WHERE is_deleted = 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(result.get("count"))
    }

    /// Check if any accounts exist
    pub async fn has_accounts(&self) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }
}
