//! Profile operations

use chrono::Utc;

use crate::error::DbError;
use crate::models::{Profile, ProfileUpdate};
use crate::repository::Database;

impl Database {
    // ==================== Profile Operations ====================

    /// Get a profile by account ID
    pub async fn get_profile(&self, account_id: &str) -> Result<Option<Profile>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT account_id, display_name, bio, avatar_url, location, website,
                   created_at, updated_at
            FROM account_profiles
            WHERE account_id = ?
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| Profile::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Create or update a profile. Fields set to None keep their stored value.
    pub async fn upsert_profile(
        &self,
        account_id: &str,
        update: ProfileUpdate,
    ) -> Result<Profile, DbError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO account_profiles (
                account_id, display_name, bio, avatar_url, location, website,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(account_id) DO UPDATE SET
                display_name = COALESCE(excluded.display_name, display_name),
                bio = COALESCE(excluded.bio, bio),
                avatar_url = COALESCE(excluded.avatar_url, avatar_url),
                location = COALESCE(excluded.location, location),
                website = COALESCE(excluded.website, website),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(account_id)
        .bind(&update.display_name)
        .bind(&update.bio)
        .bind(&update.avatar_url)
        .bind(&update.location)
        .bind(&update.website)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_profile(account_id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Profile: {}", account_id)))
    }

    /// Delete a profile
    pub async fn delete_profile(&self, account_id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM account_profiles WHERE account_id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewAccount, Role};

    async fn test_db(name: &str) -> Database {
        Database::new(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_profile_upsert_merges_fields() {
        let db = test_db("profiles_upsert").await;
        let account = db
            .insert_account(NewAccount::registration(
                "pat@example.com".to_string(),
                "hash".to_string(),
                Role::User,
                None,
            ))
            .await
            .unwrap();

        assert!(db.get_profile(&account.id).await.unwrap().is_none());

        let profile = db
            .upsert_profile(
                &account.id,
                ProfileUpdate {
                    display_name: Some("Pat".to_string()),
                    bio: Some("hello".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Pat"));

        // A partial update leaves other fields intact
        let profile = db
            .upsert_profile(
                &account.id,
                ProfileUpdate {
                    location: Some("Berlin".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Pat"));
        assert_eq!(profile.bio.as_deref(), Some("hello"));
        assert_eq!(profile.location.as_deref(), Some("Berlin"));

        assert!(db.delete_profile(&account.id).await.unwrap());
        assert!(!db.delete_profile(&account.id).await.unwrap());
    }
}
