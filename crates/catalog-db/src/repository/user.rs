//! # User Repository
//!
//! Owner records. The catalog only needs them for foreign-key integrity and
//! owner-filtered listing; credentials are hashed by the caller.

use std::collections::HashMap;

use catalog_core::validation::{validate_email, validate_username};
use catalog_core::{NewUser, User};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::{begin, finish};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, bio, image, created_at, updated_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a user by ID. `Ok(None)` when absent.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, id).await
    }

    /// Gets a user by username. `Ok(None)` when absent.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        find_by_username(&mut conn, username).await
    }

    /// Gets a user by email. `Ok(None)` when absent.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Inserts a new user.
    ///
    /// ## Returns
    /// * `Ok(User)` - Stored row
    /// * `Err(DbError::UniqueViolation)` - Username or email taken
    pub async fn create(&self, user: &NewUser) -> DbResult<User> {
        validate_username(&user.username)?;
        validate_email(&user.email)?;

        debug!(username = %user.username, "Creating user");

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4) RETURNING {USER_COLUMNS}"
        );

        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DbError::from(e)
                    .with_unique_value("username", &user.username)
                    .with_unique_value("email", &user.email)
            })?;

        Ok(created)
    }

    /// Overwrites a user's mutable fields and returns the stored row.
    pub async fn update(&self, user: &User) -> DbResult<User> {
        validate_username(&user.username)?;
        validate_email(&user.email)?;

        debug!(id = user.id, "Updating user");

        let mut tx = begin(&self.pool).await?;
        let result = update_in(&mut tx, user).await;
        finish(tx, result, "user.update").await
    }

    /// Deletes a user.
    ///
    /// Fails with `ForeignKeyViolation` while the user still owns products.
    pub async fn delete(&self, user: &User) -> DbResult<()> {
        debug!(id = user.id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", user.id));
        }

        Ok(())
    }
}

async fn update_in(conn: &mut SqliteConnection, user: &User) -> DbResult<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE users SET
            username = ?2,
            email = ?3,
            password_hash = ?4,
            bio = ?5,
            image = ?6,
            updated_at = ?7
        WHERE id = ?1
        "#,
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.bio)
    .bind(&user.image)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        DbError::from(e)
            .with_unique_value("username", &user.username)
            .with_unique_value("email", &user.email)
    })?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("User", user.id));
    }

    find_by_id(conn, user.id)
        .await?
        .ok_or_else(|| DbError::not_found("User", user.id))
}

pub(crate) async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(user)
}

pub(crate) async fn find_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> DbResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(user)
}

/// Loads every user in `ids` in a single query, keyed by id.
pub(crate) async fn find_many(
    conn: &mut SqliteConnection,
    ids: &[i64],
) -> DbResult<HashMap<i64, User>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE id IN ("));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let users: Vec<User> = qb.build_query_as().fetch_all(&mut *conn).await?;

    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seed_user, test_db};
    use catalog_core::NewProduct;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = test_db().await;
        let users = db.users();

        let ada = users
            .create(&NewUser::new("ada", "ada@example.com", "hash"))
            .await
            .unwrap();

        assert_eq!(users.get_by_id(ada.id).await.unwrap(), Some(ada.clone()));
        assert_eq!(users.get_by_username("ada").await.unwrap(), Some(ada.clone()));
        assert_eq!(
            users.get_by_email("ada@example.com").await.unwrap(),
            Some(ada)
        );
        assert!(users.get_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let db = test_db().await;
        seed_user(&db, "ada").await;

        let err = db
            .users()
            .create(&NewUser::new("ada", "other@example.com", "hash"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref field, .. } if field == "username"
        ));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let db = test_db().await;
        let err = db
            .users()
            .create(&NewUser::new("ada", "not-an-email", "hash"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_returns_stored_row() {
        let db = test_db().await;
        let mut ada = seed_user(&db, "ada").await;
        ada.bio = Some("Analyst".to_string());

        let updated = db.users().update(&ada).await.unwrap();
        assert_eq!(updated.bio.as_deref(), Some("Analyst"));
        assert!(updated.updated_at >= ada.updated_at);
        assert_eq!(updated.created_at, ada.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let db = test_db().await;
        let mut ghost = seed_user(&db, "ghost").await;
        db.users().delete(&ghost).await.unwrap();
        ghost.bio = Some("boo".to_string());

        let err = db.users().update(&ghost).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_restricted_while_owning_products() {
        let db = test_db().await;
        let ada = seed_user(&db, "ada").await;
        let product = db
            .products()
            .create(&NewProduct::new(ada.id, "Blue Mug"), &["kitchen"])
            .await
            .unwrap();

        let err = db.users().delete(&ada).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        db.products().delete(&product).await.unwrap();
        db.users().delete(&ada).await.unwrap();
        assert!(db.users().get_by_id(ada.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_many() {
        let db = test_db().await;
        let ada = seed_user(&db, "ada").await;
        let bob = seed_user(&db, "bob").await;

        let mut conn = db.pool().acquire().await.unwrap();
        let found = find_many(&mut conn, &[ada.id, bob.id, 9999]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[&bob.id].username, "bob");
        assert!(find_many(&mut conn, &[]).await.unwrap().is_empty());
    }
}
