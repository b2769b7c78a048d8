use async_trait::async_trait;
use rail_core::models::{NewUser, User};
use rail_core::pii::Masked;
use rail_core::repository::UserRepository;
use rail_core::{CoreError, CoreResult, Role};

use crate::database::{is_unique_violation, store_error, PgStore};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(|_| {
            CoreError::StoreError(format!("User {} has unknown role '{}'", row.id, row.role))
        })?;

        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: Masked(row.password),
            role,
        })
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_username(&self, username: &str) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to look up user", e))?;

        row.map(User::try_from).transpose()
    }

    async fn insert_user(&self, user: NewUser) -> CoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, role
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // A concurrent signup can slip past the existence check
            if is_unique_violation(&e) {
                CoreError::DuplicateUser
            } else {
                store_error("Failed to insert user", e)
            }
        })?;

        User::try_from(row)
    }

    async fn list_users(&self) -> CoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, role FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list users", e))?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn purge_users(&self) -> CoreResult<()> {
        sqlx::query("TRUNCATE users CASCADE")
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to purge users", e))?;
        Ok(())
    }
}
