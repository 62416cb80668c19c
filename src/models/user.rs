use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::database::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Role::User),
            "Admin" => Ok(Role::Admin),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,
}

impl User {
    // Найти пользователя по email
    pub async fn find_by_email(email: &str, db: &Database) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT id, email, password, role FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&db.pool)
            .await
    }

    pub async fn find_by_id(user_id: i64, db: &Database) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT id, email, password, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&db.pool)
            .await
    }

    /// Creates the user and its empty account row in one transaction.
    pub async fn register(
        email: &str,
        password_hash: &str,
        db: &Database,
    ) -> Result<User, sqlx::Error> {
        let mut tx = db.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password, role) VALUES ($1, $2, $3)
             RETURNING id, email, password, role",
        )
        .bind(email)
        .bind(password_hash)
        .bind(Role::User.as_str())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO account (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    pub async fn update_password(
        user_id: i64,
        password_hash: &str,
        db: &Database,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&db.pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }

    pub fn role(&self) -> Result<Role, String> {
        self.role.parse()
    }
}
