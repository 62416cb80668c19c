use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder};
use validator::Validate;

use crate::database::Database;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Profile {
    pub id: i64,
    pub email: String,
    pub image: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub point: i32,
}

/// Partial profile update. Only the fields that are present are written.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone.is_none()
    }

    /// `UPDATE account SET ...` with one bind per present field. `None` when nothing is set.
    pub fn query(&self, user_id: i64) -> Option<QueryBuilder<'static, Postgres>> {
        if self.is_empty() {
            return None;
        }

        let mut qb = QueryBuilder::new("UPDATE account SET ");
        {
            let mut set = qb.separated(", ");
            let columns = [
                ("firstname", &self.first_name),
                ("lastname", &self.last_name),
                ("phonenumber", &self.phone),
            ];
            for (column, value) in columns {
                if let Some(value) = value {
                    set.push(column).push_unseparated(" = ").push_bind_unseparated(value.clone());
                }
            }
        }
        qb.push(" WHERE user_id = ").push_bind(user_id);
        Some(qb)
    }
}

impl Profile {
    pub async fn find(user_id: i64, db: &Database) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT u.id, u.email, a.image,
                   a.firstname AS first_name, a.lastname AS last_name,
                   a.phonenumber AS phone, a.point
            FROM users u
            JOIN account a ON a.user_id = u.id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&db.pool)
        .await
    }

    /// Applies the update and returns the fresh profile; `None` if the account row is missing.
    pub async fn update(
        user_id: i64,
        update: &ProfileUpdate,
        db: &Database,
    ) -> Result<Option<Profile>, sqlx::Error> {
        if let Some(mut qb) = update.query(user_id) {
            let affected = qb.build().execute(&db.pool).await?.rows_affected();
            if affected == 0 {
                return Ok(None);
            }
        }
        Profile::find(user_id, db).await
    }
}
