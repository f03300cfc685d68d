use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::identity::errors::RepositoryError;
use crate::identity::models::EmailAddress;
use crate::identity::models::Synchronized;
use crate::identity::models::User;
use crate::identity::models::UserId;
use crate::identity::models::EXTERNAL_CREDENTIAL_SENTINEL;
use crate::identity::ports::UserRepository;

const EMAIL_CONSTRAINT: &str = "users_email_key";
const SUBJECT_CONSTRAINT: &str = "users_external_subject_id_key";

const USER_COLUMNS: &str = "id, email, credential_hash, is_active, external_subject_id, created_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    credential_hash: String,
    is_active: bool,
    external_subject_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = EmailAddress::new(&row.email).map_err(|e| {
            RepositoryError::Database(format!("stored email for user {} is invalid: {}", row.id, e))
        })?;

        Ok(User {
            id: UserId(row.id),
            email,
            credential_hash: row.credential_hash,
            is_active: row.is_active,
            external_subject_id: row.external_subject_id,
            created_at: row.created_at,
        })
    }
}

fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    let db_err = err.as_database_error()?;
    if db_err.is_unique_violation() {
        db_err.constraint().map(str::to_string)
    } else {
        None
    }
}

/// Credential store on the PostgreSQL `users` table.
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");

        sqlx::query_as::<_, UserRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, credential_hash, is_active, external_subject_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id.0)
        .bind(user.email.as_str())
        .bind(&user.credential_hash)
        .bind(user.is_active)
        .bind(user.external_subject_id.as_deref())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e).as_deref() {
            Some(EMAIL_CONSTRAINT) => RepositoryError::EmailTaken(user.email.to_string()),
            Some(SUBJECT_CONSTRAINT) => RepositoryError::SubjectTaken(
                user.external_subject_id.clone().unwrap_or_default(),
            ),
            _ => RepositoryError::Database(e.to_string()),
        })?;

        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, UserRow>(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError> {
        self.find_one("email", email.as_str()).await
    }

    async fn find_by_external_subject(
        &self,
        subject_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.find_one("external_subject_id", subject_id).await
    }

    async fn upsert_external(
        &self,
        email: &EmailAddress,
        subject_id: &str,
    ) -> Result<Synchronized, RepositoryError> {
        // xmax is zero only on a freshly inserted tuple.
        let query = format!(
            r#"
            INSERT INTO users (id, email, credential_hash, is_active, external_subject_id, created_at)
            VALUES ($1, $2, $3, TRUE, $4, $5)
            ON CONFLICT (email) DO UPDATE
                SET external_subject_id = EXCLUDED.external_subject_id
            RETURNING {USER_COLUMNS}, (xmax = 0) AS inserted
            "#
        );

        let result = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(email.as_str())
            .bind(EXTERNAL_CREDENTIAL_SENTINEL)
            .bind(subject_id)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await;

        let row = match result {
            Ok(row) => row,
            Err(e) if violated_constraint(&e).as_deref() == Some(SUBJECT_CONSTRAINT) => {
                // The subject was linked to another row in the meantime.
                let user = self
                    .find_by_external_subject(subject_id)
                    .await?
                    .ok_or_else(|| RepositoryError::SubjectTaken(subject_id.to_string()))?;
                return Ok(Synchronized {
                    user,
                    created: false,
                });
            }
            Err(e) => return Err(RepositoryError::Database(e.to_string())),
        };

        let created: bool = row
            .try_get("inserted")
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        let user: User = UserRow::from_row(&row)
            .map_err(|e| RepositoryError::Database(e.to_string()))?
            .try_into()?;

        Ok(Synchronized { user, created })
    }

    async fn set_active(&self, id: &UserId, is_active: bool) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id.0)
            .bind(is_active)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
