use crate::error::ApiError;
use crate::models::User;
use sqlx::PgConnection;
use uuid::Uuid;

pub async fn create_user(
    conn: &mut PgConnection,
    email: &str,
    name: &str,
    password_hash: &str,
) -> Result<User, ApiError> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, name, password_hash) \
         VALUES ($1, $2, $3) \
         RETURNING id, email, name, password_hash, created_at",
    )
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .fetch_one(conn)
    .await
    .map_err(|err| match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Conflict("email already registered".to_string())
        }
        _ => ApiError::Database(err),
    })?;

    Ok(user)
}

pub async fn get_user_by_email(
    conn: &mut PgConnection,
    email: &str,
) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, name, password_hash, created_at FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(conn)
    .await?;

    Ok(user)
}

pub async fn get_user_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, name, password_hash, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(user)
}
