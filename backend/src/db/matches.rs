use crate::error::ApiError;
use crate::models::{CatDetail, Issuer, Match, MatchDetail, MatchStatus};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

pub struct MatchInsert {
    pub issued_user_id: Uuid,
    pub match_user_id: Uuid,
    pub user_cat_id: Uuid,
    pub match_cat_id: Uuid,
    pub message: String,
}

pub async fn insert_match(
    conn: &mut PgConnection,
    payload: &MatchInsert,
) -> Result<(Uuid, DateTime<Utc>), ApiError> {
    let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        "INSERT INTO matches (status, issued_user_id, match_user_id, user_cat_id, match_cat_id, message) \
         VALUES ('pending', $1, $2, $3, $4, $5) \
         RETURNING id, created_at",
    )
    .bind(payload.issued_user_id)
    .bind(payload.match_user_id)
    .bind(payload.user_cat_id)
    .bind(payload.match_cat_id)
    .bind(&payload.message)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

pub async fn get_match_by_id(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Match>, ApiError> {
    let row = sqlx::query_as::<_, Match>(
        "SELECT id, issued_user_id, match_user_id, user_cat_id, match_cat_id, message, status, created_at \
         FROM matches WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Dedup probe for Propose: does any active match exist for the unordered
/// pair {a, b}? Storage does not normalize pair order, so both orderings are
/// tested.
pub async fn active_match_exists(
    conn: &mut PgConnection,
    cat_a: Uuid,
    cat_b: Uuid,
) -> Result<bool, ApiError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(\
            SELECT 1 FROM matches \
            WHERE status IN ('pending', 'approved') \
            AND ((user_cat_id = $1 AND match_cat_id = $2) \
              OR (user_cat_id = $2 AND match_cat_id = $1)))",
    )
    .bind(cat_a)
    .bind(cat_b)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

pub async fn set_match_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: MatchStatus,
) -> Result<(), ApiError> {
    sqlx::query("UPDATE matches SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(conn)
        .await?;

    Ok(())
}

/// Cascade-reject: every other pending match referencing either cat of an
/// approved match is forced to `reject`. Runs in the approval transaction.
pub async fn reject_sibling_matches(
    conn: &mut PgConnection,
    approved_match_id: Uuid,
    cat_a: Uuid,
    cat_b: Uuid,
) -> Result<u64, ApiError> {
    let result = sqlx::query(
        "UPDATE matches SET status = 'reject' \
         WHERE id != $1 AND status = 'pending' \
         AND (user_cat_id IN ($2, $3) OR match_cat_id IN ($2, $3))",
    )
    .bind(approved_match_id)
    .bind(cat_a)
    .bind(cat_b)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// `has_matched` is append-only-true: set on approval, never reset.
pub async fn mark_cats_matched(
    conn: &mut PgConnection,
    cat_a: Uuid,
    cat_b: Uuid,
) -> Result<(), ApiError> {
    sqlx::query("UPDATE cats SET has_matched = TRUE WHERE id IN ($1, $2)")
        .bind(cat_a)
        .bind(cat_b)
        .execute(conn)
        .await?;

    Ok(())
}

/// Withdrawal removes the row outright; a withdrawn proposal carries no
/// audit value.
pub async fn delete_match(conn: &mut PgConnection, id: Uuid) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM matches WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Reference count for the sex-lock rule. Counts rows of any status, which is
/// the documented contract.
pub async fn count_cat_in_match(conn: &mut PgConnection, cat_id: Uuid) -> Result<i64, ApiError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM matches WHERE user_cat_id = $1 OR match_cat_id = $1",
    )
    .bind(cat_id)
    .fetch_one(conn)
    .await?;

    Ok(count)
}

#[derive(Debug, FromRow)]
struct MatchDetailRow {
    id: Uuid,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
    issuer_name: String,
    issuer_email: String,
    issuer_created_at: DateTime<Utc>,
    match_cat_id: Uuid,
    match_cat_name: String,
    match_cat_race: String,
    match_cat_sex: String,
    match_cat_description: String,
    match_cat_age_in_month: i32,
    match_cat_image_urls: Vec<String>,
    match_cat_has_matched: bool,
    match_cat_created_at: DateTime<Utc>,
    user_cat_id: Uuid,
    user_cat_name: String,
    user_cat_race: String,
    user_cat_sex: String,
    user_cat_description: String,
    user_cat_age_in_month: i32,
    user_cat_image_urls: Vec<String>,
    user_cat_has_matched: bool,
    user_cat_created_at: DateTime<Utc>,
}

impl From<MatchDetailRow> for MatchDetail {
    fn from(row: MatchDetailRow) -> Self {
        MatchDetail {
            id: row.id,
            issued_by: Issuer {
                name: row.issuer_name,
                email: row.issuer_email,
                created_at: row.issuer_created_at,
            },
            match_cat_detail: CatDetail {
                id: row.match_cat_id,
                name: row.match_cat_name,
                race: row.match_cat_race,
                sex: row.match_cat_sex,
                description: row.match_cat_description,
                age_in_month: row.match_cat_age_in_month,
                image_urls: row.match_cat_image_urls,
                has_matched: row.match_cat_has_matched,
                created_at: row.match_cat_created_at,
            },
            user_cat_detail: CatDetail {
                id: row.user_cat_id,
                name: row.user_cat_name,
                race: row.user_cat_race,
                sex: row.user_cat_sex,
                description: row.user_cat_description,
                age_in_month: row.user_cat_age_in_month,
                image_urls: row.user_cat_image_urls,
                has_matched: row.user_cat_has_matched,
                created_at: row.user_cat_created_at,
            },
            message: row.message,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// Matches where the user is issuer or receiver, newest first, with issuer
/// and cat details joined at read time.
pub async fn list_matches_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Vec<MatchDetail>, ApiError> {
    let rows = sqlx::query_as::<_, MatchDetailRow>(
        "SELECT m.id, m.message, m.status, m.created_at, \
                iu.name AS issuer_name, iu.email AS issuer_email, iu.created_at AS issuer_created_at, \
                mc.id AS match_cat_id, mc.name AS match_cat_name, mc.race AS match_cat_race, \
                mc.sex AS match_cat_sex, mc.description AS match_cat_description, \
                mc.age_in_month AS match_cat_age_in_month, mc.image_urls AS match_cat_image_urls, \
                mc.has_matched AS match_cat_has_matched, mc.created_at AS match_cat_created_at, \
                uc.id AS user_cat_id, uc.name AS user_cat_name, uc.race AS user_cat_race, \
                uc.sex AS user_cat_sex, uc.description AS user_cat_description, \
                uc.age_in_month AS user_cat_age_in_month, uc.image_urls AS user_cat_image_urls, \
                uc.has_matched AS user_cat_has_matched, uc.created_at AS user_cat_created_at \
         FROM matches m \
         JOIN users iu ON iu.id = m.issued_user_id \
         JOIN cats mc ON mc.id = m.match_cat_id \
         JOIN cats uc ON uc.id = m.user_cat_id \
         WHERE m.issued_user_id = $1 OR m.match_user_id = $1 \
         ORDER BY m.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(MatchDetail::from).collect())
}
