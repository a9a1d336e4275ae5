use crate::db;
use crate::db::cats::CatFilter;
use crate::error::{ApiError, WebResponse};
use crate::models::{Cat, CatPayload};
use crate::services::AuthUser;
use crate::utils::Config;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatCreatedResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatResponse {
    pub id: Uuid,
    pub name: String,
    pub race: String,
    pub sex: String,
    pub age_in_month: i32,
    pub image_urls: Vec<String>,
    pub description: String,
    pub has_matched: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Cat> for CatResponse {
    fn from(cat: Cat) -> Self {
        CatResponse {
            id: cat.id,
            name: cat.name,
            race: cat.race,
            sex: cat.sex,
            age_in_month: cat.age_in_month,
            image_urls: cat.image_urls,
            description: cat.description,
            has_matched: cat.has_matched,
            created_at: cat.created_at,
        }
    }
}

pub async fn create_cat(
    State((pool, _config)): State<(PgPool, Config)>,
    user: AuthUser,
    Json(payload): Json<CatPayload>,
) -> Result<(StatusCode, Json<WebResponse<CatCreatedResponse>>), ApiError> {
    payload.validate()?;

    let mut conn = pool.acquire().await?;
    let (id, created_at) = db::cats::insert_cat(&mut conn, user.id, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(WebResponse::success(CatCreatedResponse { id, created_at })),
    ))
}

pub async fn list_cats(
    State((pool, _config)): State<(PgPool, Config)>,
    user: AuthUser,
    Query(filter): Query<CatFilter>,
) -> Result<(StatusCode, Json<WebResponse<Vec<CatResponse>>>), ApiError> {
    let mut conn = pool.acquire().await?;
    let cats = db::cats::list_cats(&mut conn, &filter, user.id).await?;

    let data = cats.into_iter().map(CatResponse::from).collect();
    Ok((StatusCode::OK, Json(WebResponse::success(data))))
}

/// The sex of a cat already referenced by a match row (any status) is locked.
fn check_sex_lock(
    current_sex: &str,
    requested_sex: &str,
    match_references: i64,
) -> Result<(), ApiError> {
    if match_references > 0 && requested_sex != current_sex {
        return Err(ApiError::bad_request(
            "cannot update sex when cat has requested to match",
        ));
    }
    Ok(())
}

pub async fn update_cat(
    State((pool, _config)): State<(PgPool, Config)>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<CatPayload>,
) -> Result<(StatusCode, Json<WebResponse<CatCreatedResponse>>), ApiError> {
    payload.validate()?;

    let id = Uuid::parse_str(&id).map_err(|_| ApiError::not_found("cat id not found"))?;

    let mut tx = pool.begin().await?;

    let cat = db::cats::get_cat_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found("cat id not found"))?;
    if cat.user_id != user.id {
        return Err(ApiError::not_found("cat id not found"));
    }

    let references = db::matches::count_cat_in_match(&mut tx, id).await?;
    check_sex_lock(&cat.sex, &payload.sex, references)?;

    db::cats::update_cat(&mut tx, id, &payload).await?;
    tx.commit().await?;

    Ok((
        StatusCode::OK,
        Json(WebResponse::success(CatCreatedResponse {
            id,
            created_at: cat.created_at,
        })),
    ))
}

pub async fn delete_cat(
    State((pool, _config)): State<(PgPool, Config)>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<WebResponse<()>>), ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::not_found("cat id not found"))?;

    let mut tx = pool.begin().await?;

    let cat = db::cats::get_cat_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found("cat id not found"))?;
    if cat.user_id != user.id {
        return Err(ApiError::not_found("cat id not found"));
    }

    db::cats::soft_delete_cat(&mut tx, id).await?;
    tx.commit().await?;

    Ok((
        StatusCode::OK,
        Json(WebResponse::message("success")),
    ))
}
