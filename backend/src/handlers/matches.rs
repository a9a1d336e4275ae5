use crate::db;
use crate::db::matches::MatchInsert;
use crate::error::{ApiError, WebResponse};
use crate::models::{Cat, Match, MatchDetail, MatchProposalRequest, MatchStatus};
use crate::services::AuthUser;
use crate::utils::Config;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCreatedResponse {
    pub match_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Proposal preconditions on the two cats, checked in order after both
/// lookups succeed: different sex first, then different owner.
fn check_pairing(issuer_cat: &Cat, target_cat: &Cat) -> Result<(), ApiError> {
    if issuer_cat.sex == target_cat.sex {
        return Err(ApiError::bad_request("cannot match cat with the same gender"));
    }
    if issuer_cat.user_id == target_cat.user_id {
        return Err(ApiError::bad_request("cannot match cat with the same owner"));
    }
    Ok(())
}

/// Approve/Reject preconditions. A caller who is not the receiver gets
/// not-found, so non-participants cannot probe for match existence.
fn check_resolution(m: &Match, caller_id: Uuid) -> Result<(), ApiError> {
    if m.match_user_id != caller_id {
        return Err(ApiError::not_found("match id not found"));
    }
    if MatchStatus::from_str(&m.status) != Ok(MatchStatus::Pending) {
        return Err(ApiError::bad_request("match id is no longer valid"));
    }
    Ok(())
}

/// Withdraw preconditions, in the original's two-stage order: issuer
/// ownership first (bad-request), then pending state (bad-request).
fn check_withdrawal(m: &Match, caller_id: Uuid) -> Result<(), ApiError> {
    if m.issued_user_id != caller_id {
        return Err(ApiError::bad_request("you are not the issuer"));
    }
    if MatchStatus::from_str(&m.status) != Ok(MatchStatus::Pending) {
        return Err(ApiError::bad_request("match is already approved / reject"));
    }
    Ok(())
}

pub async fn propose_match(
    State((pool, _config)): State<(PgPool, Config)>,
    user: AuthUser,
    Json(req): Json<MatchProposalRequest>,
) -> Result<(StatusCode, Json<WebResponse<MatchCreatedResponse>>), ApiError> {
    req.validate()?;

    let user_cat_id =
        Uuid::parse_str(&req.user_cat_id).map_err(|_| ApiError::not_found("cat id not found"))?;
    let match_cat_id =
        Uuid::parse_str(&req.match_cat_id).map_err(|_| ApiError::not_found("cat id not found"))?;

    let mut tx = pool.begin().await?;

    let issuer_cat = db::cats::get_cat_by_id(&mut tx, user_cat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("cat id not found"))?;
    if issuer_cat.user_id != user.id {
        return Err(ApiError::not_found("cat id not found"));
    }

    let target_cat = db::cats::get_cat_by_id(&mut tx, match_cat_id)
        .await?
        .ok_or_else(|| ApiError::not_found("cat id not found"))?;

    check_pairing(&issuer_cat, &target_cat)?;

    if db::matches::active_match_exists(&mut tx, user_cat_id, match_cat_id).await? {
        return Err(ApiError::bad_request("cat already requested to match"));
    }

    let (match_id, created_at) = db::matches::insert_match(
        &mut tx,
        &MatchInsert {
            issued_user_id: user.id,
            match_user_id: target_cat.user_id,
            user_cat_id,
            match_cat_id,
            message: req.message.clone(),
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!("match {} proposed by user {}", match_id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(WebResponse::success(MatchCreatedResponse {
            match_id,
            created_at,
        })),
    ))
}

pub async fn list_matches(
    State((pool, _config)): State<(PgPool, Config)>,
    user: AuthUser,
) -> Result<(StatusCode, Json<WebResponse<Vec<MatchDetail>>>), ApiError> {
    let mut conn = pool.acquire().await?;
    let matches = db::matches::list_matches_for_user(&mut conn, user.id).await?;

    Ok((StatusCode::OK, Json(WebResponse::success(matches))))
}

pub async fn approve_match(
    State((pool, _config)): State<(PgPool, Config)>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<WebResponse<()>>), ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::not_found("match id not found"))?;

    let mut tx = pool.begin().await?;

    let m = db::matches::get_match_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found("match id not found"))?;
    check_resolution(&m, user.id)?;

    // The status flip, sibling cascade and cat flags must land in the same
    // transaction, or a concurrent proposal could slip in between.
    db::matches::set_match_status(&mut tx, id, MatchStatus::Approved).await?;
    let rejected =
        db::matches::reject_sibling_matches(&mut tx, id, m.user_cat_id, m.match_cat_id).await?;
    db::matches::mark_cats_matched(&mut tx, m.user_cat_id, m.match_cat_id).await?;

    tx.commit().await?;

    tracing::info!("match {} approved, {} siblings rejected", id, rejected);

    Ok((StatusCode::OK, Json(WebResponse::message("success"))))
}

pub async fn reject_match(
    State((pool, _config)): State<(PgPool, Config)>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<WebResponse<()>>), ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::not_found("match id not found"))?;

    let mut tx = pool.begin().await?;

    let m = db::matches::get_match_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found("match id not found"))?;
    check_resolution(&m, user.id)?;

    db::matches::set_match_status(&mut tx, id, MatchStatus::Reject).await?;

    tx.commit().await?;

    Ok((StatusCode::OK, Json(WebResponse::message("success"))))
}

pub async fn withdraw_match(
    State((pool, _config)): State<(PgPool, Config)>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<WebResponse<()>>), ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::not_found("match id not found"))?;

    let mut tx = pool.begin().await?;

    let m = db::matches::get_match_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found("match id not found"))?;
    check_withdrawal(&m, user.id)?;

    db::matches::delete_match(&mut tx, id).await?;

    tx.commit().await?;

    Ok((StatusCode::OK, Json(WebResponse::message("success"))))
}
