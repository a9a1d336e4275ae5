use crate::db;
use crate::error::{ApiError, WebResponse};
use crate::models::{Credential, RegisterRequest};
use crate::services::auth::{JwtService, hash_password, verify_password};
use crate::utils::Config;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub email: String,
    pub name: String,
    pub access_token: String,
}

pub async fn register(
    State((pool, config)): State<(PgPool, Config)>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<WebResponse<AuthResponse>>), ApiError> {
    req.validate()?;

    let password_hash = hash_password(&req.password)?;

    let mut tx = pool.begin().await?;
    let user = db::users::create_user(&mut tx, &req.email, &req.name, &password_hash).await?;
    tx.commit().await?;

    let access_token = JwtService::new(&config.jwt_secret).create_token(user.id, &user.email)?;

    tracing::info!("registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(WebResponse::success(AuthResponse {
            email: user.email,
            name: user.name,
            access_token,
        })),
    ))
}

pub async fn login(
    State((pool, config)): State<(PgPool, Config)>,
    Json(req): Json<Credential>,
) -> Result<(StatusCode, Json<WebResponse<AuthResponse>>), ApiError> {
    req.validate()?;

    let mut conn = pool.acquire().await?;
    let user = db::users::get_user_by_email(&mut conn, &req.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::bad_request("wrong password"));
    }

    let access_token = JwtService::new(&config.jwt_secret).create_token(user.id, &user.email)?;

    Ok((
        StatusCode::OK,
        Json(WebResponse::success(AuthResponse {
            email: user.email,
            name: user.name,
            access_token,
        })),
    ))
}
