use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle states. `pending` is the only state with outgoing edges:
/// approve, reject, cascade-reject, or withdrawal (row deletion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Pending,
    Approved,
    Reject,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Approved => "approved",
            MatchStatus::Reject => "reject",
        }
    }

    /// Active matches block new proposals for the same cat pair.
    pub fn is_active(&self) -> bool {
        matches!(self, MatchStatus::Pending | MatchStatus::Approved)
    }
}

impl FromStr for MatchStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "approved" => Ok(MatchStatus::Approved),
            "reject" => Ok(MatchStatus::Reject),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Match {
    pub id: Uuid,
    pub issued_user_id: Uuid,
    pub match_user_id: Uuid,
    pub user_cat_id: Uuid,
    pub match_cat_id: Uuid,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchProposalRequest {
    pub match_cat_id: String,
    pub user_cat_id: String,
    pub message: String,
}

impl MatchProposalRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.message.len() < 5 || self.message.len() > 120 {
            return Err(ApiError::validation("message must be 5 to 120 characters"));
        }
        Ok(())
    }
}

/// Issuer info joined at read time; match rows hold only foreign keys.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issuer {
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatDetail {
    pub id: Uuid,
    pub name: String,
    pub race: String,
    pub sex: String,
    pub description: String,
    pub age_in_month: i32,
    pub image_urls: Vec<String>,
    pub has_matched: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetail {
    pub id: Uuid,
    pub issued_by: Issuer,
    pub match_cat_detail: CatDetail,
    pub user_cat_detail: CatDetail,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
