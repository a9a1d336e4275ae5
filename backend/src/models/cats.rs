use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// The ten recognized breeds. Filter values outside this set are dropped,
/// payload values outside this set are a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatRace {
    Persian,
    MaineCoon,
    Siamese,
    Ragdoll,
    Bengal,
    Sphynx,
    BritishShorthair,
    Abyssinian,
    ScottishFold,
    Birman,
}

impl CatRace {
    pub const ALL: [CatRace; 10] = [
        CatRace::Persian,
        CatRace::MaineCoon,
        CatRace::Siamese,
        CatRace::Ragdoll,
        CatRace::Bengal,
        CatRace::Sphynx,
        CatRace::BritishShorthair,
        CatRace::Abyssinian,
        CatRace::ScottishFold,
        CatRace::Birman,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CatRace::Persian => "Persian",
            CatRace::MaineCoon => "Maine Coon",
            CatRace::Siamese => "Siamese",
            CatRace::Ragdoll => "Ragdoll",
            CatRace::Bengal => "Bengal",
            CatRace::Sphynx => "Sphynx",
            CatRace::BritishShorthair => "British Shorthair",
            CatRace::Abyssinian => "Abyssinian",
            CatRace::ScottishFold => "Scottish Fold",
            CatRace::Birman => "Birman",
        }
    }
}

impl FromStr for CatRace {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CatRace::ALL
            .into_iter()
            .find(|race| race.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl FromStr for Sex {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub race: String,
    pub sex: String,
    pub age_in_month: i32,
    pub description: String,
    pub image_urls: Vec<String>,
    pub has_matched: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Create/update request body. Fields arrive loosely typed and are checked
/// against the closed enums before any transaction is opened.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatPayload {
    pub name: String,
    pub race: String,
    pub sex: String,
    pub age_in_month: i32,
    pub description: String,
    pub image_urls: Vec<String>,
}

impl CatPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.is_empty() || self.name.len() > 30 {
            return Err(ApiError::validation("name must be 1 to 30 characters"));
        }
        if CatRace::from_str(&self.race).is_err() {
            return Err(ApiError::validation("race is not a recognized breed"));
        }
        if Sex::from_str(&self.sex).is_err() {
            return Err(ApiError::validation("sex must be male or female"));
        }
        if self.age_in_month < 1 || self.age_in_month > 120_082 {
            return Err(ApiError::validation(
                "ageInMonth must be between 1 and 120082",
            ));
        }
        if self.description.is_empty() || self.description.len() > 200 {
            return Err(ApiError::validation(
                "description must be 1 to 200 characters",
            ));
        }
        if self.image_urls.is_empty() {
            return Err(ApiError::validation("imageUrls must not be empty"));
        }
        for url in &self.image_urls {
            if !is_http_url(url) {
                return Err(ApiError::validation("imageUrls must contain valid urls"));
            }
        }
        Ok(())
    }
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty())
}
