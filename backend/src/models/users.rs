use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_email(&self.email)?;
        if self.name.len() < 5 || self.name.len() > 50 {
            return Err(ApiError::validation("name must be 5 to 50 characters"));
        }
        validate_password(&self.password)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

impl Credential {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ApiError::validation("email is not valid"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ApiError::validation("email is not valid"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 5 || password.len() > 15 {
        return Err(ApiError::validation("password must be 5 to 15 characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_bounds() {
        let mut req = RegisterRequest {
            email: "owner@example.com".to_string(),
            name: "Cat Owner".to_string(),
            password: "secret".to_string(),
        };
        assert!(req.validate().is_ok());

        req.name = "abcd".to_string();
        assert!(req.validate().is_err());
        req.name = "x".repeat(51);
        assert!(req.validate().is_err());
    }

    #[test]
    fn email_shape_is_checked() {
        for bad in ["", "plainaddress", "@example.com", "user@", "user@host"] {
            let req = Credential {
                email: bad.to_string(),
                password: "secret".to_string(),
            };
            assert!(req.validate().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn password_bounds() {
        let mut req = Credential {
            email: "owner@example.com".to_string(),
            password: "1234".to_string(),
        };
        assert!(req.validate().is_err());
        req.password = "x".repeat(16);
        assert!(req.validate().is_err());
        req.password = "12345".to_string();
        assert!(req.validate().is_ok());
    }
}
