//! Explicit session value threaded into loader and mutation calls.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farrier,
    Owner,
    Stable,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Farrier => write!(f, "farrier"),
            Role::Owner => write!(f, "owner"),
            Role::Stable => write!(f, "stable"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "farrier" => Ok(Role::Farrier),
            "owner" => Ok(Role::Owner),
            "stable" => Ok(Role::Stable),
            _ => Err(format!("Invalid role: '{}'", s)),
        }
    }
}

/// The signed-in user on whose behalf a call is made.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub role: Role,
    /// BCP 47 language tag, e.g. `it-IT`
    pub locale: String,
}

impl SessionContext {
    pub fn farrier(user_id: Uuid) -> Self {
        SessionContext {
            user_id,
            role: Role::Farrier,
            locale: "it-IT".to_string(),
        }
    }

    /// Day routes belong to one farrier; only that farrier may read or
    /// mutate them.
    pub fn ensure_route_owner(&self, farrier_id: Uuid) -> Result<()> {
        if self.role != Role::Farrier {
            return Err(AppError::Forbidden(format!(
                "role '{}' cannot manage a day route",
                self.role
            )));
        }
        if self.user_id != farrier_id {
            return Err(AppError::Forbidden(
                "day route belongs to another farrier".to_string(),
            ));
        }
        Ok(())
    }
}
