//! Session identity
//!
//! Every write that needs an acting principal takes a `Session`. It is built
//! once at the process boundary from configuration; nothing below that
//! boundary hard-codes a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ValidationError;
use crate::models::Student;

/// The user this process acts on behalf of
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// Build the session from the `[session]` table of the configuration
    ///
    /// `id` and `name` are required; `email` may be empty.
    pub fn from_config(config: &Config) -> Result<Self, ValidationError> {
        let user_id = config
            .session
            .id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ValidationError::MissingSessionField("id"))?;
        let name = config
            .session
            .name
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ValidationError::MissingSessionField("name"))?;
        let email = config.session.email.clone().unwrap_or_default();

        Ok(Self {
            user_id,
            name,
            email,
        })
    }

    /// Student record written into a course document on enrollment
    pub fn to_student(&self, enrolled_at: DateTime<Utc>) -> Student {
        Student {
            id: self.user_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            enrollment_date: enrolled_at.to_rfc3339(),
        }
    }

    /// Initials for the header badge ("Yati Gautam" -> "YG")
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}
