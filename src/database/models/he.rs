use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::Region;

/// Parent record (head examiner), keyed by `HE-###`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct He {
    pub he_code: String,
    pub name: String,
    pub subject_code: String,
    pub region: Region,
    pub created_at: DateTime<Utc>,
}

/// Fields an HE update may change. `None` leaves the stored value in place.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HePatch {
    pub name: Option<String>,
    pub subject_code: Option<String>,
}

impl HePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.subject_code.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HeFilter {
    pub subject_code: Option<String>,
    pub he_code: Option<String>,
}

impl HeFilter {
    pub fn matches(&self, he: &He) -> bool {
        self.subject_code.as_deref().map_or(true, |s| he.subject_code == s)
            && self.he_code.as_deref().map_or(true, |c| he.he_code == c)
    }
}
