use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::Region;

/// Child record (examiner), coded as its parent's code plus a two digit sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Exmr {
    pub exmr_code: String,
    pub name: String,
    pub subject_code: String,
    pub he_code: String,
    pub region: Region,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExmrFilter {
    pub he_code: Option<String>,
    pub subject_code: Option<String>,
}

impl ExmrFilter {
    pub fn matches(&self, exmr: &Exmr) -> bool {
        self.he_code.as_deref().map_or(true, |c| exmr.he_code == c)
            && self.subject_code.as_deref().map_or(true, |s| exmr.subject_code == s)
    }
}

/// New identity of an EXMR moving under another HE; applied as a single write.
#[derive(Debug, Clone, PartialEq)]
pub struct ExmrRelocation {
    pub exmr_code: String,
    pub he_code: String,
    pub region: Region,
}
