//! Sequential EXMR code derivation.
//!
//! An EXMR code is its HE code followed by a two-digit sequence (`HE-001` ->
//! `HE-00101`, `HE-00102`, ...). The next sequence is one past the highest
//! existing code in the (he_code, subject_code, region) group. Two concurrent
//! generators can derive the same code; the registry's unique index makes the
//! later insert fail with `Conflict`.

use tracing::debug;

use crate::database::models::He;
use crate::database::Store;
use crate::types::Region;

use super::error::{ServiceError, ServiceResult};

pub const MAX_SEQUENCE: u32 = 99;
const SEQUENCE_DIGITS: usize = 2;

#[derive(Debug, Clone)]
pub struct GeneratedCode {
    pub exmr_code: String,
    pub region: Region,
    pub parent: He,
}

/// Code following `last` within `he_code`'s group, or the first code when the
/// group is empty.
pub fn next_child_code(he_code: &str, last: Option<&str>) -> ServiceResult<String> {
    let next = match last {
        None => 1,
        Some(code) => sequence_of(code)? + 1,
    };

    if next > MAX_SEQUENCE {
        return Err(ServiceError::SequenceExhausted {
            he_code: he_code.to_string(),
            max: MAX_SEQUENCE,
        });
    }

    Ok(format!("{}{:02}", he_code, next))
}

fn sequence_of(code: &str) -> ServiceResult<u32> {
    let tail = code
        .len()
        .checked_sub(SEQUENCE_DIGITS)
        .and_then(|start| code.get(start..))
        .ok_or_else(|| ServiceError::Internal(format!("Malformed EXMR code in registry: {}", code)))?;

    tail.parse::<u32>()
        .map_err(|_| ServiceError::Internal(format!("Malformed EXMR code in registry: {}", code)))
}

/// Looks up the HE and derives the next free code under it.
///
/// `subject_code` must match the HE's stored subject.
pub async fn generate_child_code(
    store: &dyn Store,
    he_code: &str,
    subject_code: &str,
) -> ServiceResult<GeneratedCode> {
    let parent = store
        .find_he(he_code)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("HE {} not found", he_code)))?;

    if parent.subject_code != subject_code {
        return Err(ServiceError::invalid_input(format!(
            "Subject code {} does not match HE {} (subject {})",
            subject_code, parent.he_code, parent.subject_code
        )));
    }

    let last = store
        .last_exmr_in_group(&parent.he_code, &parent.subject_code, parent.region)
        .await?;
    let exmr_code = next_child_code(&parent.he_code, last.as_ref().map(|e| e.exmr_code.as_str()))?;

    debug!("Generated EXMR code {} under {}", exmr_code, parent.he_code);

    Ok(GeneratedCode {
        exmr_code,
        region: parent.region,
        parent,
    })
}
