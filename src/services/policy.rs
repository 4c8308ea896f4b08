//! Region authorization.
//!
//! Admins bypass every region check. Regional users may only touch HE and
//! EXMR records whose region equals their own. Every check here runs before
//! the corresponding registry write.

use tracing::{debug, warn};

use crate::database::models::{Exmr, He};
use crate::database::Store;
use crate::types::{Caller, Region};

use super::error::{ServiceError, ServiceResult};

/// Region an HE creation will be stored under.
///
/// Admins choose it; a regional user's own region always wins over whatever
/// the request body says.
pub fn resolve_parent_region(caller: &Caller, requested: Option<Region>) -> ServiceResult<Region> {
    match caller {
        Caller::Admin { .. } => requested.ok_or_else(|| ServiceError::invalid_input("region is required")),
        Caller::Regional { region, .. } => {
            if let Some(requested) = requested.filter(|r| r != region) {
                debug!("Ignoring requested region {} for {} user", requested, region);
            }
            Ok(*region)
        }
    }
}

/// Resolves the HE region and rejects a duplicate (he_code, region, subject_code).
///
/// The registry's unique index still arbitrates concurrent creations.
pub async fn authorize_create_parent(
    store: &dyn Store,
    caller: &Caller,
    he_code: &str,
    subject_code: &str,
    requested: Option<Region>,
) -> ServiceResult<Region> {
    let region = resolve_parent_region(caller, requested)?;

    if store.find_he_in_scope(he_code, region, subject_code).await?.is_some() {
        return Err(ServiceError::conflict(format!(
            "HE with code {}, subject {}, and region {} already exists.",
            he_code, subject_code, region
        )));
    }

    Ok(region)
}

pub fn authorize_mutate_parent(caller: &Caller, parent: &He) -> ServiceResult<()> {
    match caller {
        Caller::Admin { .. } => Ok(()),
        Caller::Regional { region, .. } if *region == parent.region => Ok(()),
        Caller::Regional { id, region } => {
            warn!(
                "Region check failed: user {} ({}) on HE {} ({})",
                id, region, parent.he_code, parent.region
            );
            Err(ServiceError::forbidden(
                "Access denied. You can only access HEs in your region.",
            ))
        }
    }
}

/// Caller must share a region with both the EXMR and its HE.
///
/// `parent` is `None` when the HE was deleted after the EXMR was created;
/// only admins may act on such orphans.
pub fn authorize_child_operation(caller: &Caller, parent: Option<&He>, child: &Exmr) -> ServiceResult<()> {
    let Caller::Regional { id, region } = caller else {
        return Ok(());
    };

    let parent = parent.ok_or_else(|| ServiceError::not_found("Associated HE not found"))?;

    if *region != parent.region || *region != child.region {
        warn!(
            "Region check failed: user {} ({}) on EXMR {} ({}) under HE {} ({})",
            id, region, child.exmr_code, child.region, parent.he_code, parent.region
        );
        return Err(ServiceError::forbidden("Unauthorized: Region mismatch"));
    }

    Ok(())
}
