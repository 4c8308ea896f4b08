use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::database::models::{He, HeFilter, HePatch};
use crate::database::Store;
use crate::types::{Caller, Region};

use super::error::{ServiceError, ServiceResult};
use super::non_blank;
use super::policy;

/// Body of an HE creation request. Every field is optional at the wire level
/// so that missing values surface as `InvalidInput` rather than a JSON error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewHe {
    pub he_code: Option<String>,
    pub name: Option<String>,
    pub subject_code: Option<String>,
    /// Only honoured for admins
    pub region: Option<String>,
}

/// `HE-` followed by exactly three ASCII digits
pub fn is_valid_he_code(code: &str) -> bool {
    code.strip_prefix("HE-")
        .is_some_and(|digits| digits.len() == 3 && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Parent registry operations, each gated by the region policy
pub struct HeService {
    store: Arc<dyn Store>,
}

impl HeService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, caller: &Caller, input: NewHe) -> ServiceResult<He> {
        let (Some(he_code), Some(name), Some(subject_code)) = (
            non_blank(input.he_code),
            non_blank(input.name),
            non_blank(input.subject_code),
        ) else {
            return Err(ServiceError::invalid_input("All fields are required"));
        };

        if !is_valid_he_code(&he_code) {
            return Err(ServiceError::invalid_field(
                "he_code",
                format!("Invalid he_code '{}': expected format HE-###", he_code),
            ));
        }

        // Admin-supplied region only; a regional user's body region is ignored unparsed
        let requested = match (caller, non_blank(input.region)) {
            (Caller::Admin { .. }, Some(raw)) => Some(raw.parse::<Region>().map_err(ServiceError::InvalidInput)?),
            _ => None,
        };

        let region =
            policy::authorize_create_parent(self.store.as_ref(), caller, &he_code, &subject_code, requested).await?;

        let he = self
            .store
            .insert_he(He {
                he_code,
                name,
                subject_code,
                region,
                created_at: Utc::now(),
            })
            .await?;

        info!("HE {} created in {} by {}", he.he_code, he.region, caller.id());
        Ok(he)
    }

    pub async fn update(&self, caller: &Caller, he_code: &str, patch: HePatch) -> ServiceResult<He> {
        let patch = HePatch {
            name: non_blank(patch.name),
            subject_code: non_blank(patch.subject_code),
        };
        if patch.is_empty() {
            return Err(ServiceError::invalid_input("At least one field must be updated"));
        }

        let existing = self.find(he_code).await?;
        policy::authorize_mutate_parent(caller, &existing)?;

        let updated = self
            .store
            .update_he(he_code, &patch)
            .await?
            .ok_or_else(|| ServiceError::not_found("HE not found"))?;

        info!("HE {} updated by {}", updated.he_code, caller.id());
        Ok(updated)
    }

    /// Removes the HE only; its EXMRs stay behind as orphans
    pub async fn delete(&self, caller: &Caller, he_code: &str) -> ServiceResult<He> {
        let existing = self.find(he_code).await?;
        policy::authorize_mutate_parent(caller, &existing)?;

        let deleted = self
            .store
            .delete_he(he_code)
            .await?
            .ok_or_else(|| ServiceError::not_found("HE not found"))?;

        info!("HE {} deleted by {}", deleted.he_code, caller.id());
        Ok(deleted)
    }

    pub async fn search(&self, filter: HeFilter) -> ServiceResult<Vec<He>> {
        let filter = HeFilter {
            subject_code: non_blank(filter.subject_code),
            he_code: non_blank(filter.he_code),
        };
        let found = self.store.search_hes(&filter).await?;
        if found.is_empty() {
            return Err(ServiceError::not_found("No HEs found"));
        }
        Ok(found)
    }

    async fn find(&self, he_code: &str) -> ServiceResult<He> {
        self.store
            .find_he(he_code)
            .await?
            .ok_or_else(|| ServiceError::not_found("HE not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use uuid::Uuid;

    fn service() -> HeService {
        HeService::new(Arc::new(MemoryStore::new()))
    }

    fn new_he(code: &str, subject: &str, region: Option<&str>) -> NewHe {
        NewHe {
            he_code: Some(code.to_string()),
            name: Some(format!("Head {}", code)),
            subject_code: Some(subject.to_string()),
            region: region.map(str::to_string),
        }
    }

    #[test]
    fn he_code_format() {
        assert!(is_valid_he_code("HE-001"));
        assert!(is_valid_he_code("HE-999"));
        assert!(!is_valid_he_code("HE-01"));
        assert!(!is_valid_he_code("HE-0001"));
        assert!(!is_valid_he_code("he-001"));
        assert!(!is_valid_he_code("HE-00a"));
    }

    #[tokio::test]
    async fn regional_create_forces_own_region() {
        let service = service();
        let caller = Caller::regional(Uuid::new_v4(), Region::Mro);

        let he = service
            .create(&caller, new_he("HE-001", "MATH", Some("KRO")))
            .await
            .unwrap();
        assert_eq!(he.region, Region::Mro);

        // Garbage region in the body is ignored, not rejected
        let he = service
            .create(&caller, new_he("HE-002", "MATH", Some("MARS")))
            .await
            .unwrap();
        assert_eq!(he.region, Region::Mro);
    }

    #[tokio::test]
    async fn admin_create_requires_valid_region() {
        let service = service();
        let admin = Caller::admin(Uuid::new_v4());

        assert!(matches!(
            service.create(&admin, new_he("HE-001", "MATH", None)).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            service.create(&admin, new_he("HE-001", "MATH", Some("MARS"))).await,
            Err(ServiceError::InvalidInput(_))
        ));

        let he = service.create(&admin, new_he("HE-001", "MATH", Some("nbro"))).await.unwrap();
        assert_eq!(he.region, Region::Nbro);
    }

    #[tokio::test]
    async fn create_validates_fields_and_format() {
        let service = service();
        let caller = Caller::regional(Uuid::new_v4(), Region::Kro);

        let mut blank_name = new_he("HE-001", "MATH", None);
        blank_name.name = Some("   ".into());
        match service.create(&caller, blank_name).await {
            Err(ServiceError::InvalidInput(msg)) => assert_eq!(msg, "All fields are required"),
            other => panic!("unexpected: {:?}", other),
        }

        assert!(matches!(
            service.create(&caller, new_he("HE-1", "MATH", None)).await,
            Err(ServiceError::InvalidField { field: "he_code", .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_create_conflicts_and_keeps_original() {
        let service = service();
        let caller = Caller::regional(Uuid::new_v4(), Region::Kro);
        service.create(&caller, new_he("HE-001", "MATH", None)).await.unwrap();

        let mut again = new_he("HE-001", "MATH", None);
        again.name = Some("Replacement".into());
        assert!(matches!(
            service.create(&caller, again).await,
            Err(ServiceError::Conflict(_))
        ));

        // Same code under a different region still collides on the code
        let other = Caller::regional(Uuid::new_v4(), Region::Bro);
        assert!(matches!(
            service.create(&other, new_he("HE-001", "MATH", None)).await,
            Err(ServiceError::Conflict(_))
        ));

        let found = service
            .search(HeFilter { he_code: Some("HE-001".into()), subject_code: None })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Head HE-001");
        assert_eq!(found[0].region, Region::Kro);
    }

    #[tokio::test]
    async fn update_is_region_gated() {
        let service = service();
        let kro = Caller::regional(Uuid::new_v4(), Region::Kro);
        let mro = Caller::regional(Uuid::new_v4(), Region::Mro);
        service.create(&kro, new_he("HE-001", "MATH", None)).await.unwrap();

        let patch = HePatch { name: Some("Renamed".into()), subject_code: None };
        assert!(matches!(
            service.update(&mro, "HE-001", patch.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));

        let updated = service.update(&kro, "HE-001", patch).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.subject_code, "MATH");
    }

    #[tokio::test]
    async fn update_needs_a_field_and_existing_he() {
        let service = service();
        let admin = Caller::admin(Uuid::new_v4());

        assert!(matches!(
            service.update(&admin, "HE-001", HePatch::default()).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            service
                .update(&admin, "HE-001", HePatch { name: Some("x".into()), subject_code: None })
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_then_search_not_found() {
        let service = service();
        let admin = Caller::admin(Uuid::new_v4());
        service.create(&admin, new_he("HE-001", "MATH", Some("KRO"))).await.unwrap();

        let mro = Caller::regional(Uuid::new_v4(), Region::Mro);
        assert!(matches!(
            service.delete(&mro, "HE-001").await,
            Err(ServiceError::Forbidden(_))
        ));

        service.delete(&admin, "HE-001").await.unwrap();
        assert!(matches!(
            service.search(HeFilter::default()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(&admin, "HE-001").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn search_is_repeatable() {
        let service = service();
        let admin = Caller::admin(Uuid::new_v4());
        service.create(&admin, new_he("HE-001", "MATH", Some("KRO"))).await.unwrap();
        service.create(&admin, new_he("HE-002", "PHYS", Some("MRO"))).await.unwrap();

        let first = service.search(HeFilter::default()).await.unwrap();
        let second = service.search(HeFilter::default()).await.unwrap();
        let codes = |v: &[He]| v.iter().map(|h| h.he_code.clone()).collect::<Vec<_>>();
        assert_eq!(codes(&first), vec!["HE-002", "HE-001"]);
        assert_eq!(codes(&first), codes(&second));
    }
}
