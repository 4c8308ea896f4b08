use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::database::models::{Exmr, ExmrFilter, ExmrRelocation, He};
use crate::database::Store;
use crate::types::Caller;

use super::code_generator::generate_child_code;
use super::error::{ServiceError, ServiceResult};
use super::non_blank;
use super::policy;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewExmr {
    /// Always generated; a client-supplied value is rejected
    pub exmr_code: Option<String>,
    pub name: Option<String>,
    pub he_code: Option<String>,
    pub subject_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExmrRename {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExmrTransfer {
    pub new_he_code: Option<String>,
}

/// Child registry operations. Codes come from the generator; every mutation
/// passes the region policy against the owning HE first.
pub struct ExmrService {
    store: Arc<dyn Store>,
}

impl ExmrService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, caller: &Caller, input: NewExmr) -> ServiceResult<Exmr> {
        if input.exmr_code.is_some() {
            return Err(ServiceError::invalid_field(
                "exmr_code",
                "exmr_code is generated by the server and must not be supplied",
            ));
        }

        let (Some(name), Some(he_code), Some(subject_code)) = (
            non_blank(input.name),
            non_blank(input.he_code),
            non_blank(input.subject_code),
        ) else {
            return Err(ServiceError::invalid_input("name, he_code and subject_code are required"));
        };

        let generated = generate_child_code(self.store.as_ref(), &he_code, &subject_code).await?;
        policy::authorize_mutate_parent(caller, &generated.parent)?;

        let exmr = self
            .store
            .insert_exmr(Exmr {
                exmr_code: generated.exmr_code,
                name,
                subject_code: generated.parent.subject_code,
                he_code: generated.parent.he_code,
                region: generated.region,
                created_at: Utc::now(),
            })
            .await?;

        info!("EXMR {} created in {} by {}", exmr.exmr_code, exmr.region, caller.id());
        Ok(exmr)
    }

    pub async fn update(&self, caller: &Caller, exmr_code: &str, input: ExmrRename) -> ServiceResult<Exmr> {
        let name = non_blank(input.name).ok_or_else(|| ServiceError::invalid_input("Name is required to update"))?;

        self.authorize_existing(caller, exmr_code).await?;

        let renamed = self
            .store
            .rename_exmr(exmr_code, &name)
            .await?
            .ok_or_else(|| ServiceError::not_found("EXMR not found"))?;

        info!("EXMR {} renamed by {}", renamed.exmr_code, caller.id());
        Ok(renamed)
    }

    pub async fn delete(&self, caller: &Caller, exmr_code: &str) -> ServiceResult<Exmr> {
        self.authorize_existing(caller, exmr_code).await?;

        let deleted = self
            .store
            .delete_exmr(exmr_code)
            .await?
            .ok_or_else(|| ServiceError::not_found("EXMR not found"))?;

        info!("EXMR {} deleted by {}", deleted.exmr_code, caller.id());
        Ok(deleted)
    }

    pub async fn search(&self, filter: ExmrFilter) -> ServiceResult<Vec<Exmr>> {
        let filter = ExmrFilter {
            he_code: non_blank(filter.he_code),
            subject_code: non_blank(filter.subject_code),
        };
        let found = self.store.search_exmrs(&filter).await?;
        if found.is_empty() {
            return Err(ServiceError::not_found("No EXMRs found"));
        }
        Ok(found)
    }

    /// Re-parents an EXMR under `new_he_code`.
    ///
    /// The caller must be allowed to act on the EXMR where it is now and on
    /// the destination HE. The code is re-derived from the destination's
    /// sequence and the region follows the destination.
    pub async fn transfer(&self, caller: &Caller, exmr_code: &str, input: ExmrTransfer) -> ServiceResult<Exmr> {
        let new_he_code =
            non_blank(input.new_he_code).ok_or_else(|| ServiceError::invalid_input("new_he_code is required"))?;

        let child = self.authorize_existing(caller, exmr_code).await?;

        let destination = self
            .store
            .find_he(&new_he_code)
            .await?
            .ok_or_else(|| ServiceError::not_found("New HE not found"))?;
        policy::authorize_mutate_parent(caller, &destination)?;

        let generated = generate_child_code(self.store.as_ref(), &destination.he_code, &child.subject_code).await?;

        let relocation = ExmrRelocation {
            exmr_code: generated.exmr_code,
            he_code: generated.parent.he_code,
            region: generated.region,
        };
        let moved = self
            .store
            .relocate_exmr(exmr_code, &relocation)
            .await?
            .ok_or_else(|| ServiceError::not_found("EXMR not found"))?;

        info!(
            "EXMR {} transferred from {} to {} as {} by {}",
            exmr_code,
            child.he_code,
            moved.he_code,
            moved.exmr_code,
            caller.id()
        );
        Ok(moved)
    }

    /// Loads the EXMR and its current HE, then applies the child policy
    async fn authorize_existing(&self, caller: &Caller, exmr_code: &str) -> ServiceResult<Exmr> {
        let child = self
            .store
            .find_exmr(exmr_code)
            .await?
            .ok_or_else(|| ServiceError::not_found("EXMR not found"))?;

        let parent: Option<He> = self.store.find_he(&child.he_code).await?;
        policy::authorize_child_operation(caller, parent.as_ref(), &child)?;

        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::HeFilter;
    use crate::database::MemoryStore;
    use crate::services::he_service::{HeService, NewHe};
    use crate::types::Region;
    use uuid::Uuid;

    struct Fixture {
        hes: HeService,
        exmrs: ExmrService,
        admin: Caller,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Fixture {
            hes: HeService::new(store.clone()),
            exmrs: ExmrService::new(store),
            admin: Caller::admin(Uuid::new_v4()),
        }
    }

    impl Fixture {
        async fn he(&self, code: &str, subject: &str, region: &str) {
            self.hes
                .create(
                    &self.admin,
                    NewHe {
                        he_code: Some(code.into()),
                        name: Some(format!("Head {}", code)),
                        subject_code: Some(subject.into()),
                        region: Some(region.into()),
                    },
                )
                .await
                .unwrap();
        }

        async fn exmr(&self, caller: &Caller, he_code: &str, subject: &str) -> ServiceResult<Exmr> {
            self.exmrs
                .create(
                    caller,
                    NewExmr {
                        exmr_code: None,
                        name: Some("Examiner".into()),
                        he_code: Some(he_code.into()),
                        subject_code: Some(subject.into()),
                    },
                )
                .await
        }
    }

    #[tokio::test]
    async fn children_numbered_sequentially_under_parent() {
        let f = fixture();
        f.he("HE-001", "MATH", "KRO").await;
        let kro = Caller::regional(Uuid::new_v4(), Region::Kro);

        let first = f.exmr(&kro, "HE-001", "MATH").await.unwrap();
        let second = f.exmr(&kro, "HE-001", "MATH").await.unwrap();

        assert_eq!(first.exmr_code, "HE-00101");
        assert_eq!(second.exmr_code, "HE-00102");
        assert_eq!(second.region, Region::Kro);
        assert_eq!(second.subject_code, "MATH");
    }

    #[tokio::test]
    async fn supplied_code_rejected() {
        let f = fixture();
        f.he("HE-001", "MATH", "KRO").await;

        let err = f
            .exmrs
            .create(
                &f.admin,
                NewExmr {
                    exmr_code: Some("HE-00150".into()),
                    name: Some("Examiner".into()),
                    he_code: Some("HE-001".into()),
                    subject_code: Some("MATH".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidField { field: "exmr_code", .. }));
    }

    #[tokio::test]
    async fn create_under_foreign_parent_forbidden() {
        let f = fixture();
        f.he("HE-001", "MATH", "KRO").await;
        let mro = Caller::regional(Uuid::new_v4(), Region::Mro);

        assert!(matches!(
            f.exmr(&mro, "HE-001", "MATH").await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            f.exmrs.search(ExmrFilter::default()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_and_delete_respect_region() {
        let f = fixture();
        f.he("HE-001", "MATH", "KRO").await;
        let kro = Caller::regional(Uuid::new_v4(), Region::Kro);
        let bro = Caller::regional(Uuid::new_v4(), Region::Bro);
        f.exmr(&kro, "HE-001", "MATH").await.unwrap();

        let rename = ExmrRename { name: Some("Renamed".into()) };
        assert!(matches!(
            f.exmrs.update(&bro, "HE-00101", rename.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(f.exmrs.update(&kro, "HE-00101", rename).await.unwrap().name, "Renamed");

        assert!(matches!(
            f.exmrs.update(&kro, "HE-00101", ExmrRename { name: None }).await,
            Err(ServiceError::InvalidInput(_))
        ));

        assert!(matches!(
            f.exmrs.delete(&bro, "HE-00101").await,
            Err(ServiceError::Forbidden(_))
        ));
        f.exmrs.delete(&kro, "HE-00101").await.unwrap();
        assert!(matches!(
            f.exmrs.delete(&kro, "HE-00101").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn orphans_only_reachable_by_admin() {
        let f = fixture();
        f.he("HE-001", "MATH", "KRO").await;
        let kro = Caller::regional(Uuid::new_v4(), Region::Kro);
        f.exmr(&kro, "HE-001", "MATH").await.unwrap();
        f.hes.delete(&f.admin, "HE-001").await.unwrap();

        // Child survives its parent
        let orphans = f
            .exmrs
            .search(ExmrFilter { he_code: Some("HE-001".into()), subject_code: None })
            .await
            .unwrap();
        assert_eq!(orphans.len(), 1);

        let rename = ExmrRename { name: Some("Orphan".into()) };
        assert!(matches!(
            f.exmrs.update(&kro, "HE-00101", rename.clone()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(f.exmrs.update(&f.admin, "HE-00101", rename).await.unwrap().name, "Orphan");
    }

    #[tokio::test]
    async fn transfer_renumbers_and_takes_new_region() {
        let f = fixture();
        f.he("HE-001", "MATH", "KRO").await;
        f.he("HE-002", "MATH", "BRO").await;
        f.exmr(&f.admin, "HE-001", "MATH").await.unwrap();
        f.exmr(&f.admin, "HE-002", "MATH").await.unwrap();
        f.exmr(&f.admin, "HE-002", "MATH").await.unwrap();

        let moved = f
            .exmrs
            .transfer(&f.admin, "HE-00101", ExmrTransfer { new_he_code: Some("HE-002".into()) })
            .await
            .unwrap();

        assert_eq!(moved.exmr_code, "HE-00203");
        assert_eq!(moved.he_code, "HE-002");
        assert_eq!(moved.region, Region::Bro);

        // Old parent's group is empty again, so its sequence restarts
        assert_eq!(f.exmr(&f.admin, "HE-001", "MATH").await.unwrap().exmr_code, "HE-00101");
    }

    #[tokio::test]
    async fn transfer_failures() {
        let f = fixture();
        f.he("HE-001", "MATH", "KRO").await;
        f.he("HE-002", "PHYS", "KRO").await;
        f.he("HE-003", "MATH", "MRO").await;
        let kro = Caller::regional(Uuid::new_v4(), Region::Kro);
        f.exmr(&kro, "HE-001", "MATH").await.unwrap();

        let to = |code: &str| ExmrTransfer { new_he_code: Some(code.to_string()) };

        assert!(matches!(
            f.exmrs.transfer(&kro, "HE-00101", ExmrTransfer::default()).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            f.exmrs.transfer(&kro, "HE-00199", to("HE-001")).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.exmrs.transfer(&kro, "HE-00101", to("HE-404")).await,
            Err(ServiceError::NotFound(_))
        ));
        // Destination subject differs from the child's
        assert!(matches!(
            f.exmrs.transfer(&kro, "HE-00101", to("HE-002")).await,
            Err(ServiceError::InvalidInput(_))
        ));
        // Destination in another region
        assert!(matches!(
            f.exmrs.transfer(&kro, "HE-00101", to("HE-003")).await,
            Err(ServiceError::Forbidden(_))
        ));

        let untouched = f.hes.search(HeFilter::default()).await.unwrap();
        assert_eq!(untouched.len(), 3);
        let child = f
            .exmrs
            .search(ExmrFilter { he_code: Some("HE-001".into()), subject_code: None })
            .await
            .unwrap();
        assert_eq!(child[0].exmr_code, "HE-00101");
    }

    #[tokio::test]
    async fn sequence_exhaustion_surfaces() {
        let f = fixture();
        f.he("HE-001", "MATH", "KRO").await;
        for _ in 0..99 {
            f.exmr(&f.admin, "HE-001", "MATH").await.unwrap();
        }
        assert!(matches!(
            f.exmr(&f.admin, "HE-001", "MATH").await,
            Err(ServiceError::SequenceExhausted { .. })
        ));
    }
}
