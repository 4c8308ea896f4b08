use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Exmr, ExmrFilter, ExmrRelocation, He, HeFilter, HePatch, User};
use crate::database::store::{ExmrStore, HeStore, Store, UserStore};
use crate::types::{Region, Role};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    // BTreeMap keeps codes in byte order, matching COLLATE "C" in PostgreSQL
    hes: BTreeMap<String, He>,
    exmrs: BTreeMap<String, Exmr>,
}

/// In-process store for development and tests.
///
/// Every uniqueness check happens under the same write lock as the insert, so
/// concurrent writers observe the same guarantees as the PostgreSQL indexes.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HeStore for MemoryStore {
    async fn insert_he(&self, he: He) -> Result<He, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.hes.contains_key(&he.he_code) {
            return Err(DatabaseError::Conflict(format!(
                "HE with code {} already exists",
                he.he_code
            )));
        }
        tables.hes.insert(he.he_code.clone(), he.clone());
        Ok(he)
    }

    async fn find_he(&self, he_code: &str) -> Result<Option<He>, DatabaseError> {
        Ok(self.tables.read().await.hes.get(he_code).cloned())
    }

    async fn find_he_in_scope(
        &self,
        he_code: &str,
        region: Region,
        subject_code: &str,
    ) -> Result<Option<He>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .hes
            .get(he_code)
            .filter(|he| he.region == region && he.subject_code == subject_code)
            .cloned())
    }

    async fn update_he(&self, he_code: &str, patch: &HePatch) -> Result<Option<He>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(he) = tables.hes.get_mut(he_code) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            he.name = name.clone();
        }
        if let Some(subject_code) = &patch.subject_code {
            he.subject_code = subject_code.clone();
        }
        Ok(Some(he.clone()))
    }

    async fn delete_he(&self, he_code: &str) -> Result<Option<He>, DatabaseError> {
        Ok(self.tables.write().await.hes.remove(he_code))
    }

    async fn search_hes(&self, filter: &HeFilter) -> Result<Vec<He>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut found: Vec<He> = tables.hes.values().filter(|he| filter.matches(he)).cloned().collect();
        found.sort_by(|a, b| {
            b.subject_code
                .cmp(&a.subject_code)
                .then_with(|| b.he_code.cmp(&a.he_code))
        });
        Ok(found)
    }
}

#[async_trait]
impl ExmrStore for MemoryStore {
    async fn insert_exmr(&self, exmr: Exmr) -> Result<Exmr, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.exmrs.contains_key(&exmr.exmr_code) {
            return Err(DatabaseError::Conflict(format!(
                "EXMR with code {} already exists",
                exmr.exmr_code
            )));
        }
        tables.exmrs.insert(exmr.exmr_code.clone(), exmr.clone());
        Ok(exmr)
    }

    async fn find_exmr(&self, exmr_code: &str) -> Result<Option<Exmr>, DatabaseError> {
        Ok(self.tables.read().await.exmrs.get(exmr_code).cloned())
    }

    async fn last_exmr_in_group(
        &self,
        he_code: &str,
        subject_code: &str,
        region: Region,
    ) -> Result<Option<Exmr>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .exmrs
            .values()
            .rev()
            .find(|e| e.he_code == he_code && e.subject_code == subject_code && e.region == region)
            .cloned())
    }

    async fn rename_exmr(&self, exmr_code: &str, name: &str) -> Result<Option<Exmr>, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables.exmrs.get_mut(exmr_code).map(|exmr| {
            exmr.name = name.to_string();
            exmr.clone()
        }))
    }

    async fn delete_exmr(&self, exmr_code: &str) -> Result<Option<Exmr>, DatabaseError> {
        Ok(self.tables.write().await.exmrs.remove(exmr_code))
    }

    async fn search_exmrs(&self, filter: &ExmrFilter) -> Result<Vec<Exmr>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.exmrs.values().filter(|e| filter.matches(e)).cloned().collect())
    }

    async fn relocate_exmr(
        &self,
        exmr_code: &str,
        relocation: &ExmrRelocation,
    ) -> Result<Option<Exmr>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.exmrs.contains_key(exmr_code) {
            return Ok(None);
        }
        if relocation.exmr_code != exmr_code && tables.exmrs.contains_key(&relocation.exmr_code) {
            return Err(DatabaseError::Conflict(format!(
                "EXMR with code {} already exists",
                relocation.exmr_code
            )));
        }

        let Some(mut exmr) = tables.exmrs.remove(exmr_code) else {
            return Ok(None);
        };
        exmr.exmr_code = relocation.exmr_code.clone();
        exmr.he_code = relocation.he_code.clone();
        exmr.region = relocation.region;
        tables.exmrs.insert(exmr.exmr_code.clone(), exmr.clone());
        Ok(Some(exmr))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(DatabaseError::Conflict(format!(
                "User with username {} already exists",
                user.username
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self, region: Option<Region>) -> Result<Vec<User>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| region.is_none() || u.region == region)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.username.cmp(&b.username)));
        Ok(users)
    }

    async fn admin_exists(&self) -> Result<bool, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|u| u.role == Role::Admin))
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
