use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Exmr, ExmrFilter, ExmrRelocation, He, HeFilter, HePatch, User};
use crate::types::Region;

/// Parent registry. Inserts are uniqueness-checked by the backend itself:
/// a duplicate `he_code` (and therefore a duplicate code/region/subject triple)
/// fails with `DatabaseError::Conflict`.
#[async_trait]
pub trait HeStore: Send + Sync {
    async fn insert_he(&self, he: He) -> Result<He, DatabaseError>;

    async fn find_he(&self, he_code: &str) -> Result<Option<He>, DatabaseError>;

    async fn find_he_in_scope(
        &self,
        he_code: &str,
        region: Region,
        subject_code: &str,
    ) -> Result<Option<He>, DatabaseError>;

    async fn update_he(&self, he_code: &str, patch: &HePatch) -> Result<Option<He>, DatabaseError>;

    async fn delete_he(&self, he_code: &str) -> Result<Option<He>, DatabaseError>;

    /// Ordered by subject_code desc, then he_code desc
    async fn search_hes(&self, filter: &HeFilter) -> Result<Vec<He>, DatabaseError>;
}

/// Child registry. `insert_exmr` and `relocate_exmr` fail with
/// `DatabaseError::Conflict` when the target code is already taken.
#[async_trait]
pub trait ExmrStore: Send + Sync {
    async fn insert_exmr(&self, exmr: Exmr) -> Result<Exmr, DatabaseError>;

    async fn find_exmr(&self, exmr_code: &str) -> Result<Option<Exmr>, DatabaseError>;

    /// Highest-coded EXMR in the (he_code, subject_code, region) group
    async fn last_exmr_in_group(
        &self,
        he_code: &str,
        subject_code: &str,
        region: Region,
    ) -> Result<Option<Exmr>, DatabaseError>;

    async fn rename_exmr(&self, exmr_code: &str, name: &str) -> Result<Option<Exmr>, DatabaseError>;

    async fn delete_exmr(&self, exmr_code: &str) -> Result<Option<Exmr>, DatabaseError>;

    /// Ordered by exmr_code asc
    async fn search_exmrs(&self, filter: &ExmrFilter) -> Result<Vec<Exmr>, DatabaseError>;

    /// Rewrites code, parent and region in one write. `Ok(None)` when the
    /// EXMR no longer exists.
    async fn relocate_exmr(
        &self,
        exmr_code: &str,
        relocation: &ExmrRelocation,
    ) -> Result<Option<Exmr>, DatabaseError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: User) -> Result<User, DatabaseError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    /// All users when `region` is `None`, otherwise only that region's users
    async fn list_users(&self, region: Option<Region>) -> Result<Vec<User>, DatabaseError>;

    async fn admin_exists(&self) -> Result<bool, DatabaseError>;
}

/// Every registry the API needs, behind one handle
#[async_trait]
pub trait Store: HeStore + ExmrStore + UserStore {
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), DatabaseError>;
}
