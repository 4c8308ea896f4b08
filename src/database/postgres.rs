use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{Exmr, ExmrFilter, ExmrRelocation, He, HeFilter, HePatch, User};
use crate::database::store::{ExmrStore, HeStore, Store, UserStore};
use crate::types::Region;

const HE_COLUMNS: &str = "he_code, name, subject_code, region, created_at";
const EXMR_COLUMNS: &str = "exmr_code, name, subject_code, he_code, region, created_at";
const USER_COLUMNS: &str = "id, username, password_hash, role, region, created_at";

/// PostgreSQL-backed registries. Uniqueness is enforced by the indexes in
/// `migrations/0001_grouplist.sql`; violations surface as `Conflict`.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HeStore for PgStore {
    async fn insert_he(&self, he: He) -> Result<He, DatabaseError> {
        let sql = format!(
            "INSERT INTO hes ({cols}) VALUES ($1, $2, $3, $4, $5) RETURNING {cols}",
            cols = HE_COLUMNS
        );
        let stored = sqlx::query_as::<_, He>(&sql)
            .bind(&he.he_code)
            .bind(&he.name)
            .bind(&he.subject_code)
            .bind(he.region)
            .bind(he.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::from_write(e, || format!("HE with code {} already exists", he.he_code))
            })?;
        Ok(stored)
    }

    async fn find_he(&self, he_code: &str) -> Result<Option<He>, DatabaseError> {
        let sql = format!("SELECT {} FROM hes WHERE he_code = $1", HE_COLUMNS);
        let he = sqlx::query_as::<_, He>(&sql).bind(he_code).fetch_optional(&self.pool).await?;
        Ok(he)
    }

    async fn find_he_in_scope(
        &self,
        he_code: &str,
        region: Region,
        subject_code: &str,
    ) -> Result<Option<He>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM hes WHERE he_code = $1 AND region = $2 AND subject_code = $3",
            HE_COLUMNS
        );
        let he = sqlx::query_as::<_, He>(&sql)
            .bind(he_code)
            .bind(region)
            .bind(subject_code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(he)
    }

    async fn update_he(&self, he_code: &str, patch: &HePatch) -> Result<Option<He>, DatabaseError> {
        let sql = format!(
            "UPDATE hes SET name = COALESCE($2, name), subject_code = COALESCE($3, subject_code) \
             WHERE he_code = $1 RETURNING {}",
            HE_COLUMNS
        );
        let he = sqlx::query_as::<_, He>(&sql)
            .bind(he_code)
            .bind(patch.name.as_deref())
            .bind(patch.subject_code.as_deref())
            .fetch_optional(&self.pool)
            .await?;
        Ok(he)
    }

    async fn delete_he(&self, he_code: &str) -> Result<Option<He>, DatabaseError> {
        let sql = format!("DELETE FROM hes WHERE he_code = $1 RETURNING {}", HE_COLUMNS);
        let he = sqlx::query_as::<_, He>(&sql).bind(he_code).fetch_optional(&self.pool).await?;
        Ok(he)
    }

    async fn search_hes(&self, filter: &HeFilter) -> Result<Vec<He>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM hes \
             WHERE ($1::text IS NULL OR subject_code = $1) AND ($2::text IS NULL OR he_code = $2) \
             ORDER BY subject_code COLLATE \"C\" DESC, he_code COLLATE \"C\" DESC",
            HE_COLUMNS
        );
        let hes = sqlx::query_as::<_, He>(&sql)
            .bind(filter.subject_code.as_deref())
            .bind(filter.he_code.as_deref())
            .fetch_all(&self.pool)
            .await?;
        Ok(hes)
    }
}

#[async_trait]
impl ExmrStore for PgStore {
    async fn insert_exmr(&self, exmr: Exmr) -> Result<Exmr, DatabaseError> {
        let sql = format!(
            "INSERT INTO exmrs ({cols}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {cols}",
            cols = EXMR_COLUMNS
        );
        let stored = sqlx::query_as::<_, Exmr>(&sql)
            .bind(&exmr.exmr_code)
            .bind(&exmr.name)
            .bind(&exmr.subject_code)
            .bind(&exmr.he_code)
            .bind(exmr.region)
            .bind(exmr.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::from_write(e, || {
                    format!("EXMR with code {} already exists", exmr.exmr_code)
                })
            })?;
        Ok(stored)
    }

    async fn find_exmr(&self, exmr_code: &str) -> Result<Option<Exmr>, DatabaseError> {
        let sql = format!("SELECT {} FROM exmrs WHERE exmr_code = $1", EXMR_COLUMNS);
        let exmr = sqlx::query_as::<_, Exmr>(&sql).bind(exmr_code).fetch_optional(&self.pool).await?;
        Ok(exmr)
    }

    async fn last_exmr_in_group(
        &self,
        he_code: &str,
        subject_code: &str,
        region: Region,
    ) -> Result<Option<Exmr>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM exmrs WHERE he_code = $1 AND subject_code = $2 AND region = $3 \
             ORDER BY exmr_code COLLATE \"C\" DESC LIMIT 1",
            EXMR_COLUMNS
        );
        let exmr = sqlx::query_as::<_, Exmr>(&sql)
            .bind(he_code)
            .bind(subject_code)
            .bind(region)
            .fetch_optional(&self.pool)
            .await?;
        Ok(exmr)
    }

    async fn rename_exmr(&self, exmr_code: &str, name: &str) -> Result<Option<Exmr>, DatabaseError> {
        let sql = format!(
            "UPDATE exmrs SET name = $2 WHERE exmr_code = $1 RETURNING {}",
            EXMR_COLUMNS
        );
        let exmr = sqlx::query_as::<_, Exmr>(&sql)
            .bind(exmr_code)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(exmr)
    }

    async fn delete_exmr(&self, exmr_code: &str) -> Result<Option<Exmr>, DatabaseError> {
        let sql = format!("DELETE FROM exmrs WHERE exmr_code = $1 RETURNING {}", EXMR_COLUMNS);
        let exmr = sqlx::query_as::<_, Exmr>(&sql).bind(exmr_code).fetch_optional(&self.pool).await?;
        Ok(exmr)
    }

    async fn search_exmrs(&self, filter: &ExmrFilter) -> Result<Vec<Exmr>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM exmrs \
             WHERE ($1::text IS NULL OR he_code = $1) AND ($2::text IS NULL OR subject_code = $2) \
             ORDER BY exmr_code COLLATE \"C\" ASC",
            EXMR_COLUMNS
        );
        let exmrs = sqlx::query_as::<_, Exmr>(&sql)
            .bind(filter.he_code.as_deref())
            .bind(filter.subject_code.as_deref())
            .fetch_all(&self.pool)
            .await?;
        Ok(exmrs)
    }

    async fn relocate_exmr(
        &self,
        exmr_code: &str,
        relocation: &ExmrRelocation,
    ) -> Result<Option<Exmr>, DatabaseError> {
        let sql = format!(
            "UPDATE exmrs SET exmr_code = $2, he_code = $3, region = $4 \
             WHERE exmr_code = $1 RETURNING {}",
            EXMR_COLUMNS
        );
        let exmr = sqlx::query_as::<_, Exmr>(&sql)
            .bind(exmr_code)
            .bind(&relocation.exmr_code)
            .bind(&relocation.he_code)
            .bind(relocation.region)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::from_write(e, || {
                    format!("EXMR with code {} already exists", relocation.exmr_code)
                })
            })?;
        Ok(exmr)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: User) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users ({cols}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {cols}",
            cols = USER_COLUMNS
        );
        let stored = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.region)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DatabaseError::from_write(e, || {
                    format!("User with username {} already exists", user.username)
                })
            })?;
        Ok(stored)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql).bind(username).fetch_optional(&self.pool).await?;
        Ok(user)
    }

    async fn list_users(&self, region: Option<Region>) -> Result<Vec<User>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM users WHERE ($1::text IS NULL OR region = $1) \
             ORDER BY created_at, username",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(region)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn admin_exists(&self) -> Result<bool, DatabaseError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')")
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
