use super::LocalStore;
use crate::types::{EqMember, StoreObj, ID};
use anyhow::Result;
use cask_core::store::StorePath;
use cask_core::types::{EqClass, TrustId};
use std::collections::BTreeSet;

impl LocalStore {
    pub(super) async fn valid(&self, path: &StorePath) -> Result<bool> {
        Ok(sqlx::query("SELECT id FROM store_obj WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.db)
            .await?
            .is_some())
    }

    pub(super) async fn get_store_obj_hash(&self, path: &StorePath) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT hash FROM store_obj WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|r| r.0))
    }

    async fn get_store_obj_id(
        tx: &mut sqlx::SqliteTransaction<'static>,
        path: &StorePath,
    ) -> Result<ID> {
        let (id, ..): (ID,) = sqlx::query_as("SELECT id FROM store_obj WHERE path = ?")
            .bind(path)
            .fetch_one(&mut **tx)
            .await?;
        Ok(id)
    }

    async fn add_store_obj(
        tx: &mut sqlx::SqliteTransaction<'static>,
        obj: &StoreObj,
    ) -> Result<ID> {
        let (id, ..): (ID,) =
            sqlx::query_as("INSERT INTO store_obj (path, hash) VALUES (?, ?) RETURNING id")
                .bind(&obj.path)
                .bind(obj.hash.base64_with_algo())
                .fetch_one(&mut **tx)
                .await?;
        Ok(id)
    }

    async fn add_ref(
        tx: &mut sqlx::SqliteTransaction<'static>,
        referrer: ID,
        reference: ID,
    ) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO ref (referrer, reference) VALUES (?, ?)")
            .bind(referrer)
            .bind(reference)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub(super) async fn register_store_obj(
        &self,
        obj: StoreObj,
        refs: BTreeSet<StorePath>,
    ) -> Result<()> {
        let mut tx = self.db.begin().await?;
        let referrer = Self::add_store_obj(&mut tx, &obj).await?;
        for r in refs {
            let reference = if r == obj.path {
                referrer
            } else {
                Self::get_store_obj_id(&mut tx, &r).await?
            };
            Self::add_ref(&mut tx, referrer, reference).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub(super) async fn get_references(&self, path: &StorePath) -> Result<BTreeSet<StorePath>> {
        let rows: Vec<(StorePath,)> = sqlx::query_as(
            r#"
            SELECT o.path
            FROM ref r
            JOIN store_obj referrer ON referrer.id = r.referrer
            JOIN store_obj o ON o.id = r.reference
            WHERE referrer.path = ?
            "#,
        )
        .bind(path)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub(super) async fn get_referrers(&self, path: &StorePath) -> Result<BTreeSet<StorePath>> {
        let rows: Vec<(StorePath,)> = sqlx::query_as(
            r#"
            SELECT o.path
            FROM ref r
            JOIN store_obj reference ON reference.id = r.reference
            JOIN store_obj o ON o.id = r.referrer
            WHERE reference.path = ?
            "#,
        )
        .bind(path)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub(super) async fn get_deriver(&self, path: &StorePath) -> Result<Option<StorePath>> {
        let row: Option<(Option<StorePath>,)> =
            sqlx::query_as("SELECT deriver FROM store_obj WHERE path = ?")
                .bind(path)
                .fetch_optional(&self.db)
                .await?;
        Ok(row.and_then(|r| r.0))
    }

    pub(super) async fn set_deriver(
        tx: &mut sqlx::SqliteTransaction<'static>,
        path: &StorePath,
        drv: &StorePath,
    ) -> Result<()> {
        sqlx::query("UPDATE store_obj SET deriver = ? WHERE path = ?")
            .bind(drv)
            .bind(path)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub(super) async fn add_drv_output(
        tx: &mut sqlx::SqliteTransaction<'static>,
        drv: &StorePath,
        out: &str,
        path: &StorePath,
    ) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO drv_output (drv, out, path) VALUES (?, ?, ?)")
            .bind(drv)
            .bind(out)
            .bind(path)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub(super) async fn get_valid_derivers(&self, path: &StorePath) -> Result<BTreeSet<StorePath>> {
        let rows: Vec<(StorePath,)> = sqlx::query_as(
            r#"
            SELECT d.drv
            FROM drv_output d
            JOIN store_obj o ON o.path = d.drv
            WHERE d.path = ?
            "#,
        )
        .bind(path)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub(super) async fn get_drv_outputs(&self, drv: &StorePath) -> Result<BTreeSet<StorePath>> {
        let rows: Vec<(StorePath,)> = sqlx::query_as("SELECT path FROM drv_output WHERE drv = ?")
            .bind(drv)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub(super) async fn get_eq_classes(&self, path: &StorePath) -> Result<BTreeSet<EqClass>> {
        let rows: Vec<(EqClass,)> =
            sqlx::query_as("SELECT DISTINCT eq_class FROM eq_member WHERE path = ?")
                .bind(path)
                .fetch_all(&self.db)
                .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub(super) async fn get_eq_members(&self, eq_class: &EqClass) -> Result<BTreeSet<EqMember>> {
        let rows: Vec<(StorePath, TrustId)> =
            sqlx::query_as("SELECT path, trust_id FROM eq_member WHERE eq_class = ?")
                .bind(eq_class)
                .fetch_all(&self.db)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(path, trust_id)| EqMember { path, trust_id })
            .collect())
    }

    pub(super) async fn insert_eq_member(
        &self,
        eq_class: &EqClass,
        trust_id: &TrustId,
        path: &StorePath,
    ) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("INSERT OR REPLACE INTO eq_member (eq_class, trust_id, path) VALUES (?, ?, ?)")
            .bind(eq_class)
            .bind(trust_id)
            .bind(path)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
