mod queries;

use crate::api::{AddOpt, Store, SubstitutablePathInfo, CONFIG};
use crate::os::lock::{LockMode, PathLock};
use crate::rewrite::{hash_modulo, rewrite_hashes, rewrite_references, HashRewrites};
use crate::types::{EqMember, StoreObj};
use crate::utils::{add_lock_ext, is_valid_name, tempfile::tempfile_in};
use anyhow::{bail, Result};
use cask_core::drv::Derivation;
use cask_core::store::{PathHash, StorePath};
use cask_core::types::{EqClass, TrustId};
use log::info;
use sqlx::SqlitePool;
use std::cell::LazyCell;
use std::collections::{BTreeMap, BTreeSet};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub struct LocalStoreConfig {
    pub db_dir: String,
    pub db_path: String,
}

impl LocalStoreConfig {
    pub fn new() -> Self {
        let db_dir = format!("{}/db", CONFIG.state_dir);
        let db_path = format!("{db_dir}/cask.db");
        Self { db_dir, db_path }
    }
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub const LOCAL_STORE_CONFIG: LazyCell<LocalStoreConfig> = LazyCell::new(LocalStoreConfig::new);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS store_obj (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT UNIQUE NOT NULL,
    hash TEXT NOT NULL,
    deriver TEXT
);
CREATE TABLE IF NOT EXISTS ref (
    referrer INTEGER NOT NULL,
    reference INTEGER NOT NULL,
    PRIMARY KEY (referrer, reference)
);
CREATE TABLE IF NOT EXISTS drv_output (
    drv TEXT NOT NULL,
    out TEXT NOT NULL,
    path TEXT NOT NULL,
    PRIMARY KEY (drv, out)
);
CREATE TABLE IF NOT EXISTS eq_member (
    eq_class TEXT NOT NULL,
    trust_id TEXT NOT NULL,
    path TEXT NOT NULL,
    PRIMARY KEY (eq_class, trust_id, path)
);
"#;

pub struct LocalStore {
    db: SqlitePool,
    store_dir: String,
}

impl LocalStore {
    pub async fn new() -> Result<Self> {
        fs::create_dir_all(&LOCAL_STORE_CONFIG.db_dir).await?;
        fs::create_dir_all(&CONFIG.store_dir).await?;
        let url = format!("sqlite://{}?mode=rwc", LOCAL_STORE_CONFIG.db_path);
        Self::open(&url, CONFIG.store_dir.clone()).await
    }

    /// Open against an explicit database and store directory.
    pub async fn open(url: &str, store_dir: String) -> Result<Self> {
        let db = SqlitePool::connect(url).await?;
        sqlx::raw_sql(SCHEMA).execute(&db).await?;
        Ok(Self { db, store_dir })
    }

    /// Record the declared outputs of a derivation and stamp each output's
    /// deriver, so the deriver/output closure edges become answerable.
    pub async fn register_derivation(&self, drv_path: &StorePath, drv: &Derivation) -> Result<()> {
        let mut tx = self.db.begin().await?;
        for (out, o) in &drv.outputs {
            Self::add_drv_output(&mut tx, drv_path, out, &o.path).await?;
            Self::set_deriver(&mut tx, &o.path, drv_path).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

impl Store for LocalStore {
    fn store_dir(&self) -> String {
        self.store_dir.clone()
    }

    async fn add_to_store(&self, src: &StorePath, opt: AddOpt) -> Result<StorePath> {
        if !is_valid_name(&opt.name) {
            bail!("invalid name: {}", opt.name);
        }

        let buff = fs::read(self.store_path(src)).await?;
        let buff = rewrite_hashes(&buff, &opt.rewrites);

        let hash = hash_modulo(&buff, &opt.expected_hash);
        let hash_part = PathHash::from_hash(&hash);
        let path = StorePath::new(&hash_part, &opt.name);

        if self.valid(&path).await? {
            // content addressing makes this unreachable unless the store
            // is corrupted or a truncated digest collides
            if self.get_store_obj_hash(&path).await? != Some(hash.base64_with_algo()) {
                bail!("hash collision adding `{path}' to the store");
            }
            return Ok(path);
        }

        info!("add to store: {path}");
        let full_path = self.store_path(&path);
        let lock = PathLock::lock(add_lock_ext(&full_path), LockMode::Write)?;
        if !self.valid(&path).await? {
            let mut self_rewrite = HashRewrites::new();
            self_rewrite.insert(opt.expected_hash, hash_part);
            let buff = rewrite_hashes(&buff, &self_rewrite);

            let (mut file, tmp) = tempfile_in(&self.store_dir).await?;
            file.write_all(&buff).await?;
            file.flush().await?;
            drop(file);
            fs::rename(&tmp, &full_path).await?;

            let mut rewrites = opt.rewrites;
            rewrites.insert(opt.expected_hash, hash_part);
            let refs = rewrite_references(&opt.refs, &rewrites);
            self.register_store_obj(
                StoreObj {
                    path: path.clone(),
                    hash,
                },
                refs,
            )
            .await?;
        }
        lock.unlock();

        Ok(path)
    }

    async fn is_valid_path(&self, p: &StorePath) -> Result<bool> {
        self.valid(p).await
    }

    async fn query_references(&self, p: &StorePath) -> Result<BTreeSet<StorePath>> {
        self.get_references(p).await
    }

    async fn query_referrers(&self, p: &StorePath) -> Result<BTreeSet<StorePath>> {
        self.get_referrers(p).await
    }

    async fn query_deriver(&self, p: &StorePath) -> Result<Option<StorePath>> {
        self.get_deriver(p).await
    }

    async fn query_valid_derivers(&self, p: &StorePath) -> Result<BTreeSet<StorePath>> {
        self.get_valid_derivers(p).await
    }

    async fn query_derivation_outputs(&self, p: &StorePath) -> Result<BTreeSet<StorePath>> {
        self.get_drv_outputs(p).await
    }

    async fn query_eq_classes(&self, p: &StorePath) -> Result<BTreeSet<EqClass>> {
        self.get_eq_classes(p).await
    }

    async fn query_eq_members(&self, c: &EqClass) -> Result<BTreeSet<EqMember>> {
        self.get_eq_members(c).await
    }

    async fn add_eq_member(&self, c: &EqClass, trust_id: &TrustId, p: &StorePath) -> Result<()> {
        self.insert_eq_member(c, trust_id, p).await
    }

    // no substituter is wired into the local store; the contract allows
    // returning fewer entries than requested
    async fn query_substitutable_path_infos(
        &self,
        _query: &BTreeSet<StorePath>,
    ) -> Result<BTreeMap<StorePath, SubstitutablePathInfo>> {
        Ok(BTreeMap::new())
    }
}
