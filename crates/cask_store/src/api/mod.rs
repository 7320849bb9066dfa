mod opt;
pub use opt::*;

use crate::types::EqMember;
use anyhow::Result;
use cask_core::{
    drv::Derivation,
    store::{config::Config, StorePath},
    types::{EqClass, TrustId},
};
use std::cell::LazyCell;
use std::collections::{BTreeMap, BTreeSet};
use tokio::fs;

// TODO: maybe do not use a global variable
pub const CONFIG: LazyCell<Config> = LazyCell::new(Config::new);

/// What a substituter can tell us about a path it offers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubstitutablePathInfo {
    pub references: BTreeSet<StorePath>,
    pub download_size: u64,
    pub nar_size: u64,
}

#[allow(async_fn_in_trait)]
pub trait Store {
    /// Ingest the content at `src`, applying `opt.rewrites` to its bytes and
    /// reference set while hashing modulo `opt.expected_hash`. The returned
    /// path's hash component reflects the rewritten content; remaining
    /// occurrences of `opt.expected_hash` are replaced by it.
    async fn add_to_store(&self, src: &StorePath, opt: AddOpt) -> Result<StorePath>;

    async fn is_valid_path(&self, p: &StorePath) -> Result<bool>;

    async fn query_references(&self, p: &StorePath) -> Result<BTreeSet<StorePath>>;

    async fn query_referrers(&self, p: &StorePath) -> Result<BTreeSet<StorePath>>;

    async fn query_deriver(&self, p: &StorePath) -> Result<Option<StorePath>>;

    async fn query_valid_derivers(&self, p: &StorePath) -> Result<BTreeSet<StorePath>>;

    async fn query_derivation_outputs(&self, p: &StorePath) -> Result<BTreeSet<StorePath>>;

    async fn query_eq_classes(&self, p: &StorePath) -> Result<BTreeSet<EqClass>>;

    async fn query_eq_members(&self, c: &EqClass) -> Result<BTreeSet<EqMember>>;

    /// Runs inside its own transaction; the member is durable once this returns.
    async fn add_eq_member(&self, c: &EqClass, trust_id: &TrustId, p: &StorePath) -> Result<()>;

    /// May return fewer entries than requested.
    async fn query_substitutable_path_infos(
        &self,
        query: &BTreeSet<StorePath>,
    ) -> Result<BTreeMap<StorePath, SubstitutablePathInfo>>;

    fn store_dir(&self) -> String {
        CONFIG.store_dir.clone()
    }

    fn store_path(&self, path: &StorePath) -> String {
        format!("{}/{}", self.store_dir(), path)
    }

    async fn read_derivation(&self, p: &StorePath) -> Result<Derivation> {
        let path = self.store_path(p);
        let buff = fs::read_to_string(&path).await?;
        Ok(toml::from_str(&buff)?)
    }
}
