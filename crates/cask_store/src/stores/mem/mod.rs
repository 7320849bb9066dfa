use crate::api::{AddOpt, Store, SubstitutablePathInfo};
use crate::rewrite::{hash_modulo, rewrite_hashes, rewrite_references, HashRewrites};
use crate::types::EqMember;
use anyhow::{anyhow, bail, Result};
use cask_core::drv::Derivation;
use cask_core::store::{PathHash, StorePath};
use cask_core::types::{EqClass, TrustId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

/// A store living entirely in memory. Backs the planner and consolidation
/// test suites; content is held as blobs keyed by store path.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    valid: BTreeSet<StorePath>,
    blobs: BTreeMap<StorePath, Vec<u8>>,
    refs: BTreeMap<StorePath, BTreeSet<StorePath>>,
    drvs: BTreeMap<StorePath, Derivation>,
    drv_outputs: BTreeMap<StorePath, BTreeSet<StorePath>>,
    derivers: BTreeMap<StorePath, StorePath>,
    eq_members: BTreeMap<EqClass, BTreeSet<EqMember>>,
    substitutable: BTreeMap<StorePath, SubstitutablePathInfo>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` as valid with the given content and references.
    pub fn add_blob<'a, I>(&self, path: &StorePath, content: &[u8], refs: I)
    where
        I: IntoIterator<Item = &'a StorePath>,
    {
        let mut inner = self.inner.write().unwrap();
        inner.valid.insert(path.clone());
        inner.blobs.insert(path.clone(), content.to_vec());
        inner
            .refs
            .insert(path.clone(), refs.into_iter().cloned().collect());
    }

    /// Register a derivation recipe readable through `read_derivation`.
    pub fn register_derivation(&self, path: &StorePath, drv: Derivation) {
        let mut inner = self.inner.write().unwrap();
        inner.valid.insert(path.clone());
        inner.drvs.insert(path.clone(), drv);
    }

    /// Record `out` as a declared output of `drv` and `drv` as its deriver.
    pub fn register_output(&self, drv: &StorePath, out: &StorePath) {
        let mut inner = self.inner.write().unwrap();
        inner
            .drv_outputs
            .entry(drv.clone())
            .or_default()
            .insert(out.clone());
        inner.derivers.insert(out.clone(), drv.clone());
    }

    /// Pretend a substituter offers `path`.
    pub fn insert_substitutable(&self, path: &StorePath, info: SubstitutablePathInfo) {
        let mut inner = self.inner.write().unwrap();
        inner.substitutable.insert(path.clone(), info);
    }

    pub fn content(&self, path: &StorePath) -> Option<Vec<u8>> {
        self.inner.read().unwrap().blobs.get(path).cloned()
    }
}

impl Store for MemStore {
    async fn add_to_store(&self, src: &StorePath, opt: AddOpt) -> Result<StorePath> {
        let content = self
            .content(src)
            .ok_or_else(|| anyhow!("path `{src}' has no content"))?;
        let content = rewrite_hashes(&content, &opt.rewrites);

        let digest = hash_modulo(&content, &opt.expected_hash);
        let hash_part = PathHash::from_hash(&digest);
        let path = StorePath::new(&hash_part, &opt.name);

        // final substitution: the hash the content was built under
        // becomes the hash it is stored under
        let mut self_rewrite = HashRewrites::new();
        self_rewrite.insert(opt.expected_hash, hash_part);
        let content = rewrite_hashes(&content, &self_rewrite);

        let mut rewrites = opt.rewrites;
        rewrites.insert(opt.expected_hash, hash_part);
        let refs = rewrite_references(&opt.refs, &rewrites);

        let mut inner = self.inner.write().unwrap();
        if let Some(existing) = inner.blobs.get(&path) {
            if *existing != content {
                bail!("hash collision adding `{path}' to the store");
            }
        }
        inner.valid.insert(path.clone());
        inner.blobs.insert(path.clone(), content);
        inner.refs.insert(path.clone(), refs);
        Ok(path)
    }

    async fn is_valid_path(&self, p: &StorePath) -> Result<bool> {
        Ok(self.inner.read().unwrap().valid.contains(p))
    }

    async fn query_references(&self, p: &StorePath) -> Result<BTreeSet<StorePath>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .refs
            .get(p)
            .cloned()
            .unwrap_or_default())
    }

    async fn query_referrers(&self, p: &StorePath) -> Result<BTreeSet<StorePath>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .refs
            .iter()
            .filter(|(_, refs)| refs.contains(p))
            .map(|(referrer, _)| referrer.clone())
            .collect())
    }

    async fn query_deriver(&self, p: &StorePath) -> Result<Option<StorePath>> {
        Ok(self.inner.read().unwrap().derivers.get(p).cloned())
    }

    async fn query_valid_derivers(&self, p: &StorePath) -> Result<BTreeSet<StorePath>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .drv_outputs
            .iter()
            .filter(|(drv, outs)| outs.contains(p) && inner.valid.contains(*drv))
            .map(|(drv, _)| drv.clone())
            .collect())
    }

    async fn query_derivation_outputs(&self, p: &StorePath) -> Result<BTreeSet<StorePath>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .drv_outputs
            .get(p)
            .cloned()
            .unwrap_or_default())
    }

    async fn query_eq_classes(&self, p: &StorePath) -> Result<BTreeSet<EqClass>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .eq_members
            .iter()
            .filter(|(_, members)| members.iter().any(|m| m.path == *p))
            .map(|(class, _)| class.clone())
            .collect())
    }

    async fn query_eq_members(&self, c: &EqClass) -> Result<BTreeSet<EqMember>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .eq_members
            .get(c)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_eq_member(&self, c: &EqClass, trust_id: &TrustId, p: &StorePath) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.eq_members.entry(c.clone()).or_default().insert(EqMember {
            path: p.clone(),
            trust_id: trust_id.clone(),
        });
        Ok(())
    }

    async fn query_substitutable_path_infos(
        &self,
        query: &BTreeSet<StorePath>,
    ) -> Result<BTreeMap<StorePath, SubstitutablePathInfo>> {
        let inner = self.inner.read().unwrap();
        Ok(query
            .iter()
            .filter_map(|p| inner.substitutable.get(p).map(|i| (p.clone(), i.clone())))
            .collect())
    }

    async fn read_derivation(&self, p: &StorePath) -> Result<Derivation> {
        self.inner
            .read()
            .unwrap()
            .drvs
            .get(p)
            .cloned()
            .ok_or_else(|| anyhow!("derivation `{p}' is not in the store"))
    }
}
