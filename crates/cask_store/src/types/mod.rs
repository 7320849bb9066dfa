use cask_core::{hash::Hash, store::StorePath, types::TrustId};

/// Database ID
pub type ID = u32;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoreObj {
    pub path: StorePath,
    pub hash: Hash,
}

/// One vouched-for artifact inside an output equivalence class.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EqMember {
    pub path: StorePath,
    pub trust_id: TrustId,
}
