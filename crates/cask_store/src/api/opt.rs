use crate::rewrite::HashRewrites;
use cask_core::store::{PathHash, StorePath};
use std::collections::BTreeSet;

pub struct AddOpt {
    /// The hash component the source content was built under; the content
    /// hash is taken modulo this value.
    pub expected_hash: PathHash,
    pub name: String,
    /// References of the new path, before the final self hash substitution.
    pub refs: BTreeSet<StorePath>,
    pub rewrites: HashRewrites,
}
