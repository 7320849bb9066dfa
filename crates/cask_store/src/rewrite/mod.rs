use cask_core::hash::Hash;
use cask_core::store::{PathHash, StorePath, HASH_PART_LEN};
use log::debug;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Equal width hash substitutions, applied one entry at a time in map order.
pub type HashRewrites = BTreeMap<PathHash, PathHash>;

pub fn rewrite_hashes(s: &[u8], rewrites: &HashRewrites) -> Vec<u8> {
    let mut positions = Vec::new();
    rewrite_hashes_recording(s, rewrites, &mut positions)
}

/// Replace every occurrence of each `from` by its `to`, continuing the scan
/// past the written replacement, so a replacement is never re-matched.
/// Occurrence offsets are appended to `positions` in scan order.
pub fn rewrite_hashes_recording(
    s: &[u8],
    rewrites: &HashRewrites,
    positions: &mut Vec<usize>,
) -> Vec<u8> {
    let mut out = s.to_vec();
    for (from, to) in rewrites {
        let mut j = 0;
        while j + HASH_PART_LEN <= out.len() {
            if out[j..j + HASH_PART_LEN] == from.as_bytes()[..] {
                debug!("rewriting @ {j}");
                out[j..j + HASH_PART_LEN].copy_from_slice(to.as_bytes());
                positions.push(j);
                j += HASH_PART_LEN;
            } else {
                j += 1;
            }
        }
    }
    out
}

/// Path set variant: only the hash component of each path is touched.
pub fn rewrite_references(
    refs: &BTreeSet<StorePath>,
    rewrites: &HashRewrites,
) -> BTreeSet<StorePath> {
    refs.iter()
        .map(|r| {
            let mut r = r.clone();
            if let Some(to) = rewrites.get(&r.hash_part()) {
                r.rewrite_hash_part(to);
            }
            r
        })
        .collect()
}

/// Content hash of `s` taken modulo `modulus`: every occurrence of `modulus`
/// is zeroed out and its offset mixed into the digest, so that content
/// differing only in where a self reference sits still hashes differently.
pub fn hash_modulo(s: &[u8], modulus: &PathHash) -> Hash {
    let (body, positions) = if modulus.is_null() {
        (s.to_vec(), Vec::new())
    } else {
        let mut rewrites = HashRewrites::new();
        rewrites.insert(*modulus, PathHash::null());
        let mut positions = Vec::new();
        let body = rewrite_hashes_recording(s, &rewrites, &mut positions);
        (body, positions)
    };

    let mut prefix = String::new();
    for p in &positions {
        prefix.push('|');
        prefix.push_str(&p.to_string());
    }
    prefix.push_str("||");
    debug!("positions {prefix}");

    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(&body);
    Hash::Sha256(hasher.finalize().into())
}
