use base64::{engine::GeneralPurpose, prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use std::fmt::Display;

pub const BASE64: GeneralPurpose = BASE64_URL_SAFE_NO_PAD;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Hash {
    Sha256([u8; 32]),
}

impl Hash {
    pub fn digest_as_bytes(&self) -> &[u8] {
        match self {
            Hash::Sha256(digest) => digest,
        }
    }

    pub fn algo(&self) -> &'static str {
        match self {
            Hash::Sha256(_) => "sha256",
        }
    }

    pub fn base64(&self) -> String {
        BASE64.encode(self.digest_as_bytes())
    }

    pub fn base64_with_algo(&self) -> String {
        format!("{}:{}", self.algo(), self.base64())
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base64_with_algo())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printing_carries_the_algo() {
        let hash = Hash::Sha256([7; 32]);
        let printed = hash.base64_with_algo();
        assert!(printed.starts_with("sha256:"));
        assert_eq!(printed, hash.to_string());
        // no padding in the digest part
        assert!(!printed.ends_with('='));
    }

    #[test]
    fn distinct_digests_print_differently() {
        assert_ne!(
            Hash::Sha256([1; 32]).base64_with_algo(),
            Hash::Sha256([2; 32]).base64_with_algo()
        );
    }
}
