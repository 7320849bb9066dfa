pub mod config;

use crate::error::Error;
use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef},
    Decode, Sqlite, Type,
};
use std::borrow::Cow;
use std::{fmt::Display, ops::Deref};

/// Width of the textual hash component of a store path.
pub const HASH_PART_LEN: usize = 32;

/// Bytes the folded digest keeps before base-32 printing.
const FOLDED_LEN: usize = 20;

const BASE32_CHARS: &[u8; 32] = b"0123456789abcdfghijklmnpqrsvwxyz";

/// The hash component of a store path, e.g. the `zvhgns772jpj68l40mq1jb74wpfsf0ma`
/// in `zvhgns772jpj68l40mq1jb74wpfsf0ma-glibc`. A folded SHA-256 digest of the
/// path contents, printed in the store's base-32 alphabet.
///
/// The null value (all zero bytes) never names a path; it is a rewrite target
/// that erases a prefix.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathHash([u8; HASH_PART_LEN]);

impl PathHash {
    pub fn null() -> Self {
        PathHash([0; HASH_PART_LEN])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0; HASH_PART_LEN]
    }

    /// Fold a full content digest down to 160 bits and print it in base-32.
    pub fn from_hash(hash: &Hash) -> Self {
        let digest = hash.digest_as_bytes();
        let mut folded = [0u8; FOLDED_LEN];
        for (i, b) in digest.iter().enumerate() {
            folded[i % FOLDED_LEN] ^= b;
        }
        PathHash(print_hash32(&folded))
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        let bytes = s.as_bytes();
        if bytes.len() != HASH_PART_LEN || !bytes.iter().all(|b| BASE32_CHARS.contains(b)) {
            return Err(Error::InvalidPathHash(s.to_string()));
        }
        let mut rep = [0; HASH_PART_LEN];
        rep.copy_from_slice(bytes);
        Ok(PathHash(rep))
    }

    /// The raw textual bytes, as they occur inside blobs.
    pub fn as_bytes(&self) -> &[u8; HASH_PART_LEN] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // the alphabet is ASCII and the null rep is NUL bytes, both valid utf-8
        std::str::from_utf8(&self.0).unwrap()
    }

    pub(crate) fn from_rep(rep: [u8; HASH_PART_LEN]) -> Self {
        PathHash(rep)
    }
}

impl Display for PathHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Debug for PathHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// Base-32 printer, least significant character last.
fn print_hash32(folded: &[u8; FOLDED_LEN]) -> [u8; HASH_PART_LEN] {
    let mut out = [0u8; HASH_PART_LEN];
    for n in 0..HASH_PART_LEN {
        let b = n * 5;
        let i = b / 8;
        let j = b % 8;
        let mut c = (folded[i] as u16) >> j;
        if i + 1 < FOLDED_LEN {
            c |= (folded[i + 1] as u16) << (8 - j);
        }
        out[HASH_PART_LEN - 1 - n] = BASE32_CHARS[(c & 0x1f) as usize];
    }
    out
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
/// The basename of a path inside of the store: `<pathhash>-<name>`.
// kept as a utf-8 String rather than OsString so it can be embedded in
// database columns and serialized recipes directly
pub struct StorePath(String);

impl StorePath {
    pub fn new(hash: &PathHash, name: &str) -> Self {
        Self(format!("{}-{}", hash, name))
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        let bytes = s.as_bytes();
        if bytes.len() < HASH_PART_LEN + 2 || bytes[HASH_PART_LEN] != b'-' {
            return Err(Error::InvalidStorePath(s.to_string()));
        }
        PathHash::parse(&s[..HASH_PART_LEN])?;
        Ok(Self(s.to_string()))
    }

    pub fn hash_part(&self) -> PathHash {
        let mut rep = [0; HASH_PART_LEN];
        rep.copy_from_slice(&self.0.as_bytes()[..HASH_PART_LEN]);
        PathHash::from_rep(rep)
    }

    pub fn name_part(&self) -> &str {
        &self.0[HASH_PART_LEN + 1..]
    }

    pub fn rewrite_hash_part(&mut self, to: &PathHash) {
        self.0.replace_range(..HASH_PART_LEN, to.as_str());
    }
}

impl Display for StorePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for StorePath {
    type Target = String;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Type<Sqlite> for StorePath {
    fn type_info() -> SqliteTypeInfo {
        <&str as Type<Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Encode<'r, Sqlite> for StorePath {
    fn encode_by_ref(&self, args: &mut Vec<SqliteArgumentValue<'r>>) -> Result<IsNull, BoxDynError>
    where
        Self: Sized,
    {
        args.push(SqliteArgumentValue::Text(Cow::Owned(self.to_string())));
        Ok(IsNull::No)
    }
}

impl<'r> sqlx::Decode<'r, Sqlite> for StorePath {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let value = <String as Decode<Sqlite>>::decode(value)?;
        Ok(StorePath(value))
    }
}
